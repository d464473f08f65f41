// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Shared output stream.
//!
//! The runner and the harness logger write through the same `SharedOutput`
//! so test progress, harness diagnostics and summaries come out in one
//! deterministic order. The underlying writer can be swapped at runtime,
//! which is how the runner redirects into external log capture and restores
//! the previous stream afterwards.

use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type Writer = Box<dyn Write + Send>;

#[derive(Clone)]
pub struct SharedOutput {
    inner: Arc<Mutex<Writer>>,
}

impl SharedOutput {
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }

    fn lock(&self) -> MutexGuard<'_, Writer> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Install `writer` and return the one that was active.
    pub fn swap(&self, writer: Writer) -> Writer {
        std::mem::replace(&mut *self.lock(), writer)
    }

    pub fn write_str(&self, text: &str) {
        let _ = self.lock().write_all(text.as_bytes());
    }

    pub fn write_line(&self, line: &str) {
        let mut writer = self.lock();
        let _ = writer.write_all(line.as_bytes());
        let _ = writer.write_all(b"\n");
    }

    pub fn flush(&self) {
        let _ = self.lock().flush();
    }
}

/// In-memory writer whose contents stay readable after being handed to a
/// `SharedOutput`.
#[derive(Clone, Default)]
pub struct CaptureBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl CaptureBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        let bytes = self.bytes.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for CaptureBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.bytes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
