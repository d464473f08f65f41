// SPDX-License-Identifier: Apache-2.0 OR MIT
// Harness logging
//
// Every component logs through a cloneable `Logger` tagged with a facility.
// Lines are filtered by severity (globally or per facility) and written to a
// `LogSink`. The runner installs a sink that shares its output stream so
// harness diagnostics and test results appear in one ordered log.

mod facility;
mod logger;
#[macro_use]
mod macros;
mod severity;
mod sink;

pub use facility::Facility;
pub use logger::{LogLine, Logger};
pub use severity::Severity;
pub use sink::{LogSink, MemorySink, SharedOutputSink, StderrSink, StdoutSink};
