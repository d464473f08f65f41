// SPDX-License-Identifier: Apache-2.0 OR MIT
//! NETCONF operations through the interactive netopeer2-cli session.
//!
//! `edit-config` takes its payload from a file, so every change is written
//! to a temporary XML file first. netopeer2-cli reports failures as lines
//! starting with `ERROR`; those become [`ClientError::Rejected`].

use std::io::Write;
use thiserror::Error;

use crate::logging::{Facility, Logger};
use crate::model::{ConfigObject, EditOperation, ModelError};
use crate::process::{ProcessError, ProcessHandle};
use crate::{log_debug, log_info, log_warning};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("no NETCONF client session")]
    NoSession,

    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("failed to write edit-config payload: {0}")]
    Payload(#[source] std::io::Error),

    #[error("{operation} rejected by the server: {reply}")]
    Rejected { operation: String, reply: String },
}

/// Create/delete/get against the management datastore
pub trait ManagementClient {
    /// Merge `object` into the running datastore.
    fn create(&mut self, object: &dyn ConfigObject) -> Result<(), ClientError>;

    /// Delete `object` from the running datastore.
    fn delete(&mut self, object: &dyn ConfigObject) -> Result<(), ClientError>;

    /// Operational and configuration data selected by `xpath`.
    fn get(&mut self, xpath: &str) -> Result<String, ClientError>;
}

/// [`ManagementClient`] driving a logged-in netopeer2-cli
pub struct NetconfCli<'a> {
    handle: &'a mut ProcessHandle,
    logger: Logger,
}

impl<'a> NetconfCli<'a> {
    pub fn new(handle: &'a mut ProcessHandle, logger: Logger) -> Self {
        Self { handle, logger }
    }

    fn command(&mut self, operation: &str, text: &str) -> Result<String, ClientError> {
        let reply = self
            .handle
            .send_command(text)?
            .ok_or(ClientError::NoSession)?;
        if let Some(error) = first_error(&reply) {
            log_warning!(self.logger, Facility::Client, "{} failed: {}", operation, error);
            return Err(ClientError::Rejected {
                operation: operation.to_string(),
                reply: reply.trim().to_string(),
            });
        }
        Ok(reply)
    }

    /// Apply an XML payload to the running datastore.
    pub fn edit_config(&mut self, xml: &str) -> Result<String, ClientError> {
        let mut payload = tempfile::Builder::new()
            .prefix("sc-edit-")
            .suffix(".xml")
            .tempfile()
            .map_err(ClientError::Payload)?;
        payload
            .write_all(xml.as_bytes())
            .and_then(|_| payload.flush())
            .map_err(ClientError::Payload)?;
        log_debug!(self.logger, Facility::Client, "edit-config payload:\n{}", xml);

        let command = format!(
            "edit-config --target running --config={}",
            payload.path().display()
        );
        self.command("edit-config", &command)
    }

    fn apply(
        &mut self,
        object: &dyn ConfigObject,
        operation: EditOperation,
    ) -> Result<(), ClientError> {
        let xml = object.to_xml(operation)?;
        self.edit_config(&xml)?;
        log_info!(
            self.logger,
            Facility::Client,
            "{} {}",
            operation.as_str(),
            object.describe()
        );
        Ok(())
    }
}

impl ManagementClient for NetconfCli<'_> {
    fn create(&mut self, object: &dyn ConfigObject) -> Result<(), ClientError> {
        self.apply(object, EditOperation::Merge)
    }

    fn delete(&mut self, object: &dyn ConfigObject) -> Result<(), ClientError> {
        self.apply(object, EditOperation::Delete)
    }

    fn get(&mut self, xpath: &str) -> Result<String, ClientError> {
        self.command("get", &format!("get --filter-xpath {}", xpath))
    }
}

/// First line netopeer2-cli flagged as an error.
fn first_error(reply: &str) -> Option<&str> {
    reply
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with("ERROR") || line.starts_with("nc ERROR"))
}

/// Check a `get` reply.
///
/// The first non-blank line must equal `expected` (netopeer2-cli prints
/// `DATA` or `OK` there). For each `(key, value)`, every line of the form
/// `<key>...</key>` must carry exactly `value`.
pub fn check_response(reply: &str, expected: &str, checks: &[(&str, &str)]) -> Result<(), String> {
    let mut lines = reply.lines().map(str::trim).filter(|l| !l.is_empty());
    match lines.next() {
        Some(first) if first == expected => {}
        other => {
            return Err(format!(
                "expected reply to start with '{}', got {:?}",
                expected, other
            ))
        }
    }

    for (key, value) in checks {
        let open = format!("<{}>", key);
        let close = format!("</{}>", key);
        for line in reply.lines().map(str::trim) {
            let Some(rest) = line.strip_prefix(&open) else {
                continue;
            };
            let found = rest.rfind(&close).map_or(rest, |end| &rest[..end]);
            if found != *value {
                return Err(format!("<{}> is '{}', expected '{}'", key, found, value));
            }
        }
    }
    Ok(())
}
