// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Read-only queries against VPP's CLI.
//!
//! Each query is one command round trip through a [`CliTransport`] whose
//! reply is handed to the CLI parser. An interface that does not exist, or
//! has no addresses, is `Ok(None)`.

use std::collections::HashMap;
use std::process::Command;
use thiserror::Error;

use crate::cli_parser::{
    find_interface, parse_address_table, parse_interface_table, AddressListRecord,
    InterfaceStatusRecord,
};
use crate::config::QueryConfig;
use crate::logging::{Facility, Logger};
use crate::process::{ProcessError, ProcessHandle};
use crate::{log_debug, log_kv};

#[derive(Debug, Error)]
pub enum StatusError {
    #[error("failed to run '{command}': {source}")]
    Io {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{command}' failed: {stderr}")]
    Command { command: String, stderr: String },

    #[error("{label} has no interactive session")]
    NoSession { label: String },

    #[error(transparent)]
    Process(#[from] ProcessError),
}

/// Something that can run one VPP CLI command and return its output
pub trait CliTransport {
    fn run(&mut self, command: &str) -> Result<String, StatusError>;
}

impl<T: CliTransport + ?Sized> CliTransport for &mut T {
    fn run(&mut self, command: &str) -> Result<String, StatusError> {
        (**self).run(command)
    }
}

/// Runs every command as a separate `vppctl` invocation
#[derive(Debug, Clone)]
pub struct VppctlCommand {
    program: String,
}

impl VppctlCommand {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
        }
    }
}

impl Default for VppctlCommand {
    fn default() -> Self {
        Self::new("vppctl")
    }
}

impl CliTransport for VppctlCommand {
    fn run(&mut self, command: &str) -> Result<String, StatusError> {
        let output = Command::new(&self.program)
            .args(command.split_whitespace())
            .output()
            .map_err(|source| StatusError::Io {
                command: command.to_string(),
                source,
            })?;
        if !output.status.success() {
            return Err(StatusError::Command {
                command: command.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// An interactive `vppctl` session
impl CliTransport for ProcessHandle {
    fn run(&mut self, command: &str) -> Result<String, StatusError> {
        self.send_command(command)?
            .ok_or_else(|| StatusError::NoSession {
                label: self.label().to_string(),
            })
    }
}

/// Queries VPP interface state and addresses
pub struct StatusQueryClient<T> {
    transport: T,
    queries: QueryConfig,
    logger: Logger,
}

impl<T: CliTransport> StatusQueryClient<T> {
    pub fn new(transport: T, queries: QueryConfig, logger: Logger) -> Self {
        Self {
            transport,
            queries,
            logger,
        }
    }

    fn query(&mut self, command: &str) -> Result<String, StatusError> {
        let reply = self.transport.run(command)?;
        log_debug!(self.logger, Facility::Status, "{}:\n{}", command, reply.trim_end());
        Ok(reply)
    }

    /// Every row of the interface list.
    pub fn interfaces(&mut self) -> Result<Vec<InterfaceStatusRecord>, StatusError> {
        let command = self.queries.interface_list.clone();
        let reply = self.query(&command)?;
        Ok(parse_interface_table(&reply).collect())
    }

    /// Every interface that has at least one address.
    pub fn addresses(&mut self) -> Result<HashMap<String, AddressListRecord>, StatusError> {
        let command = self.queries.interface_addresses.clone();
        let reply = self.query(&command)?;
        Ok(parse_address_table(&reply))
    }

    /// Status row of `name`, `None` if VPP does not list it.
    pub fn interface_status(
        &mut self,
        name: &str,
    ) -> Result<Option<InterfaceStatusRecord>, StatusError> {
        let command = self.queries.interface_list.clone();
        let reply = self.query(&command)?;
        let record = find_interface(parse_interface_table(&reply), name);

        let state = match record.as_ref().map(|r| r.state) {
            None => "absent",
            Some(Some(true)) => "up",
            Some(Some(false)) => "down",
            Some(None) => "unknown",
        };
        log_kv!(
            self.logger,
            crate::logging::Severity::Info,
            Facility::Status,
            "interface status",
            "interface" => name,
            "state" => state
        );
        Ok(record)
    }

    /// Addresses of `name`, `None` if it has none.
    pub fn address_status(&mut self, name: &str) -> Result<Option<AddressListRecord>, StatusError> {
        let mut table = self.addresses()?;
        let record = table.remove(name);
        log_kv!(
            self.logger,
            crate::logging::Severity::Info,
            Facility::Status,
            "address status",
            "interface" => name,
            "addresses" => &record
                .as_ref()
                .map(|r| r.addr.join(","))
                .unwrap_or_else(|| "none".to_string())
        );
        Ok(record)
    }
}
