// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Host-side veth links that VPP attaches to with `create host-interface`.

use serde::{Deserialize, Serialize};
use std::process::Command;
use thiserror::Error;

use crate::logging::{Facility, Logger};
use crate::{log_debug, log_info};

/// One veth pair: `name` is handed to VPP, `peer` stays in the host stack
/// and carries `peer_address`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VethLink {
    pub name: String,
    pub peer: String,
    /// Address with prefix length, e.g. `192.168.0.2/24`
    pub peer_address: String,
}

impl VethLink {
    pub fn new(name: &str, peer: &str, peer_address: &str) -> Self {
        Self {
            name: name.to_string(),
            peer: peer.to_string(),
            peer_address: peer_address.to_string(),
        }
    }

    /// The name VPP gives the host-interface bound to this link.
    pub fn vpp_interface(&self) -> String {
        format!("host-{}", self.name)
    }
}

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("failed to run ip command: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("'ip {args}' failed: {stderr}")]
    Command { args: String, stderr: String },
}

fn ip(args: &[&str]) -> Result<(), LinkError> {
    let output = Command::new("ip").args(args).output()?;
    if !output.status.success() {
        return Err(LinkError::Command {
            args: args.join(" "),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(())
}

/// True if a link called `name` exists.
pub fn link_exists(name: &str) -> Result<bool, LinkError> {
    let status = Command::new("ip")
        .args(["link", "show", "dev", name])
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()?;
    Ok(status.success())
}

/// Create `link` unless it already exists. Returns true if it was created.
pub fn ensure_link(link: &VethLink, logger: &Logger) -> Result<bool, LinkError> {
    if link_exists(&link.name)? {
        log_debug!(logger, Facility::Topology, "link {} already present", link.name);
        return Ok(false);
    }

    ip(&["link", "add", "name", &link.name, "type", "veth", "peer", "name", &link.peer])?;
    ip(&["link", "set", "dev", &link.peer, "up"])?;
    ip(&["addr", "add", &link.peer_address, "dev", &link.peer])?;

    log_info!(
        logger,
        Facility::Topology,
        "created veth {} <-> {} ({})",
        link.name,
        link.peer,
        link.peer_address
    );
    Ok(true)
}

/// Ensure every link exists; returns how many were created.
pub fn ensure_links(links: &[VethLink], logger: &Logger) -> Result<usize, LinkError> {
    let mut created = 0;
    for link in links {
        if ensure_link(link, logger)? {
            created += 1;
        }
    }
    Ok(created)
}
