// SPDX-License-Identifier: Apache-2.0 OR MIT
// Logging facilities (harness component identifiers)

use serde::{Deserialize, Serialize};

/// Which part of the harness produced a log line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facility {
    /// Stage sequencing, readiness gates, teardown and sweeps
    Topology,
    /// Spawning, signalling and reaping external processes
    Process,
    /// Pseudo-terminal sessions and the login handshake
    Session,
    /// VPP CLI status queries
    Status,
    /// NETCONF client operations
    Client,
    /// Test discovery over the registry
    Discovery,
    /// Suite execution and result reporting
    Runner,
    /// YANG module installation and datastore import
    Provision,
    /// Test bodies
    Test,
}

impl Facility {
    pub const ALL: [Facility; 9] = [
        Facility::Topology,
        Facility::Process,
        Facility::Session,
        Facility::Status,
        Facility::Client,
        Facility::Discovery,
        Facility::Runner,
        Facility::Provision,
        Facility::Test,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Facility::Topology => "Topology",
            Facility::Process => "Process",
            Facility::Session => "Session",
            Facility::Status => "Status",
            Facility::Client => "Client",
            Facility::Discovery => "Discovery",
            Facility::Runner => "Runner",
            Facility::Provision => "Provision",
            Facility::Test => "Test",
        }
    }
}

impl std::fmt::Display for Facility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_facility_display() {
        assert_eq!(format!("{}", Facility::Topology), "Topology");
        assert_eq!(format!("{}", Facility::Test), "Test");
    }

    #[test]
    fn test_facility_serde_names() {
        let json = serde_json::to_string(&Facility::Discovery).unwrap();
        assert_eq!(json, "\"discovery\"");
        let back: Facility = serde_json::from_str("\"runner\"").unwrap();
        assert_eq!(back, Facility::Runner);
    }
}
