// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Harness configuration (JSON5 file format).
//!
//! Every field defaults to the layout the sweetcomb test bed uses today, so
//! an empty file (or no file at all) gives the stock topology:
//! - two veth pairs `vpp1/virtual1` and `vpp2/virtual2`
//! - VPP started from `/root/src/sweetcomb/test/conf/vpp.conf`
//! - sysrepod, sysrepo-plugind and netopeer2-server with logs under /var/log
//! - netopeer2-cli logging in to localhost:830 as root

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::logging::Severity;
use crate::topology::links::VethLink;
use crate::topology::readiness::{Probe, Readiness, RetryPolicy};
use crate::validation;

/// Complete harness configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HarnessConfig {
    /// Leave every process running after the test for inspection
    pub debug: bool,

    /// Daemons log at `-l 4` instead of `-l 3`; harness logs at debug
    pub verbose: bool,

    /// Harness log level when not verbose
    pub log_level: Severity,

    /// Veth pairs created before VPP starts
    pub links: Vec<VethLink>,

    pub vpp: VppConfig,
    pub sysrepo: DaemonConfig,
    pub plugind: DaemonConfig,
    pub netconf_server: DaemonConfig,
    pub netconf_client: ClientConfig,
    pub queries: QueryConfig,

    /// Name fragments force-killed after the owned handles are gone
    pub sweep_patterns: Vec<String>,

    /// Time a daemon group gets between SIGTERM and SIGKILL
    pub teardown_grace_ms: u64,

    pub provision: ProvisionConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            debug: false,
            verbose: false,
            log_level: Severity::Info,
            links: vec![
                VethLink::new("vpp1", "virtual1", "192.168.0.2/24"),
                VethLink::new("vpp2", "virtual2", "192.168.1.2/24"),
            ],
            vpp: VppConfig::default(),
            sysrepo: DaemonConfig {
                program: "sysrepod".to_string(),
                args: vec!["-d".to_string()],
                log_level_flag: Some("-l".to_string()),
                log_file: PathBuf::from("/var/log/sysrepod"),
                readiness: Readiness::probe(Probe::Process {
                    pattern: "sysrepod".to_string(),
                })
                .with_settle(1000),
            },
            plugind: DaemonConfig {
                program: "sysrepo-plugind".to_string(),
                args: vec!["-d".to_string()],
                log_level_flag: Some("-l".to_string()),
                log_file: PathBuf::from("/var/log/sysrepo-plugind"),
                readiness: Readiness::probe(Probe::Process {
                    pattern: "sysrepo-plugind".to_string(),
                }),
            },
            netconf_server: DaemonConfig {
                program: "netopeer2-server".to_string(),
                args: vec!["-d".to_string()],
                log_level_flag: None,
                log_file: PathBuf::from("/var/log/netopeer2-server"),
                readiness: Readiness::probe(Probe::TcpPort {
                    address: "127.0.0.1:830".to_string(),
                }),
            },
            netconf_client: ClientConfig::default(),
            queries: QueryConfig::default(),
            sweep_patterns: vec![
                "vpp".to_string(),
                "sysrepo".to_string(),
                "netopeer".to_string(),
            ],
            teardown_grace_ms: 2000,
            provision: ProvisionConfig::default(),
        }
    }
}

/// VPP process and its default interface setup
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VppConfig {
    pub program: String,
    pub config_file: PathBuf,
    /// CLI client used for setup commands and status queries
    pub ctl: String,
    /// Run through `ctl` once VPP is ready
    pub setup_commands: Vec<String>,
    pub log_file: PathBuf,
    pub readiness: Readiness,
}

impl Default for VppConfig {
    fn default() -> Self {
        Self {
            program: "vpp".to_string(),
            config_file: PathBuf::from("/root/src/sweetcomb/test/conf/vpp.conf"),
            ctl: "vppctl".to_string(),
            setup_commands: vec![
                "create host-interface name vpp1".to_string(),
                "create host-interface name vpp2".to_string(),
            ],
            log_file: PathBuf::from("/var/log/vpp-harness"),
            readiness: Readiness {
                probe: Probe::Command {
                    program: "vppctl".to_string(),
                    args: vec!["show".to_string(), "version".to_string()],
                },
                retry: RetryPolicy::default(),
                settle_ms: 0,
            },
        }
    }
}

/// A daemon started in the background with its output sent to `log_file`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct DaemonConfig {
    pub program: String,
    pub args: Vec<String>,
    /// Flag taking the daemon log level (`-l`), if the daemon has one
    pub log_level_flag: Option<String>,
    pub log_file: PathBuf,
    pub readiness: Readiness,
}

impl DaemonConfig {
    /// Full argument list for the given harness verbosity.
    pub fn command_args(&self, verbose: bool) -> Vec<String> {
        let mut args = self.args.clone();
        if let Some(flag) = &self.log_level_flag {
            let level = if verbose {
                Severity::Debug
            } else {
                Severity::Info
            };
            args.push(flag.clone());
            args.push(level.daemon_level().to_string());
        }
        args
    }
}

/// Interactive NETCONF client (netopeer2-cli) session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    pub program: String,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Regex matching the command prompt
    pub prompt: String,
    /// Regex matching the password challenge
    pub password_prompt: String,
    /// Regex matching the host-authenticity confirmation
    pub host_key_prompt: String,
    /// Bound on every prompt wait
    pub timeout_ms: u64,
    pub log_file: PathBuf,
    pub exit_command: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            program: "netopeer2-cli".to_string(),
            host: "localhost".to_string(),
            port: 830,
            username: "root".to_string(),
            password: "0000".to_string(),
            prompt: "> ".to_string(),
            password_prompt: "(?i)password:".to_string(),
            host_key_prompt: r"Are you sure you want to continue connecting \(yes/no\)\?"
                .to_string(),
            timeout_ms: 30_000,
            log_file: PathBuf::from("/var/log/Netopeer_controler.log"),
            exit_command: "exit".to_string(),
        }
    }
}

impl ClientConfig {
    /// Command that opens the NETCONF session once the CLI is up.
    pub fn connect_command(&self) -> String {
        format!(
            "connect --host {} --port {} --login {}",
            self.host, self.port, self.username
        )
    }
}

/// VPP CLI status queries
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct QueryConfig {
    pub interface_list: String,
    pub interface_addresses: String,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            interface_list: "show interface".to_string(),
            interface_addresses: "show interface address".to_string(),
        }
    }
}

/// One provisioning command
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProvisionStep {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Working directory, relative paths in `args` resolve against it
    #[serde(default)]
    pub cwd: Option<PathBuf>,
    /// Pause after the command
    #[serde(default)]
    pub settle_ms: u64,
}

impl ProvisionStep {
    fn new(program: &str, args: &[&str], cwd: &str, settle_ms: u64) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            cwd: Some(PathBuf::from(cwd)),
            settle_ms,
        }
    }
}

/// YANG module installation and datastore import run before any test
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProvisionConfig {
    pub steps: Vec<ProvisionStep>,
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        const IETF: &str = "/root/src/sweetcomb/src/plugins/yang/ietf";
        const OC: &str = "/root/src/sweetcomb/src/plugins/yang/openconfig";
        const CONF: &str = "/root/src/sweetcomb/test/conf";
        let install = |yang: &str, dir: &str, settle_ms: u64| {
            ProvisionStep::new(
                "sysrepoctl",
                &["--install", "-S", ".", &format!("--yang=./{}", yang)],
                dir,
                settle_ms,
            )
        };
        let import = |datastore: &str, settle_ms: u64| {
            ProvisionStep::new(
                "sysrepocfg",
                &[
                    "--import=ietf-interfaces.xml",
                    &format!("--datastore={}", datastore),
                    "--format=xml",
                    "--level=0",
                    "ietf-interfaces",
                ],
                CONF,
                settle_ms,
            )
        };
        Self {
            steps: vec![
                install("ietf-interfaces.yang", IETF, 0),
                install("openconfig-interfaces.yang", OC, 0),
                install("openconfig-if-ip.yang", OC, 0),
                install("openconfig-local-routing.yang", OC, 5000),
                import("startup", 0),
                import("running", 2000),
            ],
        }
    }
}

impl HarnessConfig {
    /// Load configuration from a JSON5 file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(path.to_path_buf(), e.to_string()))?;
        Self::parse(&content)
    }

    /// Parse configuration from a JSON5 string
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        json5::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Serialize configuration to JSON5 string (with pretty formatting)
    pub fn to_json5(&self) -> String {
        // json5 has no pretty printer; JSON output is valid JSON5 input
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Harness log level after applying `verbose`.
    pub fn effective_log_level(&self) -> Severity {
        if self.verbose {
            Severity::Debug
        } else {
            self.log_level
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        for link in &self.links {
            validate_interface_name(&link.name)?;
            validate_interface_name(&link.peer)?;
            validate_address(&link.peer_address, &link.peer)?;
        }

        check_program("vpp", &self.vpp.program)?;
        check_program("vpp.ctl", &self.vpp.ctl)?;
        check_program("sysrepo", &self.sysrepo.program)?;
        check_program("plugind", &self.plugind.program)?;
        check_program("netconf_server", &self.netconf_server.program)?;
        check_program("netconf_client", &self.netconf_client.program)?;
        for step in &self.provision.steps {
            check_program("provision step", &step.program)?;
        }

        for (context, readiness) in [
            ("vpp.readiness", &self.vpp.readiness),
            ("sysrepo.readiness", &self.sysrepo.readiness),
            ("plugind.readiness", &self.plugind.readiness),
            ("netconf_server.readiness", &self.netconf_server.readiness),
        ] {
            let retry = &readiness.retry;
            if retry.timeout_ms == 0 {
                return Err(ConfigError::InvalidTimeout {
                    context: context.to_string(),
                });
            }
            if !retry.backoff_factor.is_finite() || retry.backoff_factor < 1.0 {
                return Err(ConfigError::InvalidRetry {
                    context: context.to_string(),
                    reason: format!("backoff_factor {} must be finite and >= 1", retry.backoff_factor),
                });
            }
            if retry.initial_delay_ms > retry.max_delay_ms {
                return Err(ConfigError::InvalidRetry {
                    context: context.to_string(),
                    reason: format!(
                        "initial_delay_ms {} exceeds max_delay_ms {}",
                        retry.initial_delay_ms, retry.max_delay_ms
                    ),
                });
            }
        }
        if self.netconf_client.timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout {
                context: "netconf_client.timeout_ms".to_string(),
            });
        }

        if self.netconf_client.port == 0 {
            return Err(ConfigError::InvalidPort {
                port: 0,
                context: "netconf_client".to_string(),
            });
        }

        for pattern in &self.sweep_patterns {
            validation::validate_sweep_pattern(pattern).map_err(|reason| {
                ConfigError::InvalidSweepPattern {
                    pattern: pattern.clone(),
                    reason,
                }
            })?;
        }

        Ok(())
    }
}

fn validate_interface_name(name: &str) -> Result<(), ConfigError> {
    validation::validate_interface_name(name).map_err(|reason| {
        ConfigError::InvalidInterfaceName {
            name: name.to_string(),
            reason,
        }
    })
}

fn validate_address(address: &str, interface: &str) -> Result<(), ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidAddress {
        address: address.to_string(),
        reason,
    };
    let (ip, prefix) = address
        .split_once('/')
        .ok_or_else(|| invalid("missing /prefix".to_string()))?;
    ip.parse::<std::net::Ipv4Addr>()
        .map_err(|e| invalid(e.to_string()))?;
    let prefix: u8 = prefix.parse().map_err(|_| invalid("bad prefix".to_string()))?;
    validation::validate_prefix_length(prefix, interface).map_err(invalid)
}

fn check_program(component: &str, program: &str) -> Result<(), ConfigError> {
    if program.trim().is_empty() {
        return Err(ConfigError::EmptyProgram {
            component: component.to_string(),
        });
    }
    Ok(())
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    IoError(PathBuf, String),
    ParseError(String),
    InvalidInterfaceName { name: String, reason: String },
    InvalidAddress { address: String, reason: String },
    InvalidPort { port: u16, context: String },
    EmptyProgram { component: String },
    InvalidTimeout { context: String },
    InvalidRetry { context: String, reason: String },
    InvalidSweepPattern { pattern: String, reason: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(path, msg) => {
                write!(
                    f,
                    "failed to read config file '{}': {}",
                    path.display(),
                    msg
                )
            }
            ConfigError::ParseError(msg) => write!(f, "failed to parse config: {}", msg),
            ConfigError::InvalidInterfaceName { name, reason } => {
                write!(f, "invalid interface name '{}': {}", name, reason)
            }
            ConfigError::InvalidAddress { address, reason } => {
                write!(f, "invalid address '{}': {}", address, reason)
            }
            ConfigError::InvalidPort { port, context } => {
                write!(f, "invalid port {} in {}", port, context)
            }
            ConfigError::EmptyProgram { component } => {
                write!(f, "empty program name for {}", component)
            }
            ConfigError::InvalidTimeout { context } => {
                write!(f, "timeout must be non-zero in {}", context)
            }
            ConfigError::InvalidRetry { context, reason } => {
                write!(f, "invalid retry policy in {}: {}", context, reason)
            }
            ConfigError::InvalidSweepPattern { pattern, reason } => {
                write!(f, "invalid sweep pattern '{}': {}", pattern, reason)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_is_stock_topology() {
        let config = HarnessConfig::parse("{}").unwrap();
        assert_eq!(config, HarnessConfig::default());
        assert_eq!(config.links.len(), 2);
        assert_eq!(config.links[0].name, "vpp1");
        assert_eq!(config.sweep_patterns, vec!["vpp", "sysrepo", "netopeer"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_config_with_comments() {
        let json5 = r#"{
            // leave everything running
            debug: true,
            netconf_client: { password: "secret", port: 8300, },
            queries: { interface_list: "show int" },
        }"#;

        let config = HarnessConfig::parse(json5).unwrap();
        assert!(config.debug);
        assert_eq!(config.netconf_client.password, "secret");
        assert_eq!(config.netconf_client.port, 8300);
        assert_eq!(config.netconf_client.username, "root");
        assert_eq!(config.queries.interface_list, "show int");
        assert_eq!(config.queries.interface_addresses, "show interface address");
    }

    #[test]
    fn test_daemon_level_follows_verbose() {
        let config = HarnessConfig::default();
        assert_eq!(config.sysrepo.command_args(false), vec!["-d", "-l", "3"]);
        assert_eq!(config.sysrepo.command_args(true), vec!["-d", "-l", "4"]);
        assert_eq!(config.netconf_server.command_args(true), vec!["-d"]);
    }

    #[test]
    fn test_effective_log_level() {
        let mut config = HarnessConfig::default();
        assert_eq!(config.effective_log_level(), Severity::Info);
        config.verbose = true;
        assert_eq!(config.effective_log_level(), Severity::Debug);
    }

    #[test]
    fn test_connect_command() {
        let client = ClientConfig::default();
        assert_eq!(
            client.connect_command(),
            "connect --host localhost --port 830 --login root"
        );
    }

    #[test]
    fn test_validate_invalid_interface_name() {
        let mut config = HarnessConfig::default();
        config.links[0].peer = "a-very-long-interface-name".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidInterfaceName { .. })
        ));
    }

    #[test]
    fn test_validate_bad_peer_address() {
        let mut config = HarnessConfig::default();
        config.links[1].peer_address = "192.168.1.2".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidAddress { .. })
        ));
        config.links[1].peer_address = "192.168.1.2/40".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidAddress { .. })
        ));
    }

    #[test]
    fn test_validate_empty_program() {
        let mut config = HarnessConfig::default();
        config.plugind.program = " ".to_string();
        let err = config.validate().unwrap_err();
        assert_eq!(err.to_string(), "empty program name for plugind");
    }

    #[test]
    fn test_validate_zero_timeout() {
        let mut config = HarnessConfig::default();
        config.netconf_client.timeout_ms = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidTimeout { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_negative_backoff() {
        let config = HarnessConfig::parse(
            "{ vpp: { readiness: { retry: { backoff_factor: -1.0, timeout_ms: 1000 } } } }",
        )
        .unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRetry { .. }), "{}", err);
        assert!(err.to_string().contains("vpp.readiness"));
    }

    #[test]
    fn test_validate_rejects_unusable_backoff() {
        for factor in [f64::NAN, f64::INFINITY, 0.5] {
            let mut config = HarnessConfig::default();
            config.netconf_server.readiness.retry.backoff_factor = factor;
            assert!(matches!(
                config.validate(),
                Err(ConfigError::InvalidRetry { .. })
            ));
        }
    }

    #[test]
    fn test_validate_initial_delay_above_max() {
        let mut config = HarnessConfig::default();
        config.sysrepo.readiness.retry.initial_delay_ms = 5000;
        config.sysrepo.readiness.retry.max_delay_ms = 1000;
        let err = config.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid retry policy in sysrepo.readiness: initial_delay_ms 5000 exceeds max_delay_ms 1000"
        );
    }

    #[test]
    fn test_validate_short_sweep_pattern() {
        let mut config = HarnessConfig::default();
        config.sweep_patterns.push("v".to_string());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidSweepPattern { .. })
        ));
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            HarnessConfig::parse("{ debug: "),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let result = HarnessConfig::load_from_file(Path::new("/nonexistent/harness.json5"));
        assert!(matches!(result, Err(ConfigError::IoError(..))));
    }

    #[test]
    fn test_config_roundtrip() {
        let mut config = HarnessConfig::default();
        config.verbose = true;
        config.sysrepo.readiness = Readiness::delay(1000);

        let parsed = HarnessConfig::parse(&config.to_json5()).unwrap();
        assert_eq!(parsed, config);
    }
}
