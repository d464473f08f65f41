// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Startup stages of the sweetcomb topology.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use super::readiness::Readiness;
use crate::config::{DaemonConfig, HarnessConfig};
use crate::process::{LoginSpec, ProcessSpec, SessionSpec};

/// Longest process name the kernel reports (TASK_COMM_LEN - 1)
const COMM_LEN: usize = 15;

/// The processes making up a topology, in startup order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Component {
    Vpp,
    Sysrepo,
    Plugind,
    NetconfServer,
    NetconfClient,
}

impl Component {
    pub const ALL: [Component; 5] = [
        Component::Vpp,
        Component::Sysrepo,
        Component::Plugind,
        Component::NetconfServer,
        Component::NetconfClient,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Component::Vpp => "vpp",
            Component::Sysrepo => "sysrepod",
            Component::Plugind => "sysrepo-plugind",
            Component::NetconfServer => "netopeer2-server",
            Component::NetconfClient => "netopeer2-cli",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One startup step: spawn, wait for readiness, run setup commands
#[derive(Debug, Clone, PartialEq)]
pub struct Stage {
    pub component: Component,
    pub spec: ProcessSpec,
    pub readiness: Readiness,
    /// Argument vectors run once the stage is ready
    pub setup: Vec<Vec<String>>,
    /// Name fragment used to sweep this component alone
    pub sweep_pattern: String,
}

impl Stage {
    pub fn label(&self) -> &str {
        &self.spec.label
    }
}

/// Name the kernel reports for processes started from `program`.
pub fn comm_name(program: &str) -> String {
    let base = Path::new(program)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| program.to_string());
    base.chars().take(COMM_LEN).collect()
}

fn daemon_stage(
    component: Component,
    daemon: &DaemonConfig,
    verbose: bool,
    grace: Duration,
) -> Stage {
    Stage {
        component,
        spec: ProcessSpec::daemon(
            component.as_str(),
            &daemon.program,
            daemon.command_args(verbose),
            daemon.log_file.clone(),
        )
        .with_grace(grace),
        readiness: daemon.readiness.clone(),
        setup: Vec::new(),
        sweep_pattern: comm_name(&daemon.program),
    }
}

/// Stages for `config`, in the order they must start.
pub fn plan(config: &HarnessConfig) -> Vec<Stage> {
    let grace = Duration::from_millis(config.teardown_grace_ms);
    let vpp = &config.vpp;
    let client = &config.netconf_client;

    let vpp_stage = Stage {
        component: Component::Vpp,
        spec: ProcessSpec::daemon(
            Component::Vpp.as_str(),
            &vpp.program,
            vec!["-c".to_string(), vpp.config_file.display().to_string()],
            vpp.log_file.clone(),
        )
        .with_grace(grace),
        readiness: vpp.readiness.clone(),
        setup: vpp
            .setup_commands
            .iter()
            .map(|command| {
                std::iter::once(vpp.ctl.clone())
                    .chain(command.split_whitespace().map(str::to_string))
                    .collect()
            })
            .collect(),
        sweep_pattern: comm_name(&vpp.program),
    };

    let client_stage = Stage {
        component: Component::NetconfClient,
        spec: ProcessSpec::interactive(
            Component::NetconfClient.as_str(),
            &client.program,
            Vec::new(),
            client.log_file.clone(),
            SessionSpec {
                prompt: client.prompt.clone(),
                timeout: Duration::from_millis(client.timeout_ms),
                login: Some(LoginSpec {
                    initiation: client.connect_command(),
                    password: client.password.clone(),
                    password_prompt: client.password_prompt.clone(),
                    host_key_prompt: client.host_key_prompt.clone(),
                    accept_host_key: "yes".to_string(),
                }),
                exit_command: Some(client.exit_command.clone()),
            },
        )
        .with_grace(grace),
        readiness: Readiness::default(),
        setup: Vec::new(),
        sweep_pattern: comm_name(&client.program),
    };

    vec![
        vpp_stage,
        daemon_stage(Component::Sysrepo, &config.sysrepo, config.verbose, grace),
        daemon_stage(Component::Plugind, &config.plugind, config.verbose, grace),
        daemon_stage(
            Component::NetconfServer,
            &config.netconf_server,
            config.verbose,
            grace,
        ),
        client_stage,
    ]
}
