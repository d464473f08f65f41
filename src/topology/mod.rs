// SPDX-License-Identifier: Apache-2.0 OR MIT
//! The set of processes one test needs, brought up in order and torn down
//! even when bring-up fails halfway.
//!
//! Startup order:
//! 1. veth links (skipped when present)
//! 2. VPP, readiness gate, default host-interfaces
//! 3. sysrepod, readiness gate
//! 4. sysrepo-plugind, readiness gate
//! 5. netopeer2-server, readiness gate
//! 6. netopeer2-cli session
//!
//! Each handle is tracked before it is spawned, so `close()` reaches every
//! stage that was started. Teardown runs in reverse startup order, then
//! sweeps the process table for daemon name fragments.

pub mod links;
pub mod readiness;
pub mod stage;
pub mod sweep;

use std::process::Command;
use thiserror::Error;

pub use links::{LinkError, VethLink};
pub use readiness::{Probe, ProbeError, Readiness, RetryPolicy};
pub use stage::{Component, Stage};
pub use sweep::SweptProcess;

use crate::config::HarnessConfig;
use crate::logging::{Facility, Logger};
use crate::process::{ProcessError, ProcessHandle};
use crate::{log_debug, log_error, log_info, log_notice, log_warning};

#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("failed to prepare veth links: {0}")]
    Links(#[from] LinkError),

    #[error("{component} failed to start: {source}")]
    Process {
        component: Component,
        #[source]
        source: ProcessError,
    },

    #[error("{component} not ready: {source}")]
    NotReady {
        component: Component,
        #[source]
        source: ProbeError,
    },

    #[error("{component} setup command '{command}' failed: {reason}")]
    Setup {
        component: Component,
        command: String,
        reason: String,
    },

    #[error("topology already created")]
    AlreadyCreated,

    #[error("{0} is not part of this topology")]
    Unknown(Component),
}

impl TopologyError {
    /// True if an expected prompt never appeared during bring-up.
    pub fn is_timeout(&self) -> bool {
        matches!(self, TopologyError::Process { source, .. } if source.is_timeout())
    }
}

/// Processes owned by one test
pub struct Topology {
    config: HarnessConfig,
    stages: Vec<Stage>,
    handles: Vec<(Component, ProcessHandle)>,
    created: bool,
    closed: bool,
    logger: Logger,
}

impl Topology {
    /// The debug flag is read from `config` once and never changes.
    pub fn new(config: HarnessConfig, logger: Logger) -> Self {
        let stages = stage::plan(&config);
        Self {
            config,
            stages,
            handles: Vec::new(),
            created: false,
            closed: false,
            logger,
        }
    }

    pub fn debug(&self) -> bool {
        self.config.debug
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Tracked components in startup order.
    pub fn components(&self) -> Vec<Component> {
        self.handles.iter().map(|(c, _)| *c).collect()
    }

    pub fn handle(&self, component: Component) -> Option<&ProcessHandle> {
        self.handles
            .iter()
            .find(|(c, _)| *c == component)
            .map(|(_, h)| h)
    }

    pub fn handle_mut(&mut self, component: Component) -> Option<&mut ProcessHandle> {
        self.handles
            .iter_mut()
            .find(|(c, _)| *c == component)
            .map(|(_, h)| h)
    }

    /// The interactive NETCONF client, once its stage has started.
    pub fn netconf_client(&mut self) -> Option<&mut ProcessHandle> {
        self.handle_mut(Component::NetconfClient)
    }

    /// Bring every stage up in order.
    ///
    /// On error the stages started so far stay tracked; `close()` (or
    /// dropping the topology) tears them down.
    pub fn create(&mut self) -> Result<(), TopologyError> {
        if self.created {
            return Err(TopologyError::AlreadyCreated);
        }
        self.created = true;
        self.closed = false;

        log_info!(
            self.logger,
            Facility::Topology,
            "creating topology{}",
            if self.debug() { " (debug)" } else { "" }
        );
        links::ensure_links(&self.config.links, &self.logger)?;

        for index in 0..self.stages.len() {
            self.start_stage(index)?;
        }

        log_notice!(self.logger, Facility::Topology, "topology up");
        Ok(())
    }

    fn start_stage(&mut self, index: usize) -> Result<(), TopologyError> {
        let stage = self.stages[index].clone();
        let component = stage.component;

        log_info!(self.logger, Facility::Topology, "starting {}", stage.label());
        let handle = ProcessHandle::new(stage.spec.clone(), self.logger.clone());
        let position = match self.handles.iter().position(|(c, _)| *c == component) {
            Some(position) => {
                self.handles[position].1 = handle;
                position
            }
            None => {
                self.handles.push((component, handle));
                self.handles.len() - 1
            }
        };

        self.handles[position]
            .1
            .spawn()
            .map_err(|source| TopologyError::Process { component, source })?;

        stage
            .readiness
            .wait(stage.label(), &self.logger)
            .map_err(|source| TopologyError::NotReady { component, source })?;

        for argv in &stage.setup {
            self.run_setup(component, argv)?;
        }
        Ok(())
    }

    fn run_setup(&self, component: Component, argv: &[String]) -> Result<(), TopologyError> {
        let command = argv.join(" ");
        let setup_error = |reason: String| TopologyError::Setup {
            component,
            command: command.clone(),
            reason,
        };
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| setup_error("empty command".to_string()))?;

        log_debug!(self.logger, Facility::Topology, "{}: {}", component, command);
        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|e| setup_error(e.to_string()))?;
        if !output.status.success() {
            return Err(setup_error(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(())
    }

    /// Kill one component and start it again through its stage.
    ///
    /// Stray processes carrying the component's name are swept before the
    /// restart. Processes started after it are left alone.
    pub fn restart(&mut self, component: Component) -> Result<(), TopologyError> {
        let index = self
            .stages
            .iter()
            .position(|s| s.component == component)
            .ok_or(TopologyError::Unknown(component))?;
        let pattern = self.stages[index].sweep_pattern.clone();

        log_info!(self.logger, Facility::Topology, "restarting {}", component);
        if let Some(Err(e)) = self.handle_mut(component).map(ProcessHandle::kill) {
            log_warning!(self.logger, Facility::Topology, "killing {}: {}", component, e);
        }
        for swept in sweep::sweep(&[pattern]) {
            log_debug!(
                self.logger,
                Facility::Topology,
                "swept {} (pid {})",
                swept.name,
                swept.pid
            );
        }

        self.start_stage(index)
    }

    /// Terminate every tracked process, then sweep for stragglers.
    ///
    /// Does nothing in debug mode (processes are left for inspection) and
    /// on every call after the first. Returns what the sweep killed.
    pub fn close(&mut self) -> Vec<SweptProcess> {
        if self.closed {
            return Vec::new();
        }
        self.closed = true;

        if self.debug() {
            for (_, handle) in self.handles.iter_mut() {
                handle.release();
            }
            log_notice!(
                self.logger,
                Facility::Topology,
                "debug mode: leaving {} process(es) running",
                self.handles.len()
            );
            self.handles.clear();
            return Vec::new();
        }

        for (component, handle) in self.handles.iter_mut().rev() {
            if let Err(e) = handle.terminate() {
                log_error!(self.logger, Facility::Topology, "stopping {}: {}", component, e);
            }
        }
        self.handles.clear();

        let swept = sweep::sweep(&self.config.sweep_patterns);
        for process in &swept {
            log_warning!(
                self.logger,
                Facility::Topology,
                "sweep killed {} (pid {})",
                process.name,
                process.pid
            );
        }
        log_notice!(self.logger, Facility::Topology, "topology closed");
        swept
    }
}

impl Drop for Topology {
    fn drop(&mut self) {
        self.close();
    }
}
