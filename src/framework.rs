// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Test classes and the per-test context.
//!
//! A test class is a unit struct registered with `#[sweetcomb_class]`. Its
//! `set_up` runs before every test method and `tear_down` after it, whether
//! the method passed, failed or panicked. The default hooks stand up a
//! fresh topology and close it again.

use anyhow::Context;

use crate::client::NetconfCli;
use crate::config::HarnessConfig;
use crate::logging::{Facility, Logger};
use crate::status::{StatusQueryClient, VppctlCommand};
use crate::sweetcomb_class;
use crate::topology::{Component, Topology, TopologyError};
use crate::{log_debug, log_info};

/// Name of the base class; never collected as a suite.
pub const BASE_CLASS: &str = "SweetcombTestCase";

/// Classes whose name starts with this are templates, never collected.
pub const RESERVED_PREFIX: &str = "Template";

/// Signature of a registered test method
pub type TestFn = fn(&mut TestContext) -> anyhow::Result<()>;

/// Hooks run around each test method of a class
pub trait TestClass {
    fn set_up(ctx: &mut TestContext) -> anyhow::Result<()> {
        ctx.create_topology().context("topology bring-up failed")
    }

    fn tear_down(ctx: &mut TestContext) {
        ctx.close_topology();
    }
}

/// Base class every scenario class derives its behaviour from.
#[sweetcomb_class]
pub struct SweetcombTestCase;

impl TestClass for SweetcombTestCase {}

/// Everything a test method can reach
pub struct TestContext {
    config: HarnessConfig,
    logger: Logger,
    topology: Option<Topology>,
}

impl TestContext {
    pub fn new(config: HarnessConfig, logger: Logger) -> Self {
        Self {
            config,
            logger,
            topology: None,
        }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Replace any previous topology with a freshly created one.
    ///
    /// The topology is stored before bring-up starts, so a failed create
    /// still leaves its partial handles reachable by `close_topology`.
    pub fn create_topology(&mut self) -> Result<(), TopologyError> {
        self.close_topology();
        let topology = self
            .topology
            .insert(Topology::new(self.config.clone(), self.logger.clone()));
        topology.create()
    }

    /// Close and drop the current topology. No-op without one.
    pub fn close_topology(&mut self) {
        if let Some(mut topology) = self.topology.take() {
            let swept = topology.close();
            if !swept.is_empty() {
                log_debug!(
                    self.logger,
                    Facility::Test,
                    "tear-down swept {} process(es)",
                    swept.len()
                );
            }
        }
    }

    pub fn topology(&self) -> Option<&Topology> {
        self.topology.as_ref()
    }

    pub fn topology_mut(&mut self) -> anyhow::Result<&mut Topology> {
        self.topology
            .as_mut()
            .context("no topology; set_up did not create one")
    }

    /// VPP status queries through `vppctl`.
    pub fn vpp(&self) -> StatusQueryClient<VppctlCommand> {
        StatusQueryClient::new(
            VppctlCommand::new(&self.config.vpp.ctl),
            self.config.queries.clone(),
            self.logger.clone(),
        )
    }

    /// Management client over the topology's netopeer2-cli session.
    pub fn netconf(&mut self) -> anyhow::Result<NetconfCli<'_>> {
        let logger = self.logger.clone();
        let handle = self
            .topology_mut()?
            .netconf_client()
            .context("NETCONF client session not started")?;
        Ok(NetconfCli::new(handle, logger))
    }

    pub fn restart(&mut self, component: Component) -> anyhow::Result<()> {
        log_info!(self.logger, Facility::Test, "restart {}", component);
        self.topology_mut()?
            .restart(component)
            .with_context(|| format!("restarting {}", component))
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        self.close_topology();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::MemorySink;

    fn inert_config() -> HarnessConfig {
        HarnessConfig {
            links: Vec::new(),
            sweep_patterns: Vec::new(),
            ..HarnessConfig::default()
        }
    }

    #[test]
    fn test_context_without_topology() {
        let mut ctx = TestContext::new(inert_config(), Logger::new(MemorySink::new()));
        assert!(ctx.topology().is_none());
        assert!(ctx.topology_mut().is_err());
        assert!(ctx.netconf().is_err());
        ctx.close_topology();
    }

    #[test]
    fn test_failed_create_keeps_topology_for_tear_down() {
        let mut config = inert_config();
        config.vpp.program = "/nonexistent/bin/vpp".to_string();
        let mut ctx = TestContext::new(config, Logger::new(MemorySink::new()));

        assert!(SweetcombTestCase::set_up(&mut ctx).is_err());
        assert_eq!(
            ctx.topology().map(Topology::components),
            Some(vec![Component::Vpp])
        );

        SweetcombTestCase::tear_down(&mut ctx);
        assert!(ctx.topology().is_none());
    }
}
