// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Configuration survives a restart of VPP or of the plugin host.
//!
//! After VPP restarts, sysrepo-plugind replays the running datastore into
//! the new VPP instance. After sysrepo-plugind restarts, VPP still holds
//! what was configured before.

use anyhow::ensure;

use super::{vpp_addresses, vpp_state};
use crate::client::ManagementClient;
use crate::framework::{TestClass, TestContext};
use crate::logging::Facility;
use crate::model::IetfInterface;
use crate::topology::Component;
use crate::{log_info, sweetcomb_class, sweetcomb_test};

const INTERFACE: &str = "host-vpp1";

#[sweetcomb_class]
pub struct TestRestartManagement;

impl TestClass for TestRestartManagement {}

fn configure(ctx: &mut TestContext, prefix: &str) -> anyhow::Result<()> {
    let interface = IetfInterface::new(INTERFACE)
        .enabled(true)
        .mtu(1500)
        .address(prefix.parse()?);
    ctx.netconf()?.create(&interface)?;
    Ok(())
}

fn verify(ctx: &TestContext, prefix: &str) -> anyhow::Result<()> {
    ensure!(
        vpp_state(ctx, INTERFACE)? == Some(true),
        "{} is not up",
        INTERFACE
    );
    let configured = vpp_addresses(ctx, INTERFACE)?;
    ensure!(
        configured.iter().any(|a| a == prefix),
        "{} missing from {:?}",
        prefix,
        configured
    );
    Ok(())
}

#[sweetcomb_test(TestRestartManagement)]
fn test_vpp_restart(ctx: &mut TestContext) -> anyhow::Result<()> {
    let prefix = "192.168.0.1/24";
    configure(ctx, prefix)?;
    verify(ctx, prefix)?;

    ctx.restart(Component::Vpp)?;
    log_info!(ctx.logger(), Facility::Test, "vpp restarted, re-checking");
    verify(ctx, prefix)
}

#[sweetcomb_test(TestRestartManagement)]
fn test_sweetcomb_restart(ctx: &mut TestContext) -> anyhow::Result<()> {
    let prefix = "192.168.0.3/24";
    configure(ctx, prefix)?;
    verify(ctx, prefix)?;

    ctx.restart(Component::Plugind)?;
    log_info!(ctx.logger(), Facility::Test, "sysrepo-plugind restarted, re-checking");
    verify(ctx, prefix)
}
