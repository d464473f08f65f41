// SPDX-License-Identifier: Apache-2.0 OR MIT
// openconfig-interfaces: admin state

use anyhow::ensure;

use super::{vpp_addresses, vpp_state};
use crate::client::ManagementClient;
use crate::framework::{TestClass, TestContext};
use crate::model::{Ipv4Prefix, OcInterface};
use crate::{sweetcomb_class, sweetcomb_test};

const INTERFACE: &str = "host-vpp1";

#[sweetcomb_class]
pub struct TestOcInterfaces;

impl TestClass for TestOcInterfaces {}

#[sweetcomb_test(TestOcInterfaces)]
fn test_interface(ctx: &mut TestContext) -> anyhow::Result<()> {
    for enabled in [true, false] {
        let interface = OcInterface::new(INTERFACE).enabled(enabled);
        ctx.netconf()?.create(&interface)?;

        let state = vpp_state(ctx, INTERFACE)?;
        ensure!(
            state == Some(enabled),
            "{} reports {:?}, configured enabled={}",
            INTERFACE,
            state,
            enabled
        );
    }
    Ok(())
}

#[sweetcomb_test(
    TestOcInterfaces,
    skip = "plugin rejects openconfig IPv4 addresses on subinterface 0"
)]
fn test_interface_ipv4(ctx: &mut TestContext) -> anyhow::Result<()> {
    let prefix: Ipv4Prefix = "10.0.0.2/24".parse()?;
    let interface = OcInterface::new(INTERFACE).address(prefix);
    ctx.netconf()?.create(&interface)?;

    let configured = vpp_addresses(ctx, INTERFACE)?;
    ensure!(
        configured.contains(&prefix.to_string()),
        "{} missing from {:?}",
        prefix,
        configured
    );
    Ok(())
}
