// SPDX-License-Identifier: Apache-2.0 OR MIT
// ietf-interfaces: admin state and IPv4 addresses

use anyhow::ensure;

use super::{vpp_addresses, vpp_state};
use crate::client::{check_response, ManagementClient};
use crate::framework::{TestClass, TestContext};
use crate::logging::Facility;
use crate::model::{IetfInterface, Ipv4Prefix};
use crate::{log_info, sweetcomb_class, sweetcomb_test};

const INTERFACE: &str = "host-vpp1";

#[sweetcomb_class]
pub struct TestIetfInterfaces;

impl TestClass for TestIetfInterfaces {}

#[sweetcomb_test(TestIetfInterfaces)]
fn test_interface_up(ctx: &mut TestContext) -> anyhow::Result<()> {
    let mut interface = IetfInterface::new(INTERFACE).enabled(true);
    ctx.netconf()?.create(&interface)?;
    ensure!(
        vpp_state(ctx, INTERFACE)? == Some(true),
        "{} not up after enabling",
        INTERFACE
    );

    let reply = ctx.netconf()?.get("/ietf-interfaces:interfaces")?;
    check_response(&reply, "DATA", &[("name", INTERFACE), ("enabled", "true")])
        .map_err(anyhow::Error::msg)?;

    interface = interface.enabled(false);
    ctx.netconf()?.create(&interface)?;
    ensure!(
        vpp_state(ctx, INTERFACE)? == Some(false),
        "{} not down after disabling",
        INTERFACE
    );
    Ok(())
}

#[sweetcomb_test(TestIetfInterfaces)]
fn test_ip_addr(ctx: &mut TestContext) -> anyhow::Result<()> {
    let prefixes: Vec<Ipv4Prefix> = ["192.168.0.1/24", "142.168.0.1/14"]
        .iter()
        .map(|p| p.parse::<Ipv4Prefix>())
        .collect::<Result<_, _>>()?;

    let interface = prefixes
        .iter()
        .fold(IetfInterface::new(INTERFACE).enabled(true), |i, p| i.address(*p));
    ctx.netconf()?.create(&interface)?;

    let configured = vpp_addresses(ctx, INTERFACE)?;
    for prefix in &prefixes {
        ensure!(
            configured.contains(&prefix.to_string()),
            "{} missing from {:?}",
            prefix,
            configured
        );
    }
    log_info!(
        ctx.logger(),
        Facility::Test,
        "192.168.0.1 reachable: {}",
        crate::net::ping(prefixes[0].ip.into(), 4)
    );

    ctx.netconf()?.delete(&interface)?;
    let remaining = ctx.vpp().address_status(INTERFACE)?;
    ensure!(
        remaining.is_none(),
        "addresses left on {}: {:?}",
        INTERFACE,
        remaining
    );
    Ok(())
}
