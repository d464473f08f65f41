// SPDX-License-Identifier: Apache-2.0 OR MIT
//! End-to-end scenarios.
//!
//! Each `test_*.rs` file registers one class; the runner finds them by
//! walking this directory. All of them need root and the real VPP,
//! sysrepo and netopeer2 binaries.

pub mod test_ietf_interfaces;
pub mod test_oc_interfaces;
pub mod test_restart_management;

use anyhow::Context;

use crate::framework::TestContext;

/// Admin state VPP reports for `name`; errors if VPP does not list it.
pub(crate) fn vpp_state(ctx: &TestContext, name: &str) -> anyhow::Result<Option<bool>> {
    let record = ctx
        .vpp()
        .interface_status(name)?
        .with_context(|| format!("VPP does not list {}", name))?;
    Ok(record.state)
}

/// Addresses VPP reports on `name`, empty if none.
pub(crate) fn vpp_addresses(ctx: &TestContext, name: &str) -> anyhow::Result<Vec<String>> {
    Ok(ctx
        .vpp()
        .address_status(name)?
        .map(|record| record.addr)
        .unwrap_or_default())
}
