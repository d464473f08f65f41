// SPDX-License-Identifier: Apache-2.0 OR MIT
// Reachability checks from the host side of the veth links

use std::net::IpAddr;
use std::process::{Command, Stdio};

/// Send `count` echo requests to `address`; true if any reply arrived.
///
/// `ping` exits 0 when at least one reply was received. A missing `ping`
/// binary counts as unreachable.
pub fn ping(address: IpAddr, count: u32) -> bool {
    Command::new("ping")
        .args(["-c", &count.max(1).to_string(), "-W", "1", "-q"])
        .arg(address.to_string())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|status| status.success())
}
