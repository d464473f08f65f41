// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Process-table sweep by name fragment.

use std::os::unix::fs::symlink;
use std::os::unix::process::CommandExt;
use std::process::Command;
use std::time::Duration;

use sweetcomb_harness::topology::sweep;

use crate::support::gone_within;

#[test]
fn test_sweep_kills_by_name_fragment() {
    let dir = tempfile::tempdir().unwrap();
    // comm comes from the executable's file name, so a symlink gives the
    // shell a name nothing else on the machine carries.
    let link = dir.path().join("sc-sweep-target");
    symlink("/bin/sh", &link).unwrap();

    let mut child = Command::new(&link)
        .arg0("sh")
        .args(["-c", "while :; do sleep 1; done"])
        .spawn()
        .unwrap();
    let pattern = vec!["sc-sweep-targ".to_string()];

    let mut found = Vec::new();
    for _ in 0..20 {
        found = sweep::find(&pattern);
        if !found.is_empty() {
            break;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    assert!(found.iter().any(|p| p.pid == child.id()));

    let swept = sweep::sweep(&pattern);
    assert!(swept.iter().any(|p| p.pid == child.id()));
    let status = child.wait().unwrap();
    assert!(!status.success());
    assert!(gone_within(child.id(), Duration::from_secs(1)));

    assert!(sweep::find(&pattern).is_empty());
}
