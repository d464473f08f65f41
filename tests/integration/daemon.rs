// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Daemon handles: process-group teardown and log redirection.

use std::fs;
use std::time::{Duration, Instant};

use sweetcomb_harness::process::{HandleState, ProcessHandle, ProcessSpec};

use crate::support::{gone_within, is_alive, logger};

fn wait_for_file(path: &std::path::Path, needle: &str) -> String {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let contents = fs::read_to_string(path).unwrap_or_default();
        if contents.contains(needle) || Instant::now() >= deadline {
            return contents;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
}

#[test]
fn test_terminate_stops_the_whole_group() {
    let dir = tempfile::tempdir().unwrap();
    let pid_file = dir.path().join("child.pid");
    let script = format!("sleep 30 & echo $! > {}; wait", pid_file.display());
    let spec = ProcessSpec::daemon(
        "sysrepod",
        "sh",
        vec!["-c".to_string(), script],
        dir.path().join("sysrepod.log"),
    )
    .with_grace(Duration::from_secs(2));

    let mut handle = ProcessHandle::new(spec, logger());
    handle.spawn().unwrap();
    let shell = handle.pid().unwrap();

    let child: u32 = wait_for_file(&pid_file, "\n").trim().parse().unwrap();
    assert!(is_alive(child));

    handle.terminate().unwrap();
    assert_eq!(handle.state(), HandleState::Terminated);
    assert!(gone_within(shell, Duration::from_secs(3)));
    assert!(gone_within(child, Duration::from_secs(3)), "background child survived");
}

#[test]
fn test_ignored_sigterm_escalates_to_sigkill() {
    let dir = tempfile::tempdir().unwrap();
    let spec = ProcessSpec::daemon(
        "stubborn",
        "sh",
        vec![
            "-c".to_string(),
            "trap '' TERM; echo armed; while :; do sleep 1; done".to_string(),
        ],
        dir.path().join("stubborn.log"),
    )
    .with_grace(Duration::from_millis(300));

    let mut handle = ProcessHandle::new(spec, logger());
    handle.spawn().unwrap();
    wait_for_file(&dir.path().join("stubborn.log"), "armed");
    let pid = handle.pid().unwrap();

    let start = Instant::now();
    handle.terminate().unwrap();
    assert!(start.elapsed() >= Duration::from_millis(300));
    assert!(gone_within(pid, Duration::from_secs(3)));
}

#[test]
fn test_output_goes_to_log_file() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("vpp-harness.log");
    let spec = ProcessSpec::daemon(
        "vpp",
        "sh",
        vec![
            "-c".to_string(),
            "echo 'vpp started'; echo 'warning' >&2; sleep 30".to_string(),
        ],
        log.clone(),
    );

    let mut handle = ProcessHandle::new(spec, logger());
    handle.spawn().unwrap();
    let contents = wait_for_file(&log, "warning");
    handle.kill().unwrap();

    assert!(contents.contains("vpp started"));
    assert!(contents.contains("warning"));
}

#[test]
fn test_drop_terminates() {
    let dir = tempfile::tempdir().unwrap();
    let spec = ProcessSpec::daemon(
        "sleeper",
        "sleep",
        vec!["30".to_string()],
        dir.path().join("sleeper.log"),
    )
    .with_grace(Duration::from_millis(500));

    let pid = {
        let mut handle = ProcessHandle::new(spec, logger());
        handle.spawn().unwrap();
        handle.pid().unwrap()
    };
    assert!(gone_within(pid, Duration::from_secs(3)));
}
