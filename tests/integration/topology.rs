// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Full topology lifecycle with stand-in programs.
//!
//! Every daemon is a looping shell script whose file name carries a
//! per-test tag, so readiness probes and sweeps in one test never see the
//! processes of another. The NETCONF client is the scripted netopeer2-cli
//! stand-in.

use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::time::Duration;

use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use sweetcomb_harness::config::HarnessConfig;
use sweetcomb_harness::process::HandleState;
use sweetcomb_harness::topology::{Component, Probe, Readiness, Topology, TopologyError};

use crate::support::{gone_within, is_alive, logger, FAKE_NETCONF_CLI};

const FAKE_DAEMON: &str = "while :; do sleep 1; done\n";

fn script(dir: &Path, name: &str, body: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path.display().to_string()
}

/// Configuration whose programs are all named `sc<tag>-*`.
fn fake_config(dir: &Path, tag: &str) -> HarnessConfig {
    let mut config = HarnessConfig {
        links: Vec::new(),
        sweep_patterns: vec![format!("sc{}-", tag)],
        teardown_grace_ms: 500,
        ..HarnessConfig::default()
    };

    config.vpp.program = script(dir, &format!("sc{}-vpp", tag), FAKE_DAEMON);
    config.vpp.setup_commands = Vec::new();
    config.vpp.readiness = Readiness::default();
    config.vpp.log_file = dir.join("vpp.log");

    let daemons = [
        (&mut config.sysrepo, "srd"),
        (&mut config.plugind, "plugd"),
        (&mut config.netconf_server, "ncd"),
    ];
    for (daemon, suffix) in daemons {
        let name = format!("sc{}-{}", tag, suffix);
        daemon.program = script(dir, &name, FAKE_DAEMON);
        daemon.args = Vec::new();
        daemon.log_level_flag = None;
        daemon.log_file = dir.join(format!("{}.log", suffix));
        daemon.readiness = Readiness::probe(Probe::Process { pattern: name });
    }

    config.netconf_client.program = script(dir, &format!("sc{}-cli", tag), FAKE_NETCONF_CLI);
    config.netconf_client.log_file = dir.join("netconf-cli.log");
    config.netconf_client.timeout_ms = 5000;

    config
}

fn pids(topology: &Topology) -> Vec<u32> {
    Component::ALL
        .iter()
        .filter_map(|c| topology.handle(*c).and_then(|h| h.pid()))
        .collect()
}

#[test]
fn test_create_then_close() {
    let dir = tempfile::tempdir().unwrap();
    let mut topology = Topology::new(fake_config(dir.path(), "t1"), logger());

    topology.create().unwrap();
    assert_eq!(topology.components(), Component::ALL.to_vec());
    for component in Component::ALL {
        let handle = topology.handle(component).unwrap();
        assert_eq!(handle.state(), HandleState::Running, "{}", component);
    }

    let reply = topology
        .netconf_client()
        .unwrap()
        .send_command("get --filter-xpath /ietf-interfaces:*")
        .unwrap()
        .unwrap();
    assert!(reply.contains("<name>host-vpp1</name>"));

    let started = pids(&topology);
    assert_eq!(started.len(), 5);

    topology.close();
    assert!(topology.is_closed());
    for pid in started {
        assert!(gone_within(pid, Duration::from_secs(3)), "pid {} survived", pid);
    }
    assert!(topology.close().is_empty());
}

#[test]
fn test_restart_replaces_one_component() {
    let dir = tempfile::tempdir().unwrap();
    let mut topology = Topology::new(fake_config(dir.path(), "t2"), logger());
    topology.create().unwrap();

    let old = topology.handle(Component::Plugind).unwrap().pid().unwrap();
    let vpp = topology.handle(Component::Vpp).unwrap().pid().unwrap();

    topology.restart(Component::Plugind).unwrap();

    let new = topology.handle(Component::Plugind).unwrap().pid().unwrap();
    assert_ne!(old, new);
    assert!(gone_within(old, Duration::from_secs(3)));
    assert!(is_alive(new));
    assert!(is_alive(vpp));
    assert_eq!(topology.components(), Component::ALL.to_vec());

    topology.close();
    assert!(gone_within(new, Duration::from_secs(3)));
}

#[test]
fn test_failed_stage_leaves_earlier_stages_for_close() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = fake_config(dir.path(), "t3");
    config.netconf_server.program = "/nonexistent/bin/netopeer2-server".to_string();
    let mut topology = Topology::new(config, logger());

    let err = topology.create().unwrap_err();
    assert!(matches!(
        err,
        TopologyError::Process {
            component: Component::NetconfServer,
            ..
        }
    ));
    assert_eq!(
        topology.components(),
        vec![
            Component::Vpp,
            Component::Sysrepo,
            Component::Plugind,
            Component::NetconfServer
        ]
    );

    let started = pids(&topology);
    assert_eq!(started.len(), 3);
    assert!(started.iter().all(|pid| is_alive(*pid)));

    drop(topology);
    for pid in started {
        assert!(gone_within(pid, Duration::from_secs(3)), "pid {} survived", pid);
    }
}

#[test]
fn test_debug_close_leaves_everything_running() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = fake_config(dir.path(), "t4");
    config.debug = true;
    let mut topology = Topology::new(config, logger());
    topology.create().unwrap();

    let started = pids(&topology);
    topology.close();
    drop(topology);
    assert!(started.iter().all(|pid| is_alive(*pid)));

    // every stage leads its own process group (the client its own session)
    for pid in started {
        let _ = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL);
        assert!(gone_within(pid, Duration::from_secs(3)));
    }
}
