// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Last-resort process sweep by name fragment.
//!
//! Daemons that double-fork leave their process group and escape
//! group-directed signals. After the owned handles are terminated the
//! topology force-kills anything whose name still contains a daemon
//! fragment. This is coarse: on a shared host it also kills unrelated
//! processes that happen to match.

use sysinfo::{Pid, ProcessesToUpdate, Signal, System};

/// A process matched by the sweep
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweptProcess {
    pub pid: u32,
    pub name: String,
}

/// True if `name` contains any of `patterns`.
pub fn matches_any(name: &str, patterns: &[String]) -> bool {
    patterns
        .iter()
        .any(|pattern| !pattern.is_empty() && name.contains(pattern.as_str()))
}

fn snapshot() -> System {
    let mut sys = System::new();
    sys.refresh_processes(ProcessesToUpdate::All, true);
    sys
}

/// Processes whose name contains one of `patterns`, excluding this process.
pub fn find(patterns: &[String]) -> Vec<SweptProcess> {
    let own = Pid::from_u32(std::process::id());
    let sys = snapshot();
    let mut found: Vec<SweptProcess> = sys
        .processes()
        .iter()
        .filter(|(pid, _)| **pid != own)
        .filter_map(|(pid, process)| {
            let name = process.name().to_string_lossy();
            matches_any(&name, patterns).then(|| SweptProcess {
                pid: pid.as_u32(),
                name: name.into_owned(),
            })
        })
        .collect();
    found.sort_by_key(|p| p.pid);
    found
}

/// SIGKILL every process matching `patterns`; returns the ones signalled.
pub fn sweep(patterns: &[String]) -> Vec<SweptProcess> {
    let own = Pid::from_u32(std::process::id());
    let sys = snapshot();
    let mut killed = Vec::new();
    for (pid, process) in sys.processes() {
        if *pid == own {
            continue;
        }
        let name = process.name().to_string_lossy();
        if !matches_any(&name, patterns) {
            continue;
        }
        // `None` means the signal is unsupported; fall back to plain kill().
        let delivered = process
            .kill_with(Signal::Kill)
            .unwrap_or_else(|| process.kill());
        if delivered {
            killed.push(SweptProcess {
                pid: pid.as_u32(),
                name: name.into_owned(),
            });
        }
    }
    killed.sort_by_key(|p| p.pid);
    killed
}
