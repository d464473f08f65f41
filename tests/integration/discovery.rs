// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Discovery over the scenarios shipped in this crate.

use std::path::{Path, PathBuf};

use sweetcomb_harness::discovery::{discover, Registry};

use crate::support::logger;

fn scenarios() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("src/scenarios")
}

#[test]
fn test_scenario_suites() {
    let suites = discover(&Registry::global(), &[scenarios()], Some(Path::new("conf")), &logger())
        .unwrap();
    let names: Vec<&str> = suites.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "test_ietf_interfaces.rsTestIetfInterfaces",
            "test_oc_interfaces.rsTestOcInterfaces",
            "test_restart_management.rsTestRestartManagement",
        ]
    );

    let ietf: Vec<&str> = suites[0].cases.iter().map(|c| c.method.name).collect();
    assert_eq!(ietf, vec!["test_interface_up", "test_ip_addr"]);

    let oc = &suites[1].cases;
    assert_eq!(oc[1].method.name, "test_interface_ipv4");
    assert!(oc[1].method.skip.is_some());
}

#[test]
fn test_crate_root_finds_the_same_suites() {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let from_root =
        discover(&Registry::global(), &[root], Some(Path::new("target")), &logger()).unwrap();
    let from_scenarios = discover(&Registry::global(), &[scenarios()], None, &logger()).unwrap();

    let names = |suites: &[sweetcomb_harness::discovery::DiscoveredSuite]| {
        suites.iter().map(|s| s.name.clone()).collect::<Vec<_>>()
    };
    assert_eq!(names(&from_root), names(&from_scenarios));
}

#[test]
fn test_ignoring_the_scenarios_directory() {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("src");
    let suites = discover(&Registry::global(), &[root], Some(Path::new("scenarios")), &logger())
        .unwrap();
    assert!(suites.is_empty());
}

#[test]
fn test_copy_of_a_scenario_file_is_not_collected() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::copy(
        scenarios().join("test_ietf_interfaces.rs"),
        dir.path().join("test_ietf_interfaces.rs"),
    )
    .unwrap();
    let suites = discover(&Registry::global(), &[dir.path().to_path_buf()], None, &logger())
        .unwrap();
    assert!(suites.is_empty());
}
