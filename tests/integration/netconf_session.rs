// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Interactive sessions against a scripted netopeer2-cli stand-in.

use std::fs;

use sweetcomb_harness::client::{check_response, ClientError, ManagementClient, NetconfCli};
use sweetcomb_harness::model::IetfInterface;
use sweetcomb_harness::process::{HandleState, ProcessHandle, ProcessKind};

use crate::support::{logger, netconf_cli_spec, FAKE_NETCONF_CLI};

/// The stand-in with terminal echo off while the password is typed, the
/// way the real client reads it.
fn script() -> String {
    FAKE_NETCONF_CLI
        .replace(
            "printf 'root@localhost password: '",
            "stty -echo; printf 'root@localhost password: '",
        )
        .replace("read pw || exit 1", "read pw || exit 1; stty echo")
}

#[test]
fn test_login_then_commands() {
    let dir = tempfile::tempdir().unwrap();
    let spec = netconf_cli_spec(dir.path(), &script(), "0000");
    let mut handle = ProcessHandle::new(spec, logger());

    handle.spawn().unwrap();
    assert_eq!(handle.state(), HandleState::Running);

    let reply = handle
        .send_command("get --filter-xpath /ietf-interfaces:*")
        .unwrap()
        .unwrap();
    assert!(reply.trim_start().starts_with("DATA"), "reply: {:?}", reply);
    check_response(&reply, "DATA", &[("name", "host-vpp1"), ("enabled", "true")]).unwrap();

    let unknown = handle.send_command("frobnicate").unwrap().unwrap();
    assert!(unknown.contains("Unknown command"));

    handle.terminate().unwrap();
    assert_eq!(handle.state(), HandleState::Terminated);
    assert_eq!(handle.send_command("get").unwrap(), None);

    let transcript = fs::read_to_string(dir.path().join("netopeer2-cli.log")).unwrap();
    assert!(transcript.contains("connect --host localhost --port 830 --login root"));
    assert!(transcript.contains("********"));
    assert!(!transcript.contains("0000"));
}

#[test]
fn test_wrong_password_fails_spawn() {
    let dir = tempfile::tempdir().unwrap();
    let spec = netconf_cli_spec(dir.path(), FAKE_NETCONF_CLI, "1234");
    let mut handle = ProcessHandle::new(spec, logger());

    let err = handle.spawn().unwrap_err();
    assert!(!err.is_timeout());
    assert_eq!(handle.state(), HandleState::Terminated);
}

#[test]
fn test_missing_prompt_times_out() {
    let dir = tempfile::tempdir().unwrap();
    let mut spec = netconf_cli_spec(dir.path(), "sleep 30\n", "0000");
    if let ProcessKind::Interactive(session) = &mut spec.kind {
        session.timeout = std::time::Duration::from_millis(500);
    }
    let mut handle = ProcessHandle::new(spec, logger());

    let err = handle.spawn().unwrap_err();
    assert!(err.is_timeout(), "unexpected error: {}", err);
    assert_eq!(handle.state(), HandleState::Terminated);
}

#[test]
fn test_management_client_operations() {
    let dir = tempfile::tempdir().unwrap();
    let spec = netconf_cli_spec(dir.path(), &script(), "0000");
    let mut handle = ProcessHandle::new(spec, logger());
    handle.spawn().unwrap();

    {
        let mut client = NetconfCli::new(&mut handle, logger());
        let interface = IetfInterface::new("host-vpp1").enabled(true);

        client.create(&interface).unwrap();

        let reply = client.get("/ietf-interfaces:interfaces").unwrap();
        check_response(&reply, "DATA", &[("enabled", "true")]).unwrap();

        match client.delete(&interface) {
            Err(ClientError::Rejected { operation, reply }) => {
                assert_eq!(operation, "edit-config");
                assert!(reply.contains("data-missing"));
            }
            other => panic!("expected rejection, got {:?}", other.map(|_| ())),
        }
    }

    handle.terminate().unwrap();
}
