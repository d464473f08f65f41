// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Shared helpers for the integration tests.
//!
//! Nothing here needs root: the "daemons" are `sleep` and `sh`, and the
//! NETCONF client is a shell script that speaks just enough of the
//! netopeer2-cli dialogue.

#![allow(dead_code)]

use std::path::Path;
use std::time::Duration;

use sweetcomb_harness::config::ClientConfig;
use sweetcomb_harness::logging::{Logger, MemorySink, Severity};
use sweetcomb_harness::process::{LoginSpec, ProcessSpec, SessionSpec};

/// Host-key confirmation, then password, then a command loop.
///
/// `get` answers with a DATA block; `edit-config` answers OK unless the
/// payload asks for a delete, which is answered with an ERROR block.
pub const FAKE_NETCONF_CLI: &str = r#"
printf '> '
read cmd || exit 1
printf 'The authenticity of the host cannot be established.\r\n'
printf 'Are you sure you want to continue connecting (yes/no)? '
read answer || exit 1
[ "$answer" = "yes" ] || exit 1
printf 'root@localhost password: '
read pw || exit 1
[ "$pw" = "0000" ] || { printf 'nc ERROR: authentication failed\r\n'; exit 1; }
while :; do
    printf '> '
    read cmd || exit 0
    case "$cmd" in
        exit) exit 0 ;;
        get*)
            printf 'DATA\r\n'
            printf '<interfaces xmlns="urn:ietf:params:xml:ns:yang:ietf-interfaces">\r\n'
            printf '  <interface>\r\n'
            printf '    <name>host-vpp1</name>\r\n'
            printf '    <enabled>true</enabled>\r\n'
            printf '  </interface>\r\n'
            printf '</interfaces>\r\n'
            ;;
        edit-config*)
            file=${cmd#*--config=}
            if [ ! -f "$file" ]; then
                printf 'nc ERROR: cannot read %s\r\n' "$file"
            elif grep -q 'operation="delete"' "$file"; then
                printf 'ERROR\r\n  type:     application\r\n  message:  data-missing\r\n'
            else
                printf 'OK\r\n'
            fi
            ;;
        *) printf 'Unknown command "%s"\r\n' "$cmd" ;;
    esac
done
"#;

pub fn logger() -> Logger {
    let logger = Logger::new(MemorySink::new());
    logger.set_global_level(Severity::Debug);
    logger
}

/// Interactive spec running `script` through `sh`, with the stock login.
pub fn netconf_cli_spec(dir: &Path, script: &str, password: &str) -> ProcessSpec {
    let path = dir.join("fake-netopeer2-cli.sh");
    std::fs::write(&path, script).unwrap();

    let client = ClientConfig::default();
    let session = SessionSpec {
        prompt: client.prompt.clone(),
        timeout: Duration::from_secs(5),
        login: Some(LoginSpec {
            initiation: client.connect_command(),
            password: password.to_string(),
            password_prompt: client.password_prompt.clone(),
            host_key_prompt: client.host_key_prompt.clone(),
            accept_host_key: "yes".to_string(),
        }),
        exit_command: Some(client.exit_command.clone()),
    };
    ProcessSpec::interactive(
        "netopeer2-cli",
        "sh",
        vec![path.display().to_string()],
        dir.join("netopeer2-cli.log"),
        session,
    )
    .with_grace(Duration::from_secs(1))
}

/// False once `pid` has exited, zombies included.
pub fn is_alive(pid: u32) -> bool {
    let Ok(stat) = std::fs::read_to_string(format!("/proc/{}/stat", pid)) else {
        return false;
    };
    // state is the first field after the parenthesised command name
    let state = stat
        .rfind(')')
        .and_then(|end| stat[end + 1..].trim_start().chars().next());
    !matches!(state, None | Some('Z') | Some('X'))
}

/// True once `pid` has exited, polling for up to `within`.
pub fn gone_within(pid: u32, within: Duration) -> bool {
    let deadline = std::time::Instant::now() + within;
    while is_alive(pid) {
        if std::time::Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    true
}
