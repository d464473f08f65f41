// SPDX-License-Identifier: Apache-2.0 OR MIT
// YANG module installation and startup datastore import

use std::path::PathBuf;
use std::process::Command;
use std::thread;
use std::time::Duration;
use thiserror::Error;

use crate::config::{ProvisionConfig, ProvisionStep};
use crate::logging::{Facility, Logger};
use crate::{log_debug, log_info, log_warning};

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("failed to run '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{command}' exited with {status}: {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("working directory {} does not exist", .0.display())]
    MissingDirectory(PathBuf),
}

fn describe(step: &ProvisionStep) -> String {
    std::iter::once(step.program.as_str())
        .chain(step.args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}

fn run_step(step: &ProvisionStep, logger: &Logger) -> Result<(), ProvisionError> {
    let command = describe(step);
    let mut cmd = Command::new(&step.program);
    cmd.args(&step.args);
    if let Some(cwd) = &step.cwd {
        if !cwd.is_dir() {
            return Err(ProvisionError::MissingDirectory(cwd.clone()));
        }
        cmd.current_dir(cwd);
    }

    log_debug!(logger, Facility::Provision, "{}", command);
    let output = cmd.output().map_err(|source| ProvisionError::Spawn {
        command: command.clone(),
        source,
    })?;
    if !output.status.success() {
        return Err(ProvisionError::Failed {
            command,
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(())
}

/// Run every step in order, sleeping each step's settle time after it.
///
/// With `keep_going` a failed step is logged and the next one runs (a
/// module that is already installed makes `sysrepoctl --install` fail).
/// Returns the number of steps that failed.
pub fn provision(
    config: &ProvisionConfig,
    keep_going: bool,
    logger: &Logger,
) -> Result<usize, ProvisionError> {
    log_info!(logger, Facility::Provision, "running {} step(s)", config.steps.len());
    let mut failed = 0;
    for step in &config.steps {
        match run_step(step, logger) {
            Ok(()) => {}
            Err(e) if keep_going => {
                log_warning!(logger, Facility::Provision, "{}", e);
                failed += 1;
            }
            Err(e) => return Err(e),
        }
        if step.settle_ms > 0 {
            thread::sleep(Duration::from_millis(step.settle_ms));
        }
    }
    Ok(failed)
}
