// SPDX-License-Identifier: Apache-2.0 OR MIT
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use sweetcomb_harness::config::HarnessConfig;
use sweetcomb_harness::discovery::{self, Registry};
use sweetcomb_harness::logging::{Facility, Logger, SharedOutputSink};
use sweetcomb_harness::output::SharedOutput;
use sweetcomb_harness::provision;
use sweetcomb_harness::runner::SuiteRunner;
use sweetcomb_harness::{log_info, log_warning};

/// Discover and run the sweetcomb integration suites
#[derive(Parser, Debug, PartialEq)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory to search for test_*.rs files (repeatable)
    #[arg(long = "dir", value_name = "PATH", default_value = ".")]
    dirs: Vec<PathBuf>,

    /// Directory prefix, relative to each search directory, not descended into
    #[arg(long, value_name = "PREFIX", default_value = "conf")]
    ignore: PathBuf,

    /// JSON5 harness configuration
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Leave every process running after each test
    #[arg(long)]
    debug: bool,

    /// Verbose daemons and debug-level harness logs
    #[arg(long)]
    verbose: bool,

    /// Do not print the run summary
    #[arg(long)]
    quiet: bool,

    /// Install YANG modules and import the startup configuration first
    #[arg(long)]
    provision: bool,

    /// Print the discovered suites and exit
    #[arg(long)]
    list: bool,
}

fn load_config(args: &Args) -> Result<HarnessConfig> {
    let mut config = match &args.config {
        Some(path) => HarnessConfig::load_from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => HarnessConfig::default(),
    };
    config.debug |= args.debug;
    config.verbose |= args.verbose;
    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn run(args: Args) -> Result<bool> {
    let config = load_config(&args)?;

    let output = SharedOutput::stdout();
    let logger = Logger::new(SharedOutputSink::new(output.clone()));
    logger.set_global_level(config.effective_log_level());

    let suites = discovery::discover(
        &Registry::global(),
        &args.dirs,
        Some(&args.ignore),
        &logger,
    )?;

    if args.list {
        for suite in &suites {
            output.write_line(&suite.name);
            for case in &suite.cases {
                let skip = case
                    .method
                    .skip
                    .map(|reason| format!(" (skipped: {})", reason))
                    .unwrap_or_default();
                output.write_line(&format!("    {}{}", case.method.name, skip));
            }
        }
        output.flush();
        return Ok(true);
    }

    if suites.is_empty() {
        log_warning!(logger, Facility::Runner, "no test suites found");
    }

    if args.provision {
        let failed = provision::provision(&config.provision, true, &logger)?;
        log_info!(
            logger,
            Facility::Provision,
            "provisioning done, {} step(s) failed",
            failed
        );
    }

    let result = SuiteRunner::new(config, logger, output)
        .suppress_summary(args.quiet)
        .run(&suites);
    Ok(result.success())
}

fn main() -> ExitCode {
    match run(Args::parse()) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("sc-test-runner: {:#}", e);
            ExitCode::from(2)
        }
    }
}
