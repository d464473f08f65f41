// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Sequential suite runner with per-case progress and a run summary.
//!
//! Every case gets a fresh [`TestContext`]. The class `set_up` runs first;
//! if it fails the case is an error and the body is not run. `tear_down`
//! always runs afterwards, including after a panicking body. A failing case
//! never stops the run.
//!
//! Progress lines, harness logs (through a `SharedOutputSink`) and the final
//! summary all go to one [`SharedOutput`]. While a run is in progress, panics
//! raised by a case are kept off stderr: their message and location end up
//! in the case report instead.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::HarnessConfig;
use crate::discovery::{DiscoveredSuite, TestCase};
use crate::framework::TestContext;
use crate::logging::{Facility, Logger};
use crate::output::SharedOutput;
use crate::{log_debug, log_info};

const SEPARATOR_HEAVY: &str =
    "======================================================================";
const SEPARATOR_LIGHT: &str =
    "----------------------------------------------------------------------";

thread_local! {
    /// Set while this thread runs case code
    static IN_CASE: Cell<bool> = const { Cell::new(false) };
    /// Location of the last panic captured on this thread
    static PANIC_LOCATION: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// How one case ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Passed,
    /// The body returned an error or an assertion panicked
    Failed(String),
    /// Set-up or tear-down broke
    Errored(String),
    Skipped(String),
}

impl Outcome {
    fn short(&self) -> String {
        match self {
            Outcome::Passed => "ok".to_string(),
            Outcome::Failed(_) => "FAIL".to_string(),
            Outcome::Errored(_) => "ERROR".to_string(),
            Outcome::Skipped(reason) => format!("skipped '{}'", reason),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CaseReport {
    pub suite: String,
    pub class: &'static str,
    pub method: &'static str,
    pub outcome: Outcome,
    pub duration: Duration,
}

impl fmt::Display for CaseReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.method, self.class)
    }
}

/// Results of a whole run
#[derive(Debug, Clone, Default)]
pub struct RunResult {
    pub reports: Vec<CaseReport>,
    pub elapsed: Duration,
}

impl RunResult {
    pub fn tests_run(&self) -> usize {
        self.reports.len()
    }

    fn count(&self, pred: impl Fn(&Outcome) -> bool) -> usize {
        self.reports.iter().filter(|r| pred(&r.outcome)).count()
    }

    pub fn failures(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Failed(_)))
    }

    pub fn errors(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Errored(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Skipped(_)))
    }

    /// No case failed or errored.
    pub fn success(&self) -> bool {
        self.failures() == 0 && self.errors() == 0
    }
}

pub struct SuiteRunner {
    config: HarnessConfig,
    logger: Logger,
    output: SharedOutput,
    stream: Option<Box<dyn Write + Send>>,
    suppress_summary: bool,
}

impl SuiteRunner {
    /// `logger` should write into `output` so logs interleave with results.
    pub fn new(config: HarnessConfig, logger: Logger, output: SharedOutput) -> Self {
        Self {
            config,
            logger,
            output,
            stream: None,
            suppress_summary: false,
        }
    }

    /// Send the run's output to `stream` instead of the current writer.
    ///
    /// The previous writer is put back when the run finishes.
    pub fn with_stream(mut self, stream: impl Write + Send + 'static) -> Self {
        self.stream = Some(Box::new(stream));
        self
    }

    /// Skip the closing summary (failure details and totals).
    pub fn suppress_summary(mut self, suppress: bool) -> Self {
        self.suppress_summary = suppress;
        self
    }

    pub fn run(&mut self, suites: &[DiscoveredSuite]) -> RunResult {
        let previous = self.stream.take().map(|stream| self.output.swap(stream));
        let previous_hook = Arc::new(panic::take_hook());
        let chained = Arc::clone(&previous_hook);
        panic::set_hook(Box::new(move |info| {
            if IN_CASE.with(Cell::get) {
                let location = info.location().map(|l| format!("{}:{}", l.file(), l.line()));
                PANIC_LOCATION.with(|slot| *slot.borrow_mut() = location);
            } else {
                chained(info);
            }
        }));

        let start = Instant::now();
        let mut result = RunResult::default();
        for suite in suites {
            log_info!(self.logger, Facility::Runner, "running suite {}", suite.name);
            for case in &suite.cases {
                let report = self.run_case(&suite.name, case);
                result.reports.push(report);
            }
        }
        result.elapsed = start.elapsed();

        if !self.suppress_summary {
            self.print_summary(&result);
        }
        self.output.flush();

        drop(panic::take_hook());
        match Arc::try_unwrap(previous_hook) {
            Ok(hook) => panic::set_hook(hook),
            Err(shared) => panic::set_hook(Box::new(move |info| shared(info))),
        }

        if let Some(previous) = previous {
            let stream = self.output.swap(previous);
            self.stream = Some(stream);
        }
        result
    }

    fn run_case(&self, suite: &str, case: &TestCase) -> CaseReport {
        let start = Instant::now();
        self.output
            .write_str(&format!("{} ({}) ... ", case.method.name, case.class.name));
        self.output.flush();

        let outcome = match case.method.skip {
            Some(reason) => Outcome::Skipped(reason.to_string()),
            None => self.execute(case),
        };

        self.output.write_line(&outcome.short());
        self.output.flush();
        log_debug!(
            self.logger,
            Facility::Runner,
            "{} finished in {:.3}s",
            case.id(),
            start.elapsed().as_secs_f64()
        );

        CaseReport {
            suite: suite.to_string(),
            class: case.class.name,
            method: case.method.name,
            outcome,
            duration: start.elapsed(),
        }
    }

    fn execute(&self, case: &TestCase) -> Outcome {
        let mut ctx = TestContext::new(self.config.clone(), self.logger.clone());

        let mut outcome = match guarded(|| (case.class.set_up)(&mut ctx)) {
            Ok(Ok(())) => match guarded(|| (case.method.func)(&mut ctx)) {
                Ok(Ok(())) => Outcome::Passed,
                Ok(Err(e)) => Outcome::Failed(format!("{:#}", e)),
                Err(panicked) => Outcome::Failed(panicked),
            },
            Ok(Err(e)) => Outcome::Errored(format!("set_up: {:#}", e)),
            Err(panicked) => Outcome::Errored(format!("set_up: {}", panicked)),
        };

        if let Err(panicked) = guarded(|| (case.class.tear_down)(&mut ctx)) {
            if outcome == Outcome::Passed {
                outcome = Outcome::Errored(format!("tear_down: {}", panicked));
            }
        }
        outcome
    }

    fn print_summary(&self, result: &RunResult) {
        let out = &self.output;
        out.write_line("");

        for report in &result.reports {
            let (kind, detail) = match &report.outcome {
                Outcome::Failed(detail) => ("FAIL", detail),
                Outcome::Errored(detail) => ("ERROR", detail),
                _ => continue,
            };
            out.write_line(SEPARATOR_HEAVY);
            out.write_line(&format!("{}: {}", kind, report));
            out.write_line(SEPARATOR_LIGHT);
            out.write_line(detail);
            out.write_line("");
        }

        out.write_line(SEPARATOR_LIGHT);
        let tests = result.tests_run();
        out.write_line(&format!(
            "Ran {} test{} in {:.3}s",
            tests,
            if tests == 1 { "" } else { "s" },
            result.elapsed.as_secs_f64()
        ));
        out.write_line("");

        let mut counts = Vec::new();
        if result.failures() > 0 {
            counts.push(format!("failures={}", result.failures()));
        }
        if result.errors() > 0 {
            counts.push(format!("errors={}", result.errors()));
        }
        if result.skipped() > 0 {
            counts.push(format!("skipped={}", result.skipped()));
        }
        let verdict = if result.success() { "OK" } else { "FAILED" };
        if counts.is_empty() {
            out.write_line(verdict);
        } else {
            out.write_line(&format!("{} ({})", verdict, counts.join(", ")));
        }
    }
}

/// Run case code, turning a panic into its message and location.
fn guarded<T>(f: impl FnOnce() -> T) -> Result<T, String> {
    IN_CASE.with(|flag| flag.set(true));
    let result = panic::catch_unwind(AssertUnwindSafe(f));
    IN_CASE.with(|flag| flag.set(false));

    result.map_err(|payload| {
        let message = panic_message(payload.as_ref());
        match PANIC_LOCATION.with(|slot| slot.borrow_mut().take()) {
            Some(location) => format!("{} (at {})", message, location),
            None => message,
        }
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panicked".to_string()
    }
}
