// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Integration-test harness for the sweetcomb plugin stack.
//!
//! The harness brings up VPP, sysrepo (daemon and plugin host) and the
//! netopeer2 NETCONF server/client as external processes, pushes
//! configuration through NETCONF and checks that VPP's own CLI reports the
//! intended state.
//!
//! Test cases are registered with `#[sweetcomb_class]` and
//! `#[sweetcomb_test(Class)]`; the `sc-test-runner` binary discovers them by
//! walking the source tree and runs them suite by suite.

// The registration macros expand to `::sweetcomb_harness::...` paths, which
// must also resolve for the scenarios compiled into this crate.
extern crate self as sweetcomb_harness;

pub use inventory;
pub use sc_test_macros::{requires_root, sweetcomb_class, sweetcomb_test};

pub mod cli_parser;
pub mod client;
pub mod config;
pub mod discovery;
pub mod framework;
pub mod logging;
pub mod model;
pub mod net;
pub mod output;
pub mod process;
pub mod provision;
pub mod runner;
pub mod scenarios;
pub mod status;
pub mod topology;
pub mod validation;
