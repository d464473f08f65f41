// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Parsers for VPP's tabular CLI output.
//!
//! Only the layouts VPP prints today are understood:
//!
//! ```text
//!               Name               Idx    State  MTU (L3/IP4/IP6/MPLS)     Counter          Count
//! host-vpp1                         1      up          1500/0/0/0     rx packets                 3
//! ```
//!
//! and for `show interface address`:
//!
//! ```text
//! host-vpp1 (up):
//!   L3 192.168.0.1/24
//! local0 (dn):
//! ```
//!
//! Ragged lines are not errors. Missing trailing columns leave the
//! corresponding fields unset.

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// One row of `show interface`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterfaceStatusRecord {
    pub name: String,
    pub index: Option<String>,
    /// `Some(true)` for "up", `Some(false)` for "down", `None` for anything else
    pub state: Option<bool>,
    /// First field of the slash-separated MTU column
    pub mtu: Option<String>,
    pub counter: Option<String>,
    pub count: Option<String>,
}

/// Addresses of one interface from `show interface address`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressListRecord {
    pub name: String,
    /// Address/prefix strings in output order
    pub addr: Vec<String>,
}

impl AddressListRecord {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            addr: Vec::new(),
        }
    }

    pub fn contains(&self, prefix: &str) -> bool {
        self.addr.iter().any(|a| a == prefix)
    }
}

/// Parse one non-header line of `show interface`.
///
/// The line is split on runs of whitespace. A line with leading blanks
/// therefore has an empty first field and an empty name; VPP prints
/// continuation rows (extra counters) that way.
pub fn parse_interface_line(line: &str) -> InterfaceStatusRecord {
    let mut record = InterfaceStatusRecord::default();
    for (position, field) in WHITESPACE.split(line).enumerate() {
        match position {
            0 => record.name = field.to_string(),
            1 => record.index = Some(field.to_string()),
            2 => {
                record.state = match field {
                    "up" => Some(true),
                    "down" => Some(false),
                    _ => None,
                }
            }
            3 => record.mtu = field.split('/').next().map(str::to_string),
            4 => record.counter = Some(field.to_string()),
            5 => record.count = Some(field.to_string()),
            _ => break,
        }
    }
    record
}

/// Parse the whole `show interface` output.
///
/// The first line is the table header and is dropped. Blank lines are
/// skipped. The returned iterator is lazy and can be consumed once.
pub fn parse_interface_table(text: &str) -> impl Iterator<Item = InterfaceStatusRecord> + '_ {
    text.lines()
        .skip(1)
        .filter(|line| !line.trim().is_empty())
        .map(parse_interface_line)
}

/// First record whose name is exactly `name`.
///
/// `None` is the normal answer for an interface that does not exist yet.
pub fn find_interface<I>(records: I, name: &str) -> Option<InterfaceStatusRecord>
where
    I: IntoIterator<Item = InterfaceStatusRecord>,
{
    records.into_iter().find(|record| record.name == name)
}

/// Parse the whole `show interface address` output, keyed by interface name.
///
/// A line starting with a non-blank character names the current interface
/// (its first space-separated token). Each indented line adds its third
/// whitespace field to that interface. Interfaces without any address
/// lines do not appear, so a lookup miss means "no addresses".
pub fn parse_address_table(text: &str) -> HashMap<String, AddressListRecord> {
    let mut table: HashMap<String, AddressListRecord> = HashMap::new();
    let mut current: Option<&str> = None;

    for line in text.lines() {
        if line.is_empty() {
            continue;
        }
        if !line.starts_with(char::is_whitespace) {
            current = line.split(' ').next();
            continue;
        }
        let Some(name) = current else {
            continue;
        };
        let Some(address) = WHITESPACE.split(line).nth(2) else {
            continue;
        };
        if address.is_empty() {
            continue;
        }
        table
            .entry(name.to_string())
            .or_insert_with(|| AddressListRecord::new(name))
            .addr
            .push(address.to_string());
    }

    table
}
