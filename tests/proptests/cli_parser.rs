// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Property tests: VPP CLI output parser
//!
//! - Arbitrary text never panics either parser.
//! - Well-formed `show interface` rows round out to the fields they were
//!   built from, whatever the column padding.
//! - Every well-formed `show interface address` entry lands under the
//!   interface that precedes it, in order.

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use sweetcomb_harness::cli_parser::{
        find_interface, parse_address_table, parse_interface_line, parse_interface_table,
    };

    fn interface_name() -> impl Strategy<Value = String> {
        "(host-vpp|local|loop|GigabitEthernet0/8/)[0-9]{1,2}"
    }

    fn padding() -> impl Strategy<Value = String> {
        "[ \t]{1,12}"
    }

    fn ipv4_prefix() -> impl Strategy<Value = String> {
        (any::<[u8; 4]>(), 0u8..=32)
            .prop_map(|(o, len)| format!("{}.{}.{}.{}/{}", o[0], o[1], o[2], o[3], len))
    }

    proptest! {
        #[test]
        fn test_parsers_do_not_panic(input in any::<String>()) {
            let _ = parse_interface_line(&input);
            let _ = parse_interface_table(&input).count();
            let _ = parse_address_table(&input);
        }

        #[test]
        fn test_interface_row_fields(
            name in interface_name(),
            index in 0u32..4096,
            up in any::<bool>(),
            mtu in 68u32..9216,
            pads in prop::collection::vec(padding(), 4),
        ) {
            let state = if up { "up" } else { "down" };
            let line = format!(
                "{}{}{}{}{}{}{}/0/0/0",
                name, pads[0], index, pads[1], state, pads[2], mtu
            );
            let record = parse_interface_line(&line);
            prop_assert_eq!(record.name, name);
            prop_assert_eq!(record.index, Some(index.to_string()));
            prop_assert_eq!(record.state, Some(up));
            prop_assert_eq!(record.mtu, Some(mtu.to_string()));
            prop_assert_eq!(record.counter, None);
        }

        #[test]
        fn test_table_drops_only_the_header(
            names in prop::collection::btree_set(interface_name(), 0..8),
            blank_lines in 0usize..3,
        ) {
            let mut text = String::from(
                "              Name               Idx    State  MTU (L3/IP4/IP6/MPLS)     Counter          Count\n",
            );
            for (i, name) in names.iter().enumerate() {
                text.push_str(&format!("{}    {}    up    1500/0/0/0\n", name, i));
                text.push_str(&"\n".repeat(blank_lines));
            }

            let parsed: Vec<String> = parse_interface_table(&text).map(|r| r.name).collect();
            let expected: Vec<String> = names.iter().cloned().collect();
            prop_assert_eq!(parsed, expected);

            for name in &names {
                prop_assert!(find_interface(parse_interface_table(&text), name).is_some());
            }
            prop_assert!(find_interface(parse_interface_table(&text), "absent0").is_none());
        }

        #[test]
        fn test_addresses_follow_their_interface(
            entries in prop::collection::btree_map(
                interface_name(),
                prop::collection::vec(ipv4_prefix(), 0..4),
                0..6,
            ),
        ) {
            let mut text = String::new();
            for (name, addresses) in &entries {
                text.push_str(&format!("{} (up):\n", name));
                for address in addresses {
                    text.push_str(&format!("  L3 {}\n", address));
                }
            }

            let table = parse_address_table(&text);
            for (name, addresses) in &entries {
                match table.get(name) {
                    Some(record) => prop_assert_eq!(&record.addr, addresses),
                    None => prop_assert!(addresses.is_empty()),
                }
            }
            prop_assert_eq!(
                table.len(),
                entries.values().filter(|a| !a.is_empty()).count()
            );
        }
    }
}
