// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Validation helpers shared by the configuration loader and the
//! configuration objects pushed over NETCONF.

/// Maximum Linux interface name length (IFNAMSIZ - 1)
pub const MAX_INTERFACE_NAME_LEN: usize = 15;

/// Result type for validation functions
pub type ValidationResult = Result<(), String>;

/// Validate a Linux (veth) interface name.
///
/// # Rules
/// - Must not be empty
/// - Must not exceed 15 characters (IFNAMSIZ - 1)
/// - Only alphanumeric characters, dash, underscore, or dot
/// - Must not start with a dash or dot
pub fn validate_interface_name(name: &str) -> ValidationResult {
    if name.is_empty() {
        return Err("interface name cannot be empty".to_string());
    }

    if name.len() > MAX_INTERFACE_NAME_LEN {
        return Err(format!(
            "interface name '{}' exceeds maximum length of {} characters",
            name, MAX_INTERFACE_NAME_LEN
        ));
    }

    if let Some((i, c)) = name
        .chars()
        .enumerate()
        .find(|(_, c)| !c.is_ascii_alphanumeric() && !matches!(c, '-' | '_' | '.'))
    {
        return Err(format!(
            "interface name '{}' contains invalid character '{}' at position {}",
            name, c, i
        ));
    }

    if name.starts_with(['-', '.']) {
        return Err(format!(
            "interface name '{}' must start with alphanumeric or underscore",
            name
        ));
    }

    Ok(())
}

/// Validate an IPv4 prefix length.
pub fn validate_prefix_length(prefix_length: u8, context: &str) -> ValidationResult {
    if prefix_length > 32 {
        return Err(format!(
            "{}: prefix length {} is out of range 0-32",
            context, prefix_length
        ));
    }
    Ok(())
}

/// Validate a process-name fragment used by the teardown sweep.
///
/// Short fragments would match far too many unrelated processes.
pub fn validate_sweep_pattern(pattern: &str) -> ValidationResult {
    if pattern.trim().len() < 3 {
        return Err(format!(
            "sweep pattern '{}' must be at least 3 non-blank characters",
            pattern
        ));
    }
    Ok(())
}
