// SPDX-License-Identifier: Apache-2.0 OR MIT
// Logging macros taking format arguments

/// Log a message with error severity
///
/// ```ignore
/// log_error!(logger, Facility::Topology, "{} failed to start", component);
/// ```
#[macro_export]
macro_rules! log_error {
    ($logger:expr, $facility:expr, $($arg:tt)+) => {
        $logger.error($facility, &format!($($arg)+))
    };
}

/// Log a message with warning severity
#[macro_export]
macro_rules! log_warning {
    ($logger:expr, $facility:expr, $($arg:tt)+) => {
        $logger.warning($facility, &format!($($arg)+))
    };
}

/// Log a message with notice severity
#[macro_export]
macro_rules! log_notice {
    ($logger:expr, $facility:expr, $($arg:tt)+) => {
        $logger.notice($facility, &format!($($arg)+))
    };
}

/// Log a message with info severity
///
/// ```ignore
/// log_info!(logger, Facility::Runner, "Running suite {}", suite.name);
/// ```
#[macro_export]
macro_rules! log_info {
    ($logger:expr, $facility:expr, $($arg:tt)+) => {
        $logger.info($facility, &format!($($arg)+))
    };
}

/// Log a message with debug severity
#[macro_export]
macro_rules! log_debug {
    ($logger:expr, $facility:expr, $($arg:tt)+) => {
        $logger.debug($facility, &format!($($arg)+))
    };
}

/// Log a message with key-value pairs
///
/// ```ignore
/// log_kv!(logger, Severity::Info, Facility::Process, "spawned",
///         "label" => "vpp", "pid" => &pid.to_string());
/// ```
#[macro_export]
macro_rules! log_kv {
    ($logger:expr, $severity:expr, $facility:expr, $msg:expr, $($key:expr => $value:expr),+) => {{
        let kvs: &[(&str, &str)] = &[$(($key, $value)),+];
        $logger.log_kv($severity, $facility, $msg, kvs)
    }};
}
