//! Console output macros for the snap CLI.
//!
//! These write user-facing status lines to stderr so stdout stays free for
//! machine-readable output. Structured logs go through `tracing` instead.

#[macro_export]
macro_rules! snap_error {
    ($($arg:tt)*) => {
        eprintln!("❌ {}", format!($($arg)*));
    }
}

#[macro_export]
macro_rules! snap_success {
    ($($arg:tt)*) => {
        eprintln!("✓ {}", format!($($arg)*));
    };
}

#[macro_export]
macro_rules! snap_info {
    ($($arg:tt)*) => {
        eprintln!("ℹ {}", format!($($arg)*));
    };
}

#[macro_export]
macro_rules! snap_warning {
    ($($arg:tt)*) => {
        eprintln!("⚠ {}", format!($($arg)*));
    };
}

#[macro_export]
macro_rules! snap_error_hint {
    ($($arg:tt)*) => {
        eprintln!("💡 {}", format!($($arg)*));
    };
}
