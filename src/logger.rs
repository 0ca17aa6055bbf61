//! Quiet-aware logging.
//!
//! Thin wrappers over `tracing` that drop informational output (`info`,
//! `debug`, `trace`) when the bridge runs with `quiet` set. Warnings and
//! errors are never suppressed.

/// Emits an `info` event unless `$quiet` is true.
macro_rules! info_unless_quiet {
    ($quiet:expr, $($arg:tt)+) => {
        if !$quiet {
            ::tracing::info!($($arg)+);
        }
    };
}

/// Emits a `debug` event unless `$quiet` is true.
macro_rules! debug_unless_quiet {
    ($quiet:expr, $($arg:tt)+) => {
        if !$quiet {
            ::tracing::debug!($($arg)+);
        }
    };
}

/// Emits a `trace` event unless `$quiet` is true.
macro_rules! trace_unless_quiet {
    ($quiet:expr, $($arg:tt)+) => {
        if !$quiet {
            ::tracing::trace!($($arg)+);
        }
    };
}

pub(crate) use debug_unless_quiet;
pub(crate) use info_unless_quiet;
pub(crate) use trace_unless_quiet;
