//! Logging macros.
//!
//! Call sites use the crate-level `log_*!` macros so the backend can change
//! in one place. Messages go to `tracing` under the `dazzler_client` target.

#[doc(hidden)]
pub use tracing::Level;

#[doc(hidden)]
pub fn emit(level: Level, msg: &str) {
    match level {
        Level::ERROR => tracing::error!(target: "dazzler_client", "{}", msg),
        Level::WARN => tracing::warn!(target: "dazzler_client", "{}", msg),
        Level::INFO => tracing::info!(target: "dazzler_client", "{}", msg),
        Level::DEBUG => tracing::debug!(target: "dazzler_client", "{}", msg),
        _ => tracing::trace!(target: "dazzler_client", "{}", msg),
    }
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::logging::emit($crate::logging::Level::INFO, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::logging::emit($crate::logging::Level::ERROR, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::logging::emit($crate::logging::Level::WARN, &format!($($arg)*))
    };
}

/// Debug output, off unless `RUST_LOG` enables `dazzler_client=debug`.
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        $crate::logging::emit($crate::logging::Level::DEBUG, &format!($($arg)*))
    };
}
