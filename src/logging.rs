//! Logging facade
//!
//! The crate logs through these macros so the backend can be picked at compile time:
//!
//! - `log` (default) - records go to the standard `log` facade
//! - `tracing` - records become `tracing` events
//!
//! The two features are mutually exclusive. With neither enabled the macros expand
//! to nothing. Every record is emitted under the `url_rules` target, so a filter
//! such as `RUST_LOG=url_rules=debug` shows rule compilation and matching.
//!
//! ```ignore
//! use url_rules::{debug_log, trace_log};
//!
//! trace_log!("Compiling pattern '{}'", pattern);
//! debug_log!("Request parsed with URL rule: {}", name);
//! ```

/// Target used for every record emitted by this crate.
pub const LOG_TARGET: &str = "url_rules";

/// Trace-level record. Used for compiler internals.
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        ::tracing::trace!(target: $crate::logging::LOG_TARGET, $($arg)*);
        #[cfg(feature = "log")]
        ::log::trace!(target: $crate::logging::LOG_TARGET, $($arg)*);
    };
}

/// Debug-level record. Used when a rule parses a request or creates a URL.
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        ::tracing::debug!(target: $crate::logging::LOG_TARGET, $($arg)*);
        #[cfg(feature = "log")]
        ::log::debug!(target: $crate::logging::LOG_TARGET, $($arg)*);
    };
}

/// Info-level record.
#[macro_export]
macro_rules! info_log {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        ::tracing::info!(target: $crate::logging::LOG_TARGET, $($arg)*);
        #[cfg(feature = "log")]
        ::log::info!(target: $crate::logging::LOG_TARGET, $($arg)*);
    };
}

/// Warn-level record. Used for sub-patterns the regex engine rejects.
#[macro_export]
macro_rules! warn_log {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        ::tracing::warn!(target: $crate::logging::LOG_TARGET, $($arg)*);
        #[cfg(feature = "log")]
        ::log::warn!(target: $crate::logging::LOG_TARGET, $($arg)*);
    };
}
