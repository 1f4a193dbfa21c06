//! Diagnostics for catalog building and chain compilation.
//!
//! The engine emits `tracing` events and never installs a subscriber on its
//! own. What it reports, by level:
//!
//! - `info`: an engine configuration was built (dialect, base table, offset).
//! - `debug`: filter types registered and the catalog frozen, operators
//!   registered, filters prepended, each predicate contributed (`operator`,
//!   `column`, `values`) and every compiled chain (`filters`, `params`,
//!   `sql`).
//! - `trace`: attribute writes, operator assignment, unbound filters
//!   skipped, duplicate joins dropped and copy-on-write filter edits.
//! - `warn`: a report configured with a default operator its catalog does
//!   not know.
//!
//! Bound parameter values are never logged, only their count.
//!
//! # Environment Variables
//!
//! - `RECKON_DEBUG=true|1|yes` - lower the default level to `debug` and
//!   enable [`reckon_debug!`](crate::reckon_debug) / [`reckon_trace!`](crate::reckon_trace)
//! - `RECKON_LOG_LEVEL=trace|debug|info|warn|error` - explicit level
//! - `RECKON_LOG_FORMAT=json|pretty|compact` - output format (default: json)
//!
//! # Usage
//!
//! With the `tracing-subscriber` feature, an application without its own
//! subscriber can call [`init`] once at startup:
//!
//! ```rust,no_run
//! use reckon_query::logging;
//!
//! logging::init();
//! ```

use std::env;
use std::sync::Once;

static INIT: Once = Once::new();

/// Check if debug logging is enabled via `RECKON_DEBUG`.
///
/// Returns `true` if `RECKON_DEBUG` is set to "true", "1", or "yes" (case-insensitive).
#[inline]
pub fn is_debug_enabled() -> bool {
    env::var("RECKON_DEBUG")
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

/// Get the configured log level from `RECKON_LOG_LEVEL`.
///
/// Defaults to "debug" if `RECKON_DEBUG` is enabled, otherwise "warn".
pub fn get_log_level() -> &'static str {
    let fallback = if is_debug_enabled() { "debug" } else { "warn" };
    match env::var("RECKON_LOG_LEVEL") {
        Ok(level) => match level.to_lowercase().as_str() {
            "trace" => "trace",
            "debug" => "debug",
            "info" => "info",
            "warn" => "warn",
            "error" => "error",
            _ => fallback,
        },
        Err(_) => fallback,
    }
}

/// Get the configured log format from `RECKON_LOG_FORMAT`.
///
/// Defaults to "json".
pub fn get_log_format() -> &'static str {
    env::var("RECKON_LOG_FORMAT")
        .map(|f| match f.to_lowercase().as_str() {
            "pretty" => "pretty",
            "compact" => "compact",
            _ => "json",
        })
        .unwrap_or("json")
}

/// Initialize the reckon logging system.
///
/// Subsequent calls are no-ops. Without `RECKON_DEBUG` or `RECKON_LOG_LEVEL`
/// nothing is installed, leaving room for the host application's subscriber.
pub fn init() {
    INIT.call_once(|| {
        if !is_debug_enabled() && env::var("RECKON_LOG_LEVEL").is_err() {
            return;
        }

        #[cfg(feature = "tracing-subscriber")]
        {
            use tracing_subscriber::{EnvFilter, fmt, prelude::*};

            let level = get_log_level();
            let filter = EnvFilter::try_new(format!("reckon={},reckon_query={}", level, level))
                .unwrap_or_else(|_| EnvFilter::new("warn"));

            let installed = match get_log_format() {
                "json" => tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().json())
                    .try_init(),
                "compact" => tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().compact())
                    .try_init(),
                _ => tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().pretty())
                    .try_init(),
            };

            if installed.is_ok() {
                tracing::info!(level = level, format = get_log_format(), "reckon logging initialized");
            }
        }
    });
}

/// Log at debug level only when `RECKON_DEBUG` is enabled.
#[macro_export]
macro_rules! reckon_debug {
    ($($arg:tt)*) => {
        if $crate::logging::is_debug_enabled() {
            tracing::debug!($($arg)*);
        }
    };
}

/// Log at trace level only when `RECKON_DEBUG` is enabled.
#[macro_export]
macro_rules! reckon_trace {
    ($($arg:tt)*) => {
        if $crate::logging::is_debug_enabled() {
            tracing::trace!($($arg)*);
        }
    };
}
