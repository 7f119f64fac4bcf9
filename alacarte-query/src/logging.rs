//! Logging setup for alacarte.
//!
//! The crate itself only emits `tracing` events: SQL and relation loading at
//! `debug`, row counts at `trace`, schema definition conflicts at `warn`.
//! Applications that do not install their own subscriber can call [`init`]
//! (requires the `tracing-subscriber` feature), which is driven by:
//!
//! - `ALACARTE_DEBUG=true|1|yes` - enable debug logging
//! - `ALACARTE_LOG_LEVEL=trace|debug|info|warn|error` - set the level explicitly
//! - `ALACARTE_LOG_FORMAT=json|pretty|compact` - output format (default: json)
//!
//! ```rust,no_run
//! use alacarte_query::logging;
//!
//! // Call once at startup.
//! logging::init();
//! ```

use std::env;
use std::sync::Once;

static INIT: Once = Once::new();

const DEBUG_VAR: &str = "ALACARTE_DEBUG";
const LEVEL_VAR: &str = "ALACARTE_LOG_LEVEL";
const FORMAT_VAR: &str = "ALACARTE_LOG_FORMAT";

/// Output format of the built-in subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per event.
    #[default]
    Json,
    /// Multi-line human readable output.
    Pretty,
    /// Single-line human readable output.
    Compact,
}

impl LogFormat {
    /// Parse a format name; unknown names fall back to JSON.
    pub fn parse(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "pretty" => Self::Pretty,
            "compact" => Self::Compact,
            _ => Self::Json,
        }
    }

    /// The format name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Pretty => "pretty",
            Self::Compact => "compact",
        }
    }
}

/// Logging settings resolved from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Whether `ALACARTE_DEBUG` is set.
    pub debug: bool,
    /// The effective level.
    pub level: &'static str,
    /// The output format.
    pub format: LogFormat,
    /// Whether anything asked for logging at all.
    pub requested: bool,
}

impl LogConfig {
    /// Resolve settings from raw variable values.
    pub fn resolve(debug: Option<&str>, level: Option<&str>, format: Option<&str>) -> Self {
        let debug = debug.is_some_and(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"));
        let requested = debug || level.is_some();
        let fallback = if debug { "debug" } else { "warn" };
        let level = match level.map(str::to_lowercase).as_deref() {
            Some("trace") => "trace",
            Some("debug") => "debug",
            Some("info") => "info",
            Some("warn") => "warn",
            Some("error") => "error",
            _ => fallback,
        };

        Self {
            debug,
            level,
            format: format.map(LogFormat::parse).unwrap_or_default(),
            requested,
        }
    }

    /// Resolve settings from the process environment.
    pub fn from_env() -> Self {
        let debug = env::var(DEBUG_VAR).ok();
        let level = env::var(LEVEL_VAR).ok();
        let format = env::var(FORMAT_VAR).ok();
        Self::resolve(debug.as_deref(), level.as_deref(), format.as_deref())
    }

    /// Filter directive covering the alacarte crates.
    pub fn directive(&self) -> String {
        format!(
            "alacarte={level},alacarte_query={level},alacarte_sqlite={level}",
            level = self.level
        )
    }
}

/// Check if debug logging is enabled via `ALACARTE_DEBUG`.
#[inline]
pub fn is_debug_enabled() -> bool {
    LogConfig::from_env().debug
}

/// Install the global subscriber described by the environment.
///
/// Does nothing unless `ALACARTE_DEBUG` or `ALACARTE_LOG_LEVEL` is set, and
/// nothing on subsequent calls.
pub fn init() {
    INIT.call_once(|| {
        let config = LogConfig::from_env();
        if !config.requested {
            return;
        }

        #[cfg(feature = "tracing-subscriber")]
        {
            use tracing_subscriber::{EnvFilter, fmt, prelude::*};

            let filter =
                EnvFilter::try_new(config.directive()).unwrap_or_else(|_| EnvFilter::new("warn"));
            let registry = tracing_subscriber::registry().with(filter);

            // Another subscriber may already be installed by the application.
            let installed = match config.format {
                LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
                LogFormat::Compact => registry.with(fmt::layer().compact()).try_init(),
                LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init(),
            };

            if installed.is_ok() {
                tracing::info!(
                    level = config.level,
                    format = config.format.as_str(),
                    "alacarte logging initialized"
                );
            }
        }

        #[cfg(not(feature = "tracing-subscriber"))]
        let _ = config;
    });
}

/// Initialize logging with a specific level.
///
/// # Safety
///
/// This function modifies environment variables, which is unsafe in
/// multi-threaded programs. Call this early in your program before
/// spawning threads.
pub fn init_with_level(level: &str) {
    // SAFETY: called at program startup before threads are spawned.
    unsafe {
        env::set_var(LEVEL_VAR, level);
    }
    init();
}

/// Initialize debug logging; same as `ALACARTE_DEBUG=true` plus [`init`].
///
/// # Safety
///
/// See [`init_with_level`].
pub fn init_debug() {
    // SAFETY: called at program startup before threads are spawned.
    unsafe {
        env::set_var(DEBUG_VAR, "true");
    }
    init();
}
