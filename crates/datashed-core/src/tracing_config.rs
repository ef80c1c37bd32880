//! Tracing conventions for datashed.
//!
//! Defines the target names and structured field names used by every span
//! and event in the engine, so consumers can filter and query logs
//! consistently. Subscriber setup itself lives in the facade crate
//! (`datashed::init_tracing`); this module is just the naming contract.

use tracing::Level;

/// Target prefix used by all datashed tracing spans and events.
///
/// Consumers can use this to filter datashed logs:
/// ```text
/// DATASHED_LOG=datashed=debug
/// ```
pub const TARGET_PREFIX: &str = "datashed";

/// Standard event targets used across the engine.
///
/// These constants keep target naming consistent so consumers can match on
/// them in subscribers and tests.
pub mod targets {
    /// SQLite store operations (schema, upserts, deletes).
    pub const STORAGE: &str = "datashed::storage";
    /// Query execution and cache behavior.
    pub const SEARCH: &str = "datashed::search";
    /// Autocomplete candidate ranking.
    pub const SUGGEST: &str = "datashed::suggest";
    /// Background index passes.
    pub const INDEXER: &str = "datashed::indexer";
    /// Sync coordinator decisions.
    pub const SYNC: &str = "datashed::sync";
    /// Git subprocess invocations.
    pub const GIT: &str = "datashed::git";
    /// Configuration loading.
    pub const CONFIG: &str = "datashed::config";
    /// Engine lifecycle (startup, shutdown).
    pub const ENGINE: &str = "datashed::engine";
}

/// Standard structured field names used in tracing events.
pub mod field_names {
    pub const OP: &str = "op";
    pub const PATH: &str = "path";
    pub const BRANCH: &str = "branch";
    pub const REMOTE: &str = "remote";
    pub const PASS: &str = "pass";
    pub const ITEM_COUNT: &str = "item_count";
    pub const RESULT_COUNT: &str = "result_count";
    pub const DURATION_US: &str = "duration_us";
    pub const EXIT_CODE: &str = "exit_code";
    pub const COMMIT: &str = "commit";
}

/// Parse a log level string (case-insensitive).
///
/// Recognized values: `trace`, `debug`, `info`, `warn`, `error`.
/// Returns `None` for unrecognized strings.
#[must_use]
pub fn parse_level(s: &str) -> Option<Level> {
    match s.to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

/// Returns the `tracing::Level` for the given environment.
///
/// Checks `DATASHED_LOG` first (when it holds a bare level rather than a
/// filter expression), then falls back to the provided default.
#[must_use]
pub fn level_from_env(default: Level) -> Level {
    std::env::var("DATASHED_LOG")
        .ok()
        .and_then(|s| parse_level(&s))
        .unwrap_or(default)
}
