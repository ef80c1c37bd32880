//! Configuration for the catalog engine.
//!
//! [`EngineConfig`] contains all tuning knobs for indexing, search, and git
//! sync. All fields have sensible defaults; override selectively via a TOML
//! file or environment variables.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, CatalogResult};

/// Configuration for the catalog engine.
///
/// # Environment Variable Overrides
///
/// | Variable                       | Field                | Default          |
/// |--------------------------------|----------------------|------------------|
/// | `DATASHED_DB_PATH`             | `db_path`            | `.datashed/index.db` |
/// | `DATASHED_BRANCH`              | `branch`             | `main`           |
/// | `DATASHED_REMOTE`              | `remote_name`        | `origin`         |
/// | `DATASHED_SYNC_INTERVAL_SECS`  | `sync_interval_secs` | `900`            |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Path of the SQLite index database.
    /// Default: `.datashed/index.db`.
    pub db_path: PathBuf,

    /// Root of the catalog checkout to index and sync.
    /// Default: `.` (current directory).
    pub catalog_root: PathBuf,

    /// Descriptor file name looked up inside each dataset directory.
    /// Default: `dataset.yaml`.
    pub descriptor_filename: String,

    /// Git remote pulled from. Default: `origin`.
    pub remote_name: String,

    /// Branch tracked by sync. Default: `main`.
    pub branch: String,

    /// Stash local modifications before pulling. Default: true.
    pub auto_stash: bool,

    /// Allow non-fast-forward merges when pulling. Default: false
    /// (fast-forward only).
    pub allow_merge: bool,

    /// Repository path prefixes whose changes trigger a reindex after a
    /// pull. Default: `["datasets/"]`.
    pub catalog_paths: Vec<String>,

    /// Seconds between periodic background index passes. Default: 900.
    pub sync_interval_secs: u64,

    /// A full rebuild replaces the incremental pass once the last full
    /// index is older than this many days. Default: 7.
    pub full_index_max_age_days: i64,

    /// Timeout for each git subprocess invocation. Default: 30.
    pub git_timeout_secs: u64,

    /// Timeout for the cheap remote reachability probe. Default: 2.
    pub probe_timeout_secs: u64,

    /// First-page query cache time-to-live. Default: 60.
    pub query_cache_ttl_secs: u64,

    /// Keystroke debounce window before a search fires. Default: 180.
    pub search_debounce_ms: u64,

    /// Maximum autocomplete suggestions returned. Default: 8.
    pub suggestion_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(".datashed/index.db"),
            catalog_root: PathBuf::from("."),
            descriptor_filename: "dataset.yaml".to_owned(),
            remote_name: "origin".to_owned(),
            branch: "main".to_owned(),
            auto_stash: true,
            allow_merge: false,
            catalog_paths: vec!["datasets/".to_owned()],
            sync_interval_secs: 900,
            full_index_max_age_days: 7,
            git_timeout_secs: 30,
            probe_timeout_secs: 2,
            query_cache_ttl_secs: 60,
            search_debounce_ms: 180,
            suggestion_limit: 8,
        }
    }
}

impl EngineConfig {
    /// Loads configuration from a TOML file.
    ///
    /// Falls back to `Default::default()` if the file does not exist or
    /// cannot be parsed. The TOML file uses flat keys matching the field
    /// names of `EngineConfig`; missing keys keep their defaults.
    #[must_use]
    pub fn from_file(path: &Path) -> Self {
        std::fs::read_to_string(path).map_or_else(
            |_| Self::default(),
            |contents| match toml::from_str::<Self>(&contents) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!(
                        target: "datashed::config",
                        path = %path.display(),
                        error = %e,
                        "failed to parse config file, using defaults"
                    );
                    Self::default()
                }
            },
        )
    }

    /// Load overrides from environment variables.
    ///
    /// Only overrides fields for which environment variables are set.
    /// Invalid values are silently ignored (current values are kept).
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("DATASHED_DB_PATH")
            && !val.is_empty()
        {
            self.db_path = PathBuf::from(val);
        }
        if let Ok(val) = std::env::var("DATASHED_BRANCH")
            && !val.is_empty()
        {
            self.branch = val;
        }
        if let Ok(val) = std::env::var("DATASHED_REMOTE")
            && !val.is_empty()
        {
            self.remote_name = val;
        }
        if let Ok(val) = std::env::var("DATASHED_SYNC_INTERVAL_SECS")
            && let Ok(secs) = val.parse::<u64>()
            && secs > 0
        {
            self.sync_interval_secs = secs;
        }
        self
    }

    /// Validates invariants the rest of the engine relies on.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::InvalidConfig` naming the offending field.
    pub fn validate(&self) -> CatalogResult<()> {
        if self.branch.trim().is_empty() {
            return Err(invalid("branch", &self.branch, "must not be empty"));
        }
        if self.remote_name.trim().is_empty() {
            return Err(invalid("remote_name", &self.remote_name, "must not be empty"));
        }
        if self.descriptor_filename.trim().is_empty() || self.descriptor_filename.contains('/') {
            return Err(invalid(
                "descriptor_filename",
                &self.descriptor_filename,
                "must be a bare file name",
            ));
        }
        if self.sync_interval_secs == 0 {
            return Err(invalid("sync_interval_secs", "0", "must be positive"));
        }
        if self.git_timeout_secs == 0 {
            return Err(invalid("git_timeout_secs", "0", "must be positive"));
        }
        if self.full_index_max_age_days <= 0 {
            return Err(invalid(
                "full_index_max_age_days",
                &self.full_index_max_age_days.to_string(),
                "must be positive",
            ));
        }
        Ok(())
    }
}

fn invalid(field: &str, value: &str, reason: &str) -> CatalogError {
    CatalogError::InvalidConfig {
        field: field.to_owned(),
        value: value.to_owned(),
        reason: reason.to_owned(),
    }
}
