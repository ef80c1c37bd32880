/// Unified error type covering all failure modes across the datashed catalog engine.
///
/// Every variant includes an actionable error message guiding the consumer toward
/// resolution. Completeness-only failures degrade in place: `QuerySyntax` is caught
/// by the query engine and becomes an empty result, `PartialIndex` marks a single
/// entry that was indexed from listing data alone. Integrity failures (`Diverged`,
/// `GitCommand`, `GitTimeout`, `Storage`) always abort the operation that hit them.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    // === Storage errors ===
    /// A SQLite operation failed.
    #[error(
        "storage operation '{op}' failed: {source}. The index is a rebuildable cache; delete the database file to force a rebuild."
    )]
    Storage {
        /// Which store operation was running.
        op: &'static str,
        /// The underlying database error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The on-disk schema was written by a newer build of this engine.
    #[error(
        "catalog database schema is v{found}, but this build supports up to v{supported}. Upgrade the application or delete the database file."
    )]
    SchemaTooNew {
        /// Version recorded in the database.
        found: i64,
        /// Highest version this build understands.
        supported: i64,
    },

    // === I/O errors ===
    /// Wraps `std::io::Error` for file and subprocess-spawn operations.
    #[error("I/O error: {0}. Check file permissions and disk space.")]
    Io(#[from] std::io::Error),

    // === Configuration errors ===
    /// A configuration value is invalid.
    #[error("invalid config: {field} = \"{value}\" — {reason}")]
    InvalidConfig {
        /// Which config field.
        field: String,
        /// The invalid value.
        value: String,
        /// Why it is invalid.
        reason: String,
    },

    // === Search errors ===
    /// The full-text engine rejected the query expression.
    ///
    /// The query engine catches this variant and returns an empty result set;
    /// it never reaches interactive callers.
    #[error("full-text query \"{query}\" could not be parsed: {detail}")]
    QuerySyntax {
        /// The expression handed to the full-text engine.
        query: String,
        /// What the engine reported.
        detail: String,
    },

    // === Network errors ===
    /// A network-dependent operation failed before producing a result.
    ///
    /// Never retried inside the engine; the caller owns retry/backoff policy.
    #[error("network operation '{operation}' failed: {detail}. Check connectivity and retry.")]
    TransientNetwork {
        /// Which operation was running (e.g. "fetch", "descriptor download").
        operation: String,
        /// What went wrong.
        detail: String,
    },

    // === Git subprocess errors ===
    /// The git binary exited non-zero.
    #[error("git command `{command}` exited with status {exit_code}: {stderr}")]
    GitCommand {
        /// The full command line that was run.
        command: String,
        /// Exit status reported by the process.
        exit_code: i32,
        /// Captured standard error, trimmed.
        stderr: String,
    },

    /// The git binary did not finish within its time budget.
    #[error(
        "git command `{command}` timed out after {timeout_secs}s. Check connectivity to the remote and retry."
    )]
    GitTimeout {
        /// The full command line that was run.
        command: String,
        /// The budget that was exceeded.
        timeout_secs: u64,
    },

    // === Sync errors ===
    /// Local and target branches both have commits the other lacks.
    #[error(
        "local branch has diverged from {target} ({ahead} ahead, {behind} behind). Resolve manually with merge or rebase, then pull again."
    )]
    Diverged {
        /// The ref the pull targeted.
        target: String,
        /// Commits only the local branch has.
        ahead: u64,
        /// Commits only the target has.
        behind: u64,
    },

    /// The working tree has uncommitted changes and auto-stash is disabled.
    #[error(
        "working tree has uncommitted changes. Commit or stash them, or enable auto-stash, then pull again."
    )]
    DirtyWorkingTree,

    /// A stash taken before the pull could not be restored afterward.
    ///
    /// Attached to an otherwise-successful pull as a warning; the merge that
    /// already landed is never rolled back for this.
    #[error(
        "stashed local changes could not be restored: {detail}. Run `git stash pop` manually to recover them."
    )]
    StashConflict {
        /// What the pop reported.
        detail: String,
    },

    /// Another pull is already running against this working tree.
    #[error("a pull is already in progress for this working tree. Wait for it to finish.")]
    PullInProgress,

    // === Indexing errors ===
    /// One catalog entry's descriptor could not be fetched or parsed.
    ///
    /// The entry is still indexed from listing data (path, name, size, mtime)
    /// and the pass continues.
    #[error(
        "descriptor for '{path}' could not be read: {detail}. The entry was indexed from listing data only."
    )]
    PartialIndex {
        /// Catalog path of the affected entry.
        path: String,
        /// Why the descriptor was unusable.
        detail: String,
    },
}

/// Convenience alias used throughout the datashed crate hierarchy.
pub type CatalogResult<T> = Result<T, CatalogError>;
