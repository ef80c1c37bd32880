//! Git-backed catalog synchronization.
//!
//! Two layers: [`git`] wraps the `git` binary as an async subprocess
//! client behind the [`GitClient`] trait, and [`coordinator`] drives the
//! safe-pull state machine on top of it. Only the trait crosses the
//! boundary, so every pull scenario is testable without a repository.

#![allow(
    clippy::missing_const_for_fn,
    clippy::missing_errors_doc,
    clippy::uninlined_format_args
)]

pub mod coordinator;
pub mod git;

pub use coordinator::{PullOutcome, PullReport, PullRequest, SyncCoordinator};
pub use git::{GitClient, SharedGitClient, SubprocessGit};
