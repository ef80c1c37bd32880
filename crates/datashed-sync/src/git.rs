//! Typed wrapper around the git binary.
//!
//! [`GitClient`] is the narrow seam between pull orchestration and the
//! version-control system: every operation the coordinator needs is a
//! method returning typed results, so tests can script a fake repository
//! without a git binary on the machine. [`SubprocessGit`] is the real
//! implementation, shelling out with a hard timeout per invocation.
//!
//! Exit-code conventions worth knowing: `git stash push` reports "nothing
//! to stash" with a zero exit and a message, while `git stash pop` reports
//! an empty stash with a non-zero exit. Both cases are surfaced as
//! `Ok(false)` rather than errors, because "there was nothing to do" is an
//! answer, not a failure.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use datashed_core::traits::CatalogFuture;
use datashed_core::{CatalogError, CatalogResult};
use tokio::process::Command;

// ─── Client trait ───────────────────────────────────────────────────────────

/// Operations the pull coordinator needs from a git working tree.
///
/// All refs are passed fully qualified (`origin/main`, commit ids); the
/// client never guesses a remote or branch on its own.
pub trait GitClient: Send + Sync {
    /// Cheap reachability check against a remote, with a short timeout.
    fn probe_remote<'a>(&'a self, remote: &'a str) -> CatalogFuture<'a, ()>;

    /// Fetches (and prunes) a remote.
    fn fetch<'a>(&'a self, remote: &'a str) -> CatalogFuture<'a, ()>;

    /// Name of the currently checked-out branch.
    fn current_branch(&self) -> CatalogFuture<'_, String>;

    /// Commit id of `HEAD`.
    fn head_commit(&self) -> CatalogFuture<'_, String>;

    /// Whether the working tree has uncommitted changes (staged, unstaged,
    /// or untracked).
    fn is_dirty(&self) -> CatalogFuture<'_, bool>;

    /// Commits on `HEAD` that `target` lacks.
    fn commits_ahead<'a>(&'a self, target: &'a str) -> CatalogFuture<'a, u64>;

    /// Commits on `target` that `HEAD` lacks.
    fn commits_behind<'a>(&'a self, target: &'a str) -> CatalogFuture<'a, u64>;

    /// Stashes local changes, untracked files included. Returns `false`
    /// when there was nothing to stash.
    fn stash_push<'a>(&'a self, message: &'a str) -> CatalogFuture<'a, bool>;

    /// Pops the most recent stash entry. Returns `false` when the stash
    /// is empty; a pop that conflicts is a [`CatalogError::StashConflict`].
    fn stash_pop(&self) -> CatalogFuture<'_, bool>;

    /// Merges `target` only if `HEAD` can fast-forward to it.
    fn merge_ff_only<'a>(&'a self, target: &'a str) -> CatalogFuture<'a, ()>;

    /// Merges `target`, creating a merge commit when necessary.
    fn merge_allow_commit<'a>(&'a self, target: &'a str) -> CatalogFuture<'a, ()>;

    /// Paths touched between two commits.
    fn changed_files<'a>(&'a self, from: &'a str, to: &'a str)
    -> CatalogFuture<'a, Vec<String>>;
}

/// Shared handle used wherever a component holds a git dependency.
pub type SharedGitClient = Arc<dyn GitClient>;

// ─── Subprocess implementation ──────────────────────────────────────────────

/// Captured output of one git invocation.
#[derive(Debug)]
struct GitOutput {
    exit_code: i32,
    stdout: String,
    stderr: String,
}

impl GitOutput {
    fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Combined output for message sniffing; git is inconsistent about
    /// which stream stash notices land on.
    fn combined(&self) -> String {
        format!("{}\n{}", self.stdout, self.stderr)
    }

    fn into_error(self, command: String) -> CatalogError {
        CatalogError::GitCommand {
            command,
            exit_code: self.exit_code,
            stderr: self.stderr.trim().to_owned(),
        }
    }
}

/// [`GitClient`] that shells out to the `git` binary.
#[derive(Debug, Clone)]
pub struct SubprocessGit {
    workdir: PathBuf,
    command_timeout: Duration,
    probe_timeout: Duration,
}

impl SubprocessGit {
    /// Default budgets: 30s per command, 2s for the reachability probe.
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self::with_timeouts(workdir, 30, 2)
    }

    pub fn with_timeouts(
        workdir: impl Into<PathBuf>,
        command_timeout_secs: u64,
        probe_timeout_secs: u64,
    ) -> Self {
        Self {
            workdir: workdir.into(),
            command_timeout: Duration::from_secs(command_timeout_secs),
            probe_timeout: Duration::from_secs(probe_timeout_secs),
        }
    }

    async fn run(&self, args: &[&str], budget: Duration) -> CatalogResult<GitOutput> {
        let rendered = render_command(args);
        let mut cmd = Command::new("git");
        cmd.args(args)
            .current_dir(&self.workdir)
            // Never hang on a credential or host-key prompt.
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let started = Instant::now();
        match tokio::time::timeout(budget, cmd.output()).await {
            Ok(Ok(output)) => {
                let result = GitOutput {
                    exit_code: output.status.code().unwrap_or(-1),
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                };
                tracing::trace!(
                    target: "datashed::git",
                    command = %rendered,
                    exit_code = result.exit_code,
                    duration_us = u64::try_from(started.elapsed().as_micros())
                        .unwrap_or(u64::MAX),
                    "git command finished"
                );
                Ok(result)
            }
            Ok(Err(err)) => Err(CatalogError::Io(err)),
            Err(_) => Err(CatalogError::GitTimeout {
                command: rendered,
                timeout_secs: budget.as_secs(),
            }),
        }
    }

    /// Runs a command and requires a zero exit, returning stdout.
    async fn run_checked(&self, args: &[&str]) -> CatalogResult<String> {
        let output = self.run(args, self.command_timeout).await?;
        if output.success() {
            Ok(output.stdout)
        } else {
            Err(output.into_error(render_command(args)))
        }
    }
}

impl GitClient for SubprocessGit {
    fn probe_remote<'a>(&'a self, remote: &'a str) -> CatalogFuture<'a, ()> {
        Box::pin(async move {
            let args = ["ls-remote", "--heads", remote];
            match self.run(&args, self.probe_timeout).await {
                Ok(output) if output.success() => Ok(()),
                Ok(output) => Err(CatalogError::TransientNetwork {
                    operation: format!("probe {remote}"),
                    detail: output.stderr.trim().to_owned(),
                }),
                Err(CatalogError::GitTimeout { timeout_secs, .. }) => {
                    Err(CatalogError::TransientNetwork {
                        operation: format!("probe {remote}"),
                        detail: format!("no answer within {timeout_secs}s"),
                    })
                }
                Err(other) => Err(other),
            }
        })
    }

    fn fetch<'a>(&'a self, remote: &'a str) -> CatalogFuture<'a, ()> {
        Box::pin(async move {
            self.run_checked(&["fetch", "--prune", remote]).await?;
            tracing::debug!(target: "datashed::git", remote = %remote, "fetched remote");
            Ok(())
        })
    }

    fn current_branch(&self) -> CatalogFuture<'_, String> {
        Box::pin(async move {
            let out = self
                .run_checked(&["rev-parse", "--abbrev-ref", "HEAD"])
                .await?;
            Ok(out.trim().to_owned())
        })
    }

    fn head_commit(&self) -> CatalogFuture<'_, String> {
        Box::pin(async move {
            let out = self.run_checked(&["rev-parse", "HEAD"]).await?;
            Ok(out.trim().to_owned())
        })
    }

    fn is_dirty(&self) -> CatalogFuture<'_, bool> {
        Box::pin(async move {
            let out = self.run_checked(&["status", "--porcelain"]).await?;
            Ok(!out.trim().is_empty())
        })
    }

    fn commits_ahead<'a>(&'a self, target: &'a str) -> CatalogFuture<'a, u64> {
        Box::pin(async move {
            let range = format!("{target}..HEAD");
            let args = ["rev-list", "--count", range.as_str()];
            let out = self.run_checked(&args).await?;
            parse_count(&out).ok_or_else(|| malformed_output(&args, &out))
        })
    }

    fn commits_behind<'a>(&'a self, target: &'a str) -> CatalogFuture<'a, u64> {
        Box::pin(async move {
            let range = format!("HEAD..{target}");
            let args = ["rev-list", "--count", range.as_str()];
            let out = self.run_checked(&args).await?;
            parse_count(&out).ok_or_else(|| malformed_output(&args, &out))
        })
    }

    fn stash_push<'a>(&'a self, message: &'a str) -> CatalogFuture<'a, bool> {
        Box::pin(async move {
            let args = ["stash", "push", "--include-untracked", "-m", message];
            let output = self.run(&args, self.command_timeout).await?;
            if !output.success() {
                return Err(output.into_error(render_command(&args)));
            }
            let stashed = !nothing_to_stash(&output.combined());
            tracing::debug!(target: "datashed::git", stashed, "stash push");
            Ok(stashed)
        })
    }

    fn stash_pop(&self) -> CatalogFuture<'_, bool> {
        Box::pin(async move {
            let args = ["stash", "pop"];
            let output = self.run(&args, self.command_timeout).await?;
            if output.success() {
                tracing::debug!(target: "datashed::git", "stash pop");
                return Ok(true);
            }
            let combined = output.combined();
            if no_stash_entries(&combined) {
                return Ok(false);
            }
            if is_stash_conflict(&combined) {
                return Err(CatalogError::StashConflict {
                    detail: output.stderr.trim().to_owned(),
                });
            }
            Err(output.into_error(render_command(&args)))
        })
    }

    fn merge_ff_only<'a>(&'a self, target: &'a str) -> CatalogFuture<'a, ()> {
        Box::pin(async move {
            self.run_checked(&["merge", "--ff-only", target]).await?;
            tracing::debug!(target: "datashed::git", merge_target = %target, "fast-forwarded");
            Ok(())
        })
    }

    fn merge_allow_commit<'a>(&'a self, target: &'a str) -> CatalogFuture<'a, ()> {
        Box::pin(async move {
            self.run_checked(&["merge", "--no-edit", target]).await?;
            tracing::debug!(target: "datashed::git", merge_target = %target, "merged");
            Ok(())
        })
    }

    fn changed_files<'a>(
        &'a self,
        from: &'a str,
        to: &'a str,
    ) -> CatalogFuture<'a, Vec<String>> {
        Box::pin(async move {
            let range = format!("{from}..{to}");
            let out = self
                .run_checked(&["diff", "--name-only", range.as_str()])
                .await?;
            Ok(parse_file_list(&out))
        })
    }
}

// ─── Output parsing ─────────────────────────────────────────────────────────

fn render_command(args: &[&str]) -> String {
    let mut out = String::from("git");
    for arg in args {
        out.push(' ');
        out.push_str(arg);
    }
    out
}

fn parse_count(output: &str) -> Option<u64> {
    output.trim().parse().ok()
}

/// `git stash push` exits zero when there is nothing to stash; the message
/// is the only signal.
fn nothing_to_stash(output: &str) -> bool {
    output.contains("No local changes to save")
}

fn no_stash_entries(output: &str) -> bool {
    output.contains("No stash entries found")
}

fn is_stash_conflict(output: &str) -> bool {
    output.contains("CONFLICT") || output.contains("could not restore untracked files")
}

fn parse_file_list(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect()
}

fn malformed_output(args: &[&str], output: &str) -> CatalogError {
    CatalogError::GitCommand {
        command: render_command(args),
        exit_code: 0,
        stderr: format!("unexpected output: {:?}", output.trim()),
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
