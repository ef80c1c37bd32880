//! Safe-pull orchestration over a git working tree.
//!
//! [`SyncCoordinator::pull`] drives a fixed sequence that never reorders:
//! check the tree for local changes (stash or refuse), check for true
//! divergence before any network traffic, fetch, stop early when already
//! up to date, merge, restore the stash, and finally queue a catalog
//! reindex when the pulled range touched catalog paths.
//!
//! The failure policy is deliberately asymmetric around the merge: any
//! problem before it aborts the pull and puts the tree back the way it
//! was found, while a stash-pop failure after it is only a warning,
//! because a merge that already landed is never rolled back.

use std::sync::Arc;

use datashed_core::traits::ReindexSignal;
use datashed_core::{CatalogError, CatalogResult};
use tokio::sync::Mutex;

use crate::git::SharedGitClient;

const STASH_MESSAGE: &str = "datashed: auto-stash before pull";

// ─── Request and report types ───────────────────────────────────────────────

/// Parameters for one pull attempt.
#[derive(Debug, Clone)]
pub struct PullRequest {
    /// Branch being pulled; the counts and merge target are
    /// `<from_remote>/<branch>`.
    pub branch: String,
    /// Remote to fetch from.
    pub from_remote: String,
    /// Permit a merge commit when the local branch has its own commits.
    /// Off by default; the default mode is fast-forward only.
    pub allow_merge: bool,
    /// Stash uncommitted changes instead of refusing to pull over them.
    pub auto_stash: bool,
}

impl PullRequest {
    pub fn new(branch: impl Into<String>, from_remote: impl Into<String>) -> Self {
        Self {
            branch: branch.into(),
            from_remote: from_remote.into(),
            allow_merge: false,
            auto_stash: true,
        }
    }

    #[must_use]
    pub fn allow_merge(mut self, allow: bool) -> Self {
        self.allow_merge = allow;
        self
    }

    #[must_use]
    pub fn auto_stash(mut self, auto: bool) -> Self {
        self.auto_stash = auto;
        self
    }
}

/// Terminal state of a pull attempt.
///
/// These are outcomes, not transport errors: an infrastructure failure
/// (git missing, timeout mid-flight) surfaces as `Err` from
/// [`SyncCoordinator::pull`] instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullOutcome {
    /// Nothing to pull; the tree was left untouched.
    UpToDate,
    /// The merge landed.
    Pulled { commits: u64, reindex_queued: bool },
    /// Uncommitted changes present and auto-stash disabled.
    DirtyWorkingTree,
    /// Local and target both have commits the other lacks.
    Diverged { ahead: u64, behind: u64 },
    /// The merge step itself failed; rendered error text.
    MergeFailed { error: String },
}

/// Everything a caller needs to present a pull result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullReport {
    pub outcome: PullOutcome,
    /// The ref the pull targeted, e.g. `origin/main`.
    pub target: String,
    /// `HEAD` before the pull.
    pub old_commit: Option<String>,
    /// `HEAD` after a successful pull; `None` on failure outcomes.
    pub new_commit: Option<String>,
    /// Set when stashed changes could not be restored afterward.
    pub stash_warning: Option<String>,
}

impl PullReport {
    fn failed(outcome: PullOutcome, target: String, old_commit: String) -> Self {
        Self {
            outcome,
            target,
            old_commit: Some(old_commit),
            new_commit: None,
            stash_warning: None,
        }
    }

    /// Whether the pull reached a successful terminal state.
    #[must_use]
    pub fn success(&self) -> bool {
        matches!(
            self.outcome,
            PullOutcome::UpToDate | PullOutcome::Pulled { .. }
        )
    }

    /// Human-readable summary, including the stash warning when present.
    #[must_use]
    pub fn message(&self) -> String {
        let base = match &self.outcome {
            PullOutcome::UpToDate => format!("Already up to date with {}.", self.target),
            PullOutcome::Pulled {
                commits,
                reindex_queued,
            } => {
                let noun = if *commits == 1 { "commit" } else { "commits" };
                let mut msg = format!("Pulled {commits} {noun} from {}.", self.target);
                if *reindex_queued {
                    msg.push_str(" Catalog reindex queued.");
                }
                msg
            }
            PullOutcome::DirtyWorkingTree => CatalogError::DirtyWorkingTree.to_string(),
            PullOutcome::Diverged { ahead, behind } => CatalogError::Diverged {
                target: self.target.clone(),
                ahead: *ahead,
                behind: *behind,
            }
            .to_string(),
            PullOutcome::MergeFailed { error } => error.clone(),
        };
        match &self.stash_warning {
            Some(warning) => format!("{base} Warning: {warning}"),
            None => base,
        }
    }
}

// ─── Coordinator ────────────────────────────────────────────────────────────

/// Runs the pull state machine against one working tree.
///
/// Single-flight: a second `pull` while one is running fails fast with
/// [`CatalogError::PullInProgress`] instead of queueing behind it.
pub struct SyncCoordinator {
    git: SharedGitClient,
    catalog_paths: Vec<String>,
    reindex: Arc<dyn ReindexSignal>,
    in_flight: Mutex<()>,
}

impl SyncCoordinator {
    pub fn new(
        git: SharedGitClient,
        catalog_paths: Vec<String>,
        reindex: Arc<dyn ReindexSignal>,
    ) -> Self {
        Self {
            git,
            catalog_paths,
            reindex,
            in_flight: Mutex::new(()),
        }
    }

    /// Executes one pull attempt end to end.
    ///
    /// Terminal states, including failures like divergence, come back as
    /// `Ok(report)`; only infrastructure problems (subprocess spawn,
    /// timeout, concurrent pull) are `Err`. If an infrastructure error
    /// interrupts a pull after changes were stashed, restoring them is
    /// attempted before the error propagates.
    pub async fn pull(&self, request: &PullRequest) -> CatalogResult<PullReport> {
        let _guard = self
            .in_flight
            .try_lock()
            .map_err(|_| CatalogError::PullInProgress)?;

        let mut stash_active = false;
        let result = self.drive(request, &mut stash_active).await;
        if stash_active {
            if let Some(warning) = self.restore_stash(&mut stash_active).await {
                tracing::warn!(
                    target: "datashed::sync",
                    warning = %warning,
                    "stash restore after aborted pull failed"
                );
            }
        }
        result
    }

    async fn drive(
        &self,
        request: &PullRequest,
        stash_active: &mut bool,
    ) -> CatalogResult<PullReport> {
        let target = format!("{}/{}", request.from_remote, request.branch);
        let old_commit = self.git.head_commit().await?;
        tracing::info!(
            target: "datashed::sync",
            op = "pull",
            branch = %request.branch,
            remote = %request.from_remote,
            commit = %old_commit,
            "pull started"
        );

        // Step 1: local changes are either stashed or a hard stop.
        if self.git.is_dirty().await? {
            if !request.auto_stash {
                return Ok(PullReport::failed(
                    PullOutcome::DirtyWorkingTree,
                    target,
                    old_commit,
                ));
            }
            *stash_active = self.git.stash_push(STASH_MESSAGE).await?;
        }

        // Step 2: divergence is checked against the last-known remote
        // state, before any fetch, so a diverged tree never causes
        // network traffic or an automatic merge.
        let ahead = self.git.commits_ahead(&target).await?;
        let behind = self.git.commits_behind(&target).await?;
        if ahead > 0 && behind > 0 && !request.allow_merge {
            let stash_warning = self.restore_stash(stash_active).await;
            tracing::warn!(
                target: "datashed::sync",
                op = "pull",
                ahead,
                behind,
                "pull aborted: branches have diverged"
            );
            return Ok(PullReport {
                outcome: PullOutcome::Diverged { ahead, behind },
                target,
                old_commit: Some(old_commit),
                new_commit: None,
                stash_warning,
            });
        }

        self.git.probe_remote(&request.from_remote).await?;
        self.git.fetch(&request.from_remote).await?;

        // Step 3: nothing new after the fetch ends the pull as a no-op.
        let behind = self.git.commits_behind(&target).await?;
        if behind == 0 {
            let stash_warning = self.restore_stash(stash_active).await;
            return Ok(PullReport {
                outcome: PullOutcome::UpToDate,
                target,
                old_commit: Some(old_commit.clone()),
                new_commit: Some(old_commit),
                stash_warning,
            });
        }

        // Step 4: merge.
        let merge = if request.allow_merge {
            self.git.merge_allow_commit(&target).await
        } else {
            self.git.merge_ff_only(&target).await
        };
        if let Err(err) = merge {
            let stash_warning = self.restore_stash(stash_active).await;
            tracing::warn!(
                target: "datashed::sync",
                op = "pull",
                error = %err,
                "merge failed"
            );
            return Ok(PullReport {
                outcome: PullOutcome::MergeFailed {
                    error: err.to_string(),
                },
                target,
                old_commit: Some(old_commit),
                new_commit: None,
                stash_warning,
            });
        }
        let new_commit = self.git.head_commit().await?;

        // Step 5: the merge is in; a failed pop is a warning, not a rollback.
        let stash_warning = self.restore_stash(stash_active).await;

        // Step 6: reindex only when catalog paths changed.
        let reindex_queued = self.queue_reindex_if_needed(&old_commit, &new_commit).await;

        tracing::info!(
            target: "datashed::sync",
            op = "pull",
            commits = behind,
            reindex_queued,
            commit = %new_commit,
            "pull finished"
        );
        Ok(PullReport {
            outcome: PullOutcome::Pulled {
                commits: behind,
                reindex_queued,
            },
            target,
            old_commit: Some(old_commit),
            new_commit: Some(new_commit),
            stash_warning,
        })
    }

    /// Pops the stash if one is active. Returns the rendered error as a
    /// warning when the pop fails; the stash entry itself survives for
    /// manual recovery.
    async fn restore_stash(&self, stash_active: &mut bool) -> Option<String> {
        if !*stash_active {
            return None;
        }
        *stash_active = false;
        match self.git.stash_pop().await {
            Ok(_) => None,
            Err(err) => Some(err.to_string()),
        }
    }

    async fn queue_reindex_if_needed(&self, old: &str, new: &str) -> bool {
        let files = match self.git.changed_files(old, new).await {
            Ok(files) => files,
            Err(err) => {
                // Unknown range contents: prefer a wasted incremental pass
                // over a stale catalog.
                tracing::warn!(
                    target: "datashed::sync",
                    error = %err,
                    "could not list pulled files; queueing reindex anyway"
                );
                self.reindex.request_reindex();
                return true;
            }
        };
        if touches_catalog_paths(&self.catalog_paths, &files) {
            self.reindex.request_reindex();
            true
        } else {
            false
        }
    }
}

impl std::fmt::Debug for SyncCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncCoordinator")
            .field("catalog_paths", &self.catalog_paths)
            .finish_non_exhaustive()
    }
}

fn touches_catalog_paths(prefixes: &[String], files: &[String]) -> bool {
    files
        .iter()
        .any(|file| prefixes.iter().any(|prefix| file.starts_with(prefix)))
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::GitClient;
    use datashed_core::traits::{CatalogFuture, CountingReindexSignal};
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::Notify;

    #[derive(Default)]
    struct FakeGit {
        calls: StdMutex<Vec<&'static str>>,
        dirty: bool,
        ahead: u64,
        behind_before_fetch: u64,
        behind_after_fetch: u64,
        stash_push_fails: bool,
        pop_conflicts: bool,
        merge_fails: bool,
        fetch_times_out: bool,
        changed: Vec<String>,
        gate: Option<Arc<Notify>>,
        fetched: AtomicBool,
        merged: AtomicBool,
    }

    impl FakeGit {
        fn record(&self, name: &'static str) {
            self.calls.lock().unwrap().push(name);
        }

        fn called(&self, name: &str) -> bool {
            self.calls.lock().unwrap().iter().any(|c| *c == name)
        }
    }

    impl GitClient for FakeGit {
        fn probe_remote<'a>(&'a self, _remote: &'a str) -> CatalogFuture<'a, ()> {
            Box::pin(async move {
                self.record("probe_remote");
                Ok(())
            })
        }

        fn fetch<'a>(&'a self, _remote: &'a str) -> CatalogFuture<'a, ()> {
            Box::pin(async move {
                self.record("fetch");
                if self.fetch_times_out {
                    return Err(CatalogError::GitTimeout {
                        command: "git fetch --prune origin".to_owned(),
                        timeout_secs: 30,
                    });
                }
                self.fetched.store(true, Ordering::SeqCst);
                Ok(())
            })
        }

        fn current_branch(&self) -> CatalogFuture<'_, String> {
            Box::pin(async move {
                self.record("current_branch");
                Ok("main".to_owned())
            })
        }

        fn head_commit(&self) -> CatalogFuture<'_, String> {
            Box::pin(async move {
                self.record("head_commit");
                Ok(if self.merged.load(Ordering::SeqCst) {
                    "2222222".to_owned()
                } else {
                    "1111111".to_owned()
                })
            })
        }

        fn is_dirty(&self) -> CatalogFuture<'_, bool> {
            Box::pin(async move {
                if let Some(gate) = &self.gate {
                    gate.notified().await;
                }
                self.record("is_dirty");
                Ok(self.dirty)
            })
        }

        fn commits_ahead<'a>(&'a self, _target: &'a str) -> CatalogFuture<'a, u64> {
            Box::pin(async move {
                self.record("commits_ahead");
                Ok(self.ahead)
            })
        }

        fn commits_behind<'a>(&'a self, _target: &'a str) -> CatalogFuture<'a, u64> {
            Box::pin(async move {
                self.record("commits_behind");
                Ok(if self.fetched.load(Ordering::SeqCst) {
                    self.behind_after_fetch
                } else {
                    self.behind_before_fetch
                })
            })
        }

        fn stash_push<'a>(&'a self, _message: &'a str) -> CatalogFuture<'a, bool> {
            Box::pin(async move {
                self.record("stash_push");
                if self.stash_push_fails {
                    return Err(CatalogError::GitCommand {
                        command: "git stash push".to_owned(),
                        exit_code: 1,
                        stderr: "error: unable to write stash".to_owned(),
                    });
                }
                Ok(true)
            })
        }

        fn stash_pop(&self) -> CatalogFuture<'_, bool> {
            Box::pin(async move {
                self.record("stash_pop");
                if self.pop_conflicts {
                    return Err(CatalogError::StashConflict {
                        detail: "CONFLICT (content): Merge conflict in notes.txt".to_owned(),
                    });
                }
                Ok(true)
            })
        }

        fn merge_ff_only<'a>(&'a self, _target: &'a str) -> CatalogFuture<'a, ()> {
            Box::pin(async move {
                self.record("merge_ff_only");
                if self.merge_fails {
                    return Err(CatalogError::GitCommand {
                        command: "git merge --ff-only origin/main".to_owned(),
                        exit_code: 128,
                        stderr: "fatal: Not possible to fast-forward, aborting.".to_owned(),
                    });
                }
                self.merged.store(true, Ordering::SeqCst);
                Ok(())
            })
        }

        fn merge_allow_commit<'a>(&'a self, _target: &'a str) -> CatalogFuture<'a, ()> {
            Box::pin(async move {
                self.record("merge_allow_commit");
                if self.merge_fails {
                    return Err(CatalogError::GitCommand {
                        command: "git merge --no-edit origin/main".to_owned(),
                        exit_code: 1,
                        stderr: "CONFLICT (content): Merge conflict in data.csv".to_owned(),
                    });
                }
                self.merged.store(true, Ordering::SeqCst);
                Ok(())
            })
        }

        fn changed_files<'a>(
            &'a self,
            _from: &'a str,
            _to: &'a str,
        ) -> CatalogFuture<'a, Vec<String>> {
            Box::pin(async move {
                self.record("changed_files");
                Ok(self.changed.clone())
            })
        }
    }

    fn coordinator(git: Arc<FakeGit>) -> (SyncCoordinator, Arc<CountingReindexSignal>) {
        let signal = Arc::new(CountingReindexSignal::new());
        let coord = SyncCoordinator::new(
            git,
            vec!["datasets/".to_owned()],
            Arc::clone(&signal) as Arc<dyn ReindexSignal>,
        );
        (coord, signal)
    }

    fn request() -> PullRequest {
        PullRequest::new("main", "origin")
    }

    #[tokio::test]
    async fn up_to_date_pull_is_a_noop() {
        let fake = Arc::new(FakeGit::default());
        let (coord, signal) = coordinator(Arc::clone(&fake));

        let report = coord.pull(&request()).await.expect("pull");
        assert_eq!(report.outcome, PullOutcome::UpToDate);
        assert!(report.success());
        assert_eq!(report.old_commit.as_deref(), Some("1111111"));
        assert_eq!(report.new_commit.as_deref(), Some("1111111"));
        assert!(report.message().contains("up to date"));
        assert!(fake.called("fetch"));
        assert!(!fake.called("merge_ff_only"));
        assert_eq!(signal.count(), 0);
    }

    #[tokio::test]
    async fn fast_forward_pull_reports_commits_and_reindexes() {
        let fake = Arc::new(FakeGit {
            behind_after_fetch: 2,
            changed: vec!["datasets/sst/dataset.yaml".to_owned()],
            ..FakeGit::default()
        });
        let (coord, signal) = coordinator(Arc::clone(&fake));

        let report = coord.pull(&request()).await.expect("pull");
        assert_eq!(
            report.outcome,
            PullOutcome::Pulled {
                commits: 2,
                reindex_queued: true
            }
        );
        assert_eq!(report.new_commit.as_deref(), Some("2222222"));
        assert!(report.message().contains("Pulled 2 commits"));
        assert!(report.message().contains("reindex"));
        assert!(fake.called("merge_ff_only"));
        assert_eq!(signal.count(), 1);
    }

    #[tokio::test]
    async fn non_catalog_changes_skip_the_reindex() {
        let fake = Arc::new(FakeGit {
            behind_after_fetch: 1,
            changed: vec!["README.md".to_owned()],
            ..FakeGit::default()
        });
        let (coord, signal) = coordinator(Arc::clone(&fake));

        let report = coord.pull(&request()).await.expect("pull");
        assert_eq!(
            report.outcome,
            PullOutcome::Pulled {
                commits: 1,
                reindex_queued: false
            }
        );
        assert!(report.message().contains("Pulled 1 commit from"));
        assert_eq!(signal.count(), 0);
    }

    #[tokio::test]
    async fn divergence_aborts_before_stash_fetch_and_merge() {
        let fake = Arc::new(FakeGit {
            ahead: 2,
            behind_before_fetch: 3,
            behind_after_fetch: 3,
            ..FakeGit::default()
        });
        let (coord, signal) = coordinator(Arc::clone(&fake));

        let report = coord.pull(&request()).await.expect("pull");
        assert_eq!(
            report.outcome,
            PullOutcome::Diverged {
                ahead: 2,
                behind: 3
            }
        );
        assert!(!report.success());
        assert!(report.message().contains("diverged"));
        assert!(report.new_commit.is_none());
        assert!(!fake.called("stash_push"));
        assert!(!fake.called("probe_remote"));
        assert!(!fake.called("fetch"));
        assert!(!fake.called("merge_ff_only"));
        assert_eq!(signal.count(), 0);
    }

    #[tokio::test]
    async fn allow_merge_proceeds_through_divergence() {
        let fake = Arc::new(FakeGit {
            ahead: 1,
            behind_before_fetch: 2,
            behind_after_fetch: 2,
            ..FakeGit::default()
        });
        let (coord, _) = coordinator(Arc::clone(&fake));

        let report = coord
            .pull(&request().allow_merge(true))
            .await
            .expect("pull");
        assert_eq!(
            report.outcome,
            PullOutcome::Pulled {
                commits: 2,
                reindex_queued: false
            }
        );
        assert!(fake.called("merge_allow_commit"));
        assert!(!fake.called("merge_ff_only"));
    }

    #[tokio::test]
    async fn dirty_tree_without_auto_stash_refuses() {
        let fake = Arc::new(FakeGit {
            dirty: true,
            ..FakeGit::default()
        });
        let (coord, _) = coordinator(Arc::clone(&fake));

        let report = coord
            .pull(&request().auto_stash(false))
            .await
            .expect("pull");
        assert_eq!(report.outcome, PullOutcome::DirtyWorkingTree);
        assert!(report.message().contains("uncommitted changes"));
        assert!(!fake.called("stash_push"));
        assert!(!fake.called("fetch"));
        assert!(!fake.called("merge_ff_only"));
    }

    #[tokio::test]
    async fn dirty_tree_is_stashed_and_restored() {
        let fake = Arc::new(FakeGit {
            dirty: true,
            behind_after_fetch: 1,
            ..FakeGit::default()
        });
        let (coord, _) = coordinator(Arc::clone(&fake));

        let report = coord.pull(&request()).await.expect("pull");
        assert!(matches!(report.outcome, PullOutcome::Pulled { .. }));
        assert!(report.stash_warning.is_none());
        assert!(fake.called("stash_push"));
        assert!(fake.called("stash_pop"));
    }

    #[tokio::test]
    async fn up_to_date_with_stash_still_restores_it() {
        let fake = Arc::new(FakeGit {
            dirty: true,
            ..FakeGit::default()
        });
        let (coord, _) = coordinator(Arc::clone(&fake));

        let report = coord.pull(&request()).await.expect("pull");
        assert_eq!(report.outcome, PullOutcome::UpToDate);
        assert!(fake.called("stash_pop"));
    }

    #[tokio::test]
    async fn stash_push_failure_aborts_the_pull() {
        let fake = Arc::new(FakeGit {
            dirty: true,
            stash_push_fails: true,
            ..FakeGit::default()
        });
        let (coord, _) = coordinator(Arc::clone(&fake));

        let result = coord.pull(&request()).await;
        assert!(matches!(result, Err(CatalogError::GitCommand { .. })));
        assert!(!fake.called("probe_remote"));
        assert!(!fake.called("fetch"));
        assert!(!fake.called("stash_pop"));
    }

    #[tokio::test]
    async fn merge_failure_restores_stash_and_reports_both() {
        let fake = Arc::new(FakeGit {
            dirty: true,
            behind_after_fetch: 2,
            merge_fails: true,
            pop_conflicts: true,
            ..FakeGit::default()
        });
        let (coord, signal) = coordinator(Arc::clone(&fake));

        let report = coord.pull(&request()).await.expect("pull");
        let PullOutcome::MergeFailed { error } = &report.outcome else {
            panic!("expected merge failure, got {:?}", report.outcome);
        };
        assert!(error.contains("fast-forward"));
        assert!(fake.called("stash_pop"));
        let warning = report.stash_warning.as_deref().expect("stash warning");
        assert!(warning.contains("git stash pop"));
        assert!(!report.success());
        let message = report.message();
        assert!(message.contains("fast-forward"));
        assert!(message.contains("Warning:"));
        assert_eq!(signal.count(), 0);
    }

    #[tokio::test]
    async fn aborted_pull_restores_the_stash() {
        let fake = Arc::new(FakeGit {
            dirty: true,
            fetch_times_out: true,
            ..FakeGit::default()
        });
        let (coord, _) = coordinator(Arc::clone(&fake));

        let result = coord.pull(&request()).await;
        assert!(matches!(result, Err(CatalogError::GitTimeout { .. })));
        assert!(fake.called("stash_push"));
        assert!(fake.called("stash_pop"));
    }

    #[tokio::test]
    async fn concurrent_pull_is_rejected() {
        let gate = Arc::new(Notify::new());
        let fake = Arc::new(FakeGit {
            gate: Some(Arc::clone(&gate)),
            ..FakeGit::default()
        });
        let (coord, _) = coordinator(Arc::clone(&fake));
        let coord = Arc::new(coord);

        let first = {
            let coord = Arc::clone(&coord);
            tokio::spawn(async move { coord.pull(&request()).await })
        };
        tokio::task::yield_now().await;

        let second = coord.pull(&request()).await;
        assert!(matches!(second, Err(CatalogError::PullInProgress)));

        gate.notify_one();
        let report = first.await.expect("join").expect("pull");
        assert_eq!(report.outcome, PullOutcome::UpToDate);
    }

    #[test]
    fn catalog_path_matching_uses_prefixes() {
        let prefixes = vec!["datasets/".to_owned()];
        assert!(touches_catalog_paths(
            &prefixes,
            &["datasets/sst/dataset.yaml".to_owned()]
        ));
        assert!(!touches_catalog_paths(&prefixes, &["README.md".to_owned()]));
        assert!(!touches_catalog_paths(&prefixes, &[]));
        assert!(!touches_catalog_paths(&[], &["datasets/x".to_owned()]));
    }
}
