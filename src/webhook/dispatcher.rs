//! webhook::dispatcher
//!
//! The Webhook Dispatcher (component J): orchestrates components A–I for
//! the two events this bot reacts to, in the effect order fixed by §5 —
//! snapshot mutation, then comment post (rewrite only), then per-commit
//! statuses in commit-log order, then the branch-level roll-up (the last
//! two are the reconciler's job, component H).

use std::sync::Arc;

use thiserror::Error;

use crate::classifier::{self, PushKind};
use crate::commitlog::{self, CommitLogError};
use crate::comment;
use crate::lock::{FamilyLocks, FetchHeadLock};
use crate::platform::{with_retry, PlatformError, PlatformGateway};
use crate::policy;
use crate::reconciler::{self, CommitVerdict};
use crate::refname::{self, Pointer, PrCoordinates, RefNameError};
use crate::registry::{RegistryError, SnapshotRegistry};
use crate::types::{Oid, TypeError};
use crate::vcs::{run_blocking, RemoteRef, VcsError, VcsGateway};

use super::payload::{pr_number_from_pull_ref, PayloadError, PullRequestPayload, PushPayload};

#[derive(Debug, Error)]
pub enum DispatcherError {
    #[error("vcs error: {0}")]
    Vcs(#[from] VcsError),

    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("payload error: {0}")]
    Payload(#[from] PayloadError),

    #[error("commit log error: {0}")]
    CommitLog(#[from] CommitLogError),

    #[error("ref name error: {0}")]
    RefName(#[from] RefNameError),

    #[error("invalid object id: {0}")]
    InvalidOid(#[from] TypeError),
}

/// Resolves `(org, repo)` to the remote URL the VCS Gateway fetches from.
/// A trait (rather than a fixed SSH-URL format string) so tests can point
/// at a local fixture repository instead of a real remote.
pub trait RemoteResolver: Send + Sync {
    fn resolve(&self, org: &str, repo: &str) -> String;
}

/// Default resolver: builds the SSH clone URL from the configured VCS
/// hostname, e.g. `git@github.example.com:acme/widget.git`.
pub struct SshRemoteResolver {
    pub hostname: String,
}

impl RemoteResolver for SshRemoteResolver {
    fn resolve(&self, org: &str, repo: &str) -> String {
        format!("git@{}:{org}/{repo}.git", self.hostname)
    }
}

pub struct Dispatcher {
    vcs: Arc<VcsGateway>,
    platform: Arc<dyn PlatformGateway>,
    remote_resolver: Box<dyn RemoteResolver>,
    family_locks: FamilyLocks,
    fetch_head_lock: FetchHeadLock,
    allowed_domains: Vec<String>,
    url_root: String,
}

/// As [`run_blocking`](crate::vcs::run_blocking), for registry operations
/// (which fail with `RegistryError` rather than `VcsError` directly).
async fn run_registry<T, F>(vcs: &Arc<VcsGateway>, f: F) -> Result<T, RegistryError>
where
    F: FnOnce(&VcsGateway) -> Result<T, RegistryError> + Send + 'static,
    T: Send + 'static,
{
    let vcs = Arc::clone(vcs);
    tokio::task::spawn_blocking(move || f(&vcs)).await?
}

impl Dispatcher {
    pub fn new(
        vcs: Arc<VcsGateway>,
        platform: Arc<dyn PlatformGateway>,
        remote_resolver: Box<dyn RemoteResolver>,
        allowed_domains: Vec<String>,
        url_root: String,
    ) -> Self {
        Self {
            vcs,
            platform,
            remote_resolver,
            family_locks: FamilyLocks::new(),
            fetch_head_lock: FetchHeadLock::new(),
            allowed_domains,
            url_root,
        }
    }

    fn remote_url(&self, org: &str, repo: &str) -> String {
        self.remote_resolver.resolve(org, repo)
    }

    /// `pull_request(opened)`: validate → initialize → fetch base branch →
    /// parse `FETCH_HEAD..<head-snapshot-of-rebase-0>` → policy check →
    /// reconcile.
    pub async fn handle_pull_request_opened(
        &self,
        payload: &PullRequestPayload,
    ) -> Result<(), DispatcherError> {
        let coords = PrCoordinates::new(
            payload.repository.owner.login.clone(),
            payload.repository.name.clone(),
            payload.number,
            payload.pull_request.base.ref_name.clone(),
        )?;
        let head_sha = Oid::new(payload.pull_request.head.sha.clone())?;
        let remote = self.remote_url(&coords.org, &coords.repo);

        let _family_guard = self.family_locks.acquire(&coords).await;

        {
            let _fetch_guard = self.fetch_head_lock.acquire().await;
            let head_ref_name = payload.pull_request.head.ref_name.clone();
            let fetch_remote = remote.clone();
            run_blocking(&self.vcs, move |vcs| vcs.fetch(&fetch_remote, &head_ref_name)).await?;

            let init_coords = coords.clone();
            let init_sha = head_sha.clone();
            run_registry(&self.vcs, move |vcs| {
                SnapshotRegistry::new(vcs).initialize(&init_coords, &init_sha)
            })
            .await?;
        }

        let head_ref = refname::build(&coords, Pointer::Head, 0);
        let commits = self.commits_ahead_of_base(&coords, &head_ref).await?;
        self.check_and_reconcile(&coords, &commits, head_sha.as_str()).await?;
        Ok(())
    }

    /// `push`: locate the owning PR, classify the push, then mutate the
    /// registry and reconcile per §4.J.
    pub async fn handle_push(&self, payload: &PushPayload) -> Result<(), DispatcherError> {
        let org = payload.repository.owner.login.clone();
        let repo = payload.repository.name.clone();
        let sha_before = Oid::new(payload.before.clone())?;
        let sha_after = Oid::new(payload.after.clone())?;
        let remote = self.remote_url(&org, &repo);

        let pr_number = {
            let _fetch_guard = self.fetch_head_lock.acquire().await;
            let fetch_remote = remote.clone();
            let ref_name = payload.ref_name.clone();
            run_blocking(&self.vcs, move |vcs| vcs.fetch(&fetch_remote, &ref_name)).await?;

            let ls_remote = remote.clone();
            let pull_refs: Vec<RemoteRef> =
                run_blocking(&self.vcs, move |vcs| vcs.ls_remote(&ls_remote, "refs/pull/*/head")).await?;
            match pull_refs.iter().find(|r| r.oid == sha_after) {
                Some(matched) => pr_number_from_pull_ref(&matched.refname)?,
                None => return Ok(()),
            }
        };

        let _family_guard = self.family_locks.acquire_by_parts(&org, &repo, pr_number).await;

        let lookup_org = org.clone();
        let lookup_repo = repo.clone();
        let Some((coords, latest_rebase)) = run_registry(&self.vcs, move |vcs| {
            SnapshotRegistry::new(vcs).locate_by_pr_number(&lookup_org, &lookup_repo, pr_number)
        })
        .await?
        else {
            return Ok(());
        };

        let classify_before = sha_before.clone();
        let classify_after = sha_after.clone();
        let push_kind = run_blocking(&self.vcs, move |vcs| {
            classifier::classify(vcs, &classify_before, &classify_after)
        })
        .await?;

        match push_kind {
            PushKind::Rewrite => {
                let new_n_coords = coords.clone();
                let new_n_sha = sha_after.clone();
                let new_n = run_registry(&self.vcs, move |vcs| {
                    SnapshotRegistry::new(vcs).open_new_rebase(&new_n_coords, &new_n_sha)
                })
                .await?;

                let sender = &payload.sender.login;
                let pre_push_rebase = latest_rebase.max(0) as u64;
                let body = comment::compose(&self.url_root, &coords, sender, pre_push_rebase);
                with_retry(|| {
                    self.platform
                        .post_issue_comment(&coords.org, &coords.repo, coords.pr_number, &body)
                })
                .await?;

                let head_ref = refname::build(&coords, Pointer::Head, new_n);
                let commits = self.commits_ahead_of_base(&coords, &head_ref).await?;
                self.check_and_reconcile(&coords, &commits, sha_after.as_str()).await?;
            }
            PushKind::FastForward => {
                let advance_coords = coords.clone();
                let advance_sha = sha_after.clone();
                run_registry(&self.vcs, move |vcs| {
                    SnapshotRegistry::new(vcs).advance_head(&advance_coords, &advance_sha)
                })
                .await?;

                let n = latest_rebase.max(0) as u64;
                let head_ref = refname::build(&coords, Pointer::Head, n);
                let commits = self.commits_ahead_of_base(&coords, &head_ref).await?;
                self.check_and_reconcile(&coords, &commits, sha_after.as_str()).await?;
            }
        }

        Ok(())
    }

    /// Fetch `coords.base_branch` into `FETCH_HEAD` and parse the commits
    /// reachable from `tip_ref` but not from the fetched base — the set of
    /// commits this PR has introduced.
    async fn commits_ahead_of_base(
        &self,
        coords: &PrCoordinates,
        tip_ref: &str,
    ) -> Result<Vec<commitlog::Commit>, DispatcherError> {
        let remote = self.remote_url(&coords.org, &coords.repo);
        let range = {
            let _fetch_guard = self.fetch_head_lock.acquire().await;
            let base_branch = coords.base_branch.clone();
            run_blocking(&self.vcs, move |vcs| vcs.fetch(&remote, &base_branch)).await?;
            format!("FETCH_HEAD..{tip_ref}")
        };
        let log_text = run_blocking(&self.vcs, move |vcs| vcs.log_full(&range)).await?;
        Ok(commitlog::parse(&log_text)?)
    }

    /// Policy-check every commit in `commits`, then reconcile the resulting
    /// verdicts (in commit-log order) under `head_sha`'s branch roll-up.
    async fn check_and_reconcile(
        &self,
        coords: &PrCoordinates,
        commits: &[commitlog::Commit],
        head_sha: &str,
    ) -> Result<(), DispatcherError> {
        let mut verdicts = Vec::with_capacity(commits.len());
        for commit in commits {
            let sha = commit.sha.clone();
            let has_whitespace_issue = run_blocking(&self.vcs, move |vcs| vcs.show_check(&sha)).await?;
            let violations = policy::check(commit, &self.allowed_domains, has_whitespace_issue);
            verdicts.push(CommitVerdict {
                sha: commit.sha.as_str(),
                violations,
            });
        }
        reconciler::reconcile(self.platform.as_ref(), &coords.org, &coords.repo, head_sha, &verdicts).await?;
        Ok(())
    }
}
