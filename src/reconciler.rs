//! reconciler
//!
//! The Status Reconciler (component H): publishes per-commit policy
//! violations as platform statuses, idempotently and monotonically — a
//! `failure` is never walked back to `success`, and an already-failing
//! context is never re-posted.

use std::collections::HashSet;
use std::time::Duration;

use crate::platform::{with_retry, NewStatus, PlatformError, PlatformGateway, StatusState};
use crate::policy::Violation;

/// Prefix every rule_id is namespaced under when it becomes a status
/// context. Changing this breaks idempotence for already-posted statuses.
const CONTEXT_PREFIX: &str = "gitbot-";

/// `rule_id` used for the branch-level roll-up; namespaced the same way as
/// every other rule, producing context `gitbot-branch-check`.
const BRANCH_CHECK_RULE_ID: &str = "branch-check";

const BRANCH_FAILURE_DESCRIPTION: &str = "Branch contains commits in failure state";

/// Inter-post delay to respect platform rate limits — a correctness
/// measure, not a performance tweak (§5).
const POST_DELAY: Duration = Duration::from_secs(1);

/// One commit's policy verdict, as input to the reconciler.
pub struct CommitVerdict<'a> {
    pub sha: &'a str,
    pub violations: Vec<Violation>,
}

/// Reconcile violations for every commit in a scan, then apply the
/// branch-level roll-up if any commit failed.
pub async fn reconcile(
    platform: &dyn PlatformGateway,
    org: &str,
    repo: &str,
    head_sha: &str,
    verdicts: &[CommitVerdict<'_>],
) -> Result<(), PlatformError> {
    let mut any_failure = false;

    for verdict in verdicts {
        if verdict.violations.is_empty() {
            continue;
        }
        any_failure = true;
        reconcile_commit(platform, org, repo, verdict.sha, &verdict.violations).await?;
    }

    if any_failure {
        reconcile_commit(
            platform,
            org,
            repo,
            head_sha,
            &[Violation {
                rule_id: BRANCH_CHECK_RULE_ID,
                message: BRANCH_FAILURE_DESCRIPTION.to_string(),
            }],
        )
        .await?;
    }

    Ok(())
}

async fn reconcile_commit(
    platform: &dyn PlatformGateway,
    org: &str,
    repo: &str,
    sha: &str,
    violations: &[Violation],
) -> Result<(), PlatformError> {
    let existing = with_retry(|| platform.list_statuses(org, repo, sha)).await?;
    let already_failing: HashSet<String> = existing
        .into_iter()
        .filter(|s| s.state == StatusState::Failure && s.context.starts_with(CONTEXT_PREFIX))
        .map(|s| s.context)
        .collect();

    for (i, violation) in violations.iter().enumerate() {
        let context = format!("{CONTEXT_PREFIX}{}", violation.rule_id);
        if already_failing.contains(&context) {
            continue;
        }
        with_retry(|| {
            platform.post_status(
                org,
                repo,
                sha,
                NewStatus {
                    context: context.clone(),
                    state: StatusState::Failure,
                    description: violation.message.clone(),
                },
            )
        })
        .await?;
        if i + 1 < violations.len() {
            tokio::time::sleep(POST_DELAY).await;
        }
    }

    Ok(())
}
