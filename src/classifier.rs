//! classifier
//!
//! The Push Classifier (component E): decides whether a push appended
//! commits (fast-forward) or rewrote history (rebase, amend, reset).

use crate::types::Oid;
use crate::vcs::{VcsError, VcsGateway};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushKind {
    /// `sha_before` is an ancestor of `sha_after`: commits were appended.
    FastForward,
    /// `sha_before` is not an ancestor of `sha_after`: history was rewritten.
    Rewrite,
}

/// Classify a push from `sha_before` to `sha_after`.
///
/// Polarity note: the underlying ancestor check returns success (a `true`
/// boolean from [`VcsGateway::is_ancestor`]) exactly when the relation
/// holds — this function interprets that boolean directly as
/// "is-ancestor", not as "has-error".
pub fn classify(
    vcs: &VcsGateway,
    sha_before: &Oid,
    sha_after: &Oid,
) -> Result<PushKind, VcsError> {
    if vcs.is_ancestor(sha_before, sha_after)? {
        Ok(PushKind::FastForward)
    } else {
        Ok(PushKind::Rewrite)
    }
}
