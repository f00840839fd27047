//! refname
//!
//! Canonical snapshot ref naming scheme (component A of the design).
//!
//! # Scheme
//!
//! ```text
//! <org>/<repo>/PR/<pr_number>/<base_branch>/rebase-<pointer>/<n>
//! ```
//!
//! `base_branch` is inserted verbatim and may itself contain `/`. Parsing is
//! positional: the first four slash-separated segments fix `org, repo, "PR",
//! pr_number`; the last two segments fix `rebase-<pointer>` and `n`; everything
//! in between is `base_branch`.

use thiserror::Error;

use crate::types::{validate_ref_component, validate_ref_path, TypeError};

/// Errors building or parsing a snapshot ref name.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RefNameError {
    #[error("invalid ref component: {0}")]
    InvalidComponent(#[from] TypeError),

    #[error("not a gitbot snapshot ref: {0}")]
    NotASnapshotRef(String),

    #[error("invalid rebase number segment '{0}'")]
    InvalidRebaseSegment(String),
}

/// Which end of a rebase snapshot pair a ref points to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pointer {
    Base,
    Head,
}

impl Pointer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Pointer::Base => "base",
            Pointer::Head => "head",
        }
    }
}

impl std::fmt::Display for Pointer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Pointer {
    type Err = RefNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "base" => Ok(Pointer::Base),
            "head" => Ok(Pointer::Head),
            other => Err(RefNameError::NotASnapshotRef(format!(
                "unknown pointer '{other}'"
            ))),
        }
    }
}

/// The 4-tuple identifying a PR family: `(org, repo, pr_number, base_branch)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PrCoordinates {
    pub org: String,
    pub repo: String,
    pub pr_number: u64,
    pub base_branch: String,
}

impl PrCoordinates {
    pub fn new(
        org: impl Into<String>,
        repo: impl Into<String>,
        pr_number: u64,
        base_branch: impl Into<String>,
    ) -> Result<Self, RefNameError> {
        let org = org.into();
        let repo = repo.into();
        let base_branch = base_branch.into();
        validate_ref_component(&org)?;
        validate_ref_component(&repo)?;
        validate_ref_path(&base_branch)?;
        Ok(Self {
            org,
            repo,
            pr_number,
            base_branch,
        })
    }
}

/// A fully resolved snapshot identity: coordinates + rebase number + pointer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotRef {
    pub coordinates: PrCoordinates,
    pub rebase_number: u64,
    pub pointer: Pointer,
}

/// Build the canonical ref name for a snapshot.
pub fn build(coords: &PrCoordinates, pointer: Pointer, n: u64) -> String {
    format!(
        "{}/{}/PR/{}/{}/rebase-{}/{}",
        coords.org, coords.repo, coords.pr_number, coords.base_branch, pointer, n
    )
}

/// Parse a ref name back into its `(coordinates, pointer, n)` components.
///
/// Positional: the first four segments fix `org, repo, "PR", pr_number`; the
/// last two fix `rebase-<pointer>` and `n`; everything between is the base
/// branch (which may itself contain `/`).
pub fn parse(refname: &str) -> Result<SnapshotRef, RefNameError> {
    let segments: Vec<&str> = refname.split('/').collect();
    if segments.len() < 6 {
        return Err(RefNameError::NotASnapshotRef(refname.to_string()));
    }
    let org = segments[0];
    let repo = segments[1];
    let pr_literal = segments[2];
    let pr_number_str = segments[3];
    if pr_literal != "PR" {
        return Err(RefNameError::NotASnapshotRef(refname.to_string()));
    }
    let pr_number: u64 = pr_number_str
        .parse()
        .map_err(|_| RefNameError::NotASnapshotRef(refname.to_string()))?;

    let rebase_segment = segments[segments.len() - 2];
    let n_segment = segments[segments.len() - 1];
    let pointer_str = rebase_segment
        .strip_prefix("rebase-")
        .ok_or_else(|| RefNameError::NotASnapshotRef(refname.to_string()))?;
    let pointer: Pointer = pointer_str.parse()?;
    let n: u64 = n_segment
        .parse()
        .map_err(|_| RefNameError::InvalidRebaseSegment(n_segment.to_string()))?;

    let base_branch = segments[4..segments.len() - 2].join("/");
    let coordinates = PrCoordinates::new(org, repo, pr_number, base_branch)?;

    Ok(SnapshotRef {
        coordinates,
        rebase_number: n,
        pointer,
    })
}

/// Build a glob pattern matching every rebase-head ref of a family, for use
/// with `VcsGateway::list_branches`. Scanning on `rebase-head` is sufficient
/// because both pointers of a rebase are always created together.
pub fn enumerate_pattern(coords: &PrCoordinates) -> String {
    format!(
        "{}/{}/PR/{}/{}/rebase-head/*",
        coords.org, coords.repo, coords.pr_number, coords.base_branch
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coords() -> PrCoordinates {
        PrCoordinates::new("acme", "widget", 7, "main").unwrap()
    }

    #[test]
    fn build_then_parse_round_trips() {
        let r = build(&coords(), Pointer::Head, 3);
        assert_eq!(r, "acme/widget/PR/7/main/rebase-head/3");
        let parsed = parse(&r).unwrap();
        assert_eq!(parsed.coordinates, coords());
        assert_eq!(parsed.rebase_number, 3);
        assert_eq!(parsed.pointer, Pointer::Head);
    }

    #[test]
    fn base_branch_with_slashes_round_trips() {
        let coords = PrCoordinates::new("acme", "widget", 12, "release/2026.01").unwrap();
        let r = build(&coords, Pointer::Base, 0);
        assert_eq!(r, "acme/widget/PR/12/release/2026.01/rebase-base/0");
        let parsed = parse(&r).unwrap();
        assert_eq!(parsed.coordinates.base_branch, "release/2026.01");
        assert_eq!(parsed.rebase_number, 0);
    }

    #[test]
    fn parse_rejects_non_snapshot_ref() {
        assert!(parse("refs/heads/main").is_err());
        assert!(parse("acme/widget/PR/7/main/rebase-sideways/0").is_err());
        assert!(parse("acme/widget/PR/7/main/rebase-head/not-a-number").is_err());
    }

    #[test]
    fn enumerate_pattern_matches_build_prefix() {
        let pattern = enumerate_pattern(&coords());
        assert_eq!(pattern, "acme/widget/PR/7/main/rebase-head/*");
    }

    #[test]
    fn coordinates_reject_invalid_components() {
        assert!(PrCoordinates::new("ac/me", "widget", 1, "main").is_err());
        assert!(PrCoordinates::new("acme", "widget", 1, "../etc").is_err());
    }
}
