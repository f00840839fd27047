//! registry
//!
//! The Snapshot Registry (component D): preserves before/after branch tips
//! across force-pushes as named refs in the shared on-disk repository.
//!
//! Grounded on the VCS Gateway's ref primitives (`create_branch`,
//! `update_ref`, `list_branches`) and the Ref Namer's positional scheme.

use thiserror::Error;

use crate::refname::{self, Pointer, PrCoordinates};
use crate::types::Oid;
use crate::vcs::{VcsError, VcsGateway};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("family {0:?} is already initialized")]
    AlreadyInitialized(PrCoordinates),

    #[error("partial creation for family {coordinates:?} at rebase {rebase_number}: {detail}")]
    PartialCreation {
        coordinates: PrCoordinates,
        rebase_number: u64,
        detail: String,
    },

    #[error("vcs error: {0}")]
    Vcs(#[from] VcsError),

    #[error("ref name error: {0}")]
    RefName(#[from] crate::refname::RefNameError),

    #[error("registry worker thread panicked: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Ergonomic wrapper over [`VcsGateway`] implementing the four registry
/// operations of §4.D.
pub struct SnapshotRegistry<'a> {
    vcs: &'a VcsGateway,
}

impl<'a> SnapshotRegistry<'a> {
    pub fn new(vcs: &'a VcsGateway) -> Self {
        Self { vcs }
    }

    /// Scan existing rebases for `coords` and return the maximum rebase
    /// number, or `-1` if the family has no snapshots yet.
    pub fn current_rebase(&self, coords: &PrCoordinates) -> Result<i64, RegistryError> {
        let pattern = refname::enumerate_pattern(coords);
        let branches = self.vcs.list_branches(&pattern)?;
        let mut max_n: i64 = -1;
        for branch in branches {
            let parsed = refname::parse(&branch.name)?;
            max_n = max_n.max(parsed.rebase_number as i64);
        }
        Ok(max_n)
    }

    /// Called on `pull_request(opened)`: create rebase 0's `base` and `head`
    /// snapshots at `tip_sha`. Fails with `AlreadyInitialized` if the family
    /// already has any snapshot.
    pub fn initialize(&self, coords: &PrCoordinates, tip_sha: &Oid) -> Result<(), RegistryError> {
        if self.current_rebase(coords)? >= 0 {
            return Err(RegistryError::AlreadyInitialized(coords.clone()));
        }
        self.create_pair(coords, 0, tip_sha)
    }

    /// Fast-forward case: advance the current rebase's `head` pointer.
    /// `base` is left untouched.
    pub fn advance_head(&self, coords: &PrCoordinates, tip_sha: &Oid) -> Result<(), RegistryError> {
        let current = self.current_rebase(coords)?;
        let n = current.max(0) as u64;
        let head_ref = refname::build(coords, Pointer::Head, n);
        self.vcs.update_ref(&head_ref, tip_sha)?;
        Ok(())
    }

    /// Rewrite case: open rebase `current_rebase + 1` with both pointers at
    /// `tip_sha`. Returns the new rebase number.
    pub fn open_new_rebase(
        &self,
        coords: &PrCoordinates,
        tip_sha: &Oid,
    ) -> Result<u64, RegistryError> {
        let current = self.current_rebase(coords)?;
        let new_n = (current + 1) as u64;
        self.create_pair(coords, new_n, tip_sha)?;
        Ok(new_n)
    }

    /// Reconstruct a family's full coordinates from its snapshot refs given
    /// only `(org, repo, pr_number)` — the `push` handler does not carry
    /// `base_branch`, so it locates the family by scanning instead.
    /// Returns `None` if this PR has no known snapshots (e.g. it was opened
    /// before this service started watching it).
    pub fn locate_by_pr_number(
        &self,
        org: &str,
        repo: &str,
        pr_number: u64,
    ) -> Result<Option<(PrCoordinates, i64)>, RegistryError> {
        let pattern = format!("{org}/{repo}/PR/{pr_number}/*/rebase-head/*");
        let branches = self.vcs.list_branches(&pattern)?;
        let mut best: Option<(PrCoordinates, i64)> = None;
        for branch in branches {
            let parsed = refname::parse(&branch.name)?;
            let n = parsed.rebase_number as i64;
            let replace = match &best {
                Some((_, best_n)) => n > *best_n,
                None => true,
            };
            if replace {
                best = Some((parsed.coordinates, n));
            }
        }
        Ok(best)
    }

    fn create_pair(
        &self,
        coords: &PrCoordinates,
        n: u64,
        tip_sha: &Oid,
    ) -> Result<(), RegistryError> {
        let base_ref = refname::build(coords, Pointer::Base, n);
        let head_ref = refname::build(coords, Pointer::Head, n);

        self.vcs
            .create_branch(&base_ref, tip_sha)
            .map_err(|e| RegistryError::PartialCreation {
                coordinates: coords.clone(),
                rebase_number: n,
                detail: e.to_string(),
            })?;
        self.vcs
            .create_branch(&head_ref, tip_sha)
            .map_err(|e| RegistryError::PartialCreation {
                coordinates: coords.clone(),
                rebase_number: n,
                detail: e.to_string(),
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;

    fn init_repo() -> (tempfile::TempDir, VcsGateway) {
        let dir = tempfile::tempdir().unwrap();
        Command::new("git").args(["init", "-q"]).current_dir(dir.path()).output().unwrap();
        Command::new("git")
            .args(["config", "user.email", "t@example.com"])
            .current_dir(dir.path())
            .output()
            .unwrap();
        Command::new("git")
            .args(["config", "user.name", "T"])
            .current_dir(dir.path())
            .output()
            .unwrap();
        let gw = VcsGateway::open(dir.path()).unwrap();
        (dir, gw)
    }

    fn commit(dir: &std::path::Path, msg: &str) -> Oid {
        std::fs::write(dir.join("f.txt"), msg).unwrap();
        Command::new("git").args(["add", "-A"]).current_dir(dir).output().unwrap();
        Command::new("git").args(["commit", "-q", "-m", msg]).current_dir(dir).output().unwrap();
        let out = Command::new("git").args(["rev-parse", "HEAD"]).current_dir(dir).output().unwrap();
        Oid::new(String::from_utf8(out.stdout).unwrap().trim()).unwrap()
    }

    fn coords() -> PrCoordinates {
        PrCoordinates::new("acme", "widget", 7, "main").unwrap()
    }

    #[test]
    fn initialize_creates_rebase_zero() {
        let (dir, gw) = init_repo();
        let sha = commit(dir.path(), "first");
        let registry = SnapshotRegistry::new(&gw);
        registry.initialize(&coords(), &sha).unwrap();
        assert_eq!(registry.current_rebase(&coords()).unwrap(), 0);
    }

    #[test]
    fn initialize_twice_fails() {
        let (dir, gw) = init_repo();
        let sha = commit(dir.path(), "first");
        let registry = SnapshotRegistry::new(&gw);
        registry.initialize(&coords(), &sha).unwrap();
        assert!(matches!(
            registry.initialize(&coords(), &sha),
            Err(RegistryError::AlreadyInitialized(_))
        ));
    }

    #[test]
    fn advance_head_leaves_base_untouched() {
        let (dir, gw) = init_repo();
        let sha1 = commit(dir.path(), "first");
        let registry = SnapshotRegistry::new(&gw);
        registry.initialize(&coords(), &sha1).unwrap();

        let sha2 = commit(dir.path(), "second");
        registry.advance_head(&coords(), &sha2).unwrap();

        let base_ref = refname::build(&coords(), Pointer::Base, 0);
        let head_ref = refname::build(&coords(), Pointer::Head, 0);
        let all_pattern = format!(
            "{}/{}/PR/{}/{}/rebase-*/*",
            coords().org,
            coords().repo,
            coords().pr_number,
            coords().base_branch
        );
        let branches = gw.list_branches(&all_pattern).unwrap();
        let base = branches.iter().find(|b| b.name == base_ref).unwrap();
        let head = branches.iter().find(|b| b.name == head_ref).unwrap();
        assert_eq!(base.oid, sha1);
        assert_eq!(head.oid, sha2);
    }

    #[test]
    fn open_new_rebase_increments_and_preserves_history() {
        let (dir, gw) = init_repo();
        let sha1 = commit(dir.path(), "first");
        let registry = SnapshotRegistry::new(&gw);
        registry.initialize(&coords(), &sha1).unwrap();

        let sha2 = commit(dir.path(), "second");
        let new_n = registry.open_new_rebase(&coords(), &sha2).unwrap();
        assert_eq!(new_n, 1);
        assert_eq!(registry.current_rebase(&coords()).unwrap(), 1);

        let old_base = refname::build(&coords(), Pointer::Base, 0);
        let all_pattern = format!(
            "{}/{}/PR/{}/{}/rebase-*/*",
            coords().org,
            coords().repo,
            coords().pr_number,
            coords().base_branch
        );
        let branches = gw.list_branches(&all_pattern).unwrap();
        assert!(branches.iter().any(|b| b.name == old_base && b.oid == sha1));
    }

    #[test]
    fn locate_by_pr_number_reconstructs_coordinates() {
        let (dir, gw) = init_repo();
        let sha = commit(dir.path(), "first");
        let registry = SnapshotRegistry::new(&gw);
        registry.initialize(&coords(), &sha).unwrap();

        let (located, n) = registry
            .locate_by_pr_number(&coords().org, &coords().repo, coords().pr_number)
            .unwrap()
            .unwrap();
        assert_eq!(located, coords());
        assert_eq!(n, 0);
    }

    #[test]
    fn locate_by_pr_number_returns_none_for_unknown_family() {
        let (_dir, gw) = init_repo();
        let registry = SnapshotRegistry::new(&gw);
        assert!(registry.locate_by_pr_number("acme", "widget", 999).unwrap().is_none());
    }
}
