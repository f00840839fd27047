//! lock
//!
//! In-process serialization for the shared snapshot registry (component of
//! the concurrency & resource model).
//!
//! Two distinct locks are provided because they protect different things:
//!
//! - [`FamilyLocks`] gives each `(org, repo, pr_number)` its own mutex, so
//!   deliveries for different families proceed in parallel while deliveries
//!   for the *same* family linearize. This is the sharded-mutex design the
//!   concurrency model explicitly allows.
//! - [`FetchHeadLock`] is a single, un-sharded mutex: `FETCH_HEAD` in the
//!   registry repository is process-global, so the sequence *fetch → read
//!   FETCH_HEAD* must never interleave with another family's fetch even
//!   though the families themselves run concurrently.
//!
//! Grounded on the exclusive-acquire-with-RAII-release shape of Lattice's
//! `core::ops::lock::RepoLock`, adapted from an OS-level file lock (for
//! cross-process CLI invocations) to an in-process `tokio::sync::Mutex`
//! (this is a single long-running server process, not a CLI).

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::{Mutex, MutexGuard, OwnedMutexGuard};

use crate::refname::PrCoordinates;

/// Key identifying one PR family's serialization domain.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct FamilyKey {
    org: String,
    repo: String,
    pr_number: u64,
}

impl From<&PrCoordinates> for FamilyKey {
    fn from(coords: &PrCoordinates) -> Self {
        Self {
            org: coords.org.clone(),
            repo: coords.repo.clone(),
            pr_number: coords.pr_number,
        }
    }
}

/// A registry of per-family mutexes, created lazily on first use.
///
/// The registry itself is guarded by a short-held `std::sync::Mutex` — only
/// used to look up or insert the per-family `Arc<Mutex<()>>`, never held
/// across a suspension point.
#[derive(Debug, Default)]
pub struct FamilyLocks {
    shards: StdMutex<HashMap<FamilyKey, Arc<Mutex<()>>>>,
}

/// RAII guard for a held family lock. The family unlocks when this is dropped.
pub struct FamilyGuard(#[allow(dead_code)] OwnedMutexGuard<()>);

impl FamilyLocks {
    pub fn new() -> Self {
        Self {
            shards: StdMutex::new(HashMap::new()),
        }
    }

    fn shard_for(&self, key: FamilyKey) -> Arc<Mutex<()>> {
        let mut shards = self.shards.lock().expect("family lock map poisoned");
        shards.entry(key).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    /// Acquire the lock for this family, waiting if another delivery for the
    /// same family currently holds it.
    pub async fn acquire(&self, coords: &PrCoordinates) -> FamilyGuard {
        let shard = self.shard_for(FamilyKey::from(coords));
        FamilyGuard(shard.lock_owned().await)
    }

    /// Same as [`Self::acquire`], keyed directly on `(org, repo, pr_number)`
    /// for call sites (e.g. the `push` handler) that have not yet resolved
    /// the family's `base_branch` and so cannot build a [`PrCoordinates`].
    pub async fn acquire_by_parts(&self, org: &str, repo: &str, pr_number: u64) -> FamilyGuard {
        let key = FamilyKey {
            org: org.to_string(),
            repo: repo.to_string(),
            pr_number,
        };
        let shard = self.shard_for(key);
        FamilyGuard(shard.lock_owned().await)
    }
}

/// The single global lock protecting the `fetch → read FETCH_HEAD` critical
/// section in the shared registry repository.
#[derive(Debug, Default)]
pub struct FetchHeadLock(Mutex<()>);

/// RAII guard for the held `FETCH_HEAD` critical section.
pub struct FetchHeadGuard<'a>(#[allow(dead_code)] MutexGuard<'a, ()>);

impl FetchHeadLock {
    pub fn new() -> Self {
        Self(Mutex::new(()))
    }

    pub async fn acquire(&self) -> FetchHeadGuard<'_> {
        FetchHeadGuard(self.0.lock().await)
    }
}
