//! vcs
//!
//! The single doorway to all version-control operations (component B).
//!
//! Ref reads/writes and ancestry queries go through `git2` directly against
//! the on-disk registry repository. Operations that need the exact textual
//! shape Git's own plumbing produces — `log --format=full`, `diff`, `show
//! --check`, `fetch`, `ls-remote` — shell out to the `git` binary with typed,
//! `Vec<OsString>` argument lists (never string-interpolated) so no
//! caller-controlled value can smuggle in an extra flag or command.

mod error;
mod gateway;

pub use error::VcsError;
pub use gateway::{run_blocking, BranchEntry, DiffPrefixes, RemoteRef, VcsGateway, QUIESCENCE_DELAY};
