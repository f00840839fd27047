//! gitbot
//!
//! A webhook bot that augments code review with two features a force-push
//! discards by default: rebase archaeology (preserving before/after
//! snapshots of a rewritten PR branch and linking diffs between them) and
//! per-commit policy enforcement (message/identity/whitespace hygiene,
//! published as per-commit check statuses).
//!
//! # Architecture
//!
//! - [`types`] - shared identifiers (`Oid`, `PrCoordinates`, `Pointer`)
//! - [`refname`] - the snapshot ref naming scheme
//! - [`vcs`] - the single doorway to Git (component B)
//! - [`lock`] - per-family and FETCH_HEAD serialization (component §5)
//! - [`config`] - ambient hosting shell configuration (component §4.L)
//! - [`platform`] - the code review platform's REST API (component C)
//! - [`registry`] - the snapshot registry (component D)
//! - [`classifier`] - push classification (component E)
//! - [`commitlog`] - `git log` parsing (component F)
//! - [`policy`] - per-commit policy checks (component G)
//! - [`reconciler`] - idempotent check-status reconciliation (component H)
//! - [`comment`] - rebase-archaeology comment composition (component I)
//! - [`webhook`] - payload decoding and dispatch (component J)
//! - [`render`] - HTML diff rendering (component K)
//! - [`server`] - the HTTP server (component L)
//!
//! # Correctness Invariants
//!
//! 1. A force-push never loses the branch's prior tip; it is always
//!    reachable from a snapshot ref before the new tip is recorded.
//! 2. Every commit reachable from a PR's current head has exactly one
//!    check status per policy rule, kept current across rewrites.
//! 3. Two concurrent deliveries for the same PR family never interleave;
//!    deliveries for different families never block on each other.

pub mod classifier;
pub mod comment;
pub mod commitlog;
pub mod config;
pub mod lock;
pub mod platform;
pub mod policy;
pub mod reconciler;
pub mod refname;
pub mod registry;
pub mod render;
pub mod server;
pub mod types;
pub mod vcs;
pub mod webhook;
