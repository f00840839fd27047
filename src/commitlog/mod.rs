//! commitlog
//!
//! The Commit-Log Parser (component F): turns the raw text of
//! `git log --format=full <base>..<tip>` into an ordered sequence of
//! [`Commit`] records.

mod parser;

pub use parser::{parse, Commit, CommitLogError};
