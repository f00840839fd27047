use thiserror::Error;

use crate::types::TypeError;

/// Errors from VCS Gateway operations.
///
/// `is_ancestor` and `show_check` translate the underlying exit code to a
/// boolean instead of an error; every other operation fails with `Command`
/// (subprocess primitives) or `Git2` (ref/ancestry primitives) on non-zero
/// exit / non-success result.
#[derive(Debug, Error)]
pub enum VcsError {
    #[error("git {args:?} failed (exit {exit_code:?}): {stderr}")]
    Command {
        args: Vec<String>,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("ref not found: {0}")]
    RefNotFound(String),

    #[error("compare-and-swap failed for {refname}: expected {expected}, found {actual}")]
    CasFailed {
        refname: String,
        expected: String,
        actual: String,
    },

    #[error("invalid object id: {0}")]
    InvalidOid(#[from] TypeError),

    #[error("git2 error: {0}")]
    Git2(#[from] git2::Error),

    #[error("io error running git: {0}")]
    Io(#[from] std::io::Error),

    #[error("git produced non-utf8 output")]
    NonUtf8Output,

    #[error("vcs worker thread panicked: {0}")]
    Join(#[from] tokio::task::JoinError),
}
