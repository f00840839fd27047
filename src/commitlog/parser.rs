//! commitlog::parser
//!
//! Nine-state machine parsing `git log --format=full <base>..<tip>` output
//! into [`Commit`] records, one per commit in the range.
//!
//! # Grammar
//!
//! ```text
//! commit <sha>
//! [Merge: <parents>]
//! Author: <display> <<email>>
//! Commit: <display> <<email>>
//! <blank>
//!     <title>
//! [    <separator, possibly blank>]
//! [    <body line>...]
//! <blank or EOF>
//! ```
//!
//! Message lines are distinguished from header lines purely by a four-space
//! indent; any unexpected non-empty line in an unexpected state is a parse
//! error rather than silently skipped.

use thiserror::Error;

use crate::types::{Oid, TypeError};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommitLogError {
    #[error("malformed commit log at line {line_no}: unexpected line '{line}' in state {state}")]
    Malformed {
        line_no: usize,
        line: String,
        state: &'static str,
    },

    #[error("malformed author/committer line: {0}")]
    MalformedIdentity(String),

    #[error("invalid object id: {0}")]
    InvalidOid(#[from] TypeError),
}

/// One parsed commit record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub sha: Oid,
    pub is_merge: bool,
    pub author_display: String,
    pub author_email: String,
    pub committer_display: String,
    pub committer_email: String,
    pub title: String,
    pub separator_line: Option<String>,
    pub body_lines: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Separator,
    CommitSha,
    Merge,
    Author,
    Committer,
    MiddleSeparator,
    Title,
    Blank,
    Body,
}

impl State {
    fn name(&self) -> &'static str {
        match self {
            State::Separator => "SEPARATOR",
            State::CommitSha => "COMMIT_SHA",
            State::Merge => "MERGE",
            State::Author => "AUTHOR",
            State::Committer => "COMMITTER",
            State::MiddleSeparator => "MIDDLE_SEPARATOR",
            State::Title => "TITLE",
            State::Blank => "BLANK",
            State::Body => "BODY",
        }
    }
}

struct InProgress {
    sha: String,
    is_merge: bool,
    author: Option<(String, String)>,
    committer: Option<(String, String)>,
    title: Option<String>,
    separator_line: Option<String>,
    body_lines: Vec<String>,
}

impl InProgress {
    fn new(sha: String) -> Self {
        Self {
            sha,
            is_merge: false,
            author: None,
            committer: None,
            title: None,
            separator_line: None,
            body_lines: Vec::new(),
        }
    }

    fn finish(self) -> Result<Commit, CommitLogError> {
        let (author_display, author_email) = self
            .author
            .ok_or_else(|| CommitLogError::MalformedIdentity("missing Author line".to_string()))?;
        let (committer_display, committer_email) = self.committer.ok_or_else(|| {
            CommitLogError::MalformedIdentity("missing Commit line".to_string())
        })?;
        let title = self
            .title
            .ok_or_else(|| CommitLogError::MalformedIdentity("missing title line".to_string()))?;
        Ok(Commit {
            sha: Oid::new(self.sha)?,
            is_merge: self.is_merge,
            author_display,
            author_email,
            committer_display,
            committer_email,
            title,
            separator_line: self.separator_line,
            body_lines: self.body_lines,
        })
    }
}

/// Split `"Display Name <email@domain>"` into `(display, email)`, matching
/// the original's `rsplit(' ', 1)` then strip-angle-brackets behavior.
fn split_identity(line: &str) -> Result<(String, String), CommitLogError> {
    let (display, bracketed) = line
        .rsplit_once(' ')
        .ok_or_else(|| CommitLogError::MalformedIdentity(line.to_string()))?;
    let email = bracketed.trim_start_matches('<').trim_end_matches('>');
    Ok((display.to_string(), email.to_string()))
}

/// Parse the raw text of `git log --format=full <range>` into an ordered
/// sequence of commit records, newest first (Git's natural log order).
pub fn parse(text: &str) -> Result<Vec<Commit>, CommitLogError> {
    let mut commits = Vec::new();
    let mut state = State::Separator;
    let mut current: Option<InProgress> = None;

    let lines: Vec<&str> = text.lines().collect();

    for (idx, &line) in lines.iter().enumerate() {
        let line_no = idx + 1;

        match state {
            State::Separator => {
                if line.is_empty() {
                    continue;
                }
                let Some(sha) = line.strip_prefix("commit ") else {
                    return Err(CommitLogError::Malformed {
                        line_no,
                        line: line.to_string(),
                        state: state.name(),
                    });
                };
                current = Some(InProgress::new(sha.trim().to_string()));
                state = State::CommitSha;
            }

            State::CommitSha => {
                if let Some(parents) = line.strip_prefix("Merge: ") {
                    let c = current.as_mut().expect("in progress");
                    c.is_merge = true;
                    let _ = parents;
                    state = State::Merge;
                } else if let Some(rest) = line.strip_prefix("Author: ") {
                    let identity = split_identity(rest)?;
                    current.as_mut().expect("in progress").author = Some(identity);
                    state = State::Author;
                } else {
                    return Err(CommitLogError::Malformed {
                        line_no,
                        line: line.to_string(),
                        state: state.name(),
                    });
                }
            }

            State::Merge => {
                let Some(rest) = line.strip_prefix("Author: ") else {
                    return Err(CommitLogError::Malformed {
                        line_no,
                        line: line.to_string(),
                        state: state.name(),
                    });
                };
                let identity = split_identity(rest)?;
                current.as_mut().expect("in progress").author = Some(identity);
                state = State::Author;
            }

            State::Author => {
                let Some(rest) = line.strip_prefix("Commit: ") else {
                    return Err(CommitLogError::Malformed {
                        line_no,
                        line: line.to_string(),
                        state: state.name(),
                    });
                };
                let identity = split_identity(rest)?;
                current.as_mut().expect("in progress").committer = Some(identity);
                state = State::Committer;
            }

            State::Committer => {
                if !line.is_empty() {
                    return Err(CommitLogError::Malformed {
                        line_no,
                        line: line.to_string(),
                        state: state.name(),
                    });
                }
                state = State::MiddleSeparator;
            }

            State::MiddleSeparator => {
                let Some(title) = line.strip_prefix("    ") else {
                    return Err(CommitLogError::Malformed {
                        line_no,
                        line: line.to_string(),
                        state: state.name(),
                    });
                };
                current.as_mut().expect("in progress").title = Some(title.to_string());
                state = State::Title;
                if idx + 1 == lines.len() {
                    commits.push(current.take().expect("in progress").finish()?);
                }
            }

            State::Title => {
                if let Some(sep) = line.strip_prefix("    ") {
                    current.as_mut().expect("in progress").separator_line = Some(sep.to_string());
                    state = State::Blank;
                    if idx + 1 == lines.len() {
                        commits.push(current.take().expect("in progress").finish()?);
                    }
                } else if line.is_empty() {
                    commits.push(current.take().expect("in progress").finish()?);
                    state = State::Separator;
                } else {
                    return Err(CommitLogError::Malformed {
                        line_no,
                        line: line.to_string(),
                        state: state.name(),
                    });
                }
            }

            State::Blank | State::Body => {
                if let Some(body_line) = line.strip_prefix("    ") {
                    current.as_mut().expect("in progress").body_lines.push(body_line.to_string());
                    state = State::Body;
                    if idx + 1 == lines.len() {
                        commits.push(current.take().expect("in progress").finish()?);
                    }
                } else if line.is_empty() {
                    commits.push(current.take().expect("in progress").finish()?);
                    state = State::Separator;
                } else {
                    return Err(CommitLogError::Malformed {
                        line_no,
                        line: line.to_string(),
                        state: state.name(),
                    });
                }
            }
        }
    }

    if let Some(pending) = current {
        if matches!(state, State::Title | State::Blank | State::Body) {
            commits.push(pending.finish()?);
        } else {
            return Err(CommitLogError::Malformed {
                line_no: lines.len(),
                line: String::new(),
                state: state.name(),
            });
        }
    }

    Ok(commits)
}
