//! types
//!
//! Strong types for core domain concepts: object ids and the path-component
//! validation shared by every segment of a snapshot ref name.
//!
//! # Validation
//!
//! These types enforce validity at construction time so an invalid value
//! can never reach the VCS gateway. Untrusted webhook strings (org, repo,
//! base branch) must pass through [`validate_ref_component`] before they are
//! assembled into a ref name.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid object id: {0}")]
    InvalidOid(String),

    #[error("invalid ref path component '{component}': {reason}")]
    InvalidRefComponent { component: String, reason: String },
}

/// A Git object identifier (SHA-1 or SHA-256), normalized to lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Oid(String);

impl Oid {
    /// Create a new validated object id.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidOid` if the string is not 40 or 64 hex characters.
    pub fn new(oid: impl Into<String>) -> Result<Self, TypeError> {
        let oid = oid.into().to_ascii_lowercase();
        Self::validate(&oid)?;
        Ok(Self(oid))
    }

    fn validate(oid: &str) -> Result<(), TypeError> {
        if oid.len() != 40 && oid.len() != 64 {
            return Err(TypeError::InvalidOid(format!(
                "expected 40 or 64 hex characters, got {}",
                oid.len()
            )));
        }
        if !oid.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidOid("object id must be hexadecimal".into()));
        }
        Ok(())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn short(&self, len: usize) -> &str {
        let end = len.min(self.0.len());
        &self.0[..end]
    }
}

impl TryFrom<String> for Oid {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Oid> for String {
    fn from(oid: Oid) -> Self {
        oid.0
    }
}

impl AsRef<str> for Oid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Oid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Validate one `/`-separated component of a ref name against Git's refname rules.
///
/// `base_branch` may itself contain `/`; callers validate each of its components
/// individually, along with `org`, `repo`, and the rebase number segment.
pub fn validate_ref_component(component: &str) -> Result<(), TypeError> {
    let fail = |reason: &str| {
        Err(TypeError::InvalidRefComponent {
            component: component.to_string(),
            reason: reason.to_string(),
        })
    };

    if component.is_empty() {
        return fail("component cannot be empty");
    }
    if component.contains('/') {
        return fail("component cannot contain '/'");
    }
    if component.starts_with('.') {
        return fail("component cannot start with '.'");
    }
    if component.ends_with(".lock") {
        return fail("component cannot end with '.lock'");
    }
    if component.contains("..") {
        return fail("component cannot contain '..'");
    }
    if component.contains("@{") {
        return fail("component cannot contain '@{'");
    }
    const INVALID_CHARS: [char; 8] = [' ', '~', '^', ':', '\\', '?', '*', '['];
    for c in INVALID_CHARS {
        if component.contains(c) {
            return fail(&format!("component cannot contain '{c}'"));
        }
    }
    if component.chars().any(|c| c.is_ascii_control()) {
        return fail("component cannot contain control characters");
    }
    Ok(())
}

/// Validate every `/`-separated segment of a (possibly nested) path, such as
/// a base branch name that itself contains slashes.
pub fn validate_ref_path(path: &str) -> Result<(), TypeError> {
    if path.is_empty() {
        return Err(TypeError::InvalidRefComponent {
            component: path.to_string(),
            reason: "path cannot be empty".to_string(),
        });
    }
    for segment in path.split('/') {
        validate_ref_component(segment)?;
    }
    Ok(())
}
