//! webhook::payload
//!
//! Typed shapes of the two webhook events this bot reacts to, plus the
//! top-level event classifier. Everything else the platform might send is a
//! no-op, decided purely from the `X-Github-Event` header.

use serde::Deserialize;
use thiserror::Error;

use crate::refname::RefNameError;
use crate::types::TypeError;

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("malformed webhook payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("invalid ref path in payload: {0}")]
    RefName(#[from] RefNameError),

    #[error("invalid object id in payload: {0}")]
    InvalidOid(#[from] TypeError),

    #[error("unrecognized pull ref shape: {0}")]
    UnrecognizedPullRef(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Owner {
    pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    pub name: String,
    pub owner: Owner,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefObject {
    #[serde(rename = "ref")]
    pub ref_name: String,
    pub sha: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestObject {
    pub base: RefObject,
    pub head: RefObject,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestPayload {
    pub action: String,
    pub number: u64,
    pub pull_request: PullRequestObject,
    pub repository: Repository,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Sender {
    pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PushPayload {
    pub before: String,
    pub after: String,
    #[serde(rename = "ref")]
    pub ref_name: String,
    pub repository: Repository,
    pub sender: Sender,
}

/// The decoded shape of one webhook delivery, after filtering out event
/// types and actions this bot doesn't act on.
pub enum WebhookEvent {
    PullRequestOpened(PullRequestPayload),
    Push(PushPayload),
    Ignored,
}

/// Parse one webhook delivery given its `X-Github-Event` header value and
/// raw JSON body. Any event type other than `pull_request`/`push`, and any
/// `pull_request` action other than `opened`, is [`WebhookEvent::Ignored`]
/// rather than a validation error — only a malformed body for an event type
/// we do act on is a [`PayloadError`].
pub fn parse_event(event_header: &str, body: &[u8]) -> Result<WebhookEvent, PayloadError> {
    match event_header {
        "pull_request" => {
            let payload: PullRequestPayload = serde_json::from_slice(body)?;
            if payload.action == "opened" {
                Ok(WebhookEvent::PullRequestOpened(payload))
            } else {
                Ok(WebhookEvent::Ignored)
            }
        }
        "push" => {
            let payload: PushPayload = serde_json::from_slice(body)?;
            Ok(WebhookEvent::Push(payload))
        }
        _ => Ok(WebhookEvent::Ignored),
    }
}

/// Extract the PR number from a `refs/pull/<n>/head` ref name.
pub fn pr_number_from_pull_ref(refname: &str) -> Result<u64, PayloadError> {
    let mut segments = refname.split('/');
    match (segments.next(), segments.next(), segments.next(), segments.next()) {
        (Some("refs"), Some("pull"), Some(n), Some("head")) => n
            .parse()
            .map_err(|_| PayloadError::UnrecognizedPullRef(refname.to_string())),
        _ => Err(PayloadError::UnrecognizedPullRef(refname.to_string())),
    }
}
