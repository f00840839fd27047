//! webhook
//!
//! Everything concerned with decoding and reacting to one inbound webhook
//! delivery: [`payload`] turns raw JSON into typed events, [`dispatcher`]
//! orchestrates the rest of the bot's components in response to them.

mod dispatcher;
mod payload;

pub use dispatcher::{Dispatcher, DispatcherError, RemoteResolver, SshRemoteResolver};
pub use payload::{
    parse_event, pr_number_from_pull_ref, Owner, PayloadError, PullRequestObject,
    PullRequestPayload, PushPayload, RefObject, Repository, Sender, WebhookEvent,
};
