//! platform::client
//!
//! The single doorway to the code review platform's REST API (component C).
//!
//! Grounded on `forge::github::GitHubForge`'s header/response-handling shape,
//! trimmed to the three operations this bot needs and authenticated with
//! HTTP basic auth (username + personal access token) rather than a bearer
//! token, per the configuration record of §3.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};

use super::error::PlatformError;

const USER_AGENT_VALUE: &str = "gitbot";

/// State of a published commit status, mirroring the platform's status API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusState {
    Success,
    Failure,
    Pending,
    Error,
}

impl std::fmt::Display for StatusState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatusState::Success => write!(f, "success"),
            StatusState::Failure => write!(f, "failure"),
            StatusState::Pending => write!(f, "pending"),
            StatusState::Error => write!(f, "error"),
        }
    }
}

/// A status as read back from `list_statuses`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StatusEntry {
    pub context: String,
    pub state: StatusState,
}

/// A status to publish via `post_status`.
#[derive(Debug, Clone, Serialize)]
pub struct NewStatus {
    pub context: String,
    pub state: StatusState,
    pub description: String,
}

/// The Platform Gateway trait. A trait (rather than a bare struct) so the
/// reconciler and dispatcher can be tested against a mock implementation.
#[async_trait]
pub trait PlatformGateway: Send + Sync {
    async fn list_statuses(
        &self,
        org: &str,
        repo: &str,
        sha: &str,
    ) -> Result<Vec<StatusEntry>, PlatformError>;

    async fn post_status(
        &self,
        org: &str,
        repo: &str,
        sha: &str,
        status: NewStatus,
    ) -> Result<(), PlatformError>;

    async fn post_issue_comment(
        &self,
        org: &str,
        repo: &str,
        pr_number: u64,
        body: &str,
    ) -> Result<(), PlatformError>;
}

/// REST client for the code review platform, authenticated by HTTP basic
/// auth using the configured username and personal access token.
#[derive(Debug, Clone)]
pub struct RestPlatformGateway {
    client: Client,
    username: String,
    token: String,
    endpoint: String,
}

impl RestPlatformGateway {
    pub fn new(username: impl Into<String>, token: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            username: username.into(),
            token: token.into(),
            endpoint: endpoint.into(),
        }
    }

    fn repo_url(&self, org: &str, repo: &str, path: &str) -> String {
        format!("{}/repos/{org}/{repo}/{path}", self.endpoint)
    }

    async fn handle_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: Response,
    ) -> Result<T, PlatformError> {
        let status = response.status();
        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| PlatformError::MalformedResponse(e.to_string()))
        } else {
            Err(self.classify_error(response, status).await)
        }
    }

    async fn handle_empty_response(&self, response: Response) -> Result<(), PlatformError> {
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(self.classify_error(response, status).await)
        }
    }

    async fn classify_error(&self, response: Response, status: StatusCode) -> PlatformError {
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "unknown platform error".to_string());
        PlatformError::from_status(status.as_u16(), message)
    }
}

#[async_trait]
impl PlatformGateway for RestPlatformGateway {
    async fn list_statuses(
        &self,
        org: &str,
        repo: &str,
        sha: &str,
    ) -> Result<Vec<StatusEntry>, PlatformError> {
        let url = self.repo_url(org, repo, &format!("commits/{sha}/statuses"));
        let response = self
            .client
            .get(url)
            .basic_auth(&self.username, Some(&self.token))
            .header(reqwest::header::USER_AGENT, USER_AGENT_VALUE)
            .send()
            .await
            .map_err(|e| PlatformError::Transient {
                status: None,
                message: e.to_string(),
            })?;
        self.handle_response(response).await
    }

    async fn post_status(
        &self,
        org: &str,
        repo: &str,
        sha: &str,
        status: NewStatus,
    ) -> Result<(), PlatformError> {
        let url = self.repo_url(org, repo, &format!("statuses/{sha}"));
        let response = self
            .client
            .post(url)
            .basic_auth(&self.username, Some(&self.token))
            .header(reqwest::header::USER_AGENT, USER_AGENT_VALUE)
            .json(&status)
            .send()
            .await
            .map_err(|e| PlatformError::Transient {
                status: None,
                message: e.to_string(),
            })?;
        self.handle_empty_response(response).await
    }

    async fn post_issue_comment(
        &self,
        org: &str,
        repo: &str,
        pr_number: u64,
        body: &str,
    ) -> Result<(), PlatformError> {
        let url = self.repo_url(org, repo, &format!("issues/{pr_number}/comments"));
        let response = self
            .client
            .post(url)
            .basic_auth(&self.username, Some(&self.token))
            .header(reqwest::header::USER_AGENT, USER_AGENT_VALUE)
            .json(&serde_json::json!({ "body": body }))
            .send()
            .await
            .map_err(|e| PlatformError::Transient {
                status: None,
                message: e.to_string(),
            })?;
        self.handle_empty_response(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn gateway(endpoint: String) -> RestPlatformGateway {
        RestPlatformGateway::new("bot", "token123", endpoint)
    }

    #[tokio::test]
    async fn list_statuses_parses_entries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/widget/commits/abc123/statuses"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "context": "gitbot-title", "state": "failure" },
                { "context": "gitbot-email", "state": "success" },
            ])))
            .mount(&server)
            .await;

        let gw = gateway(server.uri());
        let statuses = gw.list_statuses("acme", "widget", "abc123").await.unwrap();
        assert_eq!(statuses.len(), 2);
        assert_eq!(statuses[0].context, "gitbot-title");
        assert_eq!(statuses[0].state, StatusState::Failure);
    }

    #[tokio::test]
    async fn post_status_succeeds_on_2xx() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/repos/acme/widget/statuses/abc123"))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;

        let gw = gateway(server.uri());
        let result = gw
            .post_status(
                "acme",
                "widget",
                "abc123",
                NewStatus {
                    context: "gitbot-title".to_string(),
                    state: StatusState::Failure,
                    description: "title too short".to_string(),
                },
            )
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn post_status_5xx_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/repos/acme/widget/statuses/abc123"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let gw = gateway(server.uri());
        let err = gw
            .post_status(
                "acme",
                "widget",
                "abc123",
                NewStatus {
                    context: "gitbot-title".to_string(),
                    state: StatusState::Failure,
                    description: "x".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn post_status_4xx_is_client_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/repos/acme/widget/statuses/abc123"))
            .respond_with(ResponseTemplate::new(422))
            .mount(&server)
            .await;

        let gw = gateway(server.uri());
        let err = gw
            .post_status(
                "acme",
                "widget",
                "abc123",
                NewStatus {
                    context: "gitbot-title".to_string(),
                    state: StatusState::Failure,
                    description: "x".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(!err.is_transient());
        assert!(matches!(err, PlatformError::Client { status: 422, .. }));
    }

    #[tokio::test]
    async fn post_issue_comment_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/repos/acme/widget/issues/7/comments"))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;

        let gw = gateway(server.uri());
        let result = gw.post_issue_comment("acme", "widget", 7, "hello").await;
        assert!(result.is_ok());
    }
}
