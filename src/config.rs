//! config
//!
//! Ambient hosting shell: configuration schema and loading (§4.L).
//!
//! # Locations
//!
//! The config file path is taken from, in order:
//! 1. The `--config` CLI flag
//! 2. the `GITBOT_CONFIG` environment variable
//!
//! After the file is parsed, individual fields may still be overridden by
//! environment variables (`GITBOT_USERNAME`, `GITBOT_TOKEN`, `GITBOT_ENDPOINT`,
//! `GITBOT_HOSTNAME`, `GITBOT_DOMAINS` — comma-separated) so secrets need not
//! live on disk in a deployed environment.
//!
//! Grounded on the `core::config` loader's file-then-defaults shape, simplified
//! to one flat record (this service has no global/repo split — there is
//! exactly one config per running process).

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Errors loading or validating configuration. Fatal at startup; never
/// surfaced per-request.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("missing required config key '{0}'")]
    MissingKey(&'static str),

    #[error("no config path given (pass --config or set GITBOT_CONFIG)")]
    NoConfigPath,
}

/// On-disk shape of the config file. Every field is optional here; required
/// fields are enforced by [`Config::from_raw`] so a missing key produces a
/// named [`ConfigError::MissingKey`] rather than a generic parse failure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawConfig {
    username: Option<String>,
    personal_access_token: Option<String>,
    endpoint: Option<String>,
    hostname: Option<String>,
    domains: Option<String>,
    bind_address: Option<String>,
    repo_path: Option<String>,
    url_root: Option<String>,
}

/// The bot's fully resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Platform API username (basic auth).
    pub username: String,
    /// Platform API token (basic auth password).
    pub personal_access_token: String,
    /// Platform API base URL, e.g. `https://api.github.com`.
    pub endpoint: String,
    /// Public hostname this service is reachable at, used to build diff-view
    /// links embedded in posted comments.
    pub hostname: String,
    /// Allow-list of email domains accepted by the identity policy rule.
    /// Defaults to empty, which makes the identity check fail closed.
    pub domains: Vec<String>,
    /// Address the HTTP server binds to.
    pub bind_address: String,
    /// On-disk path of the bare repository backing the snapshot registry.
    pub repo_path: PathBuf,
    /// Base URL (with trailing slash) the comment composer prefixes onto
    /// diff-view links it embeds in posted comments.
    pub url_root: String,
}

impl Config {
    /// Load configuration from `path`, falling back to `GITBOT_CONFIG` when
    /// `path` is `None`, then applying `GITBOT_*` environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => PathBuf::from(
                std::env::var("GITBOT_CONFIG").map_err(|_| ConfigError::NoConfigPath)?,
            ),
        };

        let contents = fs::read_to_string(&path).map_err(|e| ConfigError::ReadError {
            path: path.clone(),
            source: e,
        })?;

        let raw: RawConfig = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.clone(),
            message: e.to_string(),
        })?;

        Self::from_raw(raw, &Env)
    }

    fn from_raw(mut raw: RawConfig, env: &impl EnvSource) -> Result<Self, ConfigError> {
        if let Some(v) = env.get("GITBOT_USERNAME") {
            raw.username = Some(v);
        }
        if let Some(v) = env.get("GITBOT_TOKEN") {
            raw.personal_access_token = Some(v);
        }
        if let Some(v) = env.get("GITBOT_ENDPOINT") {
            raw.endpoint = Some(v);
        }
        if let Some(v) = env.get("GITBOT_HOSTNAME") {
            raw.hostname = Some(v);
        }
        if let Some(v) = env.get("GITBOT_DOMAINS") {
            raw.domains = Some(v);
        }
        if let Some(v) = env.get("GITBOT_REPO_PATH") {
            raw.repo_path = Some(v);
        }
        if let Some(v) = env.get("GITBOT_URL_ROOT") {
            raw.url_root = Some(v);
        }

        let username = raw.username.ok_or(ConfigError::MissingKey("username"))?;
        let personal_access_token = raw
            .personal_access_token
            .ok_or(ConfigError::MissingKey("personal_access_token"))?;
        let endpoint = raw.endpoint.ok_or(ConfigError::MissingKey("endpoint"))?;
        let hostname = raw.hostname.ok_or(ConfigError::MissingKey("hostname"))?;
        let domains = raw
            .domains
            .map(|s| {
                s.split(['\n', ','])
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        let bind_address = raw.bind_address.unwrap_or_else(|| "0.0.0.0:8080".to_string());
        let repo_path = raw
            .repo_path
            .ok_or(ConfigError::MissingKey("repo_path"))
            .map(PathBuf::from)?;
        let url_root = raw.url_root.ok_or(ConfigError::MissingKey("url_root"))?;

        Ok(Self {
            username,
            personal_access_token,
            endpoint,
            hostname,
            domains,
            bind_address,
            repo_path,
            url_root,
        })
    }
}

trait EnvSource {
    fn get(&self, key: &str) -> Option<String>;
}

struct Env;

impl EnvSource for Env {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}
