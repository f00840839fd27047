use thiserror::Error;

/// Errors from Platform Gateway operations.
///
/// `Transient` covers 5xx responses and network failures — the caller's
/// retry policy decides whether to back off and try again. `Client` covers
/// 4xx responses and is never retried.
#[derive(Debug, Clone, Error)]
pub enum PlatformError {
    #[error("transient platform error (status {status:?}): {message}")]
    Transient {
        status: Option<u16>,
        message: String,
    },

    #[error("platform client error (status {status}): {message}")]
    Client { status: u16, message: String },

    #[error("platform response could not be parsed: {0}")]
    MalformedResponse(String),
}

impl PlatformError {
    pub fn from_status(status: u16, message: String) -> Self {
        if status >= 500 {
            PlatformError::Transient {
                status: Some(status),
                message,
            }
        } else {
            PlatformError::Client { status, message }
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, PlatformError::Transient { .. })
    }
}
