use thiserror::Error;

/// Errors produced while talking to the hosted backend.
#[derive(Error, Debug)]
pub enum BaasError {
    /// The request never produced an HTTP response.
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("{service} returned {status}: {message}")]
    Api {
        service: &'static str,
        status: u16,
        message: String,
    },

    /// The response body did not match the expected shape.
    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// A write expected the affected row back but got nothing.
    #[error("Expected a row in the response but none was returned")]
    EmptyResponse,

    /// Client construction failed (bad URL, missing key).
    #[error("Invalid backend configuration: {0}")]
    Config(String),
}

impl BaasError {
    /// HTTP status reported by the service, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            BaasError::Api { status, .. } => Some(*status),
            BaasError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// `true` when the service rejected the request itself (4xx), as
    /// opposed to failing to process it.
    pub fn is_rejection(&self) -> bool {
        matches!(self.status(), Some(400..=499))
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, BaasError>;
