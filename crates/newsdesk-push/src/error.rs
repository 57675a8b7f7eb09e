use thiserror::Error;

/// Errors raised by the push gateway before per-token outcomes exist.
#[derive(Error, Debug)]
pub enum PushError {
    /// The service-account file or JSON could not be loaded.
    #[error("Invalid push credentials: {0}")]
    Credentials(String),

    /// Signing the OAuth assertion failed.
    #[error("Failed to sign OAuth assertion: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The OAuth token endpoint refused the assertion.
    #[error("OAuth token request returned {status}: {message}")]
    Auth { status: u16, message: String },
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PushError>;
