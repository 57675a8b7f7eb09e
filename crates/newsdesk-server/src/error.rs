use axum::extract::multipart::MultipartError;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use newsdesk_shared::ParseError;
use newsdesk_store::BaasError;
use thiserror::Error;
use tracing::error;

use crate::envelope::Envelope;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing, malformed or unknown bearer token.
    #[error("{0}")]
    Unauthenticated(String),

    /// The token is valid but the user has no usable profile/role row.
    #[error("User profile not found")]
    ProfileNotFound,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{message}")]
    Validation {
        message: String,
        code: Option<&'static str>,
    },

    #[error("File too large ({size} bytes). Maximum size is {}MB", .max / (1024 * 1024))]
    PayloadTooLarge { size: usize, max: usize },

    #[error("Upstream service error: {0}")]
    Upstream(#[from] BaasError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation {
            message: message.into(),
            code: None,
        }
    }

    /// Validation failure carrying a machine-readable code for clients.
    pub fn validation_code(code: &'static str, message: impl Into<String>) -> Self {
        ApiError::Validation {
            message: message.into(),
            code: Some(code),
        }
    }

    pub fn not_found(what: &str) -> Self {
        ApiError::NotFound(format!("{} not found", what))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::ProfileNotFound | ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_)
            | ApiError::Validation { .. }
            | ApiError::PayloadTooLarge { .. } => StatusCode::BAD_REQUEST,
            ApiError::Upstream(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthenticated(_) => "UNAUTHENTICATED",
            ApiError::ProfileNotFound => "PROFILE_NOT_FOUND",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::Validation { code, .. } => code.unwrap_or("VALIDATION_ERROR"),
            ApiError::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE",
            ApiError::Upstream(_) => "UPSTREAM_ERROR",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<ParseError> for ApiError {
    fn from(e: ParseError) -> Self {
        ApiError::validation(e.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        ApiError::validation(format!("Multipart error: {}", e.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match &self {
            ApiError::Upstream(e) => {
                error!(error = %e, "Upstream call failed");
                "Upstream service error".to_string()
            }
            ApiError::Internal(e) => {
                error!(error = %e, "Internal error");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        Envelope::failure_response(self.status(), self.code(), message)
    }
}

/// Convenience alias used by the services and handlers.
pub type ApiResult<T> = Result<T, ApiError>;
