//! Resource services: validated input in, store/identity calls, reshaped
//! rows out. Handlers in `routes` stay thin wrappers around these.

pub mod accounts;
pub mod articles;
pub mod categories;
pub mod channels;
pub mod devices;
pub mod media;
pub mod users;

use newsdesk_store::BaasError;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

pub(crate) fn parse_uuid(id: &str, what: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(id.trim()).map_err(|_| ApiError::validation(format!("Invalid {} id", what)))
}

pub(crate) fn parse_int_id(id: &str, what: &str) -> ApiResult<i64> {
    id.trim()
        .parse::<i64>()
        .map_err(|_| ApiError::validation(format!("Invalid {} id", what)))
}

/// Trimmed `value`, or a validation error naming `field` when blank.
pub(crate) fn required<'a>(field: &str, value: &'a str) -> ApiResult<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ApiError::validation(format!("{} is required", field)));
    }
    Ok(value)
}

/// Turn a 4xx answer from the backend into `on_reject(message)`; anything
/// else stays an upstream failure.
pub(crate) fn rejection(err: BaasError, on_reject: impl FnOnce(String) -> ApiError) -> ApiError {
    match err {
        BaasError::Api {
            status: 400..=499,
            message,
            ..
        } => on_reject(message),
        other => ApiError::Upstream(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_parsing() {
        assert!(parse_uuid("6f1c1d2e-8f35-4a8c-9a51-1e0f0d6b2a11", "article").is_ok());
        assert!(parse_uuid("abc", "article").is_err());
        assert_eq!(parse_int_id(" 7 ", "channel").unwrap(), 7);
        assert!(parse_int_id("seven", "channel").is_err());
    }

    #[test]
    fn test_rejection_mapping() {
        let rejected = BaasError::Api {
            service: "gotrue",
            status: 422,
            message: "User already registered".into(),
        };
        let err = rejection(rejected, ApiError::validation);
        assert_eq!(err.code(), "VALIDATION_ERROR");
        assert_eq!(err.to_string(), "User already registered");

        let err = rejection(BaasError::EmptyResponse, ApiError::validation);
        assert!(matches!(err, ApiError::Upstream(_)));
    }

    #[test]
    fn test_required() {
        assert_eq!(required("title", "  Hello ").unwrap(), "Hello");
        let err = required("title", "   ").unwrap_err();
        assert_eq!(err.to_string(), "title is required");
    }
}
