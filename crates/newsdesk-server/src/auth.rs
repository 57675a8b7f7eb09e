//! Identity gate: bearer token → identity user → profile → role.
//!
//! Handlers declare what they need through extractors:
//! - [`Principal`]: any authenticated user with a profile
//! - [`Gated<G>`]: a principal whose role satisfies the gate `G`
//!
//! The role always comes from the `roles` row joined to the caller's
//! profile, never from the request.

use std::marker::PhantomData;
use std::ops::Deref;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use newsdesk_shared::models::{Profile, RoleRow};
use newsdesk_shared::types::Role;
use newsdesk_store::tables::{PROFILES, ROLES};
use newsdesk_store::{Query, StoreExt};
use serde::Serialize;
use tracing::debug;

use crate::api::AppState;
use crate::error::{ApiError, ApiResult};

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Principal {
    pub user_id: String,
    pub email: Option<String>,
    pub role: Role,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub channel_id: Option<i64>,
    #[serde(skip)]
    pub access_token: String,
}

impl Principal {
    /// Name shown to other users, falling back to the email local part.
    pub fn public_name(&self) -> String {
        self.display_name
            .clone()
            .filter(|n| !n.is_empty())
            .or_else(|| {
                self.email
                    .as_deref()
                    .and_then(|e| e.split('@').next())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| "Unknown".to_string())
    }
}

/// The token of an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> ApiResult<&str> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| ApiError::Unauthenticated("Missing authorization header".into()))?
        .to_str()
        .map_err(|_| ApiError::Unauthenticated("Malformed authorization header".into()))?;

    let (scheme, token) = value
        .split_once(' ')
        .ok_or_else(|| ApiError::Unauthenticated("Malformed authorization header".into()))?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(ApiError::Unauthenticated(
            "Malformed authorization header".into(),
        ));
    }
    Ok(token)
}

/// Resolve an access token into a [`Principal`].
pub async fn authenticate(state: &AppState, token: &str) -> ApiResult<Principal> {
    let user = state
        .identity
        .get_user(token)
        .await?
        .ok_or_else(|| ApiError::Unauthenticated("Invalid or expired token".into()))?;

    let profile: Profile = state
        .store
        .fetch_one(&Query::table(PROFILES).eq("user_id", user.id.as_str()))
        .await?
        .ok_or(ApiError::ProfileNotFound)?;

    let role_id = profile.role_id.ok_or(ApiError::ProfileNotFound)?;
    let role_row: Option<RoleRow> = state
        .store
        .fetch_one(&Query::table(ROLES).eq("id", role_id))
        .await?;
    let role = role_row
        .and_then(|r| r.name.parse::<Role>().ok())
        .ok_or_else(|| {
            debug!(user_id = %user.id, role_id, "profile references an unknown role");
            ApiError::ProfileNotFound
        })?;

    Ok(Principal {
        user_id: user.id,
        email: user.email,
        role,
        display_name: profile.display_name,
        avatar_url: profile.avatar_url,
        channel_id: profile.channel_id,
        access_token: token.to_string(),
    })
}

#[axum::async_trait]
impl FromRequestParts<AppState> for Principal {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> ApiResult<Self> {
        let token = bearer_token(&parts.headers)?;
        authenticate(state, token).await
    }
}

/// A role predicate checked before a handler runs.
pub trait Gate: Send + Sync + 'static {
    const ALLOWED: &'static [Role];
    const DENIED: &'static str;

    fn permits(role: Role) -> bool {
        Self::ALLOWED.contains(&role)
    }
}

pub struct AdminOnly;
pub struct AuthorOnly;
pub struct ReaderOnly;
pub struct AuthorOrReader;

impl Gate for AdminOnly {
    const ALLOWED: &'static [Role] = &[Role::Admin];
    const DENIED: &'static str = "Admin role required";
}

impl Gate for AuthorOnly {
    const ALLOWED: &'static [Role] = &[Role::Author];
    const DENIED: &'static str = "Author role required";
}

impl Gate for ReaderOnly {
    const ALLOWED: &'static [Role] = &[Role::Reader];
    const DENIED: &'static str = "Reader role required";
}

impl Gate for AuthorOrReader {
    const ALLOWED: &'static [Role] = &[Role::Author, Role::Reader];
    const DENIED: &'static str = "Author or reader role required";
}

/// A [`Principal`] that passed gate `G`.
pub struct Gated<G> {
    principal: Principal,
    _gate: PhantomData<G>,
}

impl<G> Gated<G> {
    pub fn into_inner(self) -> Principal {
        self.principal
    }
}

impl<G> Deref for Gated<G> {
    type Target = Principal;

    fn deref(&self) -> &Principal {
        &self.principal
    }
}

#[axum::async_trait]
impl<G: Gate> FromRequestParts<AppState> for Gated<G> {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> ApiResult<Self> {
        let principal = Principal::from_request_parts(parts, state).await?;
        if !G::permits(principal.role) {
            debug!(user_id = %principal.user_id, role = %principal.role, gate = G::DENIED, "gate denied");
            return Err(ApiError::Forbidden(G::DENIED.to_string()));
        }
        Ok(Gated {
            principal,
            _gate: PhantomData,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&headers("Bearer abc")).unwrap(), "abc");
        assert_eq!(bearer_token(&headers("bearer  abc ")).unwrap(), "abc");
        assert!(bearer_token(&headers("Basic abc")).is_err());
        assert!(bearer_token(&headers("Bearer ")).is_err());
        assert!(bearer_token(&headers("abc")).is_err());
        assert!(matches!(
            bearer_token(&HeaderMap::new()),
            Err(ApiError::Unauthenticated(_))
        ));
    }

    #[test]
    fn test_gate_predicates() {
        assert!(AdminOnly::permits(Role::Admin));
        assert!(!AdminOnly::permits(Role::Author));
        assert!(AuthorOnly::permits(Role::Author));
        assert!(!AuthorOnly::permits(Role::Admin));
        assert!(ReaderOnly::permits(Role::Reader));
        assert!(!ReaderOnly::permits(Role::Admin));
        assert!(AuthorOrReader::permits(Role::Author));
        assert!(AuthorOrReader::permits(Role::Reader));
        assert!(!AuthorOrReader::permits(Role::Admin));
    }

    #[test]
    fn test_public_name_fallbacks() {
        let mut principal = Principal {
            user_id: "u1".into(),
            email: Some("jane@example.com".into()),
            role: Role::Author,
            display_name: None,
            avatar_url: None,
            channel_id: None,
            access_token: String::new(),
        };
        assert_eq!(principal.public_name(), "jane");
        principal.display_name = Some("Jane D".into());
        assert_eq!(principal.public_name(), "Jane D");
    }
}
