//! Managed identity service contract.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// A user record owned by the identity service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: Value,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub banned_until: Option<DateTime<Utc>>,
}

impl AuthUser {
    /// String field of `user_metadata`, if present and non-empty.
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.user_metadata
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Part of the email before `@`, used as a fallback display name.
    pub fn email_local_part(&self) -> Option<&str> {
        self.email
            .as_deref()
            .and_then(|e| e.split('@').next())
            .filter(|s| !s.is_empty())
    }
}

/// Tokens issued by a successful sign-in or refresh.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires_in: i64,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub user: AuthUser,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// Admin-side changes to a user. Unset fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_metadata: Option<Value>,
    /// Duration such as `"876000h"`, or `"none"` to lift a ban.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ban_duration: Option<String>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve an access token. `Ok(None)` means the token is unknown,
    /// expired or revoked.
    async fn get_user(&self, access_token: &str) -> Result<Option<AuthUser>>;

    async fn sign_up(&self, email: &str, password: &str, metadata: Value) -> Result<AuthUser>;

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session>;

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session>;

    /// Exchange a third-party OpenID Connect ID token (e.g. Google).
    async fn sign_in_with_id_token(&self, provider: &str, id_token: &str) -> Result<Session>;

    async fn sign_out(&self, access_token: &str) -> Result<()>;

    /// Verify an emailed invitation token hash.
    async fn verify_invite(&self, token_hash: &str) -> Result<AuthUser>;

    /// Invite a user by email with the given metadata.
    async fn invite_user(&self, email: &str, metadata: Value) -> Result<AuthUser>;

    async fn update_user(&self, user_id: &str, update: &UserUpdate) -> Result<AuthUser>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_metadata_helpers() {
        let user: AuthUser = serde_json::from_value(json!({
            "id": "u1",
            "email": "jane@example.com",
            "user_metadata": { "full_name": "Jane", "empty": "" }
        }))
        .unwrap();
        assert_eq!(user.metadata_str("full_name"), Some("Jane"));
        assert_eq!(user.metadata_str("empty"), None);
        assert_eq!(user.metadata_str("missing"), None);
        assert_eq!(user.email_local_part(), Some("jane"));
    }

    #[test]
    fn test_user_update_skips_unset_fields() {
        let update = UserUpdate {
            ban_duration: Some("none".into()),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&update).unwrap(), json!({ "ban_duration": "none" }));
    }
}
