use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::{check, BaasClient};
use crate::error::Result;
use crate::identity::{AuthUser, IdentityProvider, Session, UserUpdate};

const SERVICE: &str = "gotrue";

/// `/signup` answers with a session when email confirmation is disabled and
/// with the bare user otherwise.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(Session),
    User(AuthUser),
}

impl SignUpResponse {
    fn into_user(self) -> AuthUser {
        match self {
            SignUpResponse::Session(session) => session.user,
            SignUpResponse::User(user) => user,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Verified {
    user: AuthUser,
}

/// [`IdentityProvider`] over the GoTrue HTTP API.
#[derive(Clone)]
pub struct RestIdentity {
    client: BaasClient,
}

impl RestIdentity {
    pub fn new(client: BaasClient) -> Self {
        Self { client }
    }

    async fn token_grant(&self, grant_type: &str, body: Value) -> Result<Session> {
        let response = self
            .client
            .public(Method::POST, "/auth/v1/token", None)
            .query(&[("grant_type", grant_type)])
            .json(&body)
            .send()
            .await?;
        Ok(check(SERVICE, response).await?.json().await?)
    }
}

#[async_trait]
impl IdentityProvider for RestIdentity {
    async fn get_user(&self, access_token: &str) -> Result<Option<AuthUser>> {
        let response = self
            .client
            .public(Method::GET, "/auth/v1/user", Some(access_token))
            .send()
            .await?;
        if matches!(
            response.status(),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ) {
            debug!(status = response.status().as_u16(), "access token rejected");
            return Ok(None);
        }
        Ok(Some(check(SERVICE, response).await?.json().await?))
    }

    async fn sign_up(&self, email: &str, password: &str, metadata: Value) -> Result<AuthUser> {
        let response = self
            .client
            .public(Method::POST, "/auth/v1/signup", None)
            .json(&json!({ "email": email, "password": password, "data": metadata }))
            .send()
            .await?;
        let body: SignUpResponse = check(SERVICE, response).await?.json().await?;
        Ok(body.into_user())
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session> {
        self.token_grant("password", json!({ "email": email, "password": password }))
            .await
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session> {
        self.token_grant("refresh_token", json!({ "refresh_token": refresh_token }))
            .await
    }

    async fn sign_in_with_id_token(&self, provider: &str, id_token: &str) -> Result<Session> {
        self.token_grant(
            "id_token",
            json!({ "provider": provider, "id_token": id_token }),
        )
        .await
    }

    async fn sign_out(&self, access_token: &str) -> Result<()> {
        let response = self
            .client
            .public(Method::POST, "/auth/v1/logout", Some(access_token))
            .send()
            .await?;
        check(SERVICE, response).await?;
        Ok(())
    }

    async fn verify_invite(&self, token_hash: &str) -> Result<AuthUser> {
        let response = self
            .client
            .public(Method::POST, "/auth/v1/verify", None)
            .json(&json!({ "type": "invite", "token_hash": token_hash }))
            .send()
            .await?;
        let verified: Verified = check(SERVICE, response).await?.json().await?;
        Ok(verified.user)
    }

    async fn invite_user(&self, email: &str, metadata: Value) -> Result<AuthUser> {
        let response = self
            .client
            .service(Method::POST, "/auth/v1/invite")
            .json(&json!({ "email": email, "data": metadata }))
            .send()
            .await?;
        Ok(check(SERVICE, response).await?.json().await?)
    }

    async fn update_user(&self, user_id: &str, update: &UserUpdate) -> Result<AuthUser> {
        let path = format!("/auth/v1/admin/users/{}", urlencoding::encode(user_id));
        let response = self
            .client
            .service(Method::PUT, &path)
            .json(update)
            .send()
            .await?;
        Ok(check(SERVICE, response).await?.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_up_response_with_session() {
        let body = json!({
            "access_token": "at",
            "refresh_token": "rt",
            "expires_in": 3600,
            "token_type": "bearer",
            "user": { "id": "u1", "email": "a@example.com" }
        });
        let parsed: SignUpResponse = serde_json::from_value(body).unwrap();
        assert!(matches!(parsed, SignUpResponse::Session(_)));
        assert_eq!(parsed.into_user().id, "u1");
    }

    #[test]
    fn test_sign_up_response_with_bare_user() {
        let body = json!({
            "id": "u2",
            "email": "b@example.com",
            "user_metadata": { "role": "reader" },
            "confirmation_sent_at": "2024-01-01T00:00:00Z"
        });
        let parsed: SignUpResponse = serde_json::from_value(body).unwrap();
        let user = parsed.into_user();
        assert_eq!(user.id, "u2");
        assert_eq!(user.metadata_str("role"), Some("reader"));
    }

    #[test]
    fn test_verify_response_carries_user() {
        let body = json!({
            "access_token": "at",
            "user": { "id": "u3", "email": "c@example.com", "user_metadata": {} }
        });
        let verified: Verified = serde_json::from_value(body).unwrap();
        assert_eq!(verified.user.id, "u3");
    }
}
