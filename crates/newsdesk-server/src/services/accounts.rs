//! Sign-up, sign-in and the author invitation flow.
//!
//! Credentials never touch this service: every check is delegated to the
//! identity provider, and this layer only keeps the `profiles` table in
//! step with it.

use chrono::Utc;
use newsdesk_shared::constants::MIN_PASSWORD_LEN;
use newsdesk_shared::models::{Profile, RoleRow};
use newsdesk_shared::types::Role;
use newsdesk_store::tables::{PROFILES, ROLES};
use newsdesk_store::{AuthUser, Query, Session, StoreExt, UserUpdate};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use crate::api::AppState;
use crate::auth::Principal;
use crate::error::{ApiError, ApiResult};
use crate::services::users::{assign_role, role_id};
use crate::services::{rejection, required};

const GOOGLE_PROVIDER: &str = "google";

#[derive(Debug, Clone, Deserialize)]
pub struct Register {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Login {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateMe {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InviteAuthor {
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub channel_id: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Registered {
    pub user_id: String,
    pub email: Option<String>,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionUser {
    pub id: String,
    pub email: Option<String>,
    pub role: Role,
    pub display_name: Option<String>,
}

/// What a successful sign-in hands back to the client.
#[derive(Debug, Clone, Serialize)]
pub struct LoginPayload {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub token_type: String,
    pub user: SessionUser,
}

#[derive(Debug, Clone, Serialize)]
pub struct Invited {
    pub user_id: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifiedInvite {
    pub user_id: String,
    pub email: Option<String>,
    pub user_metadata: Value,
}

/// Where the emailed invitation link leads.
#[derive(Debug, Clone, PartialEq)]
pub enum Callback {
    /// Mobile browser: straight into the app.
    Redirect(String),
    /// Anything else: show the link to open on a phone.
    Instructions { deep_link: String },
}

fn valid_email(email: &str) -> ApiResult<&str> {
    let email = required("email", email)?;
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email),
        _ => Err(ApiError::validation("Invalid email address")),
    }
}

fn check_password(password: &str) -> ApiResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::validation_code(
            "PASSWORD_TOO_SHORT",
            format!("Password must be at least {} characters long", MIN_PASSWORD_LEN),
        ));
    }
    Ok(())
}

fn invalid_invite(_: String) -> ApiError {
    ApiError::validation_code("INVALID_INVITE", "Invalid or expired invitation")
}

pub async fn register(state: &AppState, data: Register) -> ApiResult<Registered> {
    let email = valid_email(&data.email)?;
    check_password(&data.password)?;
    let display_name = data
        .display_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty());

    let mut metadata = Map::new();
    metadata.insert("role".into(), json!(Role::Reader.as_str()));
    if let Some(name) = display_name {
        metadata.insert("display_name".into(), json!(name));
    }

    let user = state
        .identity
        .sign_up(email, &data.password, Value::Object(metadata))
        .await
        .map_err(|e| rejection(e, ApiError::validation))?;

    let profile = json!({ "user_id": user.id, "display_name": display_name });
    if let Err(e) = state.store.insert(PROFILES, vec![profile]).await {
        warn!(user_id = %user.id, error = %e, "Profile insert after sign-up failed");
    }

    info!(user_id = %user.id, "User registered");
    Ok(Registered {
        user_id: user.id,
        email: user.email,
        role: Role::Reader,
    })
}

pub async fn login(state: &AppState, data: Login) -> ApiResult<LoginPayload> {
    let session = state
        .identity
        .sign_in_with_password(data.email.trim(), &data.password)
        .await
        .map_err(|e| rejection(e, |_| ApiError::Unauthenticated("Invalid credentials".into())))?;
    login_payload(state, session).await
}

pub async fn refresh(state: &AppState, refresh_token: &str) -> ApiResult<LoginPayload> {
    let refresh_token = required("refresh_token", refresh_token)?;
    let session = state
        .identity
        .refresh_session(refresh_token)
        .await
        .map_err(|e| {
            rejection(e, |_| {
                ApiError::Unauthenticated("Invalid or expired refresh token".into())
            })
        })?;
    login_payload(state, session).await
}

/// Sign in with a Google ID token, creating a reader profile on first use.
pub async fn google(state: &AppState, id_token: &str) -> ApiResult<LoginPayload> {
    let id_token = required("id_token", id_token)?;
    let session = state
        .identity
        .sign_in_with_id_token(GOOGLE_PROVIDER, id_token)
        .await
        .map_err(|e| rejection(e, |_| ApiError::Unauthenticated("Invalid Google ID token".into())))?;

    let has_profile = state
        .store
        .exists(&Query::table(PROFILES).eq("user_id", session.user.id.as_str()))
        .await?;
    if !has_profile {
        let profile = json!({
            "user_id": session.user.id,
            "role_id": role_id(state.store.as_ref(), Role::Reader).await?,
            "display_name": google_display_name(&session.user),
            "avatar_url": session
                .user
                .metadata_str("avatar_url")
                .or_else(|| session.user.metadata_str("picture")),
        });
        state.store.insert(PROFILES, vec![profile]).await?;
        info!(user_id = %session.user.id, "Profile created for Google sign-in");
    }

    login_payload(state, session).await
}

fn google_display_name(user: &AuthUser) -> Option<&str> {
    user.metadata_str("full_name")
        .or_else(|| user.metadata_str("name"))
        .or_else(|| user.email_local_part())
}

/// Session tokens plus the caller's role, reader when no profile says
/// otherwise.
async fn login_payload(state: &AppState, session: Session) -> ApiResult<LoginPayload> {
    let profile: Option<Profile> = state
        .store
        .fetch_one(&Query::table(PROFILES).eq("user_id", session.user.id.as_str()))
        .await?;

    let mut role = Role::Reader;
    if let Some(role_id) = profile.as_ref().and_then(|p| p.role_id) {
        let row: Option<RoleRow> = state
            .store
            .fetch_one(&Query::table(ROLES).eq("id", role_id))
            .await?;
        if let Some(parsed) = row.and_then(|r| r.name.parse::<Role>().ok()) {
            role = parsed;
        }
    }

    Ok(LoginPayload {
        access_token: session.access_token,
        refresh_token: session.refresh_token,
        expires_in: session.expires_in,
        token_type: session.token_type,
        user: SessionUser {
            id: session.user.id,
            email: session.user.email,
            role,
            display_name: profile.and_then(|p| p.display_name),
        },
    })
}

pub async fn logout(state: &AppState, principal: &Principal) -> ApiResult<()> {
    state
        .identity
        .sign_out(&principal.access_token)
        .await
        .map_err(|e| rejection(e, ApiError::Unauthenticated))?;
    info!(user_id = %principal.user_id, "User logged out");
    Ok(())
}

pub async fn update_me(state: &AppState, principal: &Principal, data: UpdateMe) -> ApiResult<Profile> {
    let mut patch = Map::new();
    if let Some(name) = data.display_name {
        patch.insert("display_name".into(), json!(name));
    }
    if let Some(avatar) = data.avatar_url {
        patch.insert("avatar_url".into(), json!(avatar));
    }

    let query = Query::table(PROFILES).eq("user_id", principal.user_id.as_str());
    if patch.is_empty() {
        return state
            .store
            .fetch_one(&query)
            .await?
            .ok_or(ApiError::ProfileNotFound);
    }

    patch.insert("updated_at".into(), json!(Utc::now()));
    let updated: Vec<Profile> = state.store.update_rows(&query, &Value::Object(patch)).await?;
    updated.into_iter().next().ok_or(ApiError::ProfileNotFound)
}

/// Email an invitation that makes the recipient an author on `channel_id`.
pub async fn invite_author(state: &AppState, data: InviteAuthor) -> ApiResult<Invited> {
    let email = valid_email(&data.email)?;
    let display_name = data
        .display_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty());

    let metadata = json!({
        "role": Role::Author.as_str(),
        "display_name": display_name,
        "channel_id": data.channel_id,
    });
    let user = state
        .identity
        .invite_user(email, metadata)
        .await
        .map_err(|e| rejection(e, ApiError::validation))?;

    let profile = json!({
        "user_id": user.id,
        "role_id": role_id(state.store.as_ref(), Role::Author).await?,
        "display_name": display_name,
        "channel_id": data.channel_id,
    });
    if let Err(e) = state.store.insert(PROFILES, vec![profile]).await {
        warn!(user_id = %user.id, error = %e, "Profile insert after invitation failed");
    }

    info!(user_id = %user.id, channel_id = data.channel_id, "Author invited");
    Ok(Invited {
        user_id: user.id,
        email: user.email,
    })
}

pub async fn set_role(state: &AppState, user_id: &str, role: &str) -> ApiResult<Role> {
    let user_id = required("user_id", user_id)?;
    let role: Role = role.parse()?;
    assign_role(state, user_id, role).await?;
    Ok(role)
}

pub async fn verify_invite(state: &AppState, token_hash: &str) -> ApiResult<VerifiedInvite> {
    let token_hash = required("token_hash", token_hash)?;
    let user = state
        .identity
        .verify_invite(token_hash)
        .await
        .map_err(|e| rejection(e, invalid_invite))?;

    Ok(VerifiedInvite {
        user_id: user.id,
        email: user.email,
        user_metadata: match user.user_metadata {
            Value::Null => json!({}),
            other => other,
        },
    })
}

/// Set the first password of an invited user.
pub async fn setup_password(state: &AppState, token_hash: &str, password: &str) -> ApiResult<()> {
    check_password(password)?;
    let token_hash = required("token_hash", token_hash)?;
    let user = state
        .identity
        .verify_invite(token_hash)
        .await
        .map_err(|e| rejection(e, invalid_invite))?;

    let update = UserUpdate {
        password: Some(password.to_string()),
        ..UserUpdate::default()
    };
    state.identity.update_user(&user.id, &update).await?;

    info!(user_id = %user.id, "Invited user set a password");
    Ok(())
}

/// Route an invitation link to the mobile app.
pub fn callback(
    deep_link_base: &str,
    token_hash: Option<&str>,
    kind: Option<&str>,
    user_agent: &str,
) -> ApiResult<Callback> {
    let token_hash = token_hash.map(str::trim).filter(|t| !t.is_empty());
    let (Some("invite"), Some(token_hash)) = (kind, token_hash) else {
        return Err(ApiError::validation(
            "Invalid callback parameters: token_hash and type=invite are required",
        ));
    };

    let deep_link = format!(
        "{}?token_hash={}",
        deep_link_base,
        urlencoding::encode(token_hash)
    );
    let agent = user_agent.to_ascii_lowercase();
    if ["android", "iphone", "ipad"].iter().any(|m| agent.contains(m)) {
        Ok(Callback::Redirect(deep_link))
    } else {
        Ok(Callback::Instructions { deep_link })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "newsapp://auth/invite";

    #[test]
    fn test_callback_routes_mobile_to_app() {
        let outcome = callback(BASE, Some("abc123"), Some("invite"), "Mozilla/5.0 (Linux; Android 14)").unwrap();
        assert_eq!(
            outcome,
            Callback::Redirect("newsapp://auth/invite?token_hash=abc123".into())
        );

        let outcome = callback(BASE, Some("abc123"), Some("invite"), "Mozilla/5.0 (X11; Linux)").unwrap();
        assert!(matches!(outcome, Callback::Instructions { .. }));
    }

    #[test]
    fn test_callback_rejects_other_inputs() {
        assert!(callback(BASE, Some("abc"), Some("signup"), "").is_err());
        assert!(callback(BASE, None, Some("invite"), "").is_err());
        assert!(callback(BASE, Some("  "), Some("invite"), "").is_err());
    }

    #[test]
    fn test_password_rule() {
        assert_eq!(check_password("12345").unwrap_err().code(), "PASSWORD_TOO_SHORT");
        assert!(check_password("123456").is_ok());
    }

    #[test]
    fn test_email_shape() {
        assert!(valid_email("jane@example.com").is_ok());
        assert!(valid_email("jane").is_err());
        assert!(valid_email("@example.com").is_err());
    }
}
