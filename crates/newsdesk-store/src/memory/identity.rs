use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::rejected;
use crate::error::Result;
use crate::identity::{AuthUser, IdentityProvider, Session, UserUpdate};

const SERVICE: &str = "memory identity";
const SESSION_TTL_SECS: i64 = 3600;
const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone)]
struct Account {
    user: AuthUser,
    password: Option<String>,
}

#[derive(Debug, Default)]
struct State {
    accounts: HashMap<String, Account>,
    access_tokens: HashMap<String, String>,
    refresh_tokens: HashMap<String, String>,
    invites: HashMap<String, String>,
    /// `(provider, id_token)` → (email, metadata) of the external account.
    id_tokens: HashMap<(String, String), (String, Value)>,
}

impl State {
    fn find_by_email(&self, email: &str) -> Option<&Account> {
        self.accounts
            .values()
            .find(|a| a.user.email.as_deref() == Some(email))
    }

    fn create(&mut self, email: &str, password: Option<&str>, metadata: Value) -> AuthUser {
        let user = AuthUser {
            id: Uuid::new_v4().to_string(),
            email: Some(email.to_string()),
            user_metadata: if metadata.is_null() {
                Value::Object(Map::new())
            } else {
                metadata
            },
            created_at: Some(Utc::now()),
            banned_until: None,
        };
        self.accounts.insert(
            user.id.clone(),
            Account {
                user: user.clone(),
                password: password.map(str::to_string),
            },
        );
        user
    }

    fn issue_session(&mut self, user: AuthUser) -> Session {
        let access_token = Uuid::new_v4().simple().to_string();
        let refresh_token = Uuid::new_v4().simple().to_string();
        self.access_tokens.insert(access_token.clone(), user.id.clone());
        self.refresh_tokens.insert(refresh_token.clone(), user.id.clone());
        Session {
            access_token,
            refresh_token,
            expires_in: SESSION_TTL_SECS,
            token_type: "bearer".to_string(),
            user,
        }
    }
}

fn is_banned(user: &AuthUser) -> bool {
    user.banned_until.map_or(false, |until| until > Utc::now())
}

/// Identity service kept in process. Tokens are random and never expire.
#[derive(Default)]
pub struct MemoryIdentity {
    state: RwLock<State>,
}

impl MemoryIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `id_token` exchangeable for an account with `email` at `provider`.
    pub async fn register_id_token(
        &self,
        provider: &str,
        id_token: &str,
        email: &str,
        metadata: Value,
    ) {
        self.state.write().await.id_tokens.insert(
            (provider.to_string(), id_token.to_string()),
            (email.to_string(), metadata),
        );
    }

    /// Token hash of the invitation sent to `email`, as the emailed link
    /// would carry it.
    pub async fn pending_invite(&self, email: &str) -> Option<String> {
        let state = self.state.read().await;
        let user_id = &state.find_by_email(email)?.user.id;
        state
            .invites
            .iter()
            .find(|(_, id)| *id == user_id)
            .map(|(hash, _)| hash.clone())
    }

    pub async fn user(&self, user_id: &str) -> Option<AuthUser> {
        self.state
            .read()
            .await
            .accounts
            .get(user_id)
            .map(|a| a.user.clone())
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentity {
    async fn get_user(&self, access_token: &str) -> Result<Option<AuthUser>> {
        let state = self.state.read().await;
        Ok(state
            .access_tokens
            .get(access_token)
            .and_then(|id| state.accounts.get(id))
            .map(|a| a.user.clone())
            .filter(|u| !is_banned(u)))
    }

    async fn sign_up(&self, email: &str, password: &str, metadata: Value) -> Result<AuthUser> {
        if password.len() < MIN_PASSWORD_LEN {
            return Err(rejected(
                SERVICE,
                422,
                "Password should be at least 6 characters",
            ));
        }
        let mut state = self.state.write().await;
        if state.find_by_email(email).is_some() {
            return Err(rejected(SERVICE, 422, "User already registered"));
        }
        Ok(state.create(email, Some(password), metadata))
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session> {
        let mut state = self.state.write().await;
        let account = state
            .find_by_email(email)
            .filter(|a| a.password.as_deref() == Some(password))
            .cloned()
            .ok_or_else(|| rejected(SERVICE, 400, "Invalid login credentials"))?;
        if is_banned(&account.user) {
            return Err(rejected(SERVICE, 400, "User is banned"));
        }
        Ok(state.issue_session(account.user))
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session> {
        let mut state = self.state.write().await;
        let user_id = state.refresh_tokens.remove(refresh_token);
        let user = user_id
            .and_then(|id| state.accounts.get(&id))
            .map(|a| a.user.clone())
            .ok_or_else(|| rejected(SERVICE, 400, "Invalid Refresh Token"))?;
        Ok(state.issue_session(user))
    }

    async fn sign_in_with_id_token(&self, provider: &str, id_token: &str) -> Result<Session> {
        let mut state = self.state.write().await;
        let (email, metadata) = state
            .id_tokens
            .get(&(provider.to_string(), id_token.to_string()))
            .cloned()
            .ok_or_else(|| rejected(SERVICE, 400, "Invalid ID token"))?;
        let existing = state.find_by_email(&email).map(|a| a.user.clone());
        let user = match existing {
            Some(user) => user,
            None => state.create(&email, None, metadata),
        };
        Ok(state.issue_session(user))
    }

    async fn sign_out(&self, access_token: &str) -> Result<()> {
        let mut state = self.state.write().await;
        let Some(user_id) = state.access_tokens.remove(access_token) else {
            return Err(rejected(SERVICE, 401, "Invalid token"));
        };
        state.refresh_tokens.retain(|_, id| *id != user_id);
        Ok(())
    }

    async fn verify_invite(&self, token_hash: &str) -> Result<AuthUser> {
        let state = self.state.read().await;
        state
            .invites
            .get(token_hash)
            .and_then(|id| state.accounts.get(id))
            .map(|a| a.user.clone())
            .ok_or_else(|| rejected(SERVICE, 403, "Token has expired or is invalid"))
    }

    async fn invite_user(&self, email: &str, metadata: Value) -> Result<AuthUser> {
        let mut state = self.state.write().await;
        if state.find_by_email(email).is_some() {
            return Err(rejected(
                SERVICE,
                422,
                "A user with this email address has already been registered",
            ));
        }
        let user = state.create(email, None, metadata);
        let token_hash = Uuid::new_v4().simple().to_string();
        state.invites.insert(token_hash, user.id.clone());
        Ok(user)
    }

    async fn update_user(&self, user_id: &str, update: &UserUpdate) -> Result<AuthUser> {
        let banned_until = match update.ban_duration.as_deref() {
            None => None,
            Some("none") => Some(None),
            Some(duration) => {
                let hours = duration
                    .strip_suffix('h')
                    .and_then(|h| h.parse::<i64>().ok())
                    .ok_or_else(|| rejected(SERVICE, 400, "Invalid ban duration"))?;
                Some(Some(Utc::now() + Duration::hours(hours)))
            }
        };

        let mut state = self.state.write().await;
        let account = state
            .accounts
            .get_mut(user_id)
            .ok_or_else(|| rejected(SERVICE, 404, "User not found"))?;

        if let Some(password) = &update.password {
            account.password = Some(password.clone());
        }
        if let Some(Value::Object(patch)) = &update.user_metadata {
            if !account.user.user_metadata.is_object() {
                account.user.user_metadata = Value::Object(Map::new());
            }
            if let Value::Object(meta) = &mut account.user.user_metadata {
                for (k, v) in patch {
                    meta.insert(k.clone(), v.clone());
                }
            }
        }
        if let Some(until) = banned_until {
            account.user.banned_until = until;
        }
        Ok(account.user.clone())
    }
}
