//! Router harness over the in-memory backends and a recording push gateway.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use newsdesk_push::{Dispatcher, RecordingGateway};
use newsdesk_shared::types::Role;
use newsdesk_store::memory::{MemoryIdentity, MemoryStorage, MemoryStore};
use newsdesk_store::tables::{
    ADMIN_ROLE_ID, ARTICLES, AUTHOR_ROLE_ID, PROFILES, READER_ROLE_ID, USERS_DEVICES,
};
use newsdesk_store::{IdentityProvider, Store};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use crate::api::{build_router, AppState};
use crate::config::ServerConfig;
use crate::notify::Notifier;
use crate::rate_limit::RateLimiter;

pub const PASSWORD: &str = "correct-horse";

pub struct TestApp {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub identity: Arc<MemoryIdentity>,
    pub storage: Arc<MemoryStorage>,
    pub gateway: Arc<RecordingGateway>,
}

/// A decoded response.
pub struct Reply {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Value,
}

impl Reply {
    pub fn data(&self) -> &Value {
        &self.body["data"]
    }

    pub fn error_code(&self) -> &str {
        self.body["error"]["code"].as_str().unwrap_or_default()
    }
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(ServerConfig::default())
    }

    pub fn with_config(config: ServerConfig) -> Self {
        let store = Arc::new(MemoryStore::newsdesk());
        let identity = Arc::new(MemoryIdentity::new());
        let storage = Arc::new(MemoryStorage::new("http://files.test"));
        let gateway = Arc::new(RecordingGateway::new());
        let notifier = Notifier::new(Dispatcher::new(gateway.clone()), store.clone());

        let state = AppState {
            store: store.clone(),
            identity: identity.clone(),
            storage: storage.clone(),
            notifier,
            rate_limiter: RateLimiter::new(config.rate_limit_rps, config.rate_limit_burst),
            config: Arc::new(config),
        };
        Self {
            state,
            store,
            identity,
            storage,
            gateway,
        }
    }

    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    /// Create an identity user with a profile of `role` and return
    /// `(user_id, access_token)`.
    pub async fn user(&self, email: &str, role: Role) -> (String, String) {
        let user = self
            .identity
            .sign_up(email, PASSWORD, json!({ "role": role.as_str() }))
            .await
            .unwrap();
        let display_name = email.split('@').next().unwrap_or(email);
        self.store
            .insert(
                PROFILES,
                vec![json!({
                    "user_id": user.id,
                    "role_id": role_id(role),
                    "display_name": display_name,
                })],
            )
            .await
            .unwrap();
        let session = self
            .identity
            .sign_in_with_password(email, PASSWORD)
            .await
            .unwrap();
        (user.id, session.access_token)
    }

    pub async fn token(&self, email: &str, role: Role) -> String {
        self.user(email, role).await.1
    }

    /// Insert a published article directly, `age_minutes` old.
    pub async fn published_article(&self, title: &str, age_minutes: i64) -> String {
        let created = Utc::now() - Duration::minutes(age_minutes);
        let id = Uuid::new_v4().to_string();
        self.store
            .insert(
                ARTICLES,
                vec![json!({
                    "id": id,
                    "title": title,
                    "slug": format!("{}-{}", title.to_lowercase().replace(' ', "-"), age_minutes),
                    "content": "Body",
                    "status": "published",
                    "channel_id": 1,
                    "created_at": created,
                    "published_at": created,
                })],
            )
            .await
            .unwrap();
        id
    }

    pub async fn device(&self, user_id: Option<&str>, fcm_token: &str) {
        self.store
            .insert(
                USERS_DEVICES,
                vec![json!({ "fcm_token": fcm_token, "user_id": user_id, "device_type": "android" })],
            )
            .await
            .unwrap();
    }

    pub async fn send(&self, request: Request<Body>) -> Reply {
        let response = self.router().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        Reply {
            status,
            headers,
            body,
        }
    }

    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Reply {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Reply {
        self.call(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> Reply {
        self.call(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Option<Value>) -> Reply {
        self.call(Method::PUT, uri, token, body).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> Reply {
        self.call(Method::DELETE, uri, token, None).await
    }
}

pub fn role_id(role: Role) -> i64 {
    match role {
        Role::Admin => ADMIN_ROLE_ID,
        Role::Author => AUTHOR_ROLE_ID,
        Role::Reader => READER_ROLE_ID,
    }
}
