use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::AppState;
use crate::auth::{AdminOnly, Gated, Principal};
use crate::envelope::Envelope;
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiQuery};
use crate::services::accounts::{
    self, Callback, InviteAuthor, Invited, Login, LoginPayload, Register, Registered, UpdateMe,
    VerifiedInvite,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/google", post(google))
        .route("/logout", post(logout))
        .route("/me", get(me).put(update_me))
        .route("/admin/invite-author", post(invite_author))
        .route("/admin/set-role", post(set_role))
        .route("/verify-invite", post(verify_invite))
        .route("/setup-password", post(setup_password))
        .route("/callback", get(callback))
}

#[derive(Debug, Deserialize)]
struct RefreshRequest {
    refresh_token: String,
}

#[derive(Debug, Deserialize)]
struct GoogleRequest {
    id_token: String,
}

#[derive(Debug, Deserialize)]
struct SetRoleParams {
    user_id: String,
    role: String,
}

#[derive(Debug, Deserialize)]
struct VerifyInviteRequest {
    token_hash: String,
}

#[derive(Debug, Deserialize)]
struct SetupPasswordRequest {
    token_hash: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct CallbackParams {
    token_hash: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

async fn register(
    State(state): State<AppState>,
    ApiJson(data): ApiJson<Register>,
) -> ApiResult<Envelope<Registered>> {
    let registered = accounts::register(&state, data).await?;
    Ok(Envelope::ok(
        registered,
        "User registered successfully. Please check your email to confirm your account.",
    ))
}

async fn login(
    State(state): State<AppState>,
    ApiJson(data): ApiJson<Login>,
) -> ApiResult<Envelope<LoginPayload>> {
    let payload = accounts::login(&state, data).await?;
    Ok(Envelope::ok(payload, "Login successful"))
}

async fn refresh(
    State(state): State<AppState>,
    ApiJson(data): ApiJson<RefreshRequest>,
) -> ApiResult<Envelope<LoginPayload>> {
    let payload = accounts::refresh(&state, &data.refresh_token).await?;
    Ok(Envelope::ok(payload, "Token refreshed"))
}

async fn google(
    State(state): State<AppState>,
    ApiJson(data): ApiJson<GoogleRequest>,
) -> ApiResult<Envelope<LoginPayload>> {
    let payload = accounts::google(&state, &data.id_token).await?;
    Ok(Envelope::ok(payload, "Google login successful"))
}

async fn logout(State(state): State<AppState>, principal: Principal) -> ApiResult<Envelope<()>> {
    accounts::logout(&state, &principal).await?;
    Ok(Envelope::done("Logout successful"))
}

async fn me(principal: Principal) -> Envelope<Value> {
    Envelope::ok(json!({ "user": principal }), "User profile retrieved")
}

async fn update_me(
    State(state): State<AppState>,
    principal: Principal,
    ApiJson(data): ApiJson<UpdateMe>,
) -> ApiResult<Envelope<Value>> {
    let profile = accounts::update_me(&state, &principal, data).await?;
    Ok(Envelope::ok(json!({ "profile": profile }), "Profile updated"))
}

async fn invite_author(
    State(state): State<AppState>,
    _admin: Gated<AdminOnly>,
    ApiJson(data): ApiJson<InviteAuthor>,
) -> ApiResult<Envelope<Invited>> {
    let invited = accounts::invite_author(&state, data).await?;
    Ok(Envelope::ok(invited, "Author invitation sent successfully"))
}

async fn set_role(
    State(state): State<AppState>,
    _admin: Gated<AdminOnly>,
    ApiQuery(params): ApiQuery<SetRoleParams>,
) -> ApiResult<Envelope<Value>> {
    let role = accounts::set_role(&state, &params.user_id, &params.role).await?;
    Ok(Envelope::ok(
        json!({ "user_id": params.user_id, "role": role }),
        format!("User role updated to {}", role),
    ))
}

async fn verify_invite(
    State(state): State<AppState>,
    ApiJson(data): ApiJson<VerifyInviteRequest>,
) -> ApiResult<Envelope<VerifiedInvite>> {
    let invite = accounts::verify_invite(&state, &data.token_hash).await?;
    Ok(Envelope::ok(invite, "Invitation verified successfully"))
}

async fn setup_password(
    State(state): State<AppState>,
    ApiJson(data): ApiJson<SetupPasswordRequest>,
) -> ApiResult<Envelope<()>> {
    accounts::setup_password(&state, &data.token_hash, &data.password).await?;
    Ok(Envelope::done(
        "Password set successfully. You can now login with your email and password.",
    ))
}

/// Landing page of the emailed invitation link.
async fn callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiQuery(params): ApiQuery<CallbackParams>,
) -> ApiResult<Response> {
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let outcome = accounts::callback(
        &state.config.deep_link_base,
        params.token_hash.as_deref(),
        params.kind.as_deref(),
        user_agent,
    )?;

    Ok(match outcome {
        Callback::Redirect(deep_link) => {
            (StatusCode::FOUND, [(header::LOCATION, deep_link)]).into_response()
        }
        Callback::Instructions { deep_link } => Envelope::ok(
            json!({ "deep_link": deep_link }),
            "Please open this link on your mobile device to continue setup",
        )
        .into_response(),
    })
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use newsdesk_shared::types::Role;
    use newsdesk_store::tables::PROFILES;
    use serde_json::json;

    use crate::testing::TestApp;

    #[tokio::test]
    async fn test_register_validation() {
        let app = TestApp::new();
        let short = app
            .post("/api/v1/auth/register", None, json!({ "email": "a@example.com", "password": "123" }))
            .await;
        assert_eq!(short.status, StatusCode::BAD_REQUEST);
        assert_eq!(short.error_code(), "PASSWORD_TOO_SHORT");

        let bad_email = app
            .post("/api/v1/auth/register", None, json!({ "email": "nope", "password": "secret123" }))
            .await;
        assert_eq!(bad_email.status, StatusCode::BAD_REQUEST);

        let body = json!({ "email": "a@example.com", "password": "secret123" });
        assert_eq!(app.post("/api/v1/auth/register", None, body.clone()).await.status, StatusCode::OK);
        let duplicate = app.post("/api/v1/auth/register", None, body).await;
        assert_eq!(duplicate.status, StatusCode::BAD_REQUEST);

        let malformed = app.post("/api/v1/auth/register", None, json!({ "email": 3 })).await;
        assert_eq!(malformed.status, StatusCode::BAD_REQUEST);
        assert_eq!(malformed.error_code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_login_refresh_logout() {
        let app = TestApp::new();
        app.post(
            "/api/v1/auth/register",
            None,
            json!({ "email": "r@example.com", "password": "secret123" }),
        )
        .await;

        let wrong = app
            .post("/api/v1/auth/login", None, json!({ "email": "r@example.com", "password": "bad-pass" }))
            .await;
        assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
        assert_eq!(wrong.body["message"], "Invalid credentials");

        let login = app
            .post("/api/v1/auth/login", None, json!({ "email": "r@example.com", "password": "secret123" }))
            .await;
        assert_eq!(login.data()["user"]["role"], "reader");
        let refresh_token = login.data()["refresh_token"].as_str().unwrap().to_string();

        let refreshed = app
            .post("/api/v1/auth/refresh", None, json!({ "refresh_token": refresh_token }))
            .await;
        assert_eq!(refreshed.status, StatusCode::OK);
        let token = refreshed.data()["access_token"].as_str().unwrap().to_string();

        let reused = app
            .post("/api/v1/auth/refresh", None, json!({ "refresh_token": refresh_token }))
            .await;
        assert_eq!(reused.status, StatusCode::UNAUTHORIZED);

        let me = app.get("/api/v1/auth/me", Some(&token)).await;
        assert_eq!(me.data()["user"]["email"], "r@example.com");
        assert!(me.data()["user"].get("access_token").is_none());

        assert_eq!(app.post("/api/v1/auth/logout", Some(&token), json!({})).await.status, StatusCode::OK);
        let after = app.get("/api/v1/auth/me", Some(&token)).await;
        assert_eq!(after.status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_update_me() {
        let app = TestApp::new();
        let token = app.token("me@example.com", Role::Reader).await;
        let reply = app
            .put("/api/v1/auth/me", Some(&token), Some(json!({ "display_name": "New Name" })))
            .await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.data()["profile"]["display_name"], "New Name");

        let me = app.get("/api/v1/auth/me", Some(&token)).await;
        assert_eq!(me.data()["user"]["display_name"], "New Name");
    }

    #[tokio::test]
    async fn test_google_sign_in_creates_reader_profile_once() {
        let app = TestApp::new();
        app.identity
            .register_id_token(
                "google",
                "google-token",
                "g@example.com",
                json!({ "full_name": "Gee Oogle", "picture": "https://img/g.png" }),
            )
            .await;

        for _ in 0..2 {
            let reply = app
                .post("/api/v1/auth/google", None, json!({ "id_token": "google-token" }))
                .await;
            assert_eq!(reply.status, StatusCode::OK);
            assert_eq!(reply.data()["user"]["role"], "reader");
            assert_eq!(reply.data()["user"]["display_name"], "Gee Oogle");
        }
        let profiles = app.store.rows(PROFILES).await;
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0]["avatar_url"], "https://img/g.png");

        let unknown = app.post("/api/v1/auth/google", None, json!({ "id_token": "other" })).await;
        assert_eq!(unknown.status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_invitation_flow() {
        let app = TestApp::new();
        let admin = app.token("admin@example.com", Role::Admin).await;

        let invite = json!({ "email": "new@example.com", "display_name": "Newbie", "channel_id": 3 });
        let reader = app.token("reader@example.com", Role::Reader).await;
        let denied = app.post("/api/v1/auth/admin/invite-author", Some(&reader), invite.clone()).await;
        assert_eq!(denied.status, StatusCode::FORBIDDEN);

        let sent = app.post("/api/v1/auth/admin/invite-author", Some(&admin), invite).await;
        assert_eq!(sent.status, StatusCode::OK);
        assert_eq!(sent.body["message"], "Author invitation sent successfully");
        let token_hash = app.identity.pending_invite("new@example.com").await.unwrap();

        let bad = app
            .post("/api/v1/auth/verify-invite", None, json!({ "token_hash": "bogus" }))
            .await;
        assert_eq!(bad.status, StatusCode::BAD_REQUEST);
        assert_eq!(bad.error_code(), "INVALID_INVITE");

        let verified = app
            .post("/api/v1/auth/verify-invite", None, json!({ "token_hash": token_hash }))
            .await;
        assert_eq!(verified.status, StatusCode::OK);
        assert_eq!(verified.data()["email"], "new@example.com");
        assert_eq!(verified.data()["user_metadata"]["role"], "author");

        let short = app
            .post(
                "/api/v1/auth/setup-password",
                None,
                json!({ "token_hash": token_hash, "password": "abc" }),
            )
            .await;
        assert_eq!(short.error_code(), "PASSWORD_TOO_SHORT");

        let set = app
            .post(
                "/api/v1/auth/setup-password",
                None,
                json!({ "token_hash": token_hash, "password": "brand-new-pass" }),
            )
            .await;
        assert_eq!(set.status, StatusCode::OK);

        let login = app
            .post(
                "/api/v1/auth/login",
                None,
                json!({ "email": "new@example.com", "password": "brand-new-pass" }),
            )
            .await;
        assert_eq!(login.status, StatusCode::OK);
        assert_eq!(login.data()["user"]["role"], "author");
        let author = login.data()["access_token"].as_str().unwrap().to_string();

        let submitted = app
            .post(
                "/api/v1/articles",
                Some(&author),
                json!({ "title": "From channel 3", "summary": "S", "content": "C" }),
            )
            .await;
        assert_eq!(submitted.data()["article"]["channel_id"], 3);
    }

    #[tokio::test]
    async fn test_set_role() {
        let app = TestApp::new();
        let admin = app.token("admin@example.com", Role::Admin).await;
        let (user_id, token) = app.user("someone@example.com", Role::Reader).await;

        let uri = format!("/api/v1/auth/admin/set-role?user_id={}&role=author", user_id);
        let reply = app.post(&uri, Some(&admin), json!({})).await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.body["message"], "User role updated to author");
        assert_eq!(reply.data()["role"], "author");

        let me = app.get("/api/v1/auth/me", Some(&token)).await;
        assert_eq!(me.data()["user"]["role"], "author");
        let user = app.identity.user(&user_id).await.unwrap();
        assert_eq!(user.metadata_str("role"), Some("author"));

        let uri = format!("/api/v1/auth/admin/set-role?user_id={}&role=editor", user_id);
        let invalid = app.post(&uri, Some(&admin), json!({})).await;
        assert_eq!(invalid.status, StatusCode::BAD_REQUEST);

        let missing = app
            .post("/api/v1/auth/admin/set-role?user_id=nobody&role=reader", Some(&admin), json!({}))
            .await;
        assert_eq!(missing.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_callback_redirects_mobile_browsers() {
        let app = TestApp::new();
        let uri = "/api/v1/auth/callback?token_hash=abc%2B1&type=invite";

        let request = Request::builder()
            .uri(uri)
            .header(header::USER_AGENT, "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0)")
            .body(Body::empty())
            .unwrap();
        let mobile = app.send(request).await;
        assert_eq!(mobile.status, StatusCode::FOUND);
        assert_eq!(
            mobile.headers[header::LOCATION],
            "newsapp://auth/invite?token_hash=abc%2B1"
        );

        let desktop = app.get(uri, None).await;
        assert_eq!(desktop.status, StatusCode::OK);
        assert_eq!(
            desktop.data()["deep_link"],
            "newsapp://auth/invite?token_hash=abc%2B1"
        );

        let wrong_type = app
            .get("/api/v1/auth/callback?token_hash=abc&type=recovery", None)
            .await;
        assert_eq!(wrong_type.status, StatusCode::BAD_REQUEST);
    }
}
