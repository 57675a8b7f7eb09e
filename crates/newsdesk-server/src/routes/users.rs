use axum::{
    extract::{Path, State},
    routing::{get, put},
    Router,
};
use serde_json::{json, Value};

use crate::api::AppState;
use crate::auth::{AdminOnly, Gated, Principal};
use crate::envelope::Envelope;
use crate::error::ApiResult;
use crate::extract::ApiQuery;
use crate::pagination::Pagination;
use crate::services::{articles, users};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/me/bookmarks", get(my_bookmarks))
        .route("/me/articles", get(my_articles))
        .route("/admin/profiles", get(profiles))
        .route("/admin/ban/:id", put(ban))
        .route("/admin/unban/:id", put(unban))
        .route("/admin/approve-author/:id", put(approve_author))
}

async fn my_bookmarks(
    State(state): State<AppState>,
    principal: Principal,
) -> ApiResult<Envelope<Value>> {
    let bookmarks = articles::bookmarks(&state, &principal.user_id).await?;
    Ok(Envelope::ok(json!({ "bookmarks": bookmarks }), "Bookmarks retrieved"))
}

async fn my_articles(
    State(state): State<AppState>,
    principal: Principal,
    ApiQuery(pagination): ApiQuery<Pagination>,
) -> ApiResult<Envelope<Value>> {
    let page = pagination.validate()?;
    let articles = articles::by_author(&state, &principal.user_id, page).await?;
    Ok(Envelope::ok(
        json!({ "articles": articles, "page": page.page, "limit": page.limit }),
        "Your articles retrieved",
    ))
}

async fn profiles(
    State(state): State<AppState>,
    _admin: Gated<AdminOnly>,
) -> ApiResult<Envelope<Value>> {
    let profiles = users::all_profiles(&state).await?;
    Ok(Envelope::ok(
        json!({ "profiles": profiles }),
        "All user profiles retrieved",
    ))
}

async fn ban(
    State(state): State<AppState>,
    _admin: Gated<AdminOnly>,
    Path(user_id): Path<String>,
) -> ApiResult<Envelope<Value>> {
    users::ban(&state, &user_id).await?;
    Ok(Envelope::ok(json!({ "user_id": user_id }), "User banned"))
}

async fn unban(
    State(state): State<AppState>,
    _admin: Gated<AdminOnly>,
    Path(user_id): Path<String>,
) -> ApiResult<Envelope<Value>> {
    users::unban(&state, &user_id).await?;
    Ok(Envelope::ok(json!({ "user_id": user_id }), "User unbanned"))
}

async fn approve_author(
    State(state): State<AppState>,
    _admin: Gated<AdminOnly>,
    Path(user_id): Path<String>,
) -> ApiResult<Envelope<Value>> {
    users::approve_author(&state, &user_id).await?;
    Ok(Envelope::ok(
        json!({ "user_id": user_id, "role": "author" }),
        "Author approved",
    ))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use newsdesk_shared::types::Role;
    use newsdesk_store::IdentityProvider;
    use serde_json::json;

    use crate::testing::{TestApp, PASSWORD};

    #[tokio::test]
    async fn test_ban_and_unban() {
        let app = TestApp::new();
        let admin = app.token("admin@example.com", Role::Admin).await;
        let (user_id, token) = app.user("troll@example.com", Role::Reader).await;

        let banned = app
            .put(&format!("/api/v1/users/admin/ban/{}", user_id), Some(&admin), None)
            .await;
        assert_eq!(banned.status, StatusCode::OK);
        assert_eq!(banned.body["message"], "User banned");
        assert_eq!(app.get("/api/v1/auth/me", Some(&token)).await.status, StatusCode::UNAUTHORIZED);
        assert!(app
            .identity
            .sign_in_with_password("troll@example.com", PASSWORD)
            .await
            .is_err());

        let unbanned = app
            .put(&format!("/api/v1/users/admin/unban/{}", user_id), Some(&admin), None)
            .await;
        assert_eq!(unbanned.status, StatusCode::OK);
        assert!(app
            .identity
            .sign_in_with_password("troll@example.com", PASSWORD)
            .await
            .is_ok());

        let unknown = app.put("/api/v1/users/admin/ban/nobody", Some(&admin), None).await;
        assert_eq!(unknown.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_admin_endpoints_are_gated() {
        let app = TestApp::new();
        let author = app.token("author@example.com", Role::Author).await;
        for uri in [
            "/api/v1/users/admin/ban/x",
            "/api/v1/users/admin/unban/x",
            "/api/v1/users/admin/approve-author/x",
        ] {
            assert_eq!(app.put(uri, Some(&author), None).await.status, StatusCode::FORBIDDEN);
        }
        let profiles = app.get("/api/v1/users/admin/profiles", Some(&author)).await;
        assert_eq!(profiles.status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_profiles_and_own_articles() {
        let app = TestApp::new();
        let admin = app.token("admin@example.com", Role::Admin).await;
        let author = app.token("author@example.com", Role::Author).await;

        let body = json!({ "title": "Mine", "summary": "S", "content": "C" });
        app.post("/api/v1/articles", Some(&author), body).await;
        app.published_article("Someone else's", 1).await;

        let mine = app.get("/api/v1/users/me/articles", Some(&author)).await;
        let articles = mine.data()["articles"].as_array().unwrap();
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0]["title"], "Mine");
        assert_eq!(articles[0]["status"], "pending_review");

        let profiles = app.get("/api/v1/users/admin/profiles", Some(&admin)).await;
        assert_eq!(profiles.data()["profiles"].as_array().unwrap().len(), 2);
    }
}
