use axum::{
    extract::{Path, State},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};

use crate::api::AppState;
use crate::auth::{AdminOnly, Gated, ReaderOnly};
use crate::envelope::Envelope;
use crate::error::ApiResult;
use crate::extract::ApiJson;
use crate::services::channels::{self, ChannelCreate, ChannelUpdate};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(active).post(create))
        .route("/followed", get(followed))
        .route("/admin/list", get(all))
        .route("/:id", get(get_channel).put(update).delete(delete))
        .route("/:id/follow", post(follow).delete(unfollow))
}

async fn active(State(state): State<AppState>) -> ApiResult<Envelope<Value>> {
    let channels = channels::active(&state).await?;
    Ok(Envelope::ok(
        json!({ "channels": channels }),
        "Active channels retrieved successfully",
    ))
}

async fn all(
    State(state): State<AppState>,
    _admin: Gated<AdminOnly>,
) -> ApiResult<Envelope<Value>> {
    let channels = channels::all(&state).await?;
    Ok(Envelope::ok(
        json!({ "channels": channels }),
        "All channels retrieved successfully",
    ))
}

async fn followed(
    State(state): State<AppState>,
    reader: Gated<ReaderOnly>,
) -> ApiResult<Envelope<Value>> {
    let channels = channels::followed(&state, &reader).await?;
    Ok(Envelope::ok(
        json!({ "channels": channels }),
        "Followed channels retrieved successfully",
    ))
}

async fn get_channel(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Envelope<Value>> {
    let channel = channels::get(&state, &id).await?;
    Ok(Envelope::ok(
        json!({ "channel": channel }),
        "Channel retrieved successfully",
    ))
}

async fn create(
    State(state): State<AppState>,
    _admin: Gated<AdminOnly>,
    ApiJson(data): ApiJson<ChannelCreate>,
) -> ApiResult<Envelope<Value>> {
    let channel = channels::create(&state, data).await?;
    Ok(Envelope::ok(
        json!({ "channel": channel }),
        "Channel created successfully",
    ))
}

async fn update(
    State(state): State<AppState>,
    _admin: Gated<AdminOnly>,
    Path(id): Path<String>,
    ApiJson(data): ApiJson<ChannelUpdate>,
) -> ApiResult<Envelope<Value>> {
    let channel = channels::update(&state, &id, data).await?;
    Ok(Envelope::ok(
        json!({ "channel": channel }),
        "Channel updated successfully",
    ))
}

async fn delete(
    State(state): State<AppState>,
    _admin: Gated<AdminOnly>,
    Path(id): Path<String>,
) -> ApiResult<Envelope<()>> {
    channels::delete(&state, &id).await?;
    Ok(Envelope::done("Channel deleted successfully"))
}

async fn follow(
    State(state): State<AppState>,
    reader: Gated<ReaderOnly>,
    Path(id): Path<String>,
) -> ApiResult<Envelope<()>> {
    channels::follow(&state, &id, &reader).await?;
    Ok(Envelope::done("Channel followed successfully"))
}

async fn unfollow(
    State(state): State<AppState>,
    reader: Gated<ReaderOnly>,
    Path(id): Path<String>,
) -> ApiResult<Envelope<()>> {
    channels::unfollow(&state, &id, &reader).await?;
    Ok(Envelope::done("Channel unfollowed successfully"))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use newsdesk_shared::types::Role;
    use serde_json::json;

    use crate::testing::TestApp;

    async fn channel(app: &TestApp, admin: &str, name: &str, active: bool) -> i64 {
        let reply = app
            .post(
                "/api/v1/channels",
                Some(admin),
                json!({ "name": name, "slug": name.to_lowercase(), "is_active": active }),
            )
            .await;
        assert_eq!(reply.status, StatusCode::OK);
        reply.data()["channel"]["id"].as_i64().unwrap()
    }

    #[tokio::test]
    async fn test_public_list_shows_active_only() {
        let app = TestApp::new();
        let admin = app.token("admin@example.com", Role::Admin).await;
        channel(&app, &admin, "Zeta", true).await;
        channel(&app, &admin, "Alpha", true).await;
        channel(&app, &admin, "Hidden", false).await;

        let public = app.get("/api/v1/channels", None).await;
        let names: Vec<_> = public.data()["channels"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, ["Alpha", "Zeta"]);

        let all = app.get("/api/v1/channels/admin/list", Some(&admin)).await;
        assert_eq!(all.data()["channels"].as_array().unwrap().len(), 3);
        let reader = app.token("reader@example.com", Role::Reader).await;
        let denied = app.get("/api/v1/channels/admin/list", Some(&reader)).await;
        assert_eq!(denied.status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_delete_refuses_channels_with_articles() {
        let app = TestApp::new();
        let admin = app.token("admin@example.com", Role::Admin).await;
        let busy = channel(&app, &admin, "Busy", true).await;
        let idle = channel(&app, &admin, "Idle", true).await;
        assert_eq!(busy, 1);
        app.published_article("On busy", 1).await;

        let refused = app.delete(&format!("/api/v1/channels/{}", busy), Some(&admin)).await;
        assert_eq!(refused.status, StatusCode::BAD_REQUEST);
        assert_eq!(refused.error_code(), "CONFLICT");
        assert_eq!(refused.body["message"], "Cannot delete channel with existing articles");

        let deleted = app.delete(&format!("/api/v1/channels/{}", idle), Some(&admin)).await;
        assert_eq!(deleted.status, StatusCode::OK);
        let gone = app.get(&format!("/api/v1/channels/{}", idle), None).await;
        assert_eq!(gone.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_update_changes_only_given_fields() {
        let app = TestApp::new();
        let admin = app.token("admin@example.com", Role::Admin).await;
        let id = channel(&app, &admin, "Daily", true).await;
        let uri = format!("/api/v1/channels/{}", id);

        let reply = app.put(&uri, Some(&admin), Some(json!({ "description": "News" }))).await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.data()["channel"]["name"], "Daily");
        assert_eq!(reply.data()["channel"]["description"], "News");

        let unchanged = app.put(&uri, Some(&admin), Some(json!({}))).await;
        assert_eq!(unchanged.data()["channel"]["description"], "News");

        let missing = app.put("/api/v1/channels/99", Some(&admin), Some(json!({ "name": "X" }))).await;
        assert_eq!(missing.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_follow_flow() {
        let app = TestApp::new();
        let admin = app.token("admin@example.com", Role::Admin).await;
        let reader = app.token("reader@example.com", Role::Reader).await;
        let author = app.token("author@example.com", Role::Author).await;
        let id = channel(&app, &admin, "Sports", true).await;
        let uri = format!("/api/v1/channels/{}/follow", id);

        assert_eq!(app.post(&uri, Some(&author), json!({})).await.status, StatusCode::FORBIDDEN);
        assert_eq!(app.post(&uri, Some(&admin), json!({})).await.status, StatusCode::FORBIDDEN);

        let followed = app.post(&uri, Some(&reader), json!({})).await;
        assert_eq!(followed.status, StatusCode::OK);
        assert_eq!(followed.body["message"], "Channel followed successfully");

        let again = app.post(&uri, Some(&reader), json!({})).await;
        assert_eq!(again.status, StatusCode::BAD_REQUEST);
        assert_eq!(again.body["message"], "Already following this channel");

        let list = app.get("/api/v1/channels/followed", Some(&reader)).await;
        let channels = list.data()["channels"].as_array().unwrap();
        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0]["name"], "Sports");
        assert!(channels[0]["followed_at"].is_string());

        let missing = app.post("/api/v1/channels/42/follow", Some(&reader), json!({})).await;
        assert_eq!(missing.status, StatusCode::NOT_FOUND);

        assert_eq!(app.delete(&uri, Some(&reader)).await.status, StatusCode::OK);
        let list = app.get("/api/v1/channels/followed", Some(&reader)).await;
        assert_eq!(list.data()["channels"], json!([]));
    }
}
