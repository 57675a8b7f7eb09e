use axum::{
    extract::{Path, State},
    routing::get,
    Router,
};
use serde_json::{json, Value};

use crate::api::AppState;
use crate::auth::{AdminOnly, Gated};
use crate::envelope::Envelope;
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiQuery};
use crate::pagination::Pagination;
use crate::services::articles::{self, ArticleFilter};
use crate::services::categories::{self, CategoryCreate, CategoryUpdate};
use crate::services::parse_int_id;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/:id", get(get_category).put(update).delete(delete))
        .route("/:id/articles", get(articles_in))
}

async fn list(
    State(state): State<AppState>,
    ApiQuery(pagination): ApiQuery<Pagination>,
) -> ApiResult<Envelope<Value>> {
    let page = pagination.validate()?;
    let categories = categories::list(&state, page).await?;
    Ok(Envelope::ok(
        json!({ "categories": categories, "page": page.page, "limit": page.limit }),
        "Categories retrieved",
    ))
}

async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Envelope<Value>> {
    let category = categories::get(&state, &id).await?;
    Ok(Envelope::ok(json!({ "category": category }), "Category retrieved"))
}

/// Published articles tagged with the category.
async fn articles_in(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiQuery(pagination): ApiQuery<Pagination>,
) -> ApiResult<Envelope<Value>> {
    let page = pagination.validate()?;
    let category = parse_int_id(&id, "category")?;
    categories::get(&state, &id).await?;
    let filter = ArticleFilter {
        category: Some(category),
        channel: None,
    };
    let articles = articles::list(&state, filter, page).await?;
    Ok(Envelope::ok(
        json!({ "articles": articles, "page": page.page, "limit": page.limit }),
        "Category articles retrieved",
    ))
}

async fn create(
    State(state): State<AppState>,
    _admin: Gated<AdminOnly>,
    ApiJson(data): ApiJson<CategoryCreate>,
) -> ApiResult<Envelope<Value>> {
    let category = categories::create(&state, data).await?;
    Ok(Envelope::ok(
        json!({ "category": category }),
        "Category created successfully",
    ))
}

async fn update(
    State(state): State<AppState>,
    _admin: Gated<AdminOnly>,
    Path(id): Path<String>,
    ApiJson(data): ApiJson<CategoryUpdate>,
) -> ApiResult<Envelope<Value>> {
    let category = categories::update(&state, &id, data).await?;
    Ok(Envelope::ok(
        json!({ "category": category }),
        "Category updated successfully",
    ))
}

async fn delete(
    State(state): State<AppState>,
    _admin: Gated<AdminOnly>,
    Path(id): Path<String>,
) -> ApiResult<Envelope<()>> {
    categories::delete(&state, &id).await?;
    Ok(Envelope::done("Category deleted successfully"))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use newsdesk_shared::types::Role;
    use serde_json::json;

    use crate::testing::TestApp;

    #[tokio::test]
    async fn test_crud_and_delete_conflict() {
        let app = TestApp::new();
        let admin = app.token("admin@example.com", Role::Admin).await;
        let reader = app.token("reader@example.com", Role::Reader).await;

        let body = json!({ "name": "Politics", "slug": "politics" });
        let denied = app.post("/api/v1/categories", Some(&reader), body.clone()).await;
        assert_eq!(denied.status, StatusCode::FORBIDDEN);

        let created = app.post("/api/v1/categories", Some(&admin), body).await;
        assert_eq!(created.status, StatusCode::OK);
        let id = created.data()["category"]["id"].as_i64().unwrap();
        let other = app
            .post("/api/v1/categories", Some(&admin), json!({ "name": "Tech", "slug": "tech" }))
            .await;
        let other_id = other.data()["category"]["id"].as_i64().unwrap();

        let renamed = app
            .put(
                &format!("/api/v1/categories/{}", id),
                Some(&admin),
                Some(json!({ "name": "World Politics" })),
            )
            .await;
        assert_eq!(renamed.data()["category"]["name"], "World Politics");
        assert_eq!(renamed.data()["category"]["slug"], "politics");

        let mut article = json!({ "title": "Vote", "summary": "S", "content": "C" });
        article["category_id"] = json!(id);
        article["status"] = json!("published");
        app.post("/api/v1/articles/admin", Some(&admin), article).await;

        let tagged = app.get(&format!("/api/v1/categories/{}/articles", id), None).await;
        assert_eq!(tagged.data()["articles"].as_array().unwrap().len(), 1);

        let refused = app.delete(&format!("/api/v1/categories/{}", id), Some(&admin)).await;
        assert_eq!(refused.status, StatusCode::BAD_REQUEST);
        assert_eq!(refused.body["message"], "Cannot delete category with existing articles");

        let deleted = app.delete(&format!("/api/v1/categories/{}", other_id), Some(&admin)).await;
        assert_eq!(deleted.status, StatusCode::OK);

        let listed = app.get("/api/v1/categories", None).await;
        assert_eq!(listed.data()["categories"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_category() {
        let app = TestApp::new();
        assert_eq!(app.get("/api/v1/categories/7", None).await.status, StatusCode::NOT_FOUND);
        assert_eq!(
            app.get("/api/v1/categories/7/articles", None).await.status,
            StatusCode::NOT_FOUND
        );
        assert_eq!(app.get("/api/v1/categories/abc", None).await.status, StatusCode::BAD_REQUEST);
    }
}
