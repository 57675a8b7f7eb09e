use chrono::{DateTime, Utc};
use newsdesk_shared::models::Category;
use newsdesk_store::tables::{ARTICLE_CATEGORIES, CATEGORIES};
use newsdesk_store::{Query, Store, StoreExt};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::AppState;
use crate::error::{ApiError, ApiResult};
use crate::pagination::Page;
use crate::services::{parse_int_id, required};

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryCreate {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parent_id: Option<i64>,
}

/// Partial update; absent fields keep their value.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CategoryUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<i64>,
}

#[derive(Serialize)]
struct CategoryPatch {
    #[serde(flatten)]
    fields: CategoryUpdate,
    updated_at: DateTime<Utc>,
}

pub async fn list(state: &AppState, page: Page) -> ApiResult<Vec<Category>> {
    let query = Query::table(CATEGORIES).order("created_at", true);
    Ok(state.store.fetch(&page.apply(query)).await?)
}

pub async fn get(state: &AppState, id: &str) -> ApiResult<Category> {
    let id = parse_int_id(id, "category")?;
    state
        .store
        .fetch_one(&Query::table(CATEGORIES).eq("id", id))
        .await?
        .ok_or_else(|| ApiError::not_found("Category"))
}

pub async fn create(state: &AppState, data: CategoryCreate) -> ApiResult<Category> {
    let name = required("name", &data.name)?;
    let slug = required("slug", &data.slug)?;

    let row = serde_json::json!({
        "name": name,
        "slug": slug,
        "description": data.description,
        "parent_id": data.parent_id,
    });
    let category: Category = state.store.insert_one(CATEGORIES, &row).await?;
    info!(category_id = category.id, slug = %category.slug, "Category created");
    Ok(category)
}

pub async fn update(state: &AppState, id: &str, data: CategoryUpdate) -> ApiResult<Category> {
    let id = parse_int_id(id, "category")?;
    if let Some(name) = &data.name {
        required("name", name)?;
    }
    if let Some(slug) = &data.slug {
        required("slug", slug)?;
    }

    let patch = CategoryPatch {
        fields: data,
        updated_at: Utc::now(),
    };
    let updated: Vec<Category> = state
        .store
        .update_rows(&Query::table(CATEGORIES).eq("id", id), &patch)
        .await?;
    updated
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::not_found("Category"))
}

/// Delete a category nothing is tagged with.
pub async fn delete(state: &AppState, id: &str) -> ApiResult<()> {
    let id = parse_int_id(id, "category")?;
    get(state, &id.to_string()).await?;

    let tagged = state
        .store
        .count(&Query::table(ARTICLE_CATEGORIES).eq("category_id", id))
        .await?;
    if tagged > 0 {
        return Err(ApiError::Conflict(
            "Cannot delete category with existing articles".into(),
        ));
    }

    state
        .store
        .delete(&Query::table(CATEGORIES).eq("id", id))
        .await?;
    info!(category_id = id, "Category deleted");
    Ok(())
}
