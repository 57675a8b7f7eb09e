use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Router,
};
use newsdesk_shared::models::{Article, ArticleView};
use newsdesk_shared::types::ArticleStatus;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::api::AppState;
use crate::auth::{AdminOnly, AuthorOnly, Gated, ReaderOnly};
use crate::envelope::Envelope;
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiQuery};
use crate::pagination::{Page, Pagination};
use crate::services::articles::{self, ArticleCreate, ArticleFilter};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/search", get(search))
        .route("/admin", post(admin_create))
        .route("/admin/all", get(admin_all))
        .route("/admin/pending", get(pending))
        .route("/admin/approve/:id", put(approve))
        .route("/admin/reject/:id", put(reject))
        .route("/:id", get(get_article))
        .route("/:id/status", put(update_status))
        .route("/:id/publish", put(publish))
        .route("/:id/comments", get(comments).post(add_comment))
        .route("/:id/bookmark", post(bookmark).delete(remove_bookmark))
}

#[derive(Debug, Deserialize)]
struct ListParams {
    page: Option<u32>,
    limit: Option<u32>,
    category: Option<i64>,
    channel: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: String,
    page: Option<u32>,
    limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct StatusParams {
    status: String,
}

#[derive(Debug, Deserialize)]
struct CommentCreate {
    content: String,
}

#[derive(Debug, Serialize)]
struct ArticlePage<T> {
    articles: Vec<T>,
    page: u32,
    limit: u32,
}

impl<T> ArticlePage<T> {
    fn new(articles: Vec<T>, page: Page) -> Self {
        Self {
            articles,
            page: page.page,
            limit: page.limit,
        }
    }
}

fn with_article(article: &Article) -> Value {
    json!({ "article": article })
}

async fn list(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ListParams>,
) -> ApiResult<Envelope<ArticlePage<ArticleView>>> {
    let page = Pagination {
        page: params.page,
        limit: params.limit,
    }
    .validate()?;
    let filter = ArticleFilter {
        category: params.category,
        channel: params.channel,
    };
    let articles = articles::list(&state, filter, page).await?;
    Ok(Envelope::ok(ArticlePage::new(articles, page), "Articles retrieved"))
}

async fn search(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<SearchParams>,
) -> ApiResult<Envelope<ArticlePage<ArticleView>>> {
    let page = Pagination {
        page: params.page,
        limit: params.limit,
    }
    .validate()?;
    let articles = articles::search(&state, &params.q, page).await?;
    Ok(Envelope::ok(ArticlePage::new(articles, page), "Articles searched"))
}

async fn get_article(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Envelope<Value>> {
    let article = articles::get(&state, &id).await?;
    Ok(Envelope::ok(json!({ "article": article }), "Article retrieved"))
}

async fn create(
    State(state): State<AppState>,
    author: Gated<AuthorOnly>,
    ApiJson(data): ApiJson<ArticleCreate>,
) -> ApiResult<Envelope<Value>> {
    let article = articles::create(&state, data, &author).await?;
    Ok(Envelope::ok(
        with_article(&article),
        "Article created and pending approval",
    ))
}

async fn admin_create(
    State(state): State<AppState>,
    admin: Gated<AdminOnly>,
    ApiJson(data): ApiJson<ArticleCreate>,
) -> ApiResult<Envelope<Value>> {
    let article = articles::admin_create(&state, data, &admin).await?;
    Ok(Envelope::ok(with_article(&article), "Article created successfully"))
}

async fn admin_all(
    State(state): State<AppState>,
    _admin: Gated<AdminOnly>,
    ApiQuery(pagination): ApiQuery<Pagination>,
) -> ApiResult<Envelope<ArticlePage<ArticleView>>> {
    let page = pagination.validate()?;
    let articles = articles::all(&state, page).await?;
    Ok(Envelope::ok(
        ArticlePage::new(articles, page),
        "All articles retrieved (admin)",
    ))
}

async fn pending(
    State(state): State<AppState>,
    _admin: Gated<AdminOnly>,
) -> ApiResult<Envelope<Value>> {
    let articles = articles::pending(&state).await?;
    Ok(Envelope::ok(
        json!({ "articles": articles }),
        "Pending articles retrieved",
    ))
}

async fn approve(
    State(state): State<AppState>,
    _admin: Gated<AdminOnly>,
    Path(id): Path<String>,
) -> ApiResult<Envelope<Value>> {
    let article = articles::update_status(&state, &id, ArticleStatus::Published).await?;
    Ok(Envelope::ok(
        with_article(&article),
        "Article approved and published",
    ))
}

async fn reject(
    State(state): State<AppState>,
    _admin: Gated<AdminOnly>,
    Path(id): Path<String>,
) -> ApiResult<Envelope<Value>> {
    let article = articles::update_status(&state, &id, ArticleStatus::Rejected).await?;
    Ok(Envelope::ok(with_article(&article), "Article rejected"))
}

async fn update_status(
    State(state): State<AppState>,
    _admin: Gated<AdminOnly>,
    Path(id): Path<String>,
    ApiQuery(params): ApiQuery<StatusParams>,
) -> ApiResult<Envelope<Value>> {
    let status: ArticleStatus = params.status.parse()?;
    let article = articles::update_status(&state, &id, status).await?;
    Ok(Envelope::ok(
        with_article(&article),
        format!("Article status updated to {}", status),
    ))
}

async fn publish(
    State(state): State<AppState>,
    _admin: Gated<AdminOnly>,
    Path(id): Path<String>,
) -> ApiResult<Envelope<Value>> {
    let article = articles::publish(&state, &id).await?;
    Ok(Envelope::ok(with_article(&article), "Article published"))
}

async fn comments(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Envelope<Value>> {
    let comments = articles::comments(&state, &id).await?;
    Ok(Envelope::ok(json!({ "comments": comments }), "Comments retrieved"))
}

async fn add_comment(
    State(state): State<AppState>,
    reader: Gated<ReaderOnly>,
    Path(id): Path<String>,
    ApiJson(data): ApiJson<CommentCreate>,
) -> ApiResult<Envelope<Value>> {
    let comment = articles::add_comment(&state, &id, &data.content, &reader).await?;
    Ok(Envelope::ok(json!({ "comment": comment }), "Comment added"))
}

async fn bookmark(
    State(state): State<AppState>,
    reader: Gated<ReaderOnly>,
    Path(id): Path<String>,
) -> ApiResult<Envelope<Value>> {
    let bookmark = articles::bookmark(&state, &id, &reader).await?;
    Ok(Envelope::ok(json!({ "bookmark": bookmark }), "Article bookmarked"))
}

async fn remove_bookmark(
    State(state): State<AppState>,
    reader: Gated<ReaderOnly>,
    Path(id): Path<String>,
) -> ApiResult<Envelope<()>> {
    articles::remove_bookmark(&state, &id, &reader).await?;
    Ok(Envelope::done("Bookmark removed"))
}
