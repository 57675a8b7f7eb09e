//! Articles and the reader interactions hanging off them (comments and
//! bookmarks).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use newsdesk_shared::models::{
    Article, ArticleCategory, ArticleView, AuthorSummary, Bookmark, BookmarkView, Comment, CommentView,
};
use newsdesk_shared::slug::{slugify, with_timestamp_suffix};
use newsdesk_shared::types::ArticleStatus;
use newsdesk_store::tables::{ARTICLES, ARTICLE_CATEGORIES, BOOKMARKS, COMMENTS};
use newsdesk_store::{Query, Store, StoreExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::api::AppState;
use crate::auth::Principal;
use crate::error::{ApiError, ApiResult};
use crate::lookup::{ArticleLinks, ProfileDirectory};
use crate::pagination::Page;
use crate::services::{parse_uuid, required};

#[derive(Debug, Clone, Deserialize)]
pub struct ArticleCreate {
    pub title: String,
    pub summary: String,
    pub content: String,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub channel_id: Option<i64>,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub hero_image_url: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    /// Honoured on the admin route only.
    #[serde(default)]
    pub status: Option<ArticleStatus>,
}

/// Optional narrowing of the public listing.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArticleFilter {
    pub category: Option<i64>,
    pub channel: Option<i64>,
}

#[derive(Serialize)]
struct NewArticle<'a> {
    title: &'a str,
    slug: &'a str,
    summary: &'a str,
    content: &'a str,
    channel_id: i64,
    user_id: &'a str,
    view_count: i64,
    hero_image_url: Option<&'a str>,
    source_url: Option<&'a str>,
    language: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<ArticleStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    published_at: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
struct StatusPatch {
    status: ArticleStatus,
    updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    published_at: Option<DateTime<Utc>>,
}

impl StatusPatch {
    fn new(status: ArticleStatus) -> Self {
        let now = Utc::now();
        Self {
            status,
            updated_at: now,
            published_at: (status == ArticleStatus::Published).then_some(now),
        }
    }
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// Published articles, newest first.
pub async fn list(state: &AppState, filter: ArticleFilter, page: Page) -> ApiResult<Vec<ArticleView>> {
    let mut query = Query::table(ARTICLES).eq("status", ArticleStatus::Published.as_str());

    if let Some(category_id) = filter.category {
        let tagged: Vec<ArticleCategory> = state
            .store
            .fetch(
                &Query::table(ARTICLE_CATEGORIES)
                    .select("article_id,category_id")
                    .eq("category_id", category_id),
            )
            .await?;
        if tagged.is_empty() {
            return Ok(Vec::new());
        }
        query = query.in_list("id", tagged.iter().map(|t| t.article_id.to_string()));
    }
    if let Some(channel_id) = filter.channel {
        query = query.eq("channel_id", channel_id);
    }

    let articles: Vec<Article> = state
        .store
        .fetch(&page.apply(query.order("created_at", true)))
        .await?;
    with_details(state.store.as_ref(), articles).await
}

/// Published articles whose title contains `q`, case-insensitively.
pub async fn search(state: &AppState, q: &str, page: Page) -> ApiResult<Vec<ArticleView>> {
    let q = required("Search query", q)?;
    let query = Query::table(ARTICLES)
        .ilike("title", format!("%{}%", q))
        .eq("status", ArticleStatus::Published.as_str())
        .order("created_at", true);

    let articles: Vec<Article> = state.store.fetch(&page.apply(query)).await?;
    with_details(state.store.as_ref(), articles).await
}

/// One article in any status. Every read counts as a view.
pub async fn get(state: &AppState, id: &str) -> ApiResult<ArticleView> {
    let id = parse_uuid(id, "article")?;
    let article = find(state.store.as_ref(), id).await?;

    let updated: Vec<Article> = state
        .store
        .update_rows(
            &Query::table(ARTICLES).eq("id", id.to_string()),
            &serde_json::json!({ "view_count": article.view_count + 1 }),
        )
        .await?;
    let article = updated
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::not_found("Article"))?;

    let author = match article.user_id.as_deref() {
        Some(user_id) => ProfileDirectory::new(state.store.as_ref()).author(user_id).await?,
        None => AuthorSummary::anonymous(""),
    };
    let links = ArticleLinks::load(state.store.as_ref(), std::slice::from_ref(&article)).await?;
    Ok(ArticleView {
        channel: links.channel(&article),
        article_categories: links.categories(&article),
        article,
        author,
    })
}

/// Every article awaiting review, newest first.
pub async fn pending(state: &AppState) -> ApiResult<Vec<ArticleView>> {
    let query = Query::table(ARTICLES)
        .eq("status", ArticleStatus::PendingReview.as_str())
        .order("created_at", true);
    let articles: Vec<Article> = state.store.fetch(&query).await?;
    with_details(state.store.as_ref(), articles).await
}

/// Every article regardless of status.
pub async fn all(state: &AppState, page: Page) -> ApiResult<Vec<ArticleView>> {
    let query = Query::table(ARTICLES).order("created_at", true);
    let articles: Vec<Article> = state.store.fetch(&page.apply(query)).await?;
    with_details(state.store.as_ref(), articles).await
}

/// Articles written by `user_id`, any status.
pub async fn by_author(state: &AppState, user_id: &str, page: Page) -> ApiResult<Vec<Article>> {
    let query = Query::table(ARTICLES)
        .eq("user_id", user_id)
        .order("created_at", true);
    Ok(state.store.fetch(&page.apply(query)).await?)
}

async fn find(store: &dyn Store, id: Uuid) -> ApiResult<Article> {
    store
        .fetch_one(&Query::table(ARTICLES).eq("id", id.to_string()))
        .await?
        .ok_or_else(|| ApiError::not_found("Article"))
}

async fn with_details(store: &dyn Store, articles: Vec<Article>) -> ApiResult<Vec<ArticleView>> {
    let authors = ProfileDirectory::new(store)
        .authors(articles.iter().filter_map(|a| a.user_id.as_deref()))
        .await?;
    let links = ArticleLinks::load(store, &articles).await?;
    Ok(articles
        .into_iter()
        .map(|article| ArticleView {
            author: authors.get(article.user_id.as_deref()),
            channel: links.channel(&article),
            article_categories: links.categories(&article),
            article,
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// Author submission: lands in review on the author's channel and tells
/// the admins.
pub async fn create(state: &AppState, data: ArticleCreate, author: &Principal) -> ApiResult<Article> {
    let channel_id = author
        .channel_id
        .or(state.config.default_channel_id)
        .ok_or_else(|| ApiError::validation("No channel assigned to this author"))?;

    let article = insert(state, &data, &author.user_id, channel_id, None).await?;
    info!(article_id = %article.id, user_id = %author.user_id, channel_id, "Article submitted for review");

    state.notifier.article_submitted(&article, author.public_name());
    Ok(article)
}

/// Admin creation with an explicit status and channel.
pub async fn admin_create(state: &AppState, data: ArticleCreate, admin: &Principal) -> ApiResult<Article> {
    let channel_id = data
        .channel_id
        .or(state.config.default_channel_id)
        .ok_or_else(|| ApiError::validation("channel_id is required"))?;

    let article = insert(state, &data, &admin.user_id, channel_id, data.status).await?;
    info!(article_id = %article.id, status = %article.status, "Article created by admin");
    Ok(article)
}

async fn insert(
    state: &AppState,
    data: &ArticleCreate,
    user_id: &str,
    channel_id: i64,
    status: Option<ArticleStatus>,
) -> ApiResult<Article> {
    let title = required("title", &data.title)?;
    let summary = required("summary", &data.summary)?;
    let content = required("content", &data.content)?;
    let slug = unique_slug(state.store.as_ref(), title).await?;

    let row = NewArticle {
        title,
        slug: &slug,
        summary,
        content,
        channel_id,
        user_id,
        view_count: 0,
        hero_image_url: data.hero_image_url.as_deref(),
        source_url: data.source_url.as_deref(),
        language: data.language.as_deref(),
        status,
        published_at: (status == Some(ArticleStatus::Published)).then(Utc::now),
    };
    let article: Article = state.store.insert_one(ARTICLES, &row).await?;

    if let Some(category_id) = data.category_id {
        let link = ArticleCategory {
            article_id: article.id,
            category_id,
        };
        let _: ArticleCategory = state.store.insert_one(ARTICLE_CATEGORIES, &link).await?;
    }
    Ok(article)
}

async fn unique_slug(store: &dyn Store, title: &str) -> ApiResult<String> {
    let base = slugify(title)?;
    if !slug_taken(store, &base).await? {
        return Ok(base);
    }

    let stamped = with_timestamp_suffix(&base, Utc::now());
    debug!(slug = %base, candidate = %stamped, "Slug taken, adding timestamp");
    let mut candidate = stamped.clone();
    let mut n = 1;
    while slug_taken(store, &candidate).await? {
        n += 1;
        candidate = format!("{}-{}", stamped, n);
    }
    Ok(candidate)
}

async fn slug_taken(store: &dyn Store, slug: &str) -> ApiResult<bool> {
    Ok(store
        .exists(&Query::table(ARTICLES).select("id").eq("slug", slug))
        .await?)
}

/// Move an article to `status`, notifying its author and the admins.
pub async fn update_status(state: &AppState, id: &str, status: ArticleStatus) -> ApiResult<Article> {
    let id = parse_uuid(id, "article")?;
    let query = Query::table(ARTICLES).eq("id", id.to_string());
    let article = apply_status(state, query, status)
        .await?
        .ok_or_else(|| ApiError::not_found("Article"))?;

    notify_status(state, &article, status).await;
    Ok(article)
}

/// Publish an article that is still pending review.
pub async fn publish(state: &AppState, id: &str) -> ApiResult<Article> {
    let id = parse_uuid(id, "article")?;
    let current = find(state.store.as_ref(), id).await?;
    if current.status != ArticleStatus::PendingReview {
        return Err(ApiError::Conflict(format!(
            "Article is {}, only pending articles can be published",
            current.status
        )));
    }

    let query = Query::table(ARTICLES)
        .eq("id", id.to_string())
        .eq("status", ArticleStatus::PendingReview.as_str());
    let article = apply_status(state, query, ArticleStatus::Published)
        .await?
        .ok_or_else(|| ApiError::Conflict("Article is no longer pending review".into()))?;

    notify_status(state, &article, ArticleStatus::Published).await;
    Ok(article)
}

async fn apply_status(state: &AppState, query: Query, status: ArticleStatus) -> ApiResult<Option<Article>> {
    let updated: Vec<Article> = state
        .store
        .update_rows(&query, &StatusPatch::new(status))
        .await?;
    let article = updated.into_iter().next();
    if let Some(article) = &article {
        info!(article_id = %article.id, status = %status, "Article status changed");
    }
    Ok(article)
}

async fn notify_status(state: &AppState, article: &Article, status: ArticleStatus) {
    let author_name = match article.user_id.as_deref() {
        Some(user_id) => ProfileDirectory::new(state.store.as_ref())
            .author(user_id)
            .await
            .map(|a| a.display_name)
            .unwrap_or_else(|_| "Unknown".to_string()),
        None => "Unknown".to_string(),
    };
    state.notifier.status_changed(article, status, author_name);
}

// ---------------------------------------------------------------------------
// Comments & bookmarks
// ---------------------------------------------------------------------------

/// Comments of an article, newest first, each with its author.
pub async fn comments(state: &AppState, article_id: &str) -> ApiResult<Vec<CommentView>> {
    let article_id = parse_uuid(article_id, "article")?;
    let query = Query::table(COMMENTS)
        .select("id,user_id,article_id,body,created_at")
        .eq("article_id", article_id.to_string())
        .order("created_at", true);
    let comments: Vec<Comment> = state.store.fetch(&query).await?;

    let authors = ProfileDirectory::new(state.store.as_ref())
        .authors(comments.iter().map(|c| c.user_id.as_str()))
        .await?;
    Ok(comments
        .into_iter()
        .map(|comment| {
            let profile = authors.get(Some(comment.user_id.as_str()));
            CommentView { comment, profile }
        })
        .collect())
}

pub async fn add_comment(
    state: &AppState,
    article_id: &str,
    content: &str,
    reader: &Principal,
) -> ApiResult<Comment> {
    let article_id = parse_uuid(article_id, "article")?;
    let body = required("content", content)?;
    find(state.store.as_ref(), article_id).await?;

    let comment: Comment = state
        .store
        .insert_one(
            COMMENTS,
            &serde_json::json!({
                "article_id": article_id,
                "user_id": reader.user_id,
                "body": body,
            }),
        )
        .await?;
    Ok(comment)
}

/// Insert a bookmark row. Repeated calls insert repeated rows.
pub async fn bookmark(state: &AppState, article_id: &str, reader: &Principal) -> ApiResult<Bookmark> {
    let article_id = parse_uuid(article_id, "article")?;
    find(state.store.as_ref(), article_id).await?;

    let row = serde_json::json!({ "article_id": article_id, "user_id": reader.user_id });
    Ok(state.store.insert_one(BOOKMARKS, &row).await?)
}

pub async fn remove_bookmark(state: &AppState, article_id: &str, reader: &Principal) -> ApiResult<()> {
    let article_id = parse_uuid(article_id, "article")?;
    let removed = state
        .store
        .delete(
            &Query::table(BOOKMARKS)
                .eq("article_id", article_id.to_string())
                .eq("user_id", reader.user_id.as_str()),
        )
        .await?;
    debug!(article_id = %article_id, removed = removed.len(), "Bookmark removed");
    Ok(())
}

/// A user's bookmarks, newest first, with their articles attached.
pub async fn bookmarks(state: &AppState, user_id: &str) -> ApiResult<Vec<BookmarkView>> {
    let query = Query::table(BOOKMARKS)
        .eq("user_id", user_id)
        .order("created_at", true);
    let bookmarks: Vec<Bookmark> = state.store.fetch(&query).await?;
    if bookmarks.is_empty() {
        return Ok(Vec::new());
    }

    let articles: Vec<Article> = state
        .store
        .fetch(&Query::table(ARTICLES).in_list("id", bookmarks.iter().map(|b| b.article_id.to_string())))
        .await?;
    let by_id: HashMap<Uuid, Article> = articles.into_iter().map(|a| (a.id, a)).collect();

    Ok(bookmarks
        .into_iter()
        .map(|bookmark| {
            let article = by_id.get(&bookmark.article_id).cloned();
            BookmarkView { bookmark, article }
        })
        .collect())
}
