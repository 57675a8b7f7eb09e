//! Row models of the hosted database.
//!
//! Every struct derives `Serialize` and `Deserialize` so rows coming back
//! from the store can be decoded directly and handed to the API layer.
//! Columns the database fills in (ids, defaults, timestamps) are optional
//! or defaulted so partially projected rows still decode.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::ANONYMOUS_DISPLAY_NAME;
use crate::types::ArticleStatus;

// ---------------------------------------------------------------------------
// Roles & profiles
// ---------------------------------------------------------------------------

/// A row of the `roles` lookup table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoleRow {
    pub id: i64,
    pub name: String,
}

/// Per-user profile, keyed by the identity service's user id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    pub user_id: String,
    #[serde(default)]
    pub role_id: Option<i64>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub channel_id: Option<i64>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Author details embedded next to articles and comments.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthorSummary {
    pub user_id: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
}

impl AuthorSummary {
    /// Placeholder used when the profile row is missing.
    pub fn anonymous(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: ANONYMOUS_DISPLAY_NAME.to_string(),
            avatar_url: None,
        }
    }

    pub fn from_profile(profile: &Profile) -> Self {
        Self {
            user_id: profile.user_id.clone(),
            display_name: profile
                .display_name
                .clone()
                .unwrap_or_else(|| ANONYMOUS_DISPLAY_NAME.to_string()),
            avatar_url: profile.avatar_url.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Articles
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Article {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub status: ArticleStatus,
    #[serde(default)]
    pub channel_id: Option<i64>,
    /// Author's user id.
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub view_count: i64,
    #[serde(default)]
    pub hero_image_url: Option<String>,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Article together with its denormalized author, channel and category
/// links.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ArticleView {
    #[serde(flatten)]
    pub article: Article,
    pub author: AuthorSummary,
    pub channel: Option<Channel>,
    pub article_categories: Vec<ArticleCategory>,
}

/// A row of the `article_categories` join table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArticleCategory {
    pub article_id: Uuid,
    pub category_id: i64,
}

// ---------------------------------------------------------------------------
// Categories & channels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parent_id: Option<i64>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Channel {
    pub id: i64,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub rss_url: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// A channel as seen by one of its followers.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FollowedChannel {
    #[serde(flatten)]
    pub channel: Channel,
    pub followed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChannelFollow {
    pub channel_id: i64,
    pub user_id: String,
    #[serde(default)]
    pub followed_at: Option<DateTime<Utc>>,
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Reader interactions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Comment {
    pub id: Uuid,
    pub article_id: Uuid,
    pub user_id: String,
    pub body: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Comment together with its denormalized author.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CommentView {
    #[serde(flatten)]
    pub comment: Comment,
    pub profile: AuthorSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Bookmark {
    pub article_id: Uuid,
    pub user_id: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Bookmark with the bookmarked article attached, when it still exists.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BookmarkView {
    #[serde(flatten)]
    pub bookmark: Bookmark,
    pub article: Option<Article>,
}

// ---------------------------------------------------------------------------
// Devices
// ---------------------------------------------------------------------------

/// A push-capable device. `user_id == None` marks a guest device.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceToken {
    pub fcm_token: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub device_type: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_used_at: Option<DateTime<Utc>>,
}
