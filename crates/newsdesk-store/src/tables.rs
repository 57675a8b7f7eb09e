//! Table names of the hosted database and the column defaults it applies.
//!
//! The defaults are declared here so the in-memory store behaves like the
//! real database: omitted columns get the same values the SQL schema would
//! give them.

use newsdesk_shared::types::ArticleStatus;
use serde_json::{json, Value};

pub const ROLES: &str = "roles";
pub const PROFILES: &str = "profiles";
pub const ARTICLES: &str = "articles";
pub const ARTICLE_CATEGORIES: &str = "article_categories";
pub const CATEGORIES: &str = "categories";
pub const CHANNELS: &str = "channels";
pub const CHANNEL_FOLLOWERS: &str = "channel_followers";
pub const COMMENTS: &str = "comments";
pub const BOOKMARKS: &str = "bookmarks";
pub const USERS_DEVICES: &str = "users_devices";

/// Role ids seeded in the reference database.
pub const ADMIN_ROLE_ID: i64 = 1;
pub const AUTHOR_ROLE_ID: i64 = 2;
pub const READER_ROLE_ID: i64 = 3;

/// How a table's `id` column is generated when omitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdKind {
    /// `bigserial`
    Serial,
    /// `uuid default gen_random_uuid()`
    Uuid,
}

/// Value given to an omitted column.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnDefault {
    Value(Value),
    /// `default now()`
    Now,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    pub name: &'static str,
    pub id: Option<IdKind>,
    pub defaults: Vec<(&'static str, ColumnDefault)>,
}

impl TableSchema {
    fn new(name: &'static str, id: Option<IdKind>) -> Self {
        Self {
            name,
            id,
            defaults: Vec::new(),
        }
    }

    fn default(mut self, column: &'static str, value: ColumnDefault) -> Self {
        self.defaults.push((column, value));
        self
    }
}

/// Column defaults of every newsdesk table.
pub fn schema() -> Vec<TableSchema> {
    use ColumnDefault::{Now, Value as Lit};

    vec![
        TableSchema::new(ROLES, Some(IdKind::Serial)),
        TableSchema::new(PROFILES, None)
            .default("role_id", Lit(json!(READER_ROLE_ID)))
            .default("created_at", Now)
            .default("updated_at", Now),
        TableSchema::new(ARTICLES, Some(IdKind::Uuid))
            .default("status", Lit(json!(ArticleStatus::PendingReview.as_str())))
            .default("view_count", Lit(json!(0)))
            .default("created_at", Now)
            .default("updated_at", Now),
        TableSchema::new(ARTICLE_CATEGORIES, None),
        TableSchema::new(CATEGORIES, Some(IdKind::Serial))
            .default("created_at", Now)
            .default("updated_at", Now),
        TableSchema::new(CHANNELS, Some(IdKind::Serial))
            .default("is_active", Lit(json!(true)))
            .default("created_at", Now),
        TableSchema::new(CHANNEL_FOLLOWERS, None).default("followed_at", Now),
        TableSchema::new(COMMENTS, Some(IdKind::Uuid)).default("created_at", Now),
        TableSchema::new(BOOKMARKS, None).default("created_at", Now),
        TableSchema::new(USERS_DEVICES, None)
            .default("created_at", Now)
            .default("last_used_at", Now),
    ]
}

/// Reference rows present in every fresh database.
pub fn seed_rows() -> Vec<(&'static str, Value)> {
    vec![
        (ROLES, json!({ "id": ADMIN_ROLE_ID, "name": "admin" })),
        (ROLES, json!({ "id": AUTHOR_ROLE_ID, "name": "author" })),
        (ROLES, json!({ "id": READER_ROLE_ID, "name": "reader" })),
    ]
}
