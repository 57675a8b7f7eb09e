use std::collections::{BTreeSet, HashMap};

use newsdesk_shared::models::{Article, ArticleCategory, AuthorSummary, Channel, Profile};
use newsdesk_store::tables::{ARTICLE_CATEGORIES, CHANNELS, PROFILES};
use newsdesk_store::{Query, Store, StoreExt};
use uuid::Uuid;

use crate::error::ApiResult;

/// Batched profile lookups for denormalizing authors onto listings.
pub struct ProfileDirectory<'a> {
    store: &'a dyn Store,
}

impl<'a> ProfileDirectory<'a> {
    pub fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Authors of the given user ids, fetched with one query. Ids without
    /// a profile row are absent from the map.
    pub async fn authors<'i, I>(&self, user_ids: I) -> ApiResult<Authors>
    where
        I: IntoIterator<Item = &'i str>,
    {
        let ids: BTreeSet<&str> = user_ids.into_iter().filter(|id| !id.is_empty()).collect();
        if ids.is_empty() {
            return Ok(Authors::default());
        }

        let query = Query::table(PROFILES)
            .select("user_id,display_name,avatar_url")
            .in_list("user_id", ids);
        let profiles: Vec<Profile> = self.store.fetch(&query).await?;

        Ok(Authors(
            profiles
                .iter()
                .map(|p| (p.user_id.clone(), AuthorSummary::from_profile(p)))
                .collect(),
        ))
    }

    pub async fn author(&self, user_id: &str) -> ApiResult<AuthorSummary> {
        Ok(self.authors([user_id]).await?.get(Some(user_id)))
    }
}

/// Result of a batched lookup.
#[derive(Debug, Default)]
pub struct Authors(HashMap<String, AuthorSummary>);

impl Authors {
    /// Author for `user_id`, or "Anonymous" when unknown.
    pub fn get(&self, user_id: Option<&str>) -> AuthorSummary {
        let user_id = user_id.unwrap_or_default();
        self.0
            .get(user_id)
            .cloned()
            .unwrap_or_else(|| AuthorSummary::anonymous(user_id))
    }
}

/// Channels and category links of a batch of articles, two queries total.
#[derive(Debug, Default)]
pub struct ArticleLinks {
    channels: HashMap<i64, Channel>,
    categories: HashMap<Uuid, Vec<ArticleCategory>>,
}

impl ArticleLinks {
    pub async fn load(store: &dyn Store, articles: &[Article]) -> ApiResult<Self> {
        if articles.is_empty() {
            return Ok(Self::default());
        }

        let channel_ids: BTreeSet<i64> = articles.iter().filter_map(|a| a.channel_id).collect();
        let channels: Vec<Channel> = if channel_ids.is_empty() {
            Vec::new()
        } else {
            store
                .fetch(&Query::table(CHANNELS).in_list("id", channel_ids))
                .await?
        };

        let links: Vec<ArticleCategory> = store
            .fetch(
                &Query::table(ARTICLE_CATEGORIES)
                    .select("article_id,category_id")
                    .in_list("article_id", articles.iter().map(|a| a.id.to_string())),
            )
            .await?;

        let mut categories: HashMap<Uuid, Vec<ArticleCategory>> = HashMap::new();
        for link in links {
            categories.entry(link.article_id).or_default().push(link);
        }
        Ok(Self {
            channels: channels.into_iter().map(|c| (c.id, c)).collect(),
            categories,
        })
    }

    pub fn channel(&self, article: &Article) -> Option<Channel> {
        article
            .channel_id
            .and_then(|id| self.channels.get(&id))
            .cloned()
    }

    pub fn categories(&self, article: &Article) -> Vec<ArticleCategory> {
        self.categories.get(&article.id).cloned().unwrap_or_default()
    }
}
