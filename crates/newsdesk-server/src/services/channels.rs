use std::collections::HashMap;

use newsdesk_shared::models::{Channel, ChannelFollow, FollowedChannel};
use newsdesk_store::tables::{ARTICLES, CHANNELS, CHANNEL_FOLLOWERS};
use newsdesk_store::{Query, Store, StoreExt};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::AppState;
use crate::auth::Principal;
use crate::error::{ApiError, ApiResult};
use crate::services::{parse_int_id, required};

#[derive(Debug, Clone, Deserialize)]
pub struct ChannelCreate {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub rss_url: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// Partial update; absent fields keep their value.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ChannelUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rss_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl ChannelUpdate {
    fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.slug.is_none()
            && self.description.is_none()
            && self.rss_url.is_none()
            && self.logo_url.is_none()
            && self.is_active.is_none()
    }
}

/// Active channels by name, for everyone.
pub async fn active(state: &AppState) -> ApiResult<Vec<Channel>> {
    let query = Query::table(CHANNELS).eq("is_active", true).order("name", false);
    Ok(state.store.fetch(&query).await?)
}

/// Every channel, newest first.
pub async fn all(state: &AppState) -> ApiResult<Vec<Channel>> {
    let query = Query::table(CHANNELS).order("created_at", true);
    Ok(state.store.fetch(&query).await?)
}

pub async fn get(state: &AppState, id: &str) -> ApiResult<Channel> {
    let id = parse_int_id(id, "channel")?;
    find(state.store.as_ref(), id).await
}

async fn find(store: &dyn Store, id: i64) -> ApiResult<Channel> {
    store
        .fetch_one(&Query::table(CHANNELS).eq("id", id))
        .await?
        .ok_or_else(|| ApiError::not_found("Channel"))
}

pub async fn create(state: &AppState, data: ChannelCreate) -> ApiResult<Channel> {
    let row = serde_json::json!({
        "name": required("name", &data.name)?,
        "slug": required("slug", &data.slug)?,
        "description": data.description,
        "rss_url": data.rss_url,
        "logo_url": data.logo_url,
        "is_active": data.is_active.unwrap_or(true),
    });
    let channel: Channel = state.store.insert_one(CHANNELS, &row).await?;
    info!(channel_id = channel.id, slug = %channel.slug, "Channel created");
    Ok(channel)
}

pub async fn update(state: &AppState, id: &str, data: ChannelUpdate) -> ApiResult<Channel> {
    let id = parse_int_id(id, "channel")?;
    if data.is_empty() {
        return find(state.store.as_ref(), id).await;
    }
    if let Some(name) = &data.name {
        required("name", name)?;
    }
    if let Some(slug) = &data.slug {
        required("slug", slug)?;
    }

    let updated: Vec<Channel> = state
        .store
        .update_rows(&Query::table(CHANNELS).eq("id", id), &data)
        .await?;
    updated
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::not_found("Channel"))
}

/// Delete a channel no article belongs to.
pub async fn delete(state: &AppState, id: &str) -> ApiResult<()> {
    let id = parse_int_id(id, "channel")?;
    find(state.store.as_ref(), id).await?;

    let articles = state
        .store
        .count(&Query::table(ARTICLES).eq("channel_id", id))
        .await?;
    if articles > 0 {
        return Err(ApiError::Conflict(
            "Cannot delete channel with existing articles".into(),
        ));
    }

    state.store.delete(&Query::table(CHANNELS).eq("id", id)).await?;
    info!(channel_id = id, "Channel deleted");
    Ok(())
}

fn follow_query(channel_id: i64, user_id: &str) -> Query {
    Query::table(CHANNEL_FOLLOWERS)
        .eq("channel_id", channel_id)
        .eq("user_id", user_id)
}

pub async fn follow(state: &AppState, id: &str, reader: &Principal) -> ApiResult<()> {
    let id = parse_int_id(id, "channel")?;
    find(state.store.as_ref(), id).await?;

    if state.store.exists(&follow_query(id, &reader.user_id)).await? {
        return Err(ApiError::Conflict("Already following this channel".into()));
    }

    let row = serde_json::json!({ "channel_id": id, "user_id": reader.user_id });
    let _: ChannelFollow = state.store.insert_one(CHANNEL_FOLLOWERS, &row).await?;
    info!(channel_id = id, user_id = %reader.user_id, "Channel followed");
    Ok(())
}

pub async fn unfollow(state: &AppState, id: &str, reader: &Principal) -> ApiResult<()> {
    let id = parse_int_id(id, "channel")?;
    state.store.delete(&follow_query(id, &reader.user_id)).await?;
    Ok(())
}

/// Active channels the reader follows, most recent follow first.
pub async fn followed(state: &AppState, reader: &Principal) -> ApiResult<Vec<FollowedChannel>> {
    let follows: Vec<ChannelFollow> = state
        .store
        .fetch(
            &Query::table(CHANNEL_FOLLOWERS)
                .eq("user_id", reader.user_id.as_str())
                .order("followed_at", true),
        )
        .await?;
    if follows.is_empty() {
        return Ok(Vec::new());
    }

    let channels: Vec<Channel> = state
        .store
        .fetch(
            &Query::table(CHANNELS)
                .in_list("id", follows.iter().map(|f| f.channel_id))
                .eq("is_active", true),
        )
        .await?;
    let mut by_id: HashMap<i64, Channel> = channels.into_iter().map(|c| (c.id, c)).collect();

    Ok(follows
        .into_iter()
        .filter_map(|follow| {
            by_id.remove(&follow.channel_id).map(|channel| FollowedChannel {
                channel,
                followed_at: follow.followed_at,
            })
        })
        .collect())
}
