use chrono::Utc;
use newsdesk_shared::constants::BAN_DURATION;
use newsdesk_shared::models::{Profile, RoleRow};
use newsdesk_shared::types::Role;
use newsdesk_store::tables::{PROFILES, ROLES};
use newsdesk_store::{Query, Store, StoreExt, UserUpdate};
use tracing::info;

use crate::api::AppState;
use crate::error::{ApiError, ApiResult};
use crate::services::rejection;

/// Every profile, newest first.
pub async fn all_profiles(state: &AppState) -> ApiResult<Vec<Profile>> {
    let query = Query::table(PROFILES).order("created_at", true);
    Ok(state.store.fetch(&query).await?)
}

/// Id of the `roles` row named after `role`.
pub async fn role_id(store: &dyn Store, role: Role) -> ApiResult<i64> {
    let row: Option<RoleRow> = store
        .fetch_one(&Query::table(ROLES).eq("name", role.as_str()))
        .await?;
    row.map(|r| r.id)
        .ok_or_else(|| ApiError::Internal(format!("role '{}' missing from roles table", role)))
}

/// Give `user_id` the role `role` on both the profile and the identity
/// user's metadata.
pub async fn assign_role(state: &AppState, user_id: &str, role: Role) -> ApiResult<()> {
    let role_id = role_id(state.store.as_ref(), role).await?;
    let updated = state
        .store
        .update(
            &Query::table(PROFILES).eq("user_id", user_id),
            serde_json::json!({ "role_id": role_id, "updated_at": Utc::now() }),
        )
        .await?;
    if updated.is_empty() {
        return Err(ApiError::not_found("Profile"));
    }

    let update = UserUpdate {
        user_metadata: Some(serde_json::json!({ "role": role.as_str() })),
        ..UserUpdate::default()
    };
    state
        .identity
        .update_user(user_id, &update)
        .await
        .map_err(|e| rejection(e, |_| ApiError::not_found("User")))?;

    info!(user_id = %user_id, role = %role, "Role assigned");
    Ok(())
}

pub async fn approve_author(state: &AppState, user_id: &str) -> ApiResult<()> {
    assign_role(state, user_id, Role::Author).await
}

/// Ban for roughly a century.
pub async fn ban(state: &AppState, user_id: &str) -> ApiResult<()> {
    set_ban(state, user_id, BAN_DURATION).await?;
    info!(user_id = %user_id, "User banned");
    Ok(())
}

pub async fn unban(state: &AppState, user_id: &str) -> ApiResult<()> {
    set_ban(state, user_id, "none").await?;
    info!(user_id = %user_id, "User unbanned");
    Ok(())
}

async fn set_ban(state: &AppState, user_id: &str, duration: &str) -> ApiResult<()> {
    let update = UserUpdate {
        ban_duration: Some(duration.to_string()),
        ..UserUpdate::default()
    };
    state
        .identity
        .update_user(user_id, &update)
        .await
        .map_err(|e| rejection(e, |_| ApiError::not_found("User")))?;
    Ok(())
}
