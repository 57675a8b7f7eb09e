use std::collections::BTreeMap;

use chrono::Utc;
use newsdesk_push::{DispatchReport, PushMessage};
use newsdesk_shared::models::DeviceToken;
use newsdesk_store::tables::USERS_DEVICES;
use newsdesk_store::{Query, StoreExt};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::info;

use crate::api::AppState;
use crate::error::ApiResult;
use crate::notify::DeviceDirectory;
use crate::services::required;

const DEVICE_COLUMNS: &str = "fcm_token,device_type,last_used_at,created_at";

#[derive(Debug, Clone, Deserialize)]
pub struct DeviceTokenRegister {
    pub fcm_token: String,
    #[serde(default)]
    pub user_id: Option<String>,
    pub device_type: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SendNotification {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub data: BTreeMap<String, String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Register a device token, or re-bind an existing one to `user_id`.
pub async fn set_token(state: &AppState, data: DeviceTokenRegister) -> ApiResult<DeviceToken> {
    let token = required("fcm_token", &data.fcm_token)?;
    let device_type = required("device_type", &data.device_type)?;
    let user_id = data
        .user_id
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty());
    let now = Utc::now();

    let query = Query::table(USERS_DEVICES).eq("fcm_token", token);
    let existing: Option<DeviceToken> = state.store.fetch_one(&query).await?;

    let device = match existing {
        Some(current) => {
            let mut patch = Map::new();
            patch.insert("user_id".into(), json!(user_id));
            patch.insert("last_used_at".into(), json!(now));
            if current.device_type.as_deref() != Some(device_type) {
                patch.insert("device_type".into(), json!(device_type));
            }
            let updated: Vec<DeviceToken> =
                state.store.update_rows(&query, &Value::Object(patch)).await?;
            updated.into_iter().next().unwrap_or(current)
        }
        None => {
            let row = json!({
                "fcm_token": token,
                "user_id": user_id,
                "device_type": device_type,
                "created_at": now,
                "last_used_at": now,
            });
            state.store.insert_one(USERS_DEVICES, &row).await?
        }
    };

    info!(device_type = %device_type, guest = user_id.is_none(), "Device token registered");
    Ok(device)
}

/// Devices of `user_id`, or the guest devices when no user is given.
pub async fn devices(state: &AppState, user_id: Option<&str>) -> ApiResult<Vec<DeviceToken>> {
    let query = Query::table(USERS_DEVICES)
        .select(DEVICE_COLUMNS)
        .order("last_used_at", true);
    let query = match user_id.map(str::trim).filter(|u| !u.is_empty()) {
        Some(user_id) => query.eq("user_id", user_id),
        None => query.is_null("user_id"),
    };
    Ok(state.store.fetch(&query).await?)
}

/// Send a custom message to one user's devices, or to every device.
pub async fn send(state: &AppState, data: SendNotification) -> ApiResult<DispatchReport> {
    let title = required("title", &data.title)?;
    let body = required("body", &data.body)?;

    let devices = DeviceDirectory::new(state.store.as_ref());
    let tokens = match data.user_id.as_deref() {
        Some(user_id) => devices.user_tokens(user_id).await?,
        None => devices.all_tokens().await?,
    };

    let mut message = PushMessage::new(title, body).with_image(data.image_url);
    for (key, value) in data.data {
        message = message.with_data(key, value);
    }

    let report = state.notifier.send(&message, &tokens).await;
    info!(
        skipped = report.skipped,
        success = report.success_count,
        failure = report.failure_count,
        "Custom notification dispatched"
    );
    Ok(report)
}
