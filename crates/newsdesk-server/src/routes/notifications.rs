use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use newsdesk_push::DispatchReport;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::AppState;
use crate::auth::{AdminOnly, Gated};
use crate::envelope::Envelope;
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiQuery};
use crate::services::devices::{self, DeviceTokenRegister, SendNotification};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/set-token", post(set_token))
        .route("/my-devices", get(my_devices))
        .route("/send", post(send))
}

#[derive(Debug, Deserialize)]
struct DeviceParams {
    user_id: Option<String>,
}

async fn set_token(
    State(state): State<AppState>,
    ApiJson(data): ApiJson<DeviceTokenRegister>,
) -> ApiResult<Envelope<Value>> {
    let device = devices::set_token(&state, data).await?;
    Ok(Envelope::ok(
        json!({ "device": device }),
        "Device token set successfully",
    ))
}

async fn my_devices(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<DeviceParams>,
) -> ApiResult<Envelope<Value>> {
    let devices = devices::devices(&state, params.user_id.as_deref()).await?;
    Ok(Envelope::ok(
        json!({ "devices": devices }),
        "Devices retrieved successfully",
    ))
}

async fn send(
    State(state): State<AppState>,
    _admin: Gated<AdminOnly>,
    ApiJson(data): ApiJson<SendNotification>,
) -> ApiResult<Envelope<DispatchReport>> {
    let report = devices::send(&state, data).await?;
    let message = if report.skipped {
        "Notification skipped"
    } else {
        "Notification sent"
    };
    Ok(Envelope::ok(report, message))
}
