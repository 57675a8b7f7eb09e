use axum::{
    extract::{Multipart, State},
    routing::post,
    Router,
};
use bytes::Bytes;
use newsdesk_shared::constants::ALLOWED_MEDIA_TYPES;

use crate::api::AppState;
use crate::auth::{AuthorOrReader, Gated};
use crate::envelope::Envelope;
use crate::error::{ApiError, ApiResult};
use crate::services::media::{self, StoredFile, Upload};

pub fn router() -> Router<AppState> {
    Router::new().route("/upload", post(upload))
}

async fn upload(
    State(state): State<AppState>,
    _uploader: Gated<AuthorOrReader>,
    mut multipart: Multipart,
) -> ApiResult<Envelope<StoredFile>> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await?;
        check_size(&data, state.config.max_upload_size)?;
        let content_type = accepted_type(content_type.as_deref())?;

        let stored = media::upload(
            &state,
            Upload {
                file_name,
                content_type,
                data,
            },
        )
        .await?;
        return Ok(Envelope::ok(stored, "File uploaded successfully"));
    }
    Err(ApiError::validation("file is required"))
}

fn check_size(data: &Bytes, max: usize) -> ApiResult<()> {
    if data.len() > max {
        return Err(ApiError::PayloadTooLarge {
            size: data.len(),
            max,
        });
    }
    Ok(())
}

/// Bare MIME type of the part, if it is one we accept.
fn accepted_type(content_type: Option<&str>) -> ApiResult<String> {
    content_type
        .map(|c| c.split(';').next().unwrap_or(c).trim().to_ascii_lowercase())
        .filter(|c| ALLOWED_MEDIA_TYPES.contains(&c.as_str()))
        .ok_or_else(|| ApiError::validation("File type not allowed"))
}
