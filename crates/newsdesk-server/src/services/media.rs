use std::path::Path;

use bytes::Bytes;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::api::AppState;
use crate::error::ApiResult;

/// A file that already passed the size and type checks of the upload route.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: Option<String>,
    pub content_type: String,
    pub data: Bytes,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoredFile {
    pub url: String,
    pub path: String,
    pub size: usize,
    pub content_type: String,
}

/// Store under a random name keeping only the extension of the client's
/// file name.
pub async fn upload(state: &AppState, upload: Upload) -> ApiResult<StoredFile> {
    let content_type = upload.content_type;
    let path = object_name(upload.file_name.as_deref());
    let bucket = &state.config.storage_bucket;
    let size = upload.data.len();
    state
        .storage
        .upload(bucket, &path, upload.data, &content_type)
        .await?;
    let url = state.storage.public_url(bucket, &path);

    info!(path = %path, size, content_type = %content_type, "File uploaded");
    Ok(StoredFile {
        url,
        path,
        size,
        content_type,
    })
}

fn object_name(file_name: Option<&str>) -> String {
    let extension = file_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(str::to_ascii_lowercase);

    let id = Uuid::new_v4();
    match extension {
        Some(ext) => format!("{}.{}", id, ext),
        None => id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_name_keeps_only_extension() {
        let name = object_name(Some("../../Holiday Photo.JPG"));
        assert!(name.ends_with(".jpg"));
        assert!(!name.contains('/'));
        assert!(!name.contains("Holiday"));
        assert!(Uuid::parse_str(name.trim_end_matches(".jpg")).is_ok());
    }

    #[test]
    fn test_object_name_without_extension() {
        let name = object_name(Some("README"));
        assert!(Uuid::parse_str(&name).is_ok());
        assert!(Uuid::parse_str(&object_name(None)).is_ok());
    }
}
