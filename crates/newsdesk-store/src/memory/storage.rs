use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::storage::ObjectStorage;

#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub data: Bytes,
    pub content_type: String,
}

/// Object storage kept in process; public URLs point at `base_url`.
pub struct MemoryStorage {
    base_url: String,
    objects: RwLock<HashMap<(String, String), StoredObject>>,
}

impl MemoryStorage {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            objects: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get(&self, bucket: &str, path: &str) -> Option<StoredObject> {
        self.objects
            .read()
            .await
            .get(&(bucket.to_string(), path.to_string()))
            .cloned()
    }

    pub async fn object_count(&self) -> usize {
        self.objects.read().await.len()
    }
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<()> {
        self.objects.write().await.insert(
            (bucket.to_string(), path.to_string()),
            StoredObject {
                data,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/storage/v1/object/public/{}/{}", self.base_url, bucket, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upload_and_public_url() {
        let storage = MemoryStorage::new("http://localhost:8000/");
        storage
            .upload("media", "a.png", Bytes::from_static(b"png"), "image/png")
            .await
            .unwrap();

        let object = storage.get("media", "a.png").await.unwrap();
        assert_eq!(object.data, Bytes::from_static(b"png"));
        assert_eq!(object.content_type, "image/png");
        assert_eq!(
            storage.public_url("media", "a.png"),
            "http://localhost:8000/storage/v1/object/public/media/a.png"
        );
    }
}
