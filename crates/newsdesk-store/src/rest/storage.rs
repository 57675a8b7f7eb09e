use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use reqwest::Method;

use super::{check, BaasClient};
use crate::error::Result;
use crate::storage::ObjectStorage;

const SERVICE: &str = "storage";

/// [`ObjectStorage`] over the storage HTTP API.
#[derive(Clone)]
pub struct RestStorage {
    client: BaasClient,
}

impl RestStorage {
    pub fn new(client: BaasClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStorage for RestStorage {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<()> {
        let response = self
            .client
            .service(Method::POST, &format!("/storage/v1/object/{}/{}", bucket, path))
            .header(CONTENT_TYPE, content_type)
            .body(data)
            .send()
            .await?;
        check(SERVICE, response).await?;
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.client.base_url(),
            bucket,
            path
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_url() {
        let client = BaasClient::new("https://proj.supabase.co", "anon", "svc").unwrap();
        let storage = RestStorage::new(client);
        assert_eq!(
            storage.public_url("media", "abc.png"),
            "https://proj.supabase.co/storage/v1/object/public/media/abc.png"
        );
    }
}
