use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// Path-addressed object storage with publicly readable buckets.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn upload(&self, bucket: &str, path: &str, data: Bytes, content_type: &str)
        -> Result<()>;

    /// URL under which an uploaded object is publicly served.
    fn public_url(&self, bucket: &str, path: &str) -> String;
}
