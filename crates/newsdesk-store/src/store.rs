use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{BaasError, Result};
use crate::query::Query;

/// Table-scoped access to the hosted relational database.
///
/// Rows travel as JSON objects; [`StoreExt`] layers typed helpers on top.
/// Writes return the affected rows as stored, defaults included.
#[async_trait]
pub trait Store: Send + Sync {
    async fn select(&self, query: &Query) -> Result<Vec<Value>>;

    /// Number of rows matching the query's filters (order and range ignored).
    async fn count(&self, query: &Query) -> Result<u64>;

    async fn insert(&self, table: &str, rows: Vec<Value>) -> Result<Vec<Value>>;

    /// Apply `patch` to every row matching the query's filters.
    async fn update(&self, query: &Query, patch: Value) -> Result<Vec<Value>>;

    /// Delete every row matching the query's filters.
    async fn delete(&self, query: &Query) -> Result<Vec<Value>>;
}

/// Typed conveniences over any [`Store`].
#[async_trait]
pub trait StoreExt: Store {
    async fn fetch<T>(&self, query: &Query) -> Result<Vec<T>>
    where
        T: DeserializeOwned + Send,
    {
        decode_rows(self.select(query).await?)
    }

    /// First matching row, if any.
    async fn fetch_one<T>(&self, query: &Query) -> Result<Option<T>>
    where
        T: DeserializeOwned + Send,
    {
        let query = query.clone().range(0, 0);
        Ok(self.fetch(&query).await?.into_iter().next())
    }

    async fn exists(&self, query: &Query) -> Result<bool> {
        Ok(self.count(query).await? > 0)
    }

    /// Insert one row and decode it as stored.
    async fn insert_one<T, R>(&self, table: &str, row: &R) -> Result<T>
    where
        T: DeserializeOwned + Send,
        R: Serialize + Sync,
    {
        let value = serde_json::to_value(row)?;
        let inserted = self.insert(table, vec![value]).await?;
        decode_rows(inserted)?
            .into_iter()
            .next()
            .ok_or(BaasError::EmptyResponse)
    }

    async fn update_rows<T, P>(&self, query: &Query, patch: &P) -> Result<Vec<T>>
    where
        T: DeserializeOwned + Send,
        P: Serialize + Sync,
    {
        let patch = serde_json::to_value(patch)?;
        decode_rows(self.update(query, patch).await?)
    }
}

impl<S: Store + ?Sized> StoreExt for S {}

fn decode_rows<T: DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>> {
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(BaasError::from))
        .collect()
}
