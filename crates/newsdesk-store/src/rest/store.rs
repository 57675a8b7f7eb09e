use async_trait::async_trait;
use reqwest::header::CONTENT_RANGE;
use reqwest::Method;
use serde_json::Value;

use super::{check, BaasClient};
use crate::error::{BaasError, Result};
use crate::query::Query;
use crate::store::Store;

const SERVICE: &str = "postgrest";
const RETURN_ROWS: &str = "return=representation";

/// [`Store`] over PostgREST.
#[derive(Clone)]
pub struct RestStore {
    client: BaasClient,
}

impl RestStore {
    pub fn new(client: BaasClient) -> Self {
        Self { client }
    }

    fn table_path(table: &str) -> String {
        format!("/rest/v1/{}", table)
    }
}

#[async_trait]
impl Store for RestStore {
    async fn select(&self, query: &Query) -> Result<Vec<Value>> {
        let response = self
            .client
            .service(Method::GET, &Self::table_path(&query.table))
            .query(&query.to_params())
            .send()
            .await?;
        Ok(check(SERVICE, response).await?.json().await?)
    }

    async fn count(&self, query: &Query) -> Result<u64> {
        let mut params = vec![("select".to_string(), query.columns.clone())];
        params.extend(query.filter_params());

        let response = self
            .client
            .service(Method::HEAD, &Self::table_path(&query.table))
            .query(&params)
            .header("Prefer", "count=exact")
            .send()
            .await?;
        let response = check(SERVICE, response).await?;

        response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range)
            .ok_or(BaasError::EmptyResponse)
    }

    async fn insert(&self, table: &str, rows: Vec<Value>) -> Result<Vec<Value>> {
        let response = self
            .client
            .service(Method::POST, &Self::table_path(table))
            .header("Prefer", RETURN_ROWS)
            .json(&rows)
            .send()
            .await?;
        Ok(check(SERVICE, response).await?.json().await?)
    }

    async fn update(&self, query: &Query, patch: Value) -> Result<Vec<Value>> {
        let response = self
            .client
            .service(Method::PATCH, &Self::table_path(&query.table))
            .query(&query.filter_params())
            .header("Prefer", RETURN_ROWS)
            .json(&patch)
            .send()
            .await?;
        Ok(check(SERVICE, response).await?.json().await?)
    }

    async fn delete(&self, query: &Query) -> Result<Vec<Value>> {
        let response = self
            .client
            .service(Method::DELETE, &Self::table_path(&query.table))
            .query(&query.filter_params())
            .header("Prefer", RETURN_ROWS)
            .send()
            .await?;
        Ok(check(SERVICE, response).await?.json().await?)
    }
}

/// Total from a `Content-Range` header such as `0-24/3573` or `*/0`.
fn parse_content_range(header: &str) -> Option<u64> {
    header.rsplit_once('/')?.1.trim().parse().ok()
}
