//! HTTP implementations of the backend traits against a Supabase-style
//! deployment: PostgREST under `/rest/v1`, GoTrue under `/auth/v1` and the
//! storage API under `/storage/v1`.

mod identity;
mod storage;
mod store;

pub use identity::RestIdentity;
pub use storage::RestStorage;
pub use store::RestStore;

use std::time::Duration;

use reqwest::{Method, RequestBuilder, Response};
use serde_json::Value;
use tracing::debug;

use crate::error::{BaasError, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared HTTP client and credentials for every backend service.
///
/// The service-role key is used for table access and admin identity calls;
/// the anon key identifies the project on end-user auth calls.
#[derive(Clone)]
pub struct BaasClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
    service_key: String,
}

impl BaasClient {
    pub fn new(
        base_url: impl Into<String>,
        anon_key: impl Into<String>,
        service_key: impl Into<String>,
    ) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(BaasError::Config(format!(
                "backend URL must be http(s), got '{}'",
                base_url
            )));
        }
        let anon_key = anon_key.into();
        if anon_key.is_empty() {
            return Err(BaasError::Config("anon key is empty".into()));
        }
        let service_key = service_key.into();

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url,
            service_key: if service_key.is_empty() {
                anon_key.clone()
            } else {
                service_key
            },
            anon_key,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Request authorized with the service-role key.
    fn service(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, self.endpoint(path))
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }

    /// Request on behalf of an end user (or anonymous when `access_token`
    /// is `None`).
    fn public(&self, method: Method, path: &str, access_token: Option<&str>) -> RequestBuilder {
        self.http
            .request(method, self.endpoint(path))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token.unwrap_or(&self.anon_key))
    }
}

/// Turn a non-success response into [`BaasError::Api`].
async fn check(service: &'static str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = api_message(&body);
    debug!(service, status = status.as_u16(), %message, "backend rejected request");
    Err(BaasError::Api {
        service,
        status: status.as_u16(),
        message,
    })
}

/// Human-readable message from a backend error body. The services disagree
/// on the field name, so the known ones are tried in order.
fn api_message(body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    parsed
        .as_ref()
        .and_then(|v| {
            ["message", "msg", "error_description", "error"]
                .iter()
                .find_map(|k| v.get(*k).and_then(Value::as_str))
        })
        .map(str::to_string)
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                "no response body".to_string()
            } else {
                trimmed.chars().take(200).collect()
            }
        })
}
