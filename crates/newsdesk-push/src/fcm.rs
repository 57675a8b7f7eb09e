//! Firebase Cloud Messaging over the HTTP v1 API.
//!
//! Authentication uses a Google service account: an RS256-signed JWT
//! assertion is exchanged for a short-lived OAuth access token, which is
//! cached until shortly before it expires.

use std::path::Path;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{PushError, Result};
use crate::gateway::{DeliveryResult, PushGateway};
use crate::message::PushMessage;

const MESSAGING_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const FCM_API_BASE: &str = "https://fcm.googleapis.com/v1/projects";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// The fields of a Google service-account key file that FCM needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccount {
    pub project_id: String,
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccount {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| PushError::Credentials(format!("malformed service account: {}", e)))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            PushError::Credentials(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: u64,
}

struct CachedToken {
    access_token: String,
    refresh_at: Instant,
}

/// [`PushGateway`] backed by FCM.
pub struct FcmGateway {
    http: reqwest::Client,
    account: ServiceAccount,
    signing_key: EncodingKey,
    token: Mutex<Option<CachedToken>>,
}

impl FcmGateway {
    pub fn new(account: ServiceAccount) -> Result<Self> {
        let signing_key = EncodingKey::from_rsa_pem(account.private_key.as_bytes())?;
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        info!(project = %account.project_id, "FCM gateway initialised");
        Ok(Self {
            http,
            account,
            signing_key,
            token: Mutex::new(None),
        })
    }

    fn send_url(&self) -> String {
        format!("{}/{}/messages:send", FCM_API_BASE, self.account.project_id)
    }

    fn assertion(&self) -> Result<String> {
        let iat = Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: &self.account.client_email,
            scope: MESSAGING_SCOPE,
            aud: &self.account.token_uri,
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };
        Ok(encode(&Header::new(Algorithm::RS256), &claims, &self.signing_key)?)
    }

    /// Cached OAuth access token, fetched anew when close to expiry.
    async fn access_token(&self) -> Result<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(token.access_token.clone());
            }
        }

        let assertion = self.assertion()?;
        let response = self
            .http
            .post(&self.account.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PushError::Auth {
                status: status.as_u16(),
                message,
            });
        }

        let body: TokenResponse = response.json().await?;
        let lifetime = Duration::from_secs(body.expires_in);
        debug!(expires_in = body.expires_in, "fetched FCM access token");
        *cached = Some(CachedToken {
            access_token: body.access_token.clone(),
            refresh_at: Instant::now() + lifetime.saturating_sub(TOKEN_REFRESH_MARGIN),
        });
        Ok(body.access_token)
    }

    async fn send_one(&self, url: &str, access_token: &str, body: Value) -> DeliveryResult {
        let response = match self
            .http
            .post(url)
            .bearer_auth(access_token)
            .json(&body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return DeliveryResult::Failed(e.to_string()),
        };

        let status = response.status().as_u16();
        if response.status().is_success() {
            return DeliveryResult::Delivered;
        }
        let body = response.text().await.unwrap_or_default();
        classify_failure(status, &body)
    }
}

#[async_trait]
impl PushGateway for FcmGateway {
    async fn send_batch(
        &self,
        message: &PushMessage,
        tokens: &[String],
    ) -> Result<Vec<DeliveryResult>> {
        let access_token = self.access_token().await?;
        let url = self.send_url();

        let sends = tokens
            .iter()
            .map(|token| self.send_one(&url, &access_token, fcm_message(message, token)));
        Ok(join_all(sends).await)
    }
}

/// HTTP v1 request body for one device.
fn fcm_message(message: &PushMessage, token: &str) -> Value {
    let mut notification = json!({ "title": message.title, "body": message.body });
    if let Some(image) = &message.image_url {
        notification["image"] = json!(image);
    }

    json!({
        "message": {
            "token": token,
            "notification": notification,
            "data": message.data,
            "android": {
                "priority": "high",
                "notification": {
                    "sound": "default",
                    "click_action": "FLUTTER_NOTIFICATION_CLICK"
                }
            },
            "apns": {
                "payload": {
                    "aps": { "sound": "default", "badge": 1 }
                }
            }
        }
    })
}

/// Map an FCM error response to a delivery outcome. Only errors that can
/// never succeed for this token mark it invalid.
fn classify_failure(status: u16, body: &str) -> DeliveryResult {
    let parsed: Value = serde_json::from_str(body).unwrap_or(Value::Null);
    let error = &parsed["error"];

    let fcm_code = error["details"]
        .as_array()
        .into_iter()
        .flatten()
        .find_map(|d| d["errorCode"].as_str());
    let code = fcm_code
        .or_else(|| error["status"].as_str())
        .unwrap_or("UNKNOWN")
        .to_string();

    let detail = error["message"].as_str().unwrap_or(code.as_str());

    // INVALID_ARGUMENT also covers malformed messages; only blame the token
    // when FCM names it.
    let names_token = detail.to_lowercase().contains("registration token");
    let permanent = status == 404
        || matches!(code.as_str(), "UNREGISTERED" | "NOT_FOUND")
        || (code == "INVALID_ARGUMENT" && names_token);
    if permanent {
        return DeliveryResult::InvalidToken(code);
    }
    DeliveryResult::Failed(format!("{}: {}", status, detail))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_account_defaults_token_uri() {
        let account = ServiceAccount::from_json(
            r#"{"project_id":"p","client_email":"svc@p.iam.gserviceaccount.com","private_key":"k"}"#,
        )
        .unwrap();
        assert_eq!(account.token_uri, DEFAULT_TOKEN_URI);
        assert!(ServiceAccount::from_json("{}").is_err());
    }

    #[test]
    fn test_missing_credentials_file() {
        let err = ServiceAccount::from_file("/nonexistent/service-account.json").unwrap_err();
        assert!(matches!(err, PushError::Credentials(_)));
    }

    #[test]
    fn test_invalid_private_key_rejected() {
        let account = ServiceAccount {
            project_id: "p".into(),
            client_email: "svc@p".into(),
            private_key: "not a pem".into(),
            token_uri: DEFAULT_TOKEN_URI.into(),
        };
        assert!(matches!(FcmGateway::new(account), Err(PushError::Signing(_))));
    }

    #[test]
    fn test_message_shape() {
        let message = PushMessage::new("Hello", "World")
            .with_data("type", "new_article")
            .with_image(Some("https://img".into()));
        let body = fcm_message(&message, "tok");

        assert_eq!(body["message"]["token"], "tok");
        assert_eq!(body["message"]["notification"]["image"], "https://img");
        assert_eq!(body["message"]["data"]["type"], "new_article");
        assert_eq!(body["message"]["android"]["priority"], "high");
        assert_eq!(
            body["message"]["android"]["notification"]["click_action"],
            "FLUTTER_NOTIFICATION_CLICK"
        );
        assert_eq!(body["message"]["apns"]["payload"]["aps"]["badge"], 1);
    }

    #[test]
    fn test_message_without_image_omits_field() {
        let body = fcm_message(&PushMessage::new("a", "b"), "tok");
        assert!(body["message"]["notification"].get("image").is_none());
    }

    #[test]
    fn test_classify_unregistered() {
        let body = r#"{"error":{"code":404,"message":"Requested entity was not found.","status":"NOT_FOUND",
            "details":[{"@type":"type.googleapis.com/google.firebase.fcm.v1.FcmError","errorCode":"UNREGISTERED"}]}}"#;
        assert_eq!(
            classify_failure(404, body),
            DeliveryResult::InvalidToken("UNREGISTERED".into())
        );
    }

    #[test]
    fn test_classify_invalid_argument() {
        let body = r#"{"error":{"code":400,"message":"The registration token is not a valid FCM registration token","status":"INVALID_ARGUMENT"}}"#;
        assert_eq!(
            classify_failure(400, body),
            DeliveryResult::InvalidToken("INVALID_ARGUMENT".into())
        );
    }

    #[test]
    fn test_classify_malformed_message_keeps_token() {
        let body = r#"{"error":{"code":400,"message":"Invalid data payload key: from","status":"INVALID_ARGUMENT",
            "details":[{"@type":"type.googleapis.com/google.firebase.fcm.v1.FcmError","errorCode":"INVALID_ARGUMENT"}]}}"#;
        assert_eq!(
            classify_failure(400, body),
            DeliveryResult::Failed("400: Invalid data payload key: from".into())
        );
    }

    #[test]
    fn test_classify_transient() {
        let body = r#"{"error":{"code":503,"message":"Service unavailable","status":"UNAVAILABLE"}}"#;
        assert_eq!(
            classify_failure(503, body),
            DeliveryResult::Failed("503: Service unavailable".into())
        );
        assert!(matches!(classify_failure(500, "oops"), DeliveryResult::Failed(_)));
    }
}
