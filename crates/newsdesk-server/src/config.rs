//! Server configuration loaded from environment variables.
//!
//! All settings have defaults so the server can start with zero
//! configuration for local development (in-memory backend, no push).

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;

use newsdesk_shared::constants::{
    DEFAULT_CHANNEL_ID, DEFAULT_DEEP_LINK_BASE, MAX_UPLOAD_SIZE, MEDIA_BUCKET,
};

/// Where rows, users and files live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Hosted Supabase project reached over HTTP.
    Supabase,
    /// Process-local state, lost on restart.
    Memory,
}

/// Server configuration.
#[derive(Clone)]
pub struct ServerConfig {
    /// Env: `HTTP_ADDR`. Default: `0.0.0.0:8000`
    pub http_addr: SocketAddr,

    /// Env: `NEWSDESK_BACKEND` (`supabase` | `memory`).
    /// Default: `supabase` when `SUPABASE_URL` is set, `memory` otherwise.
    pub backend: BackendKind,

    /// Env: `SUPABASE_URL`
    pub supabase_url: Option<String>,

    /// Project anon key. Env: `SUPABASE_KEY`
    pub supabase_key: Option<String>,

    /// Env: `SERVICE_ROLE_KEY`. Falls back to the anon key.
    pub service_role_key: Option<String>,

    /// Env: `STORAGE_BUCKET`. Default: `media`
    pub storage_bucket: String,

    /// Env: `FIREBASE_SERVICE_ACCOUNT_PATH`
    pub firebase_service_account_path: Option<PathBuf>,

    /// Inline service-account JSON, used when no path is given.
    /// Env: `FIREBASE_SERVICE_ACCOUNT_JSON`
    pub firebase_service_account_json: Option<String>,

    /// Env: `MAX_UPLOAD_SIZE` (bytes). Default: 10 MiB
    pub max_upload_size: usize,

    /// Channel given to authors whose profile has none.
    /// Env: `DEFAULT_CHANNEL_ID` (`none` disables). Default: `1`
    pub default_channel_id: Option<i64>,

    /// Env: `DEEP_LINK_BASE`. Default: `newsapp://auth/invite`
    pub deep_link_base: String,

    /// Env: `CORS_ORIGINS` (comma separated, `*` for any). Default: `*`
    pub cors_origins: Vec<String>,

    /// Sustained requests per second per client IP. Env: `RATE_LIMIT_RPS`
    pub rate_limit_rps: f64,

    /// Env: `RATE_LIMIT_BURST`
    pub rate_limit_burst: f64,

    /// Free-form deployment label. Env: `ENVIRONMENT`. Default: `development`
    pub environment: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], 8000).into(),
            backend: BackendKind::Memory,
            supabase_url: None,
            supabase_key: None,
            service_role_key: None,
            storage_bucket: MEDIA_BUCKET.to_string(),
            firebase_service_account_path: None,
            firebase_service_account_json: None,
            max_upload_size: MAX_UPLOAD_SIZE,
            default_channel_id: Some(DEFAULT_CHANNEL_ID),
            deep_link_base: DEFAULT_DEEP_LINK_BASE.to_string(),
            cors_origins: vec!["*".to_string()],
            rate_limit_rps: 10.0,
            rate_limit_burst: 30.0,
            environment: "development".to_string(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(addr) = var("HTTP_ADDR") {
            match addr.parse::<SocketAddr>() {
                Ok(parsed) => config.http_addr = parsed,
                Err(_) => tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default"),
            }
        }

        config.supabase_url = var("SUPABASE_URL");
        config.supabase_key = var("SUPABASE_KEY");
        config.service_role_key = var("SERVICE_ROLE_KEY");

        config.backend = match var("NEWSDESK_BACKEND").as_deref() {
            Some("supabase") => BackendKind::Supabase,
            Some("memory") => BackendKind::Memory,
            Some(other) => {
                tracing::warn!(value = %other, "Unknown NEWSDESK_BACKEND, inferring from SUPABASE_URL");
                infer_backend(&config.supabase_url)
            }
            None => infer_backend(&config.supabase_url),
        };

        if let Some(bucket) = var("STORAGE_BUCKET") {
            config.storage_bucket = bucket;
        }

        config.firebase_service_account_path = var("FIREBASE_SERVICE_ACCOUNT_PATH").map(PathBuf::from);
        config.firebase_service_account_json = var("FIREBASE_SERVICE_ACCOUNT_JSON");

        if let Some(val) = var("MAX_UPLOAD_SIZE") {
            match val.parse::<usize>() {
                Ok(n) if n > 0 => config.max_upload_size = n,
                _ => tracing::warn!(value = %val, "Invalid MAX_UPLOAD_SIZE, using default"),
            }
        }

        if let Some(val) = var("DEFAULT_CHANNEL_ID") {
            if val.eq_ignore_ascii_case("none") {
                config.default_channel_id = None;
            } else {
                match val.parse::<i64>() {
                    Ok(id) => config.default_channel_id = Some(id),
                    Err(_) => tracing::warn!(value = %val, "Invalid DEFAULT_CHANNEL_ID, using default"),
                }
            }
        }

        if let Some(base) = var("DEEP_LINK_BASE") {
            config.deep_link_base = base;
        }

        if let Some(origins) = var("CORS_ORIGINS") {
            config.cors_origins = origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }

        if let Some(val) = var("RATE_LIMIT_RPS") {
            match val.parse::<f64>() {
                Ok(n) if n > 0.0 => config.rate_limit_rps = n,
                _ => tracing::warn!(value = %val, "Invalid RATE_LIMIT_RPS, using default"),
            }
        }

        if let Some(val) = var("RATE_LIMIT_BURST") {
            match val.parse::<f64>() {
                Ok(n) if n >= 1.0 => config.rate_limit_burst = n,
                _ => tracing::warn!(value = %val, "Invalid RATE_LIMIT_BURST, using default"),
            }
        }

        if let Some(env) = var("ENVIRONMENT") {
            config.environment = env;
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter.

        config
    }

    /// `true` when any origin may call the API.
    pub fn cors_any_origin(&self) -> bool {
        self.cors_origins.is_empty() || self.cors_origins.iter().any(|o| o == "*")
    }

    pub fn push_configured(&self) -> bool {
        self.firebase_service_account_path.is_some() || self.firebase_service_account_json.is_some()
    }
}

fn infer_backend(supabase_url: &Option<String>) -> BackendKind {
    if supabase_url.is_some() {
        BackendKind::Supabase
    } else {
        BackendKind::Memory
    }
}

fn redact(secret: &Option<String>) -> &'static str {
    if secret.is_some() {
        "<set>"
    } else {
        "<unset>"
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("http_addr", &self.http_addr)
            .field("backend", &self.backend)
            .field("supabase_url", &self.supabase_url)
            .field("supabase_key", &redact(&self.supabase_key))
            .field("service_role_key", &redact(&self.service_role_key))
            .field("storage_bucket", &self.storage_bucket)
            .field("firebase_service_account_path", &self.firebase_service_account_path)
            .field(
                "firebase_service_account_json",
                &redact(&self.firebase_service_account_json),
            )
            .field("max_upload_size", &self.max_upload_size)
            .field("default_channel_id", &self.default_channel_id)
            .field("deep_link_base", &self.deep_link_base)
            .field("cors_origins", &self.cors_origins)
            .field("rate_limit_rps", &self.rate_limit_rps)
            .field("rate_limit_burst", &self.rate_limit_burst)
            .field("environment", &self.environment)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> ServerConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.http_addr, ([0, 0, 0, 0], 8000).into());
        assert_eq!(config.backend, BackendKind::Memory);
        assert_eq!(config.default_channel_id, Some(1));
        assert_eq!(config.max_upload_size, 10 * 1024 * 1024);
        assert!(config.cors_any_origin());
        assert!(!config.push_configured());
    }

    #[test]
    fn test_backend_inferred_from_url() {
        let config = from_pairs(&[("SUPABASE_URL", "https://x.supabase.co")]);
        assert_eq!(config.backend, BackendKind::Supabase);

        let forced = from_pairs(&[
            ("SUPABASE_URL", "https://x.supabase.co"),
            ("NEWSDESK_BACKEND", "memory"),
        ]);
        assert_eq!(forced.backend, BackendKind::Memory);
    }

    #[test]
    fn test_default_channel_can_be_disabled() {
        assert_eq!(from_pairs(&[("DEFAULT_CHANNEL_ID", "none")]).default_channel_id, None);
        assert_eq!(from_pairs(&[("DEFAULT_CHANNEL_ID", "7")]).default_channel_id, Some(7));
        assert_eq!(from_pairs(&[("DEFAULT_CHANNEL_ID", "x")]).default_channel_id, Some(1));
    }

    #[test]
    fn test_invalid_values_keep_defaults() {
        let config = from_pairs(&[
            ("HTTP_ADDR", "not-an-addr"),
            ("RATE_LIMIT_RPS", "-3"),
            ("MAX_UPLOAD_SIZE", "0"),
        ]);
        assert_eq!(config.http_addr, ([0, 0, 0, 0], 8000).into());
        assert_eq!(config.rate_limit_rps, 10.0);
        assert_eq!(config.max_upload_size, MAX_UPLOAD_SIZE);
    }

    #[test]
    fn test_cors_origins_list() {
        let config = from_pairs(&[("CORS_ORIGINS", "https://a.com, https://b.com")]);
        assert_eq!(config.cors_origins, vec!["https://a.com", "https://b.com"]);
        assert!(!config.cors_any_origin());
    }

    #[test]
    fn test_debug_redacts_keys() {
        let config = from_pairs(&[("SUPABASE_KEY", "super-secret")]);
        let debug = format!("{:?}", config);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("<set>"));
    }
}
