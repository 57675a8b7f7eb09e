//! Construction of the backend clients selected by [`ServerConfig`].

use std::sync::Arc;

use anyhow::Context;
use newsdesk_push::{Dispatcher, FcmGateway, ServiceAccount};
use newsdesk_store::memory::{MemoryIdentity, MemoryStorage, MemoryStore};
use newsdesk_store::rest::{BaasClient, RestIdentity, RestStorage, RestStore};
use newsdesk_store::{IdentityProvider, ObjectStorage, Store};
use tracing::{info, warn};

use crate::config::{BackendKind, ServerConfig};

pub struct Backends {
    pub store: Arc<dyn Store>,
    pub identity: Arc<dyn IdentityProvider>,
    pub storage: Arc<dyn ObjectStorage>,
}

pub fn connect(config: &ServerConfig) -> anyhow::Result<Backends> {
    match config.backend {
        BackendKind::Supabase => {
            let url = config
                .supabase_url
                .as_deref()
                .context("SUPABASE_URL is required for the supabase backend")?;
            let anon_key = config
                .supabase_key
                .as_deref()
                .context("SUPABASE_KEY is required for the supabase backend")?;
            if config.service_role_key.is_none() {
                warn!("SERVICE_ROLE_KEY not set, admin calls will use the anon key");
            }
            let client = BaasClient::new(
                url,
                anon_key,
                config.service_role_key.clone().unwrap_or_default(),
            )
            .context("invalid backend configuration")?;

            info!(url = %client.base_url(), "Using hosted backend");
            Ok(Backends {
                store: Arc::new(RestStore::new(client.clone())),
                identity: Arc::new(RestIdentity::new(client.clone())),
                storage: Arc::new(RestStorage::new(client)),
            })
        }
        BackendKind::Memory => {
            warn!("Using in-memory backend, all data is lost on restart");
            Ok(Backends {
                store: Arc::new(MemoryStore::newsdesk()),
                identity: Arc::new(MemoryIdentity::new()),
                storage: Arc::new(MemoryStorage::new(format!("http://{}", config.http_addr))),
            })
        }
    }
}

/// Push dispatcher over FCM, or a disabled one when credentials are
/// missing or unusable.
pub fn push_dispatcher(config: &ServerConfig) -> Dispatcher {
    let account = if let Some(path) = &config.firebase_service_account_path {
        ServiceAccount::from_file(path)
    } else if let Some(json) = &config.firebase_service_account_json {
        ServiceAccount::from_json(json)
    } else {
        info!("No Firebase credentials configured, push notifications disabled");
        return Dispatcher::disabled();
    };

    match account.and_then(FcmGateway::new) {
        Ok(gateway) => Dispatcher::new(Arc::new(gateway)),
        Err(e) => {
            warn!(error = %e, "Failed to initialise FCM, push notifications disabled");
            Dispatcher::disabled()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_backend_by_default() {
        assert!(connect(&ServerConfig::default()).is_ok());
    }

    #[test]
    fn test_supabase_backend_requires_url() {
        let config = ServerConfig {
            backend: BackendKind::Supabase,
            ..ServerConfig::default()
        };
        assert!(connect(&config).is_err());
    }

    #[test]
    fn test_push_disabled_without_credentials() {
        assert!(!push_dispatcher(&ServerConfig::default()).is_enabled());
    }

    #[test]
    fn test_push_disabled_on_bad_credentials() {
        let config = ServerConfig {
            firebase_service_account_json: Some("{ not json".into()),
            ..ServerConfig::default()
        };
        assert!(!push_dispatcher(&config).is_enabled());
    }
}
