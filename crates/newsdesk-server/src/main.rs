//! # newsdesk-server
//!
//! HTTP backend for the news publishing platform.
//!
//! This binary provides:
//! - **REST API** (axum) under `/api/v1` for articles, categories, channels,
//!   accounts, users, device tokens and media uploads
//! - **Role gates** resolved from the caller's profile on every request
//! - **Push notifications** over FCM, sent on detached tracked tasks
//! - **Per-IP rate limiting** to protect against abuse
//!
//! Persistence, identity and file storage are delegated to a hosted
//! backend, or to in-memory stand-ins for local development.

mod api;
mod auth;
mod backend;
mod config;
mod envelope;
mod error;
mod extract;
mod lookup;
mod notify;
mod pagination;
mod rate_limit;
mod routes;
mod services;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::api::AppState;
use crate::config::ServerConfig;
use crate::notify::Notifier;
use crate::rate_limit::RateLimiter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,newsdesk_server=debug")),
        )
        .init();

    info!("Starting newsdesk server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Initialize backends and the push notifier
    // -----------------------------------------------------------------------
    let backends = backend::connect(&config)?;

    let notifier = Notifier::new(backend::push_dispatcher(&config), backends.store.clone());
    info!(push_enabled = notifier.is_enabled(), "Push notifications");

    let rate_limiter = RateLimiter::new(config.rate_limit_rps, config.rate_limit_burst);

    let http_addr = config.http_addr;
    let app_state = AppState {
        store: backends.store,
        identity: backends.identity,
        storage: backends.storage,
        notifier: notifier.clone(),
        rate_limiter: rate_limiter.clone(),
        config: Arc::new(config),
    };

    // -----------------------------------------------------------------------
    // 4. Spawn background tasks
    // -----------------------------------------------------------------------

    // Rate limiter cleanup, evicting clients idle >10 min
    rate_limiter.spawn_purge();

    // -----------------------------------------------------------------------
    // 5. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(app_state, http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    // -----------------------------------------------------------------------
    // 6. Let in-flight notifications finish
    // -----------------------------------------------------------------------
    notifier.drain().await;
    info!("Shutdown complete");

    Ok(())
}
