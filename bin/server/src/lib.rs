//! tandem web server.
//!
//! Puts the access layer in front of the journal: every browser gets its
//! own session store, and protected pages are served only once that store
//! has settled on an allow-listed identity.

pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod pages;

use rootcause::prelude::Report;
use std::sync::Arc;
use tandem_access::{AuthBackend, MemoryBackend, MemoryDirectory};
use tracing::{debug, info, warn};

use crate::auth::{AppState, BackendFactory, IdentityToolkitBackend};
use crate::config::{ProviderConfig, ServerConfig};
use crate::error::StartupError;

/// Picks the identity backend every new browser client connects to.
///
/// # Errors
///
/// Returns an error if the HTTP client for the hosted provider cannot be
/// built.
pub fn backend_factory(provider: &ProviderConfig) -> Result<BackendFactory, Report<StartupError>> {
    let Some(api_key) = provider.api_key.clone() else {
        warn!("no identity provider API key configured; using an empty in-memory account directory");
        let directory = MemoryDirectory::new();
        return Ok(Arc::new(move || {
            Arc::new(MemoryBackend::connect(&directory)) as Arc<dyn AuthBackend>
        }));
    };

    let http = reqwest::Client::builder()
        .build()
        .map_err(|e| StartupError::HttpClient {
            details: e.to_string(),
        })?;
    let endpoint = provider.endpoint.clone();
    info!(endpoint = %endpoint, "using hosted identity provider");
    Ok(Arc::new(move || {
        Arc::new(IdentityToolkitBackend::new(http.clone(), &endpoint, &api_key)) as Arc<dyn AuthBackend>
    }))
}

/// Loads configuration from the environment and serves until Ctrl-C.
///
/// # Errors
///
/// Returns an error if configuration is invalid, the listener cannot bind,
/// or the server stops with an I/O error.
pub async fn run() -> tandem_core::Result<(), StartupError> {
    let config = ServerConfig::from_env().map_err(|e| StartupError::Config {
        details: e.to_string(),
    })?;
    info!("Loaded configuration");

    let allow_list = config.access.allow_list();
    if allow_list.is_empty() {
        warn!("allow-list is empty; nobody will be able to sign in");
    }
    info!(allowed_emails = allow_list.len(), "allow-list loaded");

    let factory = backend_factory(&config.provider)?;
    let state = Arc::new(AppState::new(factory, allow_list, config.session));

    // Spawn periodic idle-client cleanup task
    let cleanup_state = Arc::clone(&state);
    let cleanup = tokio::spawn(async move {
        let period = std::time::Duration::from_secs(
            cleanup_state.session_config.cleanup_interval_seconds.max(1),
        );
        let max_idle = chrono::Duration::minutes(cleanup_state.session_config.idle_minutes);
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            let evicted = cleanup_state.registry.evict_idle(max_idle).await;
            if evicted > 0 {
                debug!(evicted_clients = evicted, "Periodic client cleanup");
            }
        }
    });

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .map_err(|e| StartupError::Bind {
            addr: config.bind_addr.clone(),
            details: e.to_string(),
        })?;
    info!("listening on http://{}", config.bind_addr);

    let served = axum::serve(listener, app::router(Arc::clone(&state)).into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await;

    cleanup.abort();
    state.registry.clear().await;

    served.map_err(|e| StartupError::Serve {
        details: e.to_string(),
    })?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl-C; shutting down");
        return;
    }
    info!("shutdown requested");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn without_api_key_clients_use_memory_directory() {
        let factory = backend_factory(&ProviderConfig::default()).unwrap();

        let backend = factory();
        let err = backend
            .sign_in_with_credentials("a@x.com", "secret1")
            .await
            .unwrap_err();
        assert_eq!(err, tandem_access::BackendError::rejected("auth/user-not-found"));
    }

    #[test]
    fn with_api_key_builds_provider_client() {
        let provider = ProviderConfig {
            api_key: Some("key-1".to_string()),
            ..ProviderConfig::default()
        };
        assert!(backend_factory(&provider).is_ok());
    }
}
