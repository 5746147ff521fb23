//! Authentication module for the tandem server.
//!
//! This module provides:
//! - A client for the hosted identity provider's REST API
//! - A registry of per-browser session stores
//! - The route guard as an Axum extractor
//! - Sign-in, sign-up and sign-out routes
//!
//! Each browser gets its own [`ClientSession`]: a backend connection, an
//! auth gateway and a session store, exactly what a single page would hold
//! in the browser. The `client` cookie only names that session; it carries
//! no credentials.

pub mod clients;
pub mod identity_toolkit;
pub mod middleware;
pub mod routes;

use std::sync::Arc;
use tandem_access::{AllowList, AuthBackend};

use crate::config::SessionConfig;

pub use clients::{ClientRegistry, ClientSession};
pub use identity_toolkit::IdentityToolkitBackend;
pub use middleware::{CLIENT_COOKIE, RequireAuth};

/// Opens a fresh backend connection for a new browser client.
pub type BackendFactory = Arc<dyn Fn() -> Arc<dyn AuthBackend> + Send + Sync>;

/// Shared application state.
pub struct AppState {
    /// Live browser clients.
    pub registry: ClientRegistry,
    /// Session configuration.
    pub session_config: SessionConfig,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(factory: BackendFactory, allow_list: AllowList, session_config: SessionConfig) -> Self {
        Self {
            registry: ClientRegistry::new(factory, allow_list),
            session_config,
        }
    }
}
