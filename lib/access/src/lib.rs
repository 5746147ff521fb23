//! Access control and session lifecycle for tandem.
//!
//! This crate provides:
//! - The email allow-list policy (`AllowList`)
//! - The identity backend seam (`AuthBackend`) and an in-memory backend
//! - The auth gateway for sign-up, sign-in and sign-out (`AuthGateway`)
//! - The session store fed by the backend's auth-state stream (`SessionStore`)
//! - The route guard that gates protected views (`RouteGuard`)
//!
//! # Access Control Model
//!
//! Only allow-listed addresses may hold a session. The gateway checks the
//! list before any credential reaches the backend, and the session store
//! checks it again on every auth-state notification, signing out any
//! principal that fails.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use tandem_access::{AllowList, AuthGateway, GuardState, MemoryBackend, MemoryDirectory, SessionStore};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let directory = MemoryDirectory::new();
//! directory.add_account("alice@example.com", "hunter22");
//! let backend = MemoryBackend::connect(&directory);
//!
//! let gateway = AuthGateway::new(Arc::new(backend), AllowList::parse("alice@example.com"));
//! let (store, _scope) = SessionStore::attach(gateway.clone());
//! assert_eq!(store.guard().state(), GuardState::Unknown);
//!
//! store.ready().await;
//! assert_eq!(store.guard().state(), GuardState::Unauthenticated);
//!
//! gateway.sign_in("alice@example.com", "hunter22").await.unwrap();
//! # }
//! ```

pub mod allow_list;
pub mod backend;
pub mod config;
pub mod error;
pub mod gateway;
pub mod guard;
pub mod identity;
pub mod memory;
pub mod notice;
pub mod session;
pub mod store;

// Re-export main types at crate root
pub use allow_list::AllowList;
pub use backend::{AuthBackend, AuthStateHub, AuthStateSubscription, BackendError, BackendErrorCode};
pub use config::AccessConfig;
pub use error::{AuthError, CredentialError, PolicyError, TransportError, UnauthorizedSessionError};
pub use gateway::AuthGateway;
pub use guard::{GuardState, RouteGuard};
pub use identity::{Identity, Principal};
pub use memory::{BackendCalls, MemoryBackend, MemoryDirectory};
pub use notice::{Notice, NoticeLevel};
pub use session::SessionHandle;
pub use store::{SessionState, SessionStore, StoreScope};
