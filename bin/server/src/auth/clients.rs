//! Per-browser session stores.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tandem_access::{AllowList, AuthGateway, Notice, SessionStore, StoreScope};
use tandem_core::ClientId;
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, info};

use super::BackendFactory;

/// One browser's view of the access layer.
pub struct ClientSession {
    store: SessionStore,
    notices: tokio::sync::Mutex<broadcast::Receiver<Notice>>,
    last_seen: Mutex<DateTime<Utc>>,
    // Dropped last; stopping the writer releases the backend subscription.
    _scope: StoreScope,
}

impl ClientSession {
    fn open(gateway: AuthGateway) -> Self {
        let (store, scope) = SessionStore::attach(gateway);
        let notices = tokio::sync::Mutex::new(store.notices());
        Self {
            store,
            notices,
            last_seen: Mutex::new(Utc::now()),
            _scope: scope,
        }
    }

    #[must_use]
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    #[must_use]
    pub fn gateway(&self) -> &AuthGateway {
        self.store.gateway()
    }

    /// Takes every notice queued since the last call.
    pub async fn drain_notices(&self) -> Vec<Notice> {
        let mut receiver = self.notices.lock().await;
        let mut drained = Vec::new();
        loop {
            match receiver.try_recv() {
                Ok(notice) => drained.push(notice),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    debug!(skipped, "client fell behind on notices");
                }
                Err(_) => break,
            }
        }
        drained
    }

    fn touch(&self) {
        *self
            .last_seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Utc::now();
    }

    fn idle_since(&self) -> DateTime<Utc> {
        *self
            .last_seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for ClientSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSession")
            .field("store", &self.store)
            .field("last_seen", &self.idle_since())
            .finish_non_exhaustive()
    }
}

/// Live browser clients keyed by their `client` cookie.
#[derive(Clone)]
pub struct ClientRegistry {
    clients: Arc<RwLock<HashMap<ClientId, Arc<ClientSession>>>>,
    factory: BackendFactory,
    allow_list: AllowList,
}

impl ClientRegistry {
    #[must_use]
    pub fn new(factory: BackendFactory, allow_list: AllowList) -> Self {
        Self {
            clients: Arc::new(RwLock::new(HashMap::new())),
            factory,
            allow_list,
        }
    }

    /// Looks up a client and marks it as seen.
    pub async fn get(&self, id: &ClientId) -> Option<Arc<ClientSession>> {
        let client = self.clients.read().await.get(id).cloned()?;
        client.touch();
        Some(client)
    }

    /// Returns the allow-list every client's gateway enforces.
    #[must_use]
    pub fn allow_list(&self) -> &AllowList {
        &self.allow_list
    }

    /// Opens a client that is not yet registered. It lives only as long as
    /// the caller holds it, until [`ClientRegistry::register`] adopts it.
    #[must_use]
    pub fn open(&self) -> Arc<ClientSession> {
        let gateway = AuthGateway::new((self.factory)(), self.allow_list.clone());
        Arc::new(ClientSession::open(gateway))
    }

    /// Adopts an opened client and returns the id its cookie will carry.
    pub async fn register(&self, client: Arc<ClientSession>) -> ClientId {
        let id = ClientId::new();
        client.touch();
        self.clients.write().await.insert(id, client);
        debug!(client_id = %id, "registered browser client");
        id
    }

    /// Forgets a client. Its store stops once in-flight requests finish.
    pub async fn remove(&self, id: &ClientId) -> bool {
        self.clients.write().await.remove(id).is_some()
    }

    /// Drops clients idle for longer than `max_idle`. Returns how many went.
    pub async fn evict_idle(&self, max_idle: Duration) -> usize {
        let cutoff = Utc::now() - max_idle;
        let mut clients = self.clients.write().await;
        let before = clients.len();
        clients.retain(|_, client| client.idle_since() >= cutoff);
        before - clients.len()
    }

    pub async fn len(&self) -> usize {
        self.clients.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drops every client.
    pub async fn clear(&self) {
        let mut clients = self.clients.write().await;
        let count = clients.len();
        clients.clear();
        info!(count, "closed browser clients");
    }
}

impl std::fmt::Debug for ClientRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientRegistry")
            .field("allowed_emails", &self.allow_list.len())
            .finish_non_exhaustive()
    }
}
