//! Session store.
//!
//! The store owns the current [`SessionState`]. It is written by exactly
//! one task, which consumes the backend's auth-state stream; everything else
//! holds a read-only [`SessionStore`] handle and observes changes through a
//! `watch` channel.
//!
//! Every notification from the backend is re-validated against the
//! allow-list. A principal that fails the check is never stored: the store
//! forces a sign-out and emits a warning notice instead.
//!
//! `loading` starts out true and flips to false once the first notification
//! has been handled, whatever it contained. It never flips back.

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::backend::AuthStateSubscription;
use crate::error::{UNAUTHORIZED_SESSION_MESSAGE, UnauthorizedSessionError};
use crate::gateway::AuthGateway;
use crate::guard::RouteGuard;
use crate::identity::{Identity, Principal};
use crate::notice::Notice;

const NOTICE_CAPACITY: usize = 16;

/// Snapshot of who is signed in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionState {
    identity: Option<Identity>,
    loading: bool,
}

impl SessionState {
    pub(crate) fn initial() -> Self {
        Self {
            identity: None,
            loading: true,
        }
    }

    pub(crate) fn settled(identity: Option<Identity>) -> Self {
        Self {
            identity,
            loading: false,
        }
    }

    #[cfg(test)]
    pub(crate) fn loading_with(identity: Option<Identity>) -> Self {
        Self {
            identity,
            loading: true,
        }
    }

    /// Returns the signed-in identity.
    ///
    /// While [`SessionState::is_loading`] is true this value means nothing:
    /// treat the session as unknown, not as signed out.
    #[must_use]
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Returns true until the backend's first notification has been handled.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Returns true if the state is settled and someone is signed in.
    #[must_use]
    pub fn is_signed_in(&self) -> bool {
        !self.loading && self.identity.is_some()
    }
}

struct Shared {
    state: watch::Sender<SessionState>,
    notices: broadcast::Sender<Notice>,
    gateway: AuthGateway,
}

/// Read-only handle to the session store.
#[derive(Clone)]
pub struct SessionStore {
    shared: Arc<Shared>,
}

/// Owns the store's writer task.
///
/// Dropping the scope (or calling [`StoreScope::shutdown`]) stops the task,
/// which releases the backend subscription.
#[derive(Debug)]
pub struct StoreScope {
    task: Option<JoinHandle<()>>,
}

impl StoreScope {
    /// Stops the writer task and waits until the subscription is released.
    pub async fn shutdown(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
        }
        debug!("session store shut down");
    }
}

impl Drop for StoreScope {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl SessionStore {
    /// Subscribes to the gateway's backend and starts the writer task.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn attach(gateway: AuthGateway) -> (Self, StoreScope) {
        let (state, _) = watch::channel(SessionState::initial());
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);
        let subscription = gateway.backend().subscribe_auth_state();
        let store = Self {
            shared: Arc::new(Shared {
                state,
                notices,
                gateway,
            }),
        };

        let writer = store.clone();
        let task = tokio::spawn(async move { writer.run(subscription).await });
        (store, StoreScope { task: Some(task) })
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.shared.state.borrow().clone()
    }

    /// Returns a receiver that observes every state change.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<SessionState> {
        self.shared.state.subscribe()
    }

    /// Returns a receiver for user-visible notices.
    #[must_use]
    pub fn notices(&self) -> broadcast::Receiver<Notice> {
        self.shared.notices.subscribe()
    }

    /// Returns a route guard driven by this store.
    #[must_use]
    pub fn guard(&self) -> RouteGuard {
        RouteGuard::new(self.watch())
    }

    /// Returns the gateway this store reports to.
    #[must_use]
    pub fn gateway(&self) -> &AuthGateway {
        &self.shared.gateway
    }

    /// Waits until the backend's first notification has been handled.
    ///
    /// There is no timeout: a backend that never answers keeps this pending.
    pub async fn ready(&self) -> SessionState {
        let mut receiver = self.watch();
        match receiver.wait_for(|state| !state.is_loading()).await {
            Ok(state) => state.clone(),
            // Unreachable while `self` keeps the sender alive.
            Err(_) => self.state(),
        }
    }

    async fn run(self, mut subscription: AuthStateSubscription) {
        debug!(subscription_id = %subscription.id(), "session store listening");
        while let Some(principal) = subscription.next().await {
            self.handle_notification(principal).await;
        }
        debug!(subscription_id = %subscription.id(), "auth-state stream closed");
    }

    async fn handle_notification(&self, principal: Option<Principal>) {
        let Some(principal) = principal else {
            self.settle(None);
            return;
        };

        let allowed = principal
            .email
            .as_deref()
            .is_some_and(|email| self.shared.gateway.allow_list().is_allowed(email));
        if !allowed {
            let err = UnauthorizedSessionError {
                unique_id: principal.uid,
                email: principal.email,
            };
            warn!(error = %err, "terminating unauthorized session");
            self.settle(None);
            self.shared.gateway.force_sign_out().await;
            self.notify(Notice::warning(UNAUTHORIZED_SESSION_MESSAGE));
            return;
        }

        self.settle(Some(Identity::from_principal(principal)));
    }

    /// The single write path for session state.
    fn settle(&self, identity: Option<Identity>) {
        let next = SessionState::settled(identity);
        let mut signed_in = None;
        self.shared.state.send_if_modified(|state| {
            if *state == next {
                return false;
            }
            if !state.loading && state.identity.is_none() {
                signed_in.clone_from(&next.identity);
            }
            *state = next;
            true
        });

        if let Some(identity) = signed_in {
            info!(uid = %identity.unique_id(), "signed in");
            self.notify(Notice::info(format!(
                "Welcome, {}.",
                identity.display_label()
            )));
        }
    }

    fn notify(&self, notice: Notice) {
        if self.shared.notices.send(notice).is_err() {
            debug!("notice dropped, nobody is listening");
        }
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("state", &*self.shared.state.borrow())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allow_list::AllowList;
    use crate::memory::{MemoryBackend, MemoryDirectory};
    use crate::notice::NoticeLevel;
    use std::time::Duration;

    fn backend_with_accounts() -> MemoryBackend {
        let directory = MemoryDirectory::new();
        directory.add_account("a@x.com", "secret-a");
        directory.add_account("b@x.com", "secret-b");
        MemoryBackend::connect(&directory)
    }

    fn attach(backend: &MemoryBackend) -> (SessionStore, StoreScope) {
        let gateway = AuthGateway::new(Arc::new(backend.clone()), AllowList::new(["a@x.com"]));
        SessionStore::attach(gateway)
    }

    async fn wait_until(
        store: &SessionStore,
        predicate: impl FnMut(&SessionState) -> bool,
    ) -> SessionState {
        let mut receiver = store.watch();
        tokio::time::timeout(Duration::from_secs(1), receiver.wait_for(predicate))
            .await
            .expect("timed out waiting for session state")
            .expect("store closed")
            .clone()
    }

    #[tokio::test]
    async fn starts_loading() {
        let backend = backend_with_accounts();
        let (store, _scope) = attach(&backend);

        let state = store.state();
        assert!(state.is_loading());
        assert!(!state.is_signed_in());
    }

    #[tokio::test]
    async fn first_empty_notification_settles_signed_out() {
        let backend = backend_with_accounts();
        let (store, _scope) = attach(&backend);

        let state = store.ready().await;
        assert_eq!(state, SessionState::settled(None));
    }

    #[tokio::test]
    async fn allowed_principal_becomes_identity() {
        let backend = backend_with_accounts();
        backend.restore_principal(Some(Principal::new("uid_a").with_email("a@x.com")));
        let (store, _scope) = attach(&backend);

        let state = store.ready().await;
        assert!(state.is_signed_in());
        let identity = state.identity().unwrap();
        assert_eq!(identity.unique_id(), "uid_a");
        assert_eq!(identity.email(), Some("a@x.com"));
    }

    #[tokio::test]
    async fn disallowed_principal_is_signed_out_once_with_warning() {
        let backend = backend_with_accounts();
        backend.restore_principal(Some(Principal::new("uid_b").with_email("b@x.com")));
        let (store, _scope) = attach(&backend);
        let mut notices = store.notices();

        let notice = tokio::time::timeout(Duration::from_secs(1), notices.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(notice.level, NoticeLevel::Warning);
        assert_eq!(notice.message, UNAUTHORIZED_SESSION_MESSAGE);

        assert_eq!(store.state(), SessionState::settled(None));
        assert_eq!(backend.calls().sign_out, 1);
        assert!(backend.current_principal().is_none());
    }

    #[tokio::test]
    async fn principal_without_email_is_rejected() {
        let backend = backend_with_accounts();
        backend.restore_principal(Some(Principal::new("anonymous")));
        let (store, _scope) = attach(&backend);
        let mut notices = store.notices();

        let notice = notices.recv().await.unwrap();
        assert_eq!(notice.level, NoticeLevel::Warning);
        assert!(store.state().identity().is_none());
    }

    #[tokio::test]
    async fn sign_in_and_sign_out_flow_through_stream() {
        let backend = backend_with_accounts();
        let (store, _scope) = attach(&backend);
        store.ready().await;

        store
            .gateway()
            .sign_in("a@x.com", "secret-a")
            .await
            .unwrap();
        let state = wait_until(&store, SessionState::is_signed_in).await;
        assert_eq!(state.identity().unwrap().email(), Some("a@x.com"));

        store.gateway().sign_out().await.unwrap();
        let state = wait_until(&store, |s| s.identity().is_none()).await;
        assert!(!state.is_loading());
    }

    #[tokio::test]
    async fn welcome_notice_follows_interactive_sign_in() {
        let backend = backend_with_accounts();
        let (store, _scope) = attach(&backend);
        store.ready().await;
        let mut notices = store.notices();

        store
            .gateway()
            .sign_in("a@x.com", "secret-a")
            .await
            .unwrap();

        let notice = notices.recv().await.unwrap();
        assert_eq!(notice.level, NoticeLevel::Info);
        assert!(notice.message.contains("a@x.com"));
    }

    #[tokio::test]
    async fn revoked_principal_clears_existing_identity() {
        let backend = backend_with_accounts();
        backend.restore_principal(Some(Principal::new("uid_a").with_email("a@x.com")));
        let (store, _scope) = attach(&backend);
        assert!(store.ready().await.is_signed_in());

        let mut notices = store.notices();
        backend.restore_principal(Some(Principal::new("uid_b").with_email("B@X.COM")));

        let notice = notices.recv().await.unwrap();
        assert_eq!(notice.level, NoticeLevel::Warning);
        let state = store.state();
        assert!(state.identity().is_none());
        assert!(!state.is_loading());
        assert_eq!(backend.calls().sign_out, 1);
    }

    #[tokio::test]
    async fn loading_never_returns() {
        let backend = backend_with_accounts();
        let (store, _scope) = attach(&backend);
        store.ready().await;
        let mut notices = store.notices();

        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut receiver = store.watch();
        receiver.mark_unchanged();
        let observer = tokio::spawn({
            let seen = Arc::clone(&seen);
            async move {
                while receiver.changed().await.is_ok() {
                    let loading = receiver.borrow_and_update().is_loading();
                    seen.lock().unwrap().push(loading);
                }
            }
        });

        backend.restore_principal(Some(Principal::new("uid_a").with_email("a@x.com")));
        backend.restore_principal(None);
        backend.restore_principal(Some(Principal::new("uid_b").with_email("b@x.com")));
        loop {
            let notice = notices.recv().await.unwrap();
            if notice.level == NoticeLevel::Warning {
                break;
            }
        }

        tokio::task::yield_now().await;
        observer.abort();
        let seen = seen.lock().unwrap();
        assert!(!seen.is_empty());
        assert!(seen.iter().all(|loading| !loading));
        assert!(!store.state().is_loading());
    }

    #[tokio::test]
    async fn shutdown_releases_subscription() {
        let backend = backend_with_accounts();
        let (store, scope) = attach(&backend);
        store.ready().await;
        assert_eq!(backend.subscriber_count(), 1);

        scope.shutdown().await;
        assert_eq!(backend.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn forced_sign_out_failure_still_clears_session() {
        let backend = backend_with_accounts();
        backend.restore_principal(Some(Principal::new("uid_b").with_email("b@x.com")));
        backend.set_offline(true);
        let (store, _scope) = attach(&backend);
        let mut notices = store.notices();

        notices.recv().await.unwrap();
        assert_eq!(store.state(), SessionState::settled(None));
        assert_eq!(backend.calls().sign_out, 1);
    }
}
