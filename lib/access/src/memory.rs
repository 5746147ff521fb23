//! In-memory identity backend.
//!
//! `MemoryDirectory` is the shared account table; each `MemoryBackend` is
//! one client connection to it with its own signed-in principal, the way
//! each browser holds its own session with a hosted provider. It backs the
//! test suites and local development without provider credentials.

use async_trait::async_trait;
use chrono::Duration;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tandem_core::UserId;
use tracing::debug;

use crate::backend::{AuthBackend, AuthStateHub, AuthStateSubscription, BackendError};
use crate::identity::Principal;
use crate::session::SessionHandle;

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone)]
struct Account {
    uid: String,
    email: String,
    password: String,
    display_name: Option<String>,
}

impl Account {
    fn principal(&self) -> Principal {
        Principal::new(self.uid.clone())
            .with_email(self.email.clone())
            .with_display_name(self.display_name.clone())
    }
}

/// Shared account table for in-memory backends.
#[derive(Debug, Clone, Default)]
pub struct MemoryDirectory {
    accounts: Arc<Mutex<HashMap<String, Account>>>,
}

impl MemoryDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an account and returns its uid. Replaces any existing
    /// account with the same address.
    pub fn add_account(&self, email: &str, password: &str) -> String {
        let uid = UserId::new().to_string();
        lock(&self.accounts).insert(
            email.to_lowercase(),
            Account {
                uid: uid.clone(),
                email: email.to_string(),
                password: password.to_string(),
                display_name: None,
            },
        );
        uid
    }

    /// Sets the display name reported for an account.
    pub fn set_display_name(&self, email: &str, display_name: Option<String>) {
        if let Some(account) = lock(&self.accounts).get_mut(&email.to_lowercase()) {
            account.display_name = display_name;
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.accounts).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup(&self, email: &str) -> Option<Account> {
        lock(&self.accounts).get(&email.to_lowercase()).cloned()
    }
}

/// Number of credential operations a [`MemoryBackend`] has served.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackendCalls {
    pub sign_in: usize,
    pub sign_up: usize,
    pub sign_out: usize,
}

impl BackendCalls {
    #[must_use]
    pub fn total(&self) -> usize {
        self.sign_in + self.sign_up + self.sign_out
    }
}

#[derive(Debug, Default)]
struct Counters {
    sign_in: AtomicUsize,
    sign_up: AtomicUsize,
    sign_out: AtomicUsize,
}

/// One client connection to a [`MemoryDirectory`].
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    directory: MemoryDirectory,
    hub: AuthStateHub,
    offline: Arc<AtomicBool>,
    counters: Arc<Counters>,
}

impl MemoryBackend {
    /// Opens a connection with nobody signed in.
    #[must_use]
    pub fn connect(directory: &MemoryDirectory) -> Self {
        Self {
            directory: directory.clone(),
            hub: AuthStateHub::new(),
            offline: Arc::new(AtomicBool::new(false)),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Sets the principal this connection reports, bypassing credentials.
    ///
    /// Models a credential cached from an earlier visit, or a change made
    /// elsewhere (another tab, an admin console).
    pub fn restore_principal(&self, principal: Option<Principal>) {
        self.hub.publish(principal);
    }

    /// Makes every subsequent call fail as if the network were down.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Returns how many credential operations reached this connection.
    #[must_use]
    pub fn calls(&self) -> BackendCalls {
        BackendCalls {
            sign_in: self.counters.sign_in.load(Ordering::SeqCst),
            sign_up: self.counters.sign_up.load(Ordering::SeqCst),
            sign_out: self.counters.sign_out.load(Ordering::SeqCst),
        }
    }

    /// Returns the principal currently signed in on this connection.
    #[must_use]
    pub fn current_principal(&self) -> Option<Principal> {
        self.hub.current()
    }

    /// Returns the number of live auth-state subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.hub.subscriber_count()
    }

    fn ensure_online(&self) -> Result<(), BackendError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(BackendError::Transport {
                details: "backend offline".to_string(),
            });
        }
        Ok(())
    }

    fn start_session(&self, account: &Account) -> SessionHandle {
        self.hub.publish(Some(account.principal()));
        SessionHandle::new(
            account.uid.clone(),
            format!("mem-{}", UserId::new()),
            None,
            Duration::hours(1),
        )
    }
}

#[async_trait]
impl AuthBackend for MemoryBackend {
    fn subscribe_auth_state(&self) -> AuthStateSubscription {
        self.hub.subscribe()
    }

    async fn sign_in_with_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<SessionHandle, BackendError> {
        self.counters.sign_in.fetch_add(1, Ordering::SeqCst);
        self.ensure_online()?;
        if !looks_like_email(email) {
            return Err(BackendError::rejected("auth/invalid-email"));
        }
        let account = self
            .directory
            .lookup(email)
            .ok_or_else(|| BackendError::rejected("auth/user-not-found"))?;
        if account.password != password {
            return Err(BackendError::rejected("auth/wrong-password"));
        }
        debug!(uid = %account.uid, "memory backend sign-in");
        Ok(self.start_session(&account))
    }

    async fn sign_up_with_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<SessionHandle, BackendError> {
        self.counters.sign_up.fetch_add(1, Ordering::SeqCst);
        self.ensure_online()?;
        if !looks_like_email(email) {
            return Err(BackendError::rejected("auth/invalid-email"));
        }
        if self.directory.lookup(email).is_some() {
            return Err(BackendError::rejected("auth/email-already-in-use"));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(BackendError::rejected("auth/weak-password"));
        }
        self.directory.add_account(email, password);
        let account = self
            .directory
            .lookup(email)
            .ok_or_else(|| BackendError::Transport {
                details: "account vanished after creation".to_string(),
            })?;
        debug!(uid = %account.uid, "memory backend sign-up");
        Ok(self.start_session(&account))
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        self.counters.sign_out.fetch_add(1, Ordering::SeqCst);
        self.ensure_online()?;
        self.hub.publish(None);
        Ok(())
    }
}

fn looks_like_email(email: &str) -> bool {
    email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'))
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendErrorCode;

    fn rejected_code(result: Result<SessionHandle, BackendError>) -> BackendErrorCode {
        match result {
            Err(BackendError::Rejected { code }) => code,
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn sign_in_publishes_principal() {
        let directory = MemoryDirectory::new();
        let uid = directory.add_account("a@x.com", "secret1");
        let backend = MemoryBackend::connect(&directory);
        let mut subscription = backend.subscribe_auth_state();
        assert_eq!(subscription.next().await, Some(None));

        let handle = backend
            .sign_in_with_credentials("a@x.com", "secret1")
            .await
            .unwrap();
        assert_eq!(handle.uid(), uid);

        let principal = subscription.next().await.unwrap().unwrap();
        assert_eq!(principal.uid, uid);
        assert_eq!(principal.email.as_deref(), Some("a@x.com"));
    }

    #[tokio::test]
    async fn sign_in_rejections() {
        let directory = MemoryDirectory::new();
        directory.add_account("a@x.com", "secret1");
        let backend = MemoryBackend::connect(&directory);

        assert_eq!(
            rejected_code(backend.sign_in_with_credentials("nope", "x").await),
            BackendErrorCode::InvalidEmail
        );
        assert_eq!(
            rejected_code(backend.sign_in_with_credentials("z@x.com", "x").await),
            BackendErrorCode::UserNotFound
        );
        assert_eq!(
            rejected_code(backend.sign_in_with_credentials("a@x.com", "x").await),
            BackendErrorCode::WrongPassword
        );
        assert_eq!(backend.calls().sign_in, 3);
    }

    #[tokio::test]
    async fn sign_up_rejections() {
        let directory = MemoryDirectory::new();
        directory.add_account("a@x.com", "secret1");
        let backend = MemoryBackend::connect(&directory);

        assert_eq!(
            rejected_code(backend.sign_up_with_credentials("A@x.com", "secret2").await),
            BackendErrorCode::EmailAlreadyInUse
        );
        assert_eq!(
            rejected_code(backend.sign_up_with_credentials("b@x.com", "123").await),
            BackendErrorCode::WeakPassword
        );
        assert!(backend
            .sign_up_with_credentials("b@x.com", "123456")
            .await
            .is_ok());
        assert_eq!(directory.len(), 2);
    }

    #[tokio::test]
    async fn connections_share_accounts_but_not_sessions() {
        let directory = MemoryDirectory::new();
        directory.add_account("a@x.com", "secret1");
        let first = MemoryBackend::connect(&directory);
        let second = MemoryBackend::connect(&directory);

        first
            .sign_in_with_credentials("a@x.com", "secret1")
            .await
            .unwrap();

        assert!(first.current_principal().is_some());
        assert!(second.current_principal().is_none());
    }

    #[tokio::test]
    async fn offline_backend_fails_with_transport_error() {
        let directory = MemoryDirectory::new();
        let backend = MemoryBackend::connect(&directory);
        backend.set_offline(true);

        assert!(matches!(
            backend.sign_out().await,
            Err(BackendError::Transport { .. })
        ));
        assert_eq!(backend.calls().sign_out, 1);
    }

    #[test]
    fn display_name_is_reported_in_principal() {
        let directory = MemoryDirectory::new();
        directory.add_account("a@x.com", "secret1");
        directory.set_display_name("A@x.com", Some("Ada".to_string()));

        let account = directory.lookup("a@x.com").unwrap();
        assert_eq!(account.principal().display_name.as_deref(), Some("Ada"));
    }
}
