//! The hosted identity backend, as seen by the access layer.
//!
//! A backend offers three credential operations and a push-based stream of
//! auth-state notifications. Every new subscriber immediately receives the
//! backend's cached principal (or `None`), then one notification per change.

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tandem_core::SubscriptionId;
use tokio::sync::mpsc;
use tracing::debug;

use crate::identity::Principal;
use crate::session::SessionHandle;

/// Error codes the backend uses to reject credential operations.
///
/// Backends report these as strings, either in SDK form
/// (`auth/wrong-password`) or REST form (`INVALID_PASSWORD`). Codes this
/// crate does not know land in `Unrecognized` instead of being guessed at.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BackendErrorCode {
    UserNotFound,
    WrongPassword,
    InvalidEmail,
    OperationNotAllowed,
    WeakPassword,
    EmailAlreadyInUse,
    InvalidCredential,
    UserDisabled,
    TooManyRequests,
    NetworkRequestFailed,
    /// A code added by a newer backend release.
    Unrecognized(String),
}

impl BackendErrorCode {
    /// Parses a backend error code.
    ///
    /// REST messages may carry a human-readable suffix after `" : "`
    /// (`WEAK_PASSWORD : Password should be at least 6 characters`); only
    /// the code before it is significant.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let code = raw.split_once(" : ").map_or(raw, |(code, _)| code).trim();
        match code {
            "auth/user-not-found" | "EMAIL_NOT_FOUND" => Self::UserNotFound,
            "auth/wrong-password" | "INVALID_PASSWORD" => Self::WrongPassword,
            "auth/invalid-email" | "INVALID_EMAIL" => Self::InvalidEmail,
            "auth/operation-not-allowed" | "OPERATION_NOT_ALLOWED" | "PASSWORD_LOGIN_DISABLED" => {
                Self::OperationNotAllowed
            }
            "auth/weak-password" | "WEAK_PASSWORD" => Self::WeakPassword,
            "auth/email-already-in-use" | "EMAIL_EXISTS" => Self::EmailAlreadyInUse,
            "auth/invalid-credential" | "auth/invalid-login-credentials" | "INVALID_LOGIN_CREDENTIALS" => {
                Self::InvalidCredential
            }
            "auth/user-disabled" | "USER_DISABLED" => Self::UserDisabled,
            "auth/too-many-requests" | "TOO_MANY_ATTEMPTS_TRY_LATER" => Self::TooManyRequests,
            "auth/network-request-failed" => Self::NetworkRequestFailed,
            other => Self::Unrecognized(other.to_string()),
        }
    }

    /// Returns the code in SDK form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::UserNotFound => "auth/user-not-found",
            Self::WrongPassword => "auth/wrong-password",
            Self::InvalidEmail => "auth/invalid-email",
            Self::OperationNotAllowed => "auth/operation-not-allowed",
            Self::WeakPassword => "auth/weak-password",
            Self::EmailAlreadyInUse => "auth/email-already-in-use",
            Self::InvalidCredential => "auth/invalid-credential",
            Self::UserDisabled => "auth/user-disabled",
            Self::TooManyRequests => "auth/too-many-requests",
            Self::NetworkRequestFailed => "auth/network-request-failed",
            Self::Unrecognized(code) => code,
        }
    }
}

impl fmt::Display for BackendErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure reported by a backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The backend understood the request and refused it.
    Rejected { code: BackendErrorCode },
    /// The backend could not be reached or answered garbage.
    Transport { details: String },
}

impl BackendError {
    /// Convenience constructor for a rejection with a raw code string.
    #[must_use]
    pub fn rejected(code: &str) -> Self {
        Self::Rejected {
            code: BackendErrorCode::parse(code),
        }
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected { code } => write!(f, "backend rejected request: {code}"),
            Self::Transport { details } => write!(f, "backend unreachable: {details}"),
        }
    }
}

impl std::error::Error for BackendError {}

/// The identity backend collaborator.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Subscribes to auth-state notifications.
    ///
    /// The cached principal is delivered immediately. Dropping the returned
    /// subscription unsubscribes.
    fn subscribe_auth_state(&self) -> AuthStateSubscription;

    /// Signs in with an email and password.
    async fn sign_in_with_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<SessionHandle, BackendError>;

    /// Creates an account and signs it in.
    async fn sign_up_with_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<SessionHandle, BackendError>;

    /// Signs the current principal out.
    async fn sign_out(&self) -> Result<(), BackendError>;
}

type Release = Box<dyn FnOnce(SubscriptionId) + Send>;

/// A live subscription to a backend's auth-state stream.
///
/// Each item is the principal the backend now considers signed in, or
/// `None` after a sign-out.
pub struct AuthStateSubscription {
    id: SubscriptionId,
    receiver: mpsc::UnboundedReceiver<Option<Principal>>,
    release: Option<Release>,
}

impl AuthStateSubscription {
    /// Wraps a notification receiver. `release` runs exactly once, when the
    /// subscription is dropped.
    #[must_use]
    pub fn new(
        id: SubscriptionId,
        receiver: mpsc::UnboundedReceiver<Option<Principal>>,
        release: impl FnOnce(SubscriptionId) + Send + 'static,
    ) -> Self {
        Self {
            id,
            receiver,
            release: Some(Box::new(release)),
        }
    }

    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Waits for the next notification. Returns `None` once the backend
    /// has gone away.
    pub async fn next(&mut self) -> Option<Option<Principal>> {
        self.receiver.recv().await
    }
}

impl fmt::Debug for AuthStateSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthStateSubscription")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl Drop for AuthStateSubscription {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release(self.id);
        }
    }
}

#[derive(Default)]
struct HubState {
    current: Option<Principal>,
    listeners: HashMap<SubscriptionId, mpsc::UnboundedSender<Option<Principal>>>,
}

/// Auth-state fan-out shared by backend implementations.
///
/// Remembers the current principal, replays it to every new subscriber and
/// publishes each change to all live subscribers.
#[derive(Clone, Default)]
pub struct AuthStateHub {
    inner: Arc<Mutex<HubState>>,
}

impl AuthStateHub {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a subscriber and delivers the current principal to it.
    #[must_use]
    pub fn subscribe(&self) -> AuthStateSubscription {
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = SubscriptionId::new();
        {
            let mut state = lock(&self.inner);
            // The receiver is alive, so this cannot fail.
            let _ = sender.send(state.current.clone());
            state.listeners.insert(id, sender);
        }
        debug!(subscription_id = %id, "auth-state subscriber added");

        let hub: Weak<Mutex<HubState>> = Arc::downgrade(&self.inner);
        AuthStateSubscription::new(id, receiver, move |id| {
            if let Some(inner) = hub.upgrade() {
                lock(&inner).listeners.remove(&id);
                debug!(subscription_id = %id, "auth-state subscriber removed");
            }
        })
    }

    /// Records a new current principal and notifies every subscriber.
    pub fn publish(&self, principal: Option<Principal>) {
        let mut state = lock(&self.inner);
        state.current.clone_from(&principal);
        state
            .listeners
            .retain(|_, sender| sender.send(principal.clone()).is_ok());
    }

    /// Returns the principal most recently published.
    #[must_use]
    pub fn current(&self) -> Option<Principal> {
        lock(&self.inner).current.clone()
    }

    /// Returns the number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        lock(&self.inner).listeners.len()
    }
}

impl fmt::Debug for AuthStateHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthStateHub")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

fn lock(state: &Mutex<HubState>) -> MutexGuard<'_, HubState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}
