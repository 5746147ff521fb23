//! Route guard.
//!
//! Decides whether a protected view, the login view, or nothing at all
//! should be shown. The guard holds no state of its own; it only reads
//! the session store.

use serde::Serialize;
use tokio::sync::watch;

use crate::identity::Identity;
use crate::store::SessionState;

/// What the guard currently allows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "identity", rename_all = "snake_case")]
pub enum GuardState {
    /// The session store has not heard from the backend yet.
    Unknown,
    Authenticated(Identity),
    Unauthenticated,
}

impl GuardState {
    /// Classifies a session snapshot. A loading snapshot is always
    /// `Unknown`, whatever identity it carries.
    #[must_use]
    pub fn from_session(state: &SessionState) -> Self {
        if state.is_loading() {
            return Self::Unknown;
        }
        match state.identity() {
            Some(identity) => Self::Authenticated(identity.clone()),
            None => Self::Unauthenticated,
        }
    }

    #[must_use]
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Authenticated(identity) => Some(identity),
            Self::Unknown | Self::Unauthenticated => None,
        }
    }
}

/// Session-store driven gate in front of protected content.
#[derive(Debug, Clone)]
pub struct RouteGuard {
    session: watch::Receiver<SessionState>,
}

impl RouteGuard {
    #[must_use]
    pub fn new(session: watch::Receiver<SessionState>) -> Self {
        Self { session }
    }

    #[must_use]
    pub fn state(&self) -> GuardState {
        GuardState::from_session(&self.session.borrow())
    }

    /// Waits for the next session change and returns the new guard state.
    /// Returns `None` once the store is gone.
    pub async fn changed(&mut self) -> Option<GuardState> {
        self.session.changed().await.ok()?;
        Some(GuardState::from_session(&self.session.borrow_and_update()))
    }

    /// Picks the view for the current state.
    pub fn render<V>(
        &self,
        loading: impl FnOnce() -> V,
        protected: impl FnOnce(&Identity) -> V,
        login: impl FnOnce() -> V,
    ) -> V {
        match self.state() {
            GuardState::Unknown => loading(),
            GuardState::Authenticated(identity) => protected(&identity),
            GuardState::Unauthenticated => login(),
        }
    }
}
