//! Session handles returned by credential operations.
//!
//! A handle proves that the backend accepted a sign-in or sign-up request.
//! It is not the authoritative session state: that is whatever the
//! backend's auth-state stream last reported to the session store.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Opaque result of a successful sign-in or sign-up call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionHandle {
    /// Backend account identifier the handle was issued for.
    uid: String,
    /// Short-lived bearer token.
    id_token: String,
    /// Token used to obtain a fresh `id_token`, if the backend issues one.
    refresh_token: Option<String>,
    /// When the handle was issued.
    issued_at: DateTime<Utc>,
    /// When `id_token` stops being accepted.
    expires_at: DateTime<Utc>,
}

impl SessionHandle {
    /// Creates a handle that is valid for `lifetime` from now.
    #[must_use]
    pub fn new(
        uid: impl Into<String>,
        id_token: impl Into<String>,
        refresh_token: Option<String>,
        lifetime: Duration,
    ) -> Self {
        let now = Utc::now();
        Self {
            uid: uid.into(),
            id_token: id_token.into(),
            refresh_token,
            issued_at: now,
            expires_at: now + lifetime,
        }
    }

    /// Returns the backend account identifier.
    #[must_use]
    pub fn uid(&self) -> &str {
        &self.uid
    }

    /// Returns the bearer token.
    #[must_use]
    pub fn id_token(&self) -> &str {
        &self.id_token
    }

    /// Returns the refresh token, if present.
    #[must_use]
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    #[must_use]
    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Returns true once the bearer token has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}
