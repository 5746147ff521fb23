//! Principals reported by the identity backend and the identities the
//! session store derives from them.
//!
//! A `Principal` is the backend's own view of a signed-in account. An
//! `Identity` is what the rest of tandem sees, and only the session store
//! creates one, after the principal has passed the allow-list.

use serde::{Deserialize, Serialize};

/// The backend's representation of a signed-in account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Backend account identifier.
    pub uid: String,
    /// Email address, if the account has one.
    pub email: Option<String>,
    /// Profile display name.
    pub display_name: Option<String>,
    /// Profile photo URL.
    pub photo_url: Option<String>,
}

impl Principal {
    /// Creates a principal with only its backend identifier set.
    #[must_use]
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            email: None,
            display_name: None,
            photo_url: None,
        }
    }

    /// Sets the email address.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_display_name(mut self, name: Option<String>) -> Self {
        self.display_name = name;
        self
    }

    /// Sets the photo URL.
    #[must_use]
    pub fn with_photo_url(mut self, url: Option<String>) -> Self {
        self.photo_url = url;
        self
    }
}

/// An authenticated, allow-listed person.
///
/// Serialize-only: an identity is never read back from outside data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    unique_id: String,
    email: Option<String>,
    display_name: Option<String>,
    avatar_url: Option<String>,
}

impl Identity {
    /// Maps a backend principal into an identity.
    ///
    /// Callers are responsible for the allow-list check; within this crate
    /// only the session store does this.
    #[must_use]
    pub(crate) fn from_principal(principal: Principal) -> Self {
        Self {
            unique_id: principal.uid,
            email: principal.email,
            display_name: principal.display_name,
            avatar_url: principal.photo_url,
        }
    }

    /// Maps a principal without consulting the allow-list. Only for tests
    /// in crates that render or route on identities.
    #[cfg(feature = "test-util")]
    #[must_use]
    pub fn from_principal_unchecked(principal: Principal) -> Self {
        Self::from_principal(principal)
    }

    /// Returns the backend's stable account identifier.
    #[must_use]
    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    /// Returns the email address, if available.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Returns the display name, if available.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    /// Returns the avatar URL, if available.
    #[must_use]
    pub fn avatar_url(&self) -> Option<&str> {
        self.avatar_url.as_deref()
    }

    /// Returns the best available label for greeting this person.
    #[must_use]
    pub fn display_label(&self) -> &str {
        self.display_name()
            .or_else(|| self.email())
            .unwrap_or("Friend")
    }
}
