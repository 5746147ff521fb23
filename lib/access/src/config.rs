//! Access configuration.
//!
//! The allow-list arrives as a single comma-separated string so it can be
//! supplied through one environment variable. When it is not set, the
//! hardcoded default pair applies.

use serde::{Deserialize, Serialize};

use crate::allow_list::AllowList;

/// Configuration for who may sign in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessConfig {
    /// Comma-separated list of permitted email addresses.
    /// Default: the two journal owners.
    #[serde(default = "default_allowed_emails")]
    allowed_emails: String,
}

fn default_allowed_emails() -> String {
    "partner.one@example.com,partner.two@example.com".to_string()
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            allowed_emails: default_allowed_emails(),
        }
    }
}

impl AccessConfig {
    /// Creates a configuration from a comma-separated address list.
    #[must_use]
    pub fn new(allowed_emails: impl Into<String>) -> Self {
        Self {
            allowed_emails: allowed_emails.into(),
        }
    }

    /// Returns the raw comma-separated address list.
    #[must_use]
    pub fn allowed_emails_raw(&self) -> &str {
        &self.allowed_emails
    }

    /// Builds the allow-list policy from this configuration.
    #[must_use]
    pub fn allow_list(&self) -> AllowList {
        AllowList::parse(&self.allowed_emails)
    }
}
