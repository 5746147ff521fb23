//! Allow-list policy.
//!
//! The journal is private: only a closed set of email addresses may hold a
//! session, no matter what the identity provider says about their
//! credentials. Entries are normalized once at startup and never change for
//! the lifetime of the process.

use std::collections::HashSet;

/// Closed set of email addresses permitted to hold a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList {
    entries: HashSet<String>,
}

impl AllowList {
    /// Creates an allow-list from individual addresses.
    ///
    /// Blank entries are dropped; the rest are trimmed and lower-cased.
    #[must_use]
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            entries: entries
                .into_iter()
                .filter_map(|entry| normalize(entry.as_ref()))
                .collect(),
        }
    }

    /// Parses a comma-separated list of addresses, as supplied by the
    /// environment.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        Self::new(raw.split(','))
    }

    /// Returns true if `email` is a member, ignoring case and surrounding
    /// whitespace. Empty input is never allowed.
    #[must_use]
    pub fn is_allowed(&self, email: &str) -> bool {
        normalize(email).is_some_and(|email| self.entries.contains(&email))
    }

    /// Returns the number of distinct entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no address is allowed at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the normalized entries in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }
}

fn normalize(email: &str) -> Option<String> {
    let trimmed = email.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_lowercase())
}
