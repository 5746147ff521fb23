//! Error types for the access crate.
//!
//! - `PolicyError`: the address is not on the allow-list; raised before any
//!   backend call
//! - `CredentialError`: the backend refused the credentials
//! - `TransportError`: the backend could not be reached
//! - `UnauthorizedSessionError`: the backend holds a session for an address
//!   that is not allowed; handled inside the session store, never returned
//!
//! Every caller-visible error offers `user_message()`, a fixed text that is
//! safe to show in the UI. Raw backend text never reaches it.

use std::fmt;

use crate::backend::{BackendError, BackendErrorCode};

/// Message shown when an address is not on the allow-list.
pub const NOT_ALLOWED_MESSAGE: &str = "This email is not authorized to access this site.";

/// Message shown when a session is terminated for a disallowed address.
pub const UNAUTHORIZED_SESSION_MESSAGE: &str =
    "Unauthorized access. Your session has been terminated.";

const TRANSPORT_MESSAGE: &str =
    "Could not reach the sign-in service. Check your connection and try again.";

/// The address was rejected by the allow-list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    NotAllowed { email: String },
}

impl PolicyError {
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NotAllowed { .. } => NOT_ALLOWED_MESSAGE,
        }
    }
}

impl fmt::Display for PolicyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAllowed { email } => write!(f, "email '{email}' is not on the allow-list"),
        }
    }
}

impl std::error::Error for PolicyError {}

/// The backend rejected the credentials for a domain reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialError {
    code: BackendErrorCode,
}

impl CredentialError {
    #[must_use]
    pub fn new(code: BackendErrorCode) -> Self {
        Self { code }
    }

    /// Returns the backend code that caused the rejection.
    #[must_use]
    pub fn code(&self) -> &BackendErrorCode {
        &self.code
    }

    /// Returns the fixed message for this rejection.
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        match self.code {
            BackendErrorCode::UserNotFound => "No account exists for this email.",
            BackendErrorCode::WrongPassword => "Incorrect password.",
            BackendErrorCode::InvalidEmail => "The email address is not valid.",
            BackendErrorCode::OperationNotAllowed => {
                "Email and password sign-in is not enabled."
            }
            BackendErrorCode::WeakPassword => "The password must be at least 6 characters long.",
            BackendErrorCode::EmailAlreadyInUse => "An account already exists for this email.",
            BackendErrorCode::InvalidCredential => "The email or password is incorrect.",
            BackendErrorCode::UserDisabled => "This account has been disabled.",
            BackendErrorCode::TooManyRequests => "Too many attempts. Please try again later.",
            BackendErrorCode::NetworkRequestFailed => TRANSPORT_MESSAGE,
            BackendErrorCode::Unrecognized(_) => "An unknown error occurred. Please try again.",
        }
    }
}

impl fmt::Display for CredentialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "credentials rejected: {}", self.code)
    }
}

impl std::error::Error for CredentialError {}

/// The backend could not be reached or failed outside its domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    details: String,
}

impl TransportError {
    #[must_use]
    pub fn new(details: impl Into<String>) -> Self {
        Self {
            details: details.into(),
        }
    }

    /// Returns the diagnostic details. Log these; do not show them.
    #[must_use]
    pub fn details(&self) -> &str {
        &self.details
    }

    #[must_use]
    pub fn user_message(&self) -> &'static str {
        TRANSPORT_MESSAGE
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "identity backend transport failure: {}", self.details)
    }
}

impl std::error::Error for TransportError {}

/// The backend reported a session for an address that is not allowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnauthorizedSessionError {
    pub unique_id: String,
    pub email: Option<String>,
}

impl fmt::Display for UnauthorizedSessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.email {
            Some(email) => write!(
                f,
                "session for '{}' ({email}) is not allowed",
                self.unique_id
            ),
            None => write!(f, "session for '{}' has no email", self.unique_id),
        }
    }
}

impl std::error::Error for UnauthorizedSessionError {}

/// Errors returned by the auth gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    Policy(PolicyError),
    Credential(CredentialError),
    Transport(TransportError),
}

impl AuthError {
    /// Returns the fixed, user-safe message for this error.
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Policy(err) => err.user_message(),
            Self::Credential(err) => err.user_message(),
            Self::Transport(err) => err.user_message(),
        }
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Policy(err) => err.fmt(f),
            Self::Credential(err) => err.fmt(f),
            Self::Transport(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for AuthError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Policy(err) => Some(err),
            Self::Credential(err) => Some(err),
            Self::Transport(err) => Some(err),
        }
    }
}

impl From<PolicyError> for AuthError {
    fn from(err: PolicyError) -> Self {
        Self::Policy(err)
    }
}

impl From<TransportError> for AuthError {
    fn from(err: TransportError) -> Self {
        Self::Transport(err)
    }
}

impl From<BackendError> for AuthError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Rejected {
                code: BackendErrorCode::NetworkRequestFailed,
            } => Self::Transport(TransportError::new(
                BackendErrorCode::NetworkRequestFailed.as_str(),
            )),
            BackendError::Rejected { code } => Self::Credential(CredentialError::new(code)),
            BackendError::Transport { details } => Self::Transport(TransportError::new(details)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_error_display_and_message() {
        let err = PolicyError::NotAllowed {
            email: "b@x.com".to_string(),
        };
        assert!(err.to_string().contains("b@x.com"));
        assert_eq!(err.user_message(), NOT_ALLOWED_MESSAGE);
    }

    #[test]
    fn wrong_password_maps_to_incorrect_password_message() {
        let err = AuthError::from(BackendError::rejected("auth/wrong-password"));
        assert!(matches!(err, AuthError::Credential(_)));
        assert_eq!(err.user_message(), "Incorrect password.");
    }

    #[test]
    fn every_known_code_has_its_own_message() {
        use std::collections::HashSet;

        let codes = [
            BackendErrorCode::UserNotFound,
            BackendErrorCode::WrongPassword,
            BackendErrorCode::InvalidEmail,
            BackendErrorCode::OperationNotAllowed,
            BackendErrorCode::WeakPassword,
            BackendErrorCode::EmailAlreadyInUse,
            BackendErrorCode::InvalidCredential,
            BackendErrorCode::UserDisabled,
            BackendErrorCode::TooManyRequests,
        ];
        let messages: HashSet<&str> = codes
            .into_iter()
            .map(|code| CredentialError::new(code).user_message())
            .collect();
        assert_eq!(messages.len(), 9);
    }

    #[test]
    fn unrecognized_code_falls_back_to_generic_message() {
        let err = CredentialError::new(BackendErrorCode::parse("SOMETHING_NEW : internal detail"));
        assert_eq!(
            err.user_message(),
            "An unknown error occurred. Please try again."
        );
        assert!(!err.user_message().contains("internal detail"));
    }

    #[test]
    fn network_failure_code_is_a_transport_error() {
        let err = AuthError::from(BackendError::rejected("auth/network-request-failed"));
        assert!(matches!(err, AuthError::Transport(_)));
    }

    #[test]
    fn transport_details_are_not_user_facing() {
        let err = AuthError::from(BackendError::Transport {
            details: "dns error: no such host".to_string(),
        });
        assert!(err.to_string().contains("dns error"));
        assert!(!err.user_message().contains("dns"));
    }

    #[test]
    fn unauthorized_session_display() {
        let err = UnauthorizedSessionError {
            unique_id: "uid_9".to_string(),
            email: Some("b@x.com".to_string()),
        };
        assert!(err.to_string().contains("uid_9"));
        assert!(err.to_string().contains("b@x.com"));

        let err = UnauthorizedSessionError {
            unique_id: "uid_9".to_string(),
            email: None,
        };
        assert!(err.to_string().contains("no email"));
    }
}
