//! Server error types.
//!
//! Startup failures travel as `rootcause` reports; request-time failures
//! are translated into status codes and fixed messages at the route layer.

use axum::http::StatusCode;
use std::fmt;
use tandem_access::AuthError;

/// Errors that prevent the server from starting or keep it from serving.
#[derive(Debug)]
pub enum StartupError {
    /// Configuration could not be loaded.
    Config { details: String },
    /// The identity provider HTTP client could not be built.
    HttpClient { details: String },
    /// The listener could not bind.
    Bind { addr: String, details: String },
    /// The HTTP server stopped with an error.
    Serve { details: String },
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { details } => write!(f, "invalid configuration: {details}"),
            Self::HttpClient { details } => {
                write!(f, "failed to build identity provider client: {details}")
            }
            Self::Bind { addr, details } => write!(f, "failed to bind to {addr}: {details}"),
            Self::Serve { details } => write!(f, "server error: {details}"),
        }
    }
}

impl std::error::Error for StartupError {}

/// Status code for a failed credential operation.
#[must_use]
pub fn auth_error_status(err: &AuthError) -> StatusCode {
    match err {
        AuthError::Policy(_) => StatusCode::FORBIDDEN,
        AuthError::Credential(_) => StatusCode::UNAUTHORIZED,
        AuthError::Transport(_) => StatusCode::BAD_GATEWAY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tandem_access::{BackendError, PolicyError};

    #[test]
    fn startup_error_display() {
        let err = StartupError::Bind {
            addr: "127.0.0.1:3000".to_string(),
            details: "address in use".to_string(),
        };
        assert!(err.to_string().contains("127.0.0.1:3000"));
        assert!(err.to_string().contains("address in use"));
    }

    #[test]
    fn auth_errors_map_to_statuses() {
        let policy = AuthError::from(PolicyError::NotAllowed {
            email: "b@x.com".to_string(),
        });
        assert_eq!(auth_error_status(&policy), StatusCode::FORBIDDEN);

        let credential = AuthError::from(BackendError::rejected("auth/wrong-password"));
        assert_eq!(auth_error_status(&credential), StatusCode::UNAUTHORIZED);

        let transport = AuthError::from(BackendError::Transport {
            details: "timeout".to_string(),
        });
        assert_eq!(auth_error_status(&transport), StatusCode::BAD_GATEWAY);
    }
}
