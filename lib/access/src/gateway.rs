//! Auth gateway: the only way callers talk to the identity backend.
//!
//! Credential operations are checked against the allow-list before the
//! backend is contacted, and backend failures are translated into the
//! access error taxonomy. None of these operations touch session state.
//! A successful `sign_in` means the request was accepted; the session store
//! learns about the new principal from the backend's stream, in its own
//! time.

use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::allow_list::AllowList;
use crate::backend::AuthBackend;
use crate::error::{AuthError, PolicyError, TransportError};
use crate::session::SessionHandle;

/// Allow-list enforcing front for an [`AuthBackend`].
#[derive(Clone)]
pub struct AuthGateway {
    backend: Arc<dyn AuthBackend>,
    allow_list: Arc<AllowList>,
}

impl AuthGateway {
    #[must_use]
    pub fn new(backend: Arc<dyn AuthBackend>, allow_list: AllowList) -> Self {
        Self {
            backend,
            allow_list: Arc::new(allow_list),
        }
    }

    /// Returns the allow-list policy this gateway enforces.
    #[must_use]
    pub fn allow_list(&self) -> &AllowList {
        &self.allow_list
    }

    pub(crate) fn backend(&self) -> &Arc<dyn AuthBackend> {
        &self.backend
    }

    /// Creates an account.
    ///
    /// # Errors
    ///
    /// `Policy` if the address is not allowed (the backend is not
    /// contacted), `Credential` if the backend refuses, `Transport` if it
    /// cannot be reached.
    #[instrument(skip(self, password))]
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<SessionHandle, AuthError> {
        self.check_policy(email)?;
        let handle = self
            .backend
            .sign_up_with_credentials(email.trim(), password)
            .await
            .inspect_err(|e| warn!(error = %e, "sign-up failed"))?;
        info!(uid = %handle.uid(), "account created");
        Ok(handle)
    }

    /// Signs in with an email and password.
    ///
    /// # Errors
    ///
    /// Same taxonomy as [`AuthGateway::sign_up`].
    #[instrument(skip(self, password))]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<SessionHandle, AuthError> {
        self.check_policy(email)?;
        let handle = self
            .backend
            .sign_in_with_credentials(email.trim(), password)
            .await
            .inspect_err(|e| warn!(error = %e, "sign-in failed"))?;
        info!(uid = %handle.uid(), "sign-in accepted");
        Ok(handle)
    }

    /// Asks the backend to sign the current principal out.
    ///
    /// # Errors
    ///
    /// `Transport` if the backend could not be reached. The failure is
    /// returned to the caller so the UI can offer a retry.
    #[instrument(skip(self))]
    pub async fn sign_out(&self) -> Result<(), TransportError> {
        self.backend.sign_out().await.map_err(|e| {
            warn!(error = %e, "sign-out failed");
            TransportError::new(e.to_string())
        })
    }

    /// Sign-out issued by the session store for a disallowed principal.
    /// Failures are logged, not returned: there is no caller to retry.
    pub(crate) async fn force_sign_out(&self) {
        if let Err(e) = self.sign_out().await {
            tracing::error!(error = %e, "forced sign-out failed");
        }
    }

    fn check_policy(&self, email: &str) -> Result<(), PolicyError> {
        if self.allow_list.is_allowed(email) {
            Ok(())
        } else {
            warn!("credential operation refused by allow-list");
            Err(PolicyError::NotAllowed {
                email: email.to_string(),
            })
        }
    }
}

impl std::fmt::Debug for AuthGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGateway")
            .field("allowed_emails", &self.allow_list.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendErrorCode;
    use crate::error::CredentialError;
    use crate::memory::{MemoryBackend, MemoryDirectory};

    fn setup() -> (AuthGateway, MemoryBackend) {
        let directory = MemoryDirectory::new();
        directory.add_account("a@x.com", "correct horse");
        directory.add_account("b@x.com", "battery staple");
        let backend = MemoryBackend::connect(&directory);
        let gateway = AuthGateway::new(Arc::new(backend.clone()), AllowList::new(["a@x.com"]));
        (gateway, backend)
    }

    #[tokio::test]
    async fn sign_in_refuses_disallowed_email_without_backend_call() {
        let (gateway, backend) = setup();

        let err = gateway
            .sign_in("b@x.com", "battery staple")
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::Policy(_)));
        assert_eq!(backend.calls().sign_in, 0);
    }

    #[tokio::test]
    async fn sign_up_refuses_disallowed_email_without_backend_call() {
        let (gateway, backend) = setup();

        let err = gateway.sign_up("new@x.com", "whatever1").await.unwrap_err();

        assert!(matches!(err, AuthError::Policy(_)));
        assert_eq!(backend.calls().sign_up, 0);
        assert_eq!(backend.calls().total(), 0);
    }

    #[tokio::test]
    async fn sign_in_with_wrong_password_is_credential_error() {
        let (gateway, backend) = setup();

        let err = gateway.sign_in("a@x.com", "wrong").await.unwrap_err();

        assert_eq!(
            err,
            AuthError::Credential(CredentialError::new(BackendErrorCode::WrongPassword))
        );
        assert_eq!(err.user_message(), "Incorrect password.");
        assert_eq!(backend.calls().sign_in, 1);
    }

    #[tokio::test]
    async fn sign_in_accepts_mixed_case_allowed_email() {
        let (gateway, _backend) = setup();

        let handle = gateway.sign_in(" A@X.com ", "correct horse").await.unwrap();
        assert!(!handle.uid().is_empty());
    }

    #[tokio::test]
    async fn sign_up_existing_account_is_credential_error() {
        let (gateway, _backend) = setup();

        let err = gateway.sign_up("a@x.com", "another one").await.unwrap_err();
        assert_eq!(
            err.user_message(),
            "An account already exists for this email."
        );
    }

    #[tokio::test]
    async fn sign_out_transport_failure_is_returned() {
        let (gateway, backend) = setup();
        backend.set_offline(true);

        let err = gateway.sign_out().await.unwrap_err();
        assert!(err.details().contains("offline"));
    }

    #[tokio::test]
    async fn sign_in_while_offline_is_transport_error() {
        let (gateway, backend) = setup();
        backend.set_offline(true);

        let err = gateway.sign_in("a@x.com", "correct horse").await.unwrap_err();
        assert!(matches!(err, AuthError::Transport(_)));
    }
}
