//! Hosted identity provider client.
//!
//! Talks to the provider's REST API (`accounts:signInWithPassword`,
//! `accounts:signUp`). The REST API has no push channel, so this client
//! publishes auth-state changes itself, the same way the provider's browser
//! SDK does. The session handle goes back to the caller; nothing here holds
//! on to tokens.

use async_trait::async_trait;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use tandem_access::{
    AuthBackend, AuthStateHub, AuthStateSubscription, BackendError, Principal, SessionHandle,
};
use tracing::{debug, instrument};

/// Token lifetime assumed when the provider omits `expiresIn`.
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CredentialRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CredentialResponse {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    profile_picture: Option<String>,
    id_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<String>,
}

impl CredentialResponse {
    fn into_parts(self) -> (Principal, SessionHandle) {
        let lifetime = self
            .expires_in
            .as_deref()
            .and_then(|secs| secs.parse::<i64>().ok())
            .unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
        let handle = SessionHandle::new(
            self.local_id.clone(),
            self.id_token,
            self.refresh_token,
            Duration::seconds(lifetime),
        );
        let mut principal = Principal::new(self.local_id)
            .with_display_name(self.display_name)
            .with_photo_url(self.profile_picture);
        principal.email = self.email;
        (principal, handle)
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// One browser client's connection to the hosted identity provider.
pub struct IdentityToolkitBackend {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    hub: AuthStateHub,
}

impl IdentityToolkitBackend {
    /// Creates a signed-out connection.
    #[must_use]
    pub fn new(http: reqwest::Client, endpoint: &str, api_key: &str) -> Self {
        Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            hub: AuthStateHub::new(),
        }
    }

    fn url(&self, method: &str) -> String {
        format!("{}/v1/accounts:{method}?key={}", self.endpoint, self.api_key)
    }

    async fn credential_call(
        &self,
        method: &str,
        email: &str,
        password: &str,
    ) -> Result<SessionHandle, BackendError> {
        let response = self
            .http
            .post(self.url(method))
            .json(&CredentialRequest {
                email,
                password,
                return_secure_token: true,
            })
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.map_err(transport)?;
            return Err(rejection(status, &body));
        }

        let body: CredentialResponse = response.json().await.map_err(transport)?;
        let (principal, handle) = body.into_parts();
        debug!(uid = %principal.uid, "provider accepted credentials");

        self.hub.publish(Some(principal));
        Ok(handle)
    }
}

#[async_trait]
impl AuthBackend for IdentityToolkitBackend {
    fn subscribe_auth_state(&self) -> AuthStateSubscription {
        self.hub.subscribe()
    }

    #[instrument(skip(self, password))]
    async fn sign_in_with_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<SessionHandle, BackendError> {
        self.credential_call("signInWithPassword", email, password)
            .await
    }

    #[instrument(skip(self, password))]
    async fn sign_up_with_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<SessionHandle, BackendError> {
        self.credential_call("signUp", email, password).await
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        // ID tokens are stateless; the provider has no sign-out endpoint.
        self.hub.publish(None);
        Ok(())
    }
}

impl std::fmt::Debug for IdentityToolkitBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityToolkitBackend")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

fn transport(err: reqwest::Error) -> BackendError {
    // The URL carries the API key.
    BackendError::Transport {
        details: err.without_url().to_string(),
    }
}

fn rejection(status: reqwest::StatusCode, body: &str) -> BackendError {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(body) => BackendError::rejected(&body.error.message),
        Err(_) => BackendError::Transport {
            details: format!("provider returned HTTP {status} with an unreadable body"),
        },
    }
}
