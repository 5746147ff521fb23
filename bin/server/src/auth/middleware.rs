//! Route guard as an Axum extractor.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, header, request::Parts},
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use std::sync::Arc;
use std::time::Duration;
use tandem_access::{GuardState, Identity};
use tandem_core::ClientId;

use super::{AppState, ClientSession};
use crate::pages;

/// Browser client cookie name.
pub const CLIENT_COOKIE: &str = "client";

/// How long a request waits for a fresh store to hear from the backend
/// before the loading page is served instead.
pub(crate) const SETTLE_WAIT: Duration = Duration::from_millis(1500);

/// Returns the browser client named by the request's cookie, if it is live.
pub async fn current_client(state: &AppState, jar: &CookieJar) -> Option<(ClientId, Arc<ClientSession>)> {
    let id: ClientId = jar.get(CLIENT_COOKIE)?.value().parse().ok()?;
    let client = state.registry.get(&id).await?;
    Some((id, client))
}

/// Extractor for requiring a signed-in, allow-listed identity.
///
/// While the client's session store is still loading, neither protected
/// content nor a redirect is produced: the browser gets a page that
/// refreshes itself.
pub struct RequireAuth {
    pub identity: Identity,
    pub client: Arc<ClientSession>,
}

impl<S> FromRequestParts<S> for RequireAuth
where
    Arc<AppState>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = Arc::<AppState>::from_ref(state);
        let jar = CookieJar::from_request_parts(parts, state)
            .await
            .map_err(|_| AuthRejection::InternalError)?;

        let (_, client) = current_client(&app_state, &jar)
            .await
            .ok_or(AuthRejection::NotAuthenticated)?;

        let mut guard = client.store().guard();
        let mut status = guard.state();
        if status == GuardState::Unknown {
            if let Ok(Some(next)) = tokio::time::timeout(SETTLE_WAIT, guard.changed()).await {
                status = next;
            }
        }

        match status {
            GuardState::Authenticated(identity) => Ok(Self { identity, client }),
            GuardState::Unauthenticated => Err(AuthRejection::NotAuthenticated),
            GuardState::Unknown => Err(AuthRejection::Loading),
        }
    }
}

/// Rejection type for [`RequireAuth`].
#[derive(Debug)]
pub enum AuthRejection {
    NotAuthenticated,
    Loading,
    InternalError,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::NotAuthenticated => Redirect::to("/login").into_response(),
            Self::Loading => (
                StatusCode::SERVICE_UNAVAILABLE,
                [(header::RETRY_AFTER, "1")],
                Html(pages::loading()),
            )
                .into_response(),
            Self::InternalError => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
        }
    }
}
