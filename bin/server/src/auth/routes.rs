//! Authentication routes for sign-in, sign-up and sign-out.
//!
//! Credential routes only report whether the gateway accepted the request.
//! Whether the browser is signed in is always read back from its session
//! store, which learns about the new principal from the backend.

use axum::{
    Form, Json,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tandem_access::{AuthError, GuardState, Notice, PolicyError};
use tandem_core::ClientId;
use time::Duration as TimeDuration;
use tracing::{debug, warn};

use super::middleware::{SETTLE_WAIT, current_client};
use super::{AppState, CLIENT_COOKIE, ClientSession, RequireAuth};
use crate::error::auth_error_status;
use crate::pages;

/// Submitted login or sign-up form.
#[derive(Debug, Deserialize)]
pub struct CredentialsForm {
    email: String,
    password: String,
}

/// Body of `GET /api/session`.
#[derive(Debug, Serialize)]
pub struct SessionStatus {
    pub guard: GuardState,
    pub notices: Vec<Notice>,
}

/// Which credential operation a form submits.
#[derive(Debug, Clone, Copy)]
enum CredentialOp {
    SignIn,
    SignUp,
}

impl CredentialOp {
    fn page(self, email: &str, error: Option<&str>, notices: &[Notice]) -> String {
        match self {
            Self::SignIn => pages::login(email, error, notices),
            Self::SignUp => pages::signup(email, error, notices),
        }
    }
}

/// Builds the cookie that names a registered browser client.
fn client_cookie(state: &AppState, id: ClientId) -> Cookie<'static> {
    Cookie::build((CLIENT_COOKIE, id.to_string()))
        .path("/")
        .http_only(true)
        .secure(state.session_config.secure_cookies)
        .same_site(SameSite::Lax)
        .max_age(TimeDuration::minutes(state.session_config.idle_minutes))
        .build()
}

/// Runs a credential operation for the browser.
///
/// Only accepted credentials register a client; a browser without one gets
/// a transient client that is dropped when the operation fails.
async fn submit_credentials(
    state: &AppState,
    jar: CookieJar,
    form: &CredentialsForm,
    op: CredentialOp,
) -> Response {
    let existing = current_client(state, &jar).await;

    if !state.registry.allow_list().is_allowed(&form.email) {
        warn!("credential form refused by allow-list");
        let err = AuthError::from(PolicyError::NotAllowed {
            email: form.email.clone(),
        });
        let notices = match &existing {
            Some((_, client)) => client.drain_notices().await,
            None => Vec::new(),
        };
        return (
            auth_error_status(&err),
            Html(op.page(&form.email, Some(err.user_message()), &notices)),
        )
            .into_response();
    }

    let (id, client) = match existing {
        Some((id, client)) => (Some(id), client),
        None => (None, state.registry.open()),
    };
    let gateway = client.gateway();
    let outcome = match op {
        CredentialOp::SignIn => gateway.sign_in(&form.email, &form.password).await,
        CredentialOp::SignUp => gateway.sign_up(&form.email, &form.password).await,
    };

    match outcome {
        Ok(_) => {
            let id = match id {
                Some(id) => id,
                None => state.registry.register(Arc::clone(&client)).await,
            };
            await_guard(&client, |guard| guard.identity().is_some()).await;
            (jar.add(client_cookie(state, id)), Redirect::to("/")).into_response()
        }
        Err(err) => {
            let notices = match id {
                Some(_) => client.drain_notices().await,
                None => Vec::new(),
            };
            (
                auth_error_status(&err),
                Html(op.page(&form.email, Some(err.user_message()), &notices)),
            )
                .into_response()
        }
    }
}

/// Waits, briefly, for the client's guard to reach a state accepted by
/// `done`.
async fn await_guard(client: &ClientSession, done: impl Fn(&GuardState) -> bool) {
    let mut guard = client.store().guard();
    let wait = async {
        if done(&guard.state()) {
            return;
        }
        while let Some(state) = guard.changed().await {
            if done(&state) {
                return;
            }
        }
    };
    if tokio::time::timeout(SETTLE_WAIT, wait).await.is_err() {
        debug!("session store has not settled yet");
    }
}

/// Shows the login form, or sends a signed-in browser home.
pub async fn login_page(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    let mut notices = Vec::new();
    if let Some((_, client)) = current_client(&state, &jar).await {
        if matches!(client.store().guard().state(), GuardState::Authenticated(_)) {
            return Redirect::to("/").into_response();
        }
        notices = client.drain_notices().await;
    }
    Html(pages::login("", None, &notices)).into_response()
}

/// Shows the sign-up form, or sends a signed-in browser home.
pub async fn signup_page(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    let mut notices = Vec::new();
    if let Some((_, client)) = current_client(&state, &jar).await {
        if matches!(client.store().guard().state(), GuardState::Authenticated(_)) {
            return Redirect::to("/").into_response();
        }
        notices = client.drain_notices().await;
    }
    Html(pages::signup("", None, &notices)).into_response()
}

/// Handles the login form.
pub async fn sign_in(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(form): Form<CredentialsForm>,
) -> Response {
    submit_credentials(&state, jar, &form, CredentialOp::SignIn).await
}

/// Handles the sign-up form. A new account is signed in straight away.
pub async fn sign_up(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(form): Form<CredentialsForm>,
) -> Response {
    submit_credentials(&state, jar, &form, CredentialOp::SignUp).await
}

/// Signs the browser's principal out.
pub async fn sign_out(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    let Some((_, client)) = current_client(&state, &jar).await else {
        return Redirect::to("/login").into_response();
    };
    match client.gateway().sign_out().await {
        Ok(()) => {
            await_guard(&client, |guard| *guard == GuardState::Unauthenticated).await;
            Redirect::to("/login").into_response()
        }
        Err(err) => (
            StatusCode::BAD_GATEWAY,
            Html(pages::error(err.user_message(), "/")),
        )
            .into_response(),
    }
}

/// Reports the browser's guard state and pending notices as JSON.
pub async fn session_status(State(state): State<Arc<AppState>>, jar: CookieJar) -> Json<SessionStatus> {
    let Some((_, client)) = current_client(&state, &jar).await else {
        return Json(SessionStatus {
            guard: GuardState::Unauthenticated,
            notices: Vec::new(),
        });
    };
    Json(SessionStatus {
        guard: client.store().guard().state(),
        notices: client.drain_notices().await,
    })
}

/// Journal home.
pub async fn home(RequireAuth { identity, client }: RequireAuth) -> Html<String> {
    let notices = client.drain_notices().await;
    Html(pages::home(&identity, &notices))
}

/// The signed-in person's profile.
pub async fn profile(RequireAuth { identity, client }: RequireAuth) -> Html<String> {
    let notices = client.drain_notices().await;
    Html(pages::profile(&identity, &notices))
}
