//! HTTP router.

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::auth::{AppState, routes};

/// Builds the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // Public routes
        .route("/login", get(routes::login_page))
        .route("/signup", get(routes::signup_page))
        .route("/auth/signin", post(routes::sign_in))
        .route("/auth/signup", post(routes::sign_up))
        .route("/auth/signout", post(routes::sign_out))
        .route("/api/session", get(routes::session_status))
        // Protected routes
        .route("/", get(routes::home))
        .route("/profile", get(routes::profile))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
