//! Console API router

use crate::credential;
use crate::dispatch::CommandDispatcher;
use crate::error::AuthApiError;
use crate::handlers::{auth, command, logout, session_info};
use crate::staging::UploadStaging;
use axum::routing::{get, post};
use axum::{middleware, Router};
use porter_session::AuthenticationGateway;
use std::sync::Arc;

/// Shared state of the console API.
#[derive(Clone)]
pub struct ConsoleState {
    pub gateway: Arc<AuthenticationGateway>,
    pub dispatcher: Arc<dyn CommandDispatcher>,
    pub staging: Arc<UploadStaging>,
    /// Cookie path, e.g. `/console/`.
    pub cookie_path: String,
    /// Where the browser lands after a local logout.
    pub logout_location: String,
    /// Default redirect target after SSO re-authentication.
    pub default_target: String,
    /// Route starting an SSO login.
    pub sso_login_path: String,
    /// Route starting SSO single logout.
    pub sso_logout_path: String,
}

/// Builds the console API router.
///
/// Basic authentication applies everywhere except `/auth/sso`, which
/// must never fall back to header credentials.
pub fn auth_router(state: ConsoleState) -> Router {
    let protected = Router::new()
        .route("/auth", post(auth::login))
        .route(
            "/get/session-info",
            get(session_info::session_info).post(session_info::session_info),
        )
        .route(
            "/command/*path",
            get(command::command).post(command::command),
        )
        .route("/upload", post(command::command_root))
        .route(
            "/upload/*path",
            get(command::command).post(command::command),
        )
        .route("/logout", get(logout::logout))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            credential::basic_auth,
        ));

    let sso_entry = Router::new().route(
        "/auth/sso",
        get(auth::sso_reauth).post(auth::sso_reauth),
    );

    protected.merge(sso_entry).with_state(state)
}

/// Fallback for unknown routes.
pub async fn not_found() -> AuthApiError {
    AuthApiError::NotFound
}
