//! Login handlers: credential login and passive SSO re-authentication

use crate::cookies;
use crate::error::AuthApiError;
use crate::extract::ClientInfo;
use crate::response::Envelope;
use crate::router::ConsoleState;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use porter_core::sanitize_redirect_target;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Credential login.
///
/// A fresh login gets a random session identifier unless the request
/// already names a live session, in which case that identifier is kept.
#[utoipa::path(
    post,
    path = "/auth",
    responses(
        (status = 200, description = "Session established, cookies set"),
        (status = 401, description = "Authentication failed"),
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<ConsoleState>,
    client: ClientInfo,
    Json(body): Json<LoginRequest>,
) -> Result<Response, AuthApiError> {
    let id = state.gateway.allocate_id(&client.identity, true);
    let session = state
        .gateway
        .authenticate(id, &body.username, &body.password)
        .await
        .map_err(|_| AuthApiError::Unauthenticated)?;

    info!(username = %session.username(), "credential login succeeded");
    let mut response = Json(Envelope::ok(json!({ "username": session.username() })))
        .into_response();
    cookies::append(
        response.headers_mut(),
        cookies::session_cookies(
            session.id(),
            session.username(),
            &state.cookie_path,
            client.host.as_deref(),
        ),
    );
    Ok(response)
}

#[derive(Debug, Deserialize)]
pub struct SsoReauthQuery {
    /// Where to send the browser after successful re-authentication.
    #[serde(rename = "return")]
    pub return_to: Option<String>,
}

/// Passive SSO re-authentication entry point.
///
/// Without a live federated session the browser is bounced to the SSO
/// login route; with one, the stored assertion is re-validated against
/// the backend and the browser returns to the sanitized `return` target.
#[utoipa::path(
    get,
    path = "/auth/sso",
    responses(
        (status = 303, description = "Redirect to SSO login or the return target"),
        (status = 500, description = "Backend rejected the stored assertion"),
    ),
    tag = "auth"
)]
pub async fn sso_reauth(
    State(state): State<ConsoleState>,
    client: ClientInfo,
    Query(query): Query<SsoReauthQuery>,
) -> Result<Response, AuthApiError> {
    let claimed = state.gateway.claimed_id(&client.identity);
    let session = state
        .gateway
        .revalidate_federated(&claimed)
        .await
        .map_err(|_| AuthApiError::FederatedRevalidationFailed)?;

    let Some(session) = session else {
        return Ok(Redirect::to(&state.sso_login_path).into_response());
    };

    let target = sanitize_redirect_target(
        query.return_to.as_deref().unwrap_or(&state.default_target),
        &state.default_target,
    );
    let mut response = Redirect::to(&target).into_response();
    cookies::append(
        response.headers_mut(),
        cookies::session_cookies(
            session.id(),
            session.username(),
            &state.cookie_path,
            client.host.as_deref(),
        ),
    );
    Ok(response)
}
