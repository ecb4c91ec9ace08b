//! Local logout

use crate::cookies;
use crate::extract::ClientInfo;
use crate::router::ConsoleState;
use axum::extract::State;
use axum::response::{IntoResponse, Redirect, Response};
use tracing::info;

/// Ends the session.
///
/// Federated sessions are bounced to the SSO logout route so the
/// identity provider can run single logout; everything else is expired
/// locally, the cookies are cleared and the browser lands on the
/// configured page.
#[utoipa::path(
    get,
    path = "/logout",
    responses((status = 303, description = "Redirect to the SSO logout route or the landing page")),
    tag = "auth"
)]
pub async fn logout(State(state): State<ConsoleState>, client: ClientInfo) -> Response {
    let claimed = state.gateway.claimed_id(&client.identity);

    if let Some(session) = state.gateway.resume(&claimed) {
        if session.is_federated() {
            return Redirect::to(&state.sso_logout_path).into_response();
        }
    }

    if let Some(session) = state.gateway.expire(&claimed) {
        info!(username = %session.username(), "logged out");
    }
    let mut response = Redirect::to(&state.logout_location).into_response();
    cookies::append(
        response.headers_mut(),
        cookies::clearing_cookies(&state.cookie_path, client.host.as_deref()),
    );
    response
}
