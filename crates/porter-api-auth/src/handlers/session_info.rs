//! Session introspection

use crate::error::AuthApiError;
use crate::extract::ClientInfo;
use crate::response::Envelope;
use crate::router::ConsoleState;
use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde_json::json;

/// Reports the logged-in user, the authentication type and the seconds
/// until the session expires.
#[utoipa::path(
    get,
    path = "/get/session-info",
    responses(
        (status = 200, description = "Session details"),
        (status = 401, description = "No authenticated session"),
    ),
    tag = "auth"
)]
pub async fn session_info(
    State(state): State<ConsoleState>,
    client: ClientInfo,
) -> Result<Json<Envelope>, AuthApiError> {
    let claimed = state.gateway.claimed_id(&client.identity);
    let session = state
        .gateway
        .resume(&claimed)
        .ok_or(AuthApiError::Unauthenticated)?;

    Ok(Json(Envelope::ok(json!({
        "username": session.username(),
        "auth_type": session.auth_type(),
        "remaining": session.remaining_secs(Utc::now()),
    }))))
}
