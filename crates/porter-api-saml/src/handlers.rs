//! SSO endpoints
//!
//! - `GET|POST /saml/` — sign-on entry and assertion consumer service
//! - `GET /saml/iframe` — passive re-authentication frame
//! - `GET|POST /saml/slo` — single logout service
//! - `GET|POST /saml/logout` — user-initiated provider logout
//! - `GET /saml/metadata` — service-provider metadata

use crate::error::SsoError;
use crate::message::{extract_message, ProtocolParam};
use crate::provider::{Binding, LogoutKind};
use crate::service::SsoService;
use axum::body::to_bytes;
use axum::extract::{Request, State};
use axum::http::header::{HeaderValue, CONTENT_TYPE};
use axum::http::Method;
use axum::response::{Html, IntoResponse, Redirect, Response};
use porter_api_auth::cookies;
use porter_api_auth::ClientInfo;
use porter_core::sanitize_redirect_target;
use porter_session::AuthenticationGateway;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Relay-state marker of the passive re-authentication frame.
const IFRAME_RELAY: &str = "iframe-passive";

const MAX_FORM_BODY: usize = 1024 * 1024;

#[derive(Clone)]
pub struct SamlState {
    pub sso: Arc<SsoService>,
    pub gateway: Arc<AuthenticationGateway>,
    pub cookie_path: String,
}

/// Query and form parameters of a protocol request, merged.
async fn request_params(
    request: Request,
) -> Result<(Method, HashMap<String, String>), SsoError> {
    let method = request.method().clone();
    let mut params: HashMap<String, String> = request
        .uri()
        .query()
        .map(|query| {
            url::form_urlencoded::parse(query.as_bytes())
                .into_owned()
                .collect()
        })
        .unwrap_or_default();

    if method == Method::POST {
        let bytes = to_bytes(request.into_body(), MAX_FORM_BODY)
            .await
            .map_err(|e| SsoError::Internal(e.to_string()))?;
        params.extend(url::form_urlencoded::parse(&bytes).into_owned());
    }

    Ok((method, params))
}

fn session_response(
    state: &SamlState,
    client: &ClientInfo,
    session: &porter_session::Session,
    inner: Response,
) -> Response {
    let mut response = inner;
    cookies::append(
        response.headers_mut(),
        cookies::session_cookies(
            session.id(),
            session.username(),
            &state.cookie_path,
            client.host.as_deref(),
        ),
    );
    response
}

/// Sign-on entry and assertion consumer service.
#[utoipa::path(
    get,
    path = "/saml/",
    responses(
        (status = 200, description = "Provider-bound form"),
        (status = 303, description = "Redirect to the identity provider or the relay target"),
        (status = 400, description = "Rejected protocol message"),
        (status = 503, description = "Single sign-on unavailable"),
    ),
    tag = "saml"
)]
pub async fn acs(
    State(state): State<SamlState>,
    client: ClientInfo,
    request: Request,
) -> Response {
    match acs_inner(&state, &client, request).await {
        Ok(response) => response,
        Err(error) => error.into_response(),
    }
}

async fn acs_inner(
    state: &SamlState,
    client: &ClientInfo,
    request: Request,
) -> Result<Response, SsoError> {
    let (method, params) = request_params(request).await?;
    let extracted = extract_message(&method, &params);
    let requested_idp = params
        .get(&state.sso.config().idp_query_param)
        .map(String::as_str);

    let Some(param) = extracted.param else {
        // No protocol message: this is the sign-on entry.
        let relay = params
            .get("location")
            .cloned()
            .unwrap_or_else(|| state.sso.config().default_target.clone());
        let transport = state.sso.initiate(requested_idp, false, Some(&relay))?;
        return Ok(transport.into_response());
    };

    let (binding, message) = resolve_param(state, extracted.binding, param).await?;

    if extracted.relay_state.as_deref() == Some(IFRAME_RELAY) {
        // Passive frame: the frontend reads the result out of a
        // textarea instead of following a redirect.
        let id = state.gateway.allocate_id(&client.identity, true);
        let session = state.sso.consume(&message, binding, id).await?;
        let payload = json!({ "status": 200, "result": { "username": session.username() } });
        let page = format!("<html><body><textarea>{payload}</textarea></body></html>");
        return Ok(session_response(
            state,
            client,
            &session,
            Html(page).into_response(),
        ));
    }

    let id = state.gateway.allocate_id(&client.identity, true);
    let session = state.sso.consume(&message, binding, id).await?;
    info!(username = %session.username(), "single sign-on completed");

    let default_target = state.sso.config().default_target.clone();
    let target = sanitize_redirect_target(
        extracted.relay_state.as_deref().unwrap_or(&default_target),
        &default_target,
    );
    Ok(session_response(
        state,
        client,
        &session,
        Redirect::to(&target).into_response(),
    ))
}

async fn resolve_param(
    state: &SamlState,
    binding: Binding,
    param: ProtocolParam,
) -> Result<(Binding, String), SsoError> {
    match param {
        ProtocolParam::Response(message) | ProtocolParam::Request(message) => {
            Ok((binding, message))
        }
        ProtocolParam::Artifact(artifact) => {
            let message = state.sso.resolve_artifact(&artifact).await?;
            Ok((Binding::Artifact, message))
        }
    }
}

/// Passive re-authentication frame: probes the provider without user
/// interaction.
#[utoipa::path(
    get,
    path = "/saml/iframe",
    responses(
        (status = 303, description = "Redirect to the identity provider"),
        (status = 503, description = "Single sign-on unavailable"),
    ),
    tag = "saml"
)]
pub async fn iframe(State(state): State<SamlState>, request: Request) -> Response {
    let result = async {
        let (_, params) = request_params(request).await?;
        let requested_idp = params
            .get(&state.sso.config().idp_query_param)
            .map(String::as_str);
        state.sso.initiate(requested_idp, true, Some(IFRAME_RELAY))
    }
    .await;
    match result {
        Ok(transport) => transport.into_response(),
        Err(error) => error.into_response(),
    }
}

/// Single logout service.
#[utoipa::path(
    get,
    path = "/saml/slo",
    responses(
        (status = 200, description = "Provider-bound logout response"),
        (status = 303, description = "Logout completed locally"),
        (status = 400, description = "Missing or rejected protocol message"),
    ),
    tag = "saml"
)]
pub async fn slo(
    State(state): State<SamlState>,
    client: ClientInfo,
    request: Request,
) -> Response {
    match slo_inner(&state, &client, request).await {
        Ok(response) => response,
        Err(error) => error.into_response(),
    }
}

async fn slo_inner(
    state: &SamlState,
    client: &ClientInfo,
    request: Request,
) -> Result<Response, SsoError> {
    let (method, params) = request_params(request).await?;
    let extracted = extract_message(&method, &params);
    let Some(param) = extracted.param else {
        return Err(SsoError::MissingMessage);
    };
    let (binding, message) = resolve_param(state, extracted.binding, param).await?;
    let claimed = state.gateway.claimed_id(&client.identity);

    match state.sso.classify_logout_message(&message)? {
        LogoutKind::Request => {
            let transport = state
                .sso
                .handle_logout_request(
                    &message,
                    binding,
                    extracted.relay_state.as_deref(),
                    &claimed,
                )
                .await?;
            Ok(transport.into_response())
        }
        LogoutKind::Response => {
            state.sso.finish_logout(&message, binding).await?;
            Ok(logout_success(state, &claimed))
        }
    }
}

/// User-initiated logout through the identity provider.
#[utoipa::path(
    get,
    path = "/saml/logout",
    responses(
        (status = 200, description = "Provider-bound logout request"),
        (status = 303, description = "Nothing to do at the provider, logout completed locally"),
    ),
    tag = "saml"
)]
pub async fn logout(
    State(state): State<SamlState>,
    client: ClientInfo,
    request: Request,
) -> Response {
    let result = async {
        let (_, _) = request_params(request).await?;
        let claimed = state.gateway.claimed_id(&client.identity);
        state.sso.global_logout(&claimed).await
    }
    .await;
    match result {
        Ok(Some(transport)) => transport.into_response(),
        Ok(None) => {
            let claimed = state.gateway.claimed_id(&client.identity);
            logout_success(&state, &claimed)
        }
        Err(error) => error.into_response(),
    }
}

/// Provider-side logout is done; drop the federated identity and finish
/// locally.
fn logout_success(state: &SamlState, claimed: &porter_core::SessionId) -> Response {
    state.sso.finish_local(claimed);
    Redirect::to(&state.sso.config().logout_landing).into_response()
}

/// Service-provider metadata document.
#[utoipa::path(
    get,
    path = "/saml/metadata",
    responses(
        (status = 200, description = "Metadata XML", content_type = "application/xml"),
        (status = 503, description = "Single sign-on unavailable"),
    ),
    tag = "saml"
)]
pub async fn metadata(State(state): State<SamlState>) -> Response {
    match state.sso.metadata() {
        Ok(document) => {
            let mut response = document.into_response();
            response
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/xml"));
            response
        }
        Err(error) => error.into_response(),
    }
}
