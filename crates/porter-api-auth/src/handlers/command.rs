//! Command and upload forwarding
//!
//! Resolves the session, stages multipart bodies, and forwards the
//! request to the backend dispatcher. Staged files are reclaimed exactly
//! once per request, on success and on every failure path.

use crate::dispatch::{CommandRequest, StagedUpload};
use crate::error::AuthApiError;
use crate::extract::ClientInfo;
use crate::response::{into_textarea, Envelope};
use crate::router::ConsoleState;
use axum::body::to_bytes;
use axum::extract::{FromRequest, Multipart, Path, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use axum::Json;
use porter_core::RequestId;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::info;

/// Upper bound for buffered JSON command bodies. Multipart bodies are
/// limited per file by the staging layer instead.
const MAX_JSON_BODY: usize = 2 * 1024 * 1024;

#[derive(Debug, Default, Deserialize)]
struct CommandArgs {
    options: Option<Value>,
    flavor: Option<String>,
}

/// `GET|POST /command/*path` and `/upload/*path`.
#[utoipa::path(
    post,
    path = "/command/{path}",
    responses(
        (status = 200, description = "Backend response"),
        (status = 401, description = "No authenticated session"),
        (status = 404, description = "Unknown command"),
    ),
    tag = "command"
)]
pub async fn command(
    State(state): State<ConsoleState>,
    client: ClientInfo,
    Path(path): Path<String>,
    request: Request,
) -> Response {
    command_inner(state, client, path, request).await
}

/// `POST /upload` without a command path: stage only, echo descriptors.
pub async fn command_root(
    State(state): State<ConsoleState>,
    client: ClientInfo,
    request: Request,
) -> Response {
    command_inner(state, client, String::new(), request).await
}

async fn command_inner(
    state: ConsoleState,
    client: ClientInfo,
    path: String,
    request: Request,
) -> Response {
    let claimed = state.gateway.claimed_id(&client.identity);
    let Some(session) = state.gateway.refresh(&claimed) else {
        let response = AuthApiError::Unauthenticated.into_response();
        return if client.iframe {
            into_textarea(response).await
        } else {
            response
        };
    };

    let request_id = RequestId::new();
    let (iframe, result) = match build_request(&state, &request_id, &path, request).await {
        Ok((command_request, force_iframe)) => {
            info!(
                session_id = %claimed,
                request_id = %request_id,
                command = %command_request.path,
                uploads = command_request.uploads.len(),
                "forwarding command"
            );
            let result = state
                .dispatcher
                .dispatch(&session, command_request)
                .await
                .map_err(AuthApiError::from);
            (client.iframe || force_iframe, result)
        }
        Err(error) => (client.iframe, Err(error)),
    };

    // The request is finished either way; reclaim its staged files.
    state.staging.cleanup(&request_id);

    let response = match result {
        Ok(value) => Json(Envelope::ok(value)).into_response(),
        Err(error) => error.into_response(),
    };
    if iframe {
        into_textarea(response).await
    } else {
        response
    }
}

/// Turns the HTTP request into a [`CommandRequest`], staging multipart
/// bodies. The second element reports whether an `iframe` form field
/// forces the textarea envelope.
async fn build_request(
    state: &ConsoleState,
    request_id: &RequestId,
    path: &str,
    request: Request,
) -> Result<(CommandRequest, bool), AuthApiError> {
    let is_multipart = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("multipart/form-data"));

    if is_multipart {
        let multipart = Multipart::from_request(request, &())
            .await
            .map_err(|e| AuthApiError::MalformedRequest(e.to_string()))?;
        let (uploads, mut fields) = stage_uploads(state, request_id, multipart).await?;
        let force_iframe = !matches!(
            fields.get("iframe").map(String::as_str),
            None | Some("false") | Some("0") | Some("")
        );
        let flavor = fields.remove("flavor");
        let options = json!(fields);
        return Ok((
            CommandRequest {
                id: *request_id,
                path: path.to_string(),
                options,
                flavor,
                uploads,
            },
            force_iframe,
        ));
    }

    if path.is_empty() {
        return Err(AuthApiError::NotFound);
    }

    let bytes = to_bytes(request.into_body(), MAX_JSON_BODY)
        .await
        .map_err(|e| AuthApiError::MalformedRequest(e.to_string()))?;
    let args: CommandArgs = if bytes.is_empty() {
        CommandArgs::default()
    } else {
        serde_json::from_slice(&bytes).map_err(|e| AuthApiError::MalformedRequest(e.to_string()))?
    };

    Ok((
        CommandRequest {
            id: *request_id,
            path: path.to_string(),
            options: args.options.unwrap_or_else(|| json!({})),
            flavor: args.flavor,
            uploads: Vec::new(),
        },
        false,
    ))
}

async fn stage_uploads(
    state: &ConsoleState,
    request_id: &RequestId,
    mut multipart: Multipart,
) -> Result<(Vec<StagedUpload>, HashMap<String, String>), AuthApiError> {
    let mut uploads = Vec::new();
    let mut fields = HashMap::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AuthApiError::MalformedRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if let Some(filename) = field.file_name().map(String::from) {
            let content_type = field.content_type().map(String::from);
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AuthApiError::MalformedRequest(e.to_string()))?;
            let staged =
                state
                    .staging
                    .stage(request_id, &filename, content_type.as_deref(), &bytes)?;
            uploads.push(StagedUpload {
                name,
                filename: staged.filename,
                content_type: staged.content_type,
                path: staged.path,
                size: staged.size,
            });
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| AuthApiError::MalformedRequest(e.to_string()))?;
            fields.insert(name, value);
        }
    }

    Ok((uploads, fields))
}
