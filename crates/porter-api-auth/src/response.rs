//! Response envelopes
//!
//! Console clients expect the `{status, result, message}` JSON envelope.
//! Iframe-driven requests (legacy upload path and the passive SSO frame)
//! additionally need the whole payload wrapped in an HTML `<textarea>`,
//! which is how the frontend smuggles JSON out of a frame document.

use axum::body::{to_bytes, Body};
use axum::http::header::{HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use axum::response::Response;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Serialize)]
pub struct Envelope {
    pub status: u16,
    pub result: Value,
    pub message: String,
}

impl Envelope {
    pub fn ok(result: Value) -> Self {
        Self {
            status: 200,
            result,
            message: String::new(),
        }
    }
}

/// Wraps a finished response body in the iframe textarea envelope.
pub async fn into_textarea(response: Response) -> Response {
    let (mut parts, body) = response.into_parts();
    let bytes = to_bytes(body, usize::MAX).await.unwrap_or_default();
    let page = format!(
        "<html><body><textarea>{}</textarea></body></html>",
        String::from_utf8_lossy(&bytes)
    );
    parts.headers.remove(CONTENT_LENGTH);
    parts.headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=UTF-8"),
    );
    Response::from_parts(parts, Body::from(page))
}
