//! Shared HTTP error envelope
//!
//! Every API surface in the gateway reports failures with the same JSON
//! shape so console clients can handle errors uniformly.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};

/// JSON body returned for every error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// HTTP status code, repeated in the body for clients that only
    /// inspect the payload.
    pub status: u16,
    /// Stable machine-readable error code.
    pub error: String,
    /// Human-readable description.
    pub message: String,
}

impl ErrorBody {
    pub fn new(status: StatusCode, error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: status.as_u16(),
            error: error.into(),
            message: message.into(),
        }
    }
}

impl IntoResponse for ErrorBody {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_body_serializes_all_fields() {
        let body = ErrorBody::new(StatusCode::UNAUTHORIZED, "unauthorized", "no session");
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["status"], 401);
        assert_eq!(json["error"], "unauthorized");
        assert_eq!(json["message"], "no session");
    }

    #[test]
    fn test_into_response_uses_status() {
        let body = ErrorBody::new(StatusCode::NOT_FOUND, "not_found", "nothing here");
        let response = body.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
