//! Console API error types

use crate::dispatch::DispatchError;
use crate::staging::StagingError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use porter_core::ErrorBody;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum AuthApiError {
    #[error("no authenticated session")]
    Unauthenticated,

    #[error("invalid Authorization header")]
    MalformedAuthorization,

    #[error("invalid request body: {0}")]
    MalformedRequest(String),

    #[error("there is not enough free space on disk")]
    InsufficientStorage,

    #[error("the size of the uploaded file is too large")]
    PayloadTooLarge,

    #[error("the requested resource was not found")]
    NotFound,

    // Usually slapd down or clock skew between provider and gateway.
    #[error("the single sign-on re-authentication failed; this might be a temporary problem, please login again")]
    FederatedRevalidationFailed,

    #[error("upload staging failed: {0}")]
    Staging(String),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

impl From<StagingError> for AuthApiError {
    fn from(error: StagingError) -> Self {
        match error {
            StagingError::InsufficientStorage => Self::InsufficientStorage,
            StagingError::PayloadTooLarge => Self::PayloadTooLarge,
            StagingError::Io(e) => Self::Staging(e.to_string()),
        }
    }
}

impl AuthApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::MalformedAuthorization
            | Self::MalformedRequest(_)
            | Self::InsufficientStorage
            | Self::PayloadTooLarge => StatusCode::BAD_REQUEST,
            Self::NotFound | Self::Dispatch(DispatchError::UnknownCommand(_)) => {
                StatusCode::NOT_FOUND
            }
            Self::Dispatch(DispatchError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            Self::FederatedRevalidationFailed
            | Self::Staging(_)
            | Self::Dispatch(DispatchError::Failed(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::MalformedAuthorization => "malformed_authorization",
            Self::MalformedRequest(_) => "malformed_request",
            Self::InsufficientStorage => "insufficient_storage",
            Self::PayloadTooLarge => "payload_too_large",
            Self::NotFound => "not_found",
            Self::FederatedRevalidationFailed => "sso_reauthentication_failed",
            Self::Staging(_) => "staging_failed",
            Self::Dispatch(_) => "dispatch_failed",
        }
    }
}

impl IntoResponse for AuthApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(error = %self, "console API request failed");
        }
        ErrorBody::new(status, self.code(), self.to_string()).into_response()
    }
}
