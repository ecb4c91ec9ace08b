//! SSO error types
//!
//! [`ProtocolViolation`] classifies the ways an inbound protocol message
//! can be rejected; [`SsoError`] covers the rest of the state machine.
//! Almost every violation is the client's (or the provider's) fault and
//! maps to 400; a missing signing key is a service-provider
//! misconfiguration and maps to 500.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use porter_core::ErrorBody;
use thiserror::Error;
use tracing::{debug, warn};

/// A protocol message was rejected.
#[derive(Debug, Error)]
pub enum ProtocolViolation {
    #[error("the principal is unknown to this service provider: {0}")]
    UnknownPrincipal(String),

    #[error("the requested binding is not supported: {0}")]
    UnsupportedBinding(String),

    #[error("the response could not be verified: {0}")]
    VerificationFailed(String),

    #[error("the response was not requested by this service provider: {0}")]
    UnsolicitedResponse(String),

    #[error("the identity provider reported an error status: {0}")]
    StatusError(String),

    #[error("the signing key of the issuer is not trusted: {0}")]
    MissingKey(String),

    #[error("the message carries an invalid signature: {0}")]
    SignatureError(String),

    // Expected whenever the user has no live provider session; the
    // passive frame probes for exactly this.
    #[error("the identity provider could not authenticate passively")]
    PassiveNotSupported,

    #[error("the identity provider response could not be parsed")]
    Unparsed,
}

#[derive(Debug, Error)]
pub enum SsoError {
    #[error(transparent)]
    Protocol(#[from] ProtocolViolation),

    #[error("no identity provider is configured for this service provider")]
    NoIdentityProvider,

    #[error(
        "multiple identity providers are available: {}; select one via the \"{query_param}\" query parameter",
        candidates.join(", ")
    )]
    AmbiguousIdentityProvider {
        candidates: Vec<String>,
        query_param: String,
    },

    #[error("single sign-on is not available due to misconfiguration")]
    ProviderUnavailable,

    #[error("the HTTP request is missing a required protocol parameter")]
    MissingMessage,

    #[error("the logout binding is not supported: {0}")]
    UnknownLogoutBinding(String),

    #[error("single sign-on failed: {0}")]
    Internal(String),
}

impl SsoError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Protocol(ProtocolViolation::MissingKey(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Protocol(_)
            | Self::AmbiguousIdentityProvider { .. }
            | Self::MissingMessage
            | Self::UnknownLogoutBinding(_) => StatusCode::BAD_REQUEST,
            Self::NoIdentityProvider | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ProviderUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::Protocol(violation) => match violation {
                ProtocolViolation::UnknownPrincipal(_) => "unknown_principal",
                ProtocolViolation::UnsupportedBinding(_) => "unsupported_binding",
                ProtocolViolation::VerificationFailed(_) => "verification_failed",
                ProtocolViolation::UnsolicitedResponse(_) => "unsolicited_response",
                ProtocolViolation::StatusError(_) => "status_error",
                ProtocolViolation::MissingKey(_) => "missing_key",
                ProtocolViolation::SignatureError(_) => "signature_error",
                ProtocolViolation::PassiveNotSupported => "passive_not_supported",
                ProtocolViolation::Unparsed => "unparsed_response",
            },
            Self::NoIdentityProvider => "no_identity_provider",
            Self::AmbiguousIdentityProvider { .. } => "ambiguous_identity_provider",
            Self::ProviderUnavailable => "sso_unavailable",
            Self::MissingMessage => "missing_message",
            Self::UnknownLogoutBinding(_) => "unknown_logout_binding",
            Self::Internal(_) => "sso_failed",
        }
    }
}

impl IntoResponse for SsoError {
    fn into_response(self) -> Response {
        // Passive refusal is the expected probe outcome, not a failure.
        if matches!(
            self,
            Self::Protocol(ProtocolViolation::PassiveNotSupported)
        ) {
            debug!("identity provider refused passive authentication");
        } else {
            warn!(error = %self, "single sign-on request failed");
        }
        ErrorBody::new(self.status(), self.code(), self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_is_server_error() {
        let error = SsoError::from(ProtocolViolation::MissingKey("issuer".into()));
        assert_eq!(error.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_violations_are_client_errors() {
        for violation in [
            ProtocolViolation::UnknownPrincipal("x".into()),
            ProtocolViolation::UnsolicitedResponse("x".into()),
            ProtocolViolation::SignatureError("x".into()),
            ProtocolViolation::PassiveNotSupported,
        ] {
            assert_eq!(SsoError::from(violation).status(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn test_ambiguous_provider_names_candidates() {
        let error = SsoError::AmbiguousIdentityProvider {
            candidates: vec!["idp-a".into(), "idp-b".into()],
            query_param: "idp".into(),
        };
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
        let message = error.to_string();
        assert!(message.contains("idp-a"));
        assert!(message.contains("idp-b"));
        assert!(message.contains("\"idp\""));
    }

    #[test]
    fn test_provider_unavailable_is_503() {
        assert_eq!(
            SsoError::ProviderUnavailable.status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
