//! Protocol collaborator seam
//!
//! Everything touching the SSO wire format (XML, signatures, artifact
//! resolution, provider metadata) lives behind [`ProtocolClient`]. The
//! state machine in this crate only deals in the structured outcomes
//! defined here.

use crate::error::ProtocolViolation;
use async_trait::async_trait;
use axum::response::{Html, IntoResponse, Redirect, Response};
use chrono::{DateTime, Utc};
use porter_session::registry::ReleaseError;
use std::collections::HashMap;
use thiserror::Error;

/// Wire binding of a protocol message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    /// Message in the query string of a redirect.
    Redirect,
    /// Message in an auto-submitted form body.
    Post,
    /// Message referenced by an artifact, resolved out of band.
    Artifact,
}

impl std::fmt::Display for Binding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Redirect => "HTTP-Redirect",
            Self::Post => "HTTP-POST",
            Self::Artifact => "HTTP-Artifact",
        })
    }
}

/// A provider-bound message, ready to hand to the browser.
#[derive(Debug, Clone)]
pub enum Transport {
    /// Send the browser to `location`.
    Redirect { location: String },
    /// Serve an auto-submitting HTML form.
    Post { body: String },
}

impl IntoResponse for Transport {
    fn into_response(self) -> Response {
        match self {
            Self::Redirect { location } => Redirect::to(&location).into_response(),
            Self::Post { body } => Html(body).into_response(),
        }
    }
}

/// Validated outcome of an authentication response.
#[derive(Debug, Clone)]
pub struct Assertion {
    /// Encoded name identifier of the subject.
    pub name_id: String,
    /// Username asserted for the subject.
    pub username: String,
    /// Correlation id of the authentication request this answers.
    pub in_response_to: Option<String>,
    /// Session expiry asserted by the provider.
    pub not_on_or_after: Option<DateTime<Utc>>,
}

/// Kind of an inbound single-logout message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutKind {
    /// The provider asks this service provider to end a session.
    Request,
    /// The provider answers a logout this service provider started.
    Response,
}

/// One provider to contact during global logout.
#[derive(Debug, Clone)]
pub struct LogoutDirective {
    pub entity_id: String,
    pub binding: Binding,
    pub transport: Transport,
}

/// Global logout could not be started.
#[derive(Debug, Error)]
pub enum GlobalLogoutError {
    /// The provider does not know the subject; it is already logged out.
    #[error("the principal is not known to the identity provider")]
    UnknownPrincipal,
    #[error("{0}")]
    Provider(String),
}

/// The protocol implementation this service provider delegates to.
#[async_trait]
pub trait ProtocolClient: Send + Sync {
    /// Entity ids of the identity providers usable for sign-on.
    fn identity_providers(&self) -> Vec<String>;

    /// Builds an authentication request towards `idp_entity_id`.
    ///
    /// Returns the correlation id (to be recorded as outstanding) and the
    /// browser-bound transport.
    fn create_authn_request(
        &self,
        idp_entity_id: &str,
        acs_url: &str,
        passive: bool,
        relay_state: Option<&str>,
    ) -> Result<(String, Transport), ProtocolViolation>;

    /// Validates an authentication response against the outstanding
    /// exchanges (correlation id → requested service URL).
    async fn parse_authn_response(
        &self,
        message: &str,
        binding: Binding,
        outstanding: &HashMap<String, String>,
    ) -> Result<Assertion, ProtocolViolation>;

    /// Resolves an artifact reference into the actual message.
    async fn resolve_artifact(&self, artifact: &str) -> Result<String, ProtocolViolation>;

    /// Decides whether an inbound logout message is a request or a
    /// response. Undecodable messages classify as responses, which then
    /// fail parsing with a precise violation.
    fn classify_logout_message(&self, message: &str) -> LogoutKind;

    /// Answers a provider-initiated logout request. `name_id` is `None`
    /// when the local session is already gone; the response must still be
    /// produced.
    async fn handle_logout_request(
        &self,
        message: &str,
        name_id: Option<&str>,
        binding: Binding,
        relay_state: Option<&str>,
    ) -> Result<Transport, ProtocolViolation>;

    /// Completes a logout this service provider initiated.
    async fn finish_logout(
        &self,
        message: &str,
        binding: Binding,
    ) -> Result<(), ProtocolViolation>;

    /// Starts logout at every provider holding a session for `name_id`.
    async fn global_logout(
        &self,
        name_id: &str,
    ) -> Result<Vec<LogoutDirective>, GlobalLogoutError>;

    /// Drops locally cached provider state for `name_id`.
    fn release(&self, name_id: &str) -> Result<(), ReleaseError>;

    /// Metadata document describing this service provider.
    fn metadata_document(&self) -> Result<String, ProtocolViolation>;
}
