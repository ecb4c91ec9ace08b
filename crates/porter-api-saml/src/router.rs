//! SSO router

use crate::handlers::{self, SamlState};
use axum::routing::get;
use axum::Router;

/// Builds the SSO router. Trailing-slash variants are registered
/// explicitly; browsers reach these routes from provider-supplied URLs
/// that are inconsistent about the slash.
pub fn saml_router(state: SamlState) -> Router {
    Router::new()
        .route("/saml", get(handlers::acs).post(handlers::acs))
        .route("/saml/", get(handlers::acs).post(handlers::acs))
        .route("/saml/metadata", get(handlers::metadata))
        .route("/saml/slo", get(handlers::slo).post(handlers::slo))
        .route("/saml/slo/", get(handlers::slo).post(handlers::slo))
        .route("/saml/logout", get(handlers::logout).post(handlers::logout))
        .route(
            "/saml/logout/",
            get(handlers::logout).post(handlers::logout),
        )
        .route("/saml/iframe", get(handlers::iframe))
        .route("/saml/iframe/", get(handlers::iframe))
        .with_state(state)
}
