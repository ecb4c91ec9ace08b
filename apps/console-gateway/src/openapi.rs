//! `OpenAPI` documentation and Swagger UI configuration.
//!
//! Collects the annotated handlers of the console and SSO routers into
//! one generated spec, served with Swagger UI.

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// `OpenAPI` documentation for the console gateway.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Porter Console Gateway",
        version = "0.1.0",
        description = "Session and authentication broker for the management console"
    ),
    tags(
        (name = "auth", description = "Login, session introspection and logout"),
        (name = "command", description = "Command forwarding and upload staging"),
        (name = "saml", description = "Single sign-on")
    ),
    paths(
        // Console API
        porter_api_auth::handlers::auth::login,
        porter_api_auth::handlers::auth::sso_reauth,
        porter_api_auth::handlers::session_info::session_info,
        porter_api_auth::handlers::command::command,
        porter_api_auth::handlers::logout::logout,
        // SSO
        porter_api_saml::handlers::acs,
        porter_api_saml::handlers::iframe,
        porter_api_saml::handlers::slo,
        porter_api_saml::handlers::logout,
        porter_api_saml::handlers::metadata,
    )
)]
pub struct ApiDoc;

/// Swagger UI at `/docs`, backed by the generated spec.
pub fn swagger_routes() -> Router {
    Router::new().merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_generation() {
        let doc = ApiDoc::openapi();
        let json = doc.to_json().expect("Should serialize to JSON");
        assert!(json.contains("Porter Console Gateway"));
    }

    #[test]
    fn test_openapi_paths_registered() {
        let doc = ApiDoc::openapi();
        let paths = &doc.paths.paths;
        assert!(paths.contains_key("/auth"));
        assert!(paths.contains_key("/auth/sso"));
        assert!(paths.contains_key("/get/session-info"));
        assert!(paths.contains_key("/command/{path}"));
        assert!(paths.contains_key("/logout"));
        assert!(paths.contains_key("/saml/"));
        assert!(paths.contains_key("/saml/iframe"));
        assert!(paths.contains_key("/saml/slo"));
        assert!(paths.contains_key("/saml/logout"));
        assert!(paths.contains_key("/saml/metadata"));
    }
}
