//! HTTP basic authentication
//!
//! Script clients authenticate with an Authorization header instead of
//! the login form. The middleware establishes a session under the
//! credential-hash identifier before the handler runs, so a header-only
//! client gets a stable session without ever storing a cookie.

use crate::cookies;
use crate::error::AuthApiError;
use crate::extract::ClientInfo;
use crate::router::ConsoleState;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use porter_session::Session;
use tracing::debug;

/// Parsed basic-auth credentials.
#[derive(Debug, PartialEq, Eq)]
pub struct BasicCredentials {
    pub username: String,
    pub password: String,
}

/// Parses an Authorization header.
///
/// `Ok(None)` for non-Basic schemes (they are simply ignored); a header
/// that cannot be split into scheme and payload, or whose payload is not
/// base64 `user:password`, is a client error.
pub fn parse_authorization(header: &str) -> Result<Option<BasicCredentials>, AuthApiError> {
    let Some((scheme, payload)) = header.split_once(' ') else {
        return Err(AuthApiError::MalformedAuthorization);
    };
    if !scheme.eq_ignore_ascii_case("basic") {
        return Ok(None);
    }
    let decoded = BASE64
        .decode(payload.trim())
        .map_err(|_| AuthApiError::MalformedAuthorization)?;
    let decoded = String::from_utf8_lossy(&decoded).into_owned();
    let Some((username, password)) = decoded.split_once(':') else {
        return Err(AuthApiError::MalformedAuthorization);
    };
    Ok(Some(BasicCredentials {
        username: username.to_string(),
        password: password.to_string(),
    }))
}

/// Middleware establishing a session from an Authorization header.
///
/// Re-authentication is idempotent: when the request already names a
/// live session (by cookie or by credential hash) the header is left
/// alone. A freshly established session also sets the session cookies on
/// the response.
pub async fn basic_auth(
    State(state): State<ConsoleState>,
    client: ClientInfo,
    request: Request,
    next: Next,
) -> Response {
    let established = match pre_authenticate(&state, &client).await {
        Ok(established) => established,
        Err(error) => return error.into_response(),
    };

    let mut response = next.run(request).await;
    if let Some(session) = established {
        cookies::append(
            response.headers_mut(),
            cookies::session_cookies(
                session.id(),
                session.username(),
                &state.cookie_path,
                client.host.as_deref(),
            ),
        );
    }
    response
}

async fn pre_authenticate(
    state: &ConsoleState,
    client: &ClientInfo,
) -> Result<Option<Session>, AuthApiError> {
    let Some(header) = client.identity.authorization.as_deref() else {
        return Ok(None);
    };

    let gateway = &state.gateway;
    let claimed = gateway.claimed_id(&client.identity);
    let hashed = client.identity.credential_hash(gateway.salt());
    if gateway.resume(&claimed).is_some() || gateway.resume(&hashed).is_some() {
        // Already authenticated; never churn the session identifier.
        return Ok(None);
    }

    let Some(credentials) = parse_authorization(header)? else {
        return Ok(None);
    };

    debug!(session_id = %hashed, "establishing session from Authorization header");
    let session = gateway
        .authenticate(hashed, &credentials.username, &credentials.password)
        .await
        .map_err(|_| AuthApiError::Unauthenticated)?;
    Ok(Some(session))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_basic() {
        // alice:secret
        let parsed = parse_authorization("Basic YWxpY2U6c2VjcmV0").unwrap().unwrap();
        assert_eq!(parsed.username, "alice");
        assert_eq!(parsed.password, "secret");
    }

    #[test]
    fn test_scheme_is_case_insensitive() {
        assert!(parse_authorization("basic YWxpY2U6c2VjcmV0").unwrap().is_some());
        assert!(parse_authorization("BASIC YWxpY2U6c2VjcmV0").unwrap().is_some());
    }

    #[test]
    fn test_non_basic_schemes_are_ignored() {
        assert!(parse_authorization("Bearer abc.def.ghi").unwrap().is_none());
        assert!(parse_authorization("Negotiate blob").unwrap().is_none());
    }

    #[test]
    fn test_malformed_headers_are_client_errors() {
        // No scheme/payload split.
        assert!(parse_authorization("Basic").is_err());
        // Payload is not base64.
        assert!(parse_authorization("Basic !!!").is_err());
        // Decodes but has no colon.
        let no_colon = BASE64.encode("alicesecret");
        assert!(parse_authorization(&format!("Basic {no_colon}")).is_err());
    }

    #[test]
    fn test_password_may_contain_colons() {
        let payload = BASE64.encode("alice:se:cr:et");
        let parsed = parse_authorization(&format!("Basic {payload}")).unwrap().unwrap();
        assert_eq!(parsed.password, "se:cr:et");
    }
}
