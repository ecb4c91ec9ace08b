//! Request-identity extraction
//!
//! [`ClientInfo`] gathers everything session-identifier derivation needs
//! from an incoming request: the session cookie, the raw Authorization
//! and Accept-Language headers, the client address and the Host header.

use crate::cookies::{self, SESSION_COOKIE};
use async_trait::async_trait;
use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::header::{ACCEPT_LANGUAGE, AUTHORIZATION, HOST};
use axum::http::request::Parts;
use porter_session::RequestIdentity;
use std::convert::Infallible;
use std::net::SocketAddr;

const IFRAME_HEADER: &str = "x-iframe-response";

/// The identity-relevant parts of one request.
#[derive(Debug, Clone)]
pub struct ClientInfo {
    pub identity: RequestIdentity,
    /// Raw Host header, used to suffix cookie names.
    pub host: Option<String>,
    /// Whether the client asked for the iframe textarea envelope.
    pub iframe: bool,
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for ClientInfo {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Infallible> {
        let headers = &parts.headers;
        let host = headers
            .get(HOST)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let cookie = cookies::read_cookie(headers, SESSION_COOKIE, host.as_deref());
        let authorization = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let accept_language = headers
            .get(ACCEPT_LANGUAGE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        // The proxy in front of the gateway appends the real client to
        // X-Forwarded-For, so the last entry is authoritative.
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next_back())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        let client_addr = forwarded.unwrap_or_else(|| {
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
                .unwrap_or_else(|| "127.0.0.1".to_string())
        });

        let iframe = headers.contains_key(IFRAME_HEADER);

        Ok(Self {
            identity: RequestIdentity {
                cookie,
                authorization,
                accept_language,
                client_addr,
            },
            host,
            iframe,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(request: Request<()>) -> ClientInfo {
        let (mut parts, ()) = request.into_parts();
        ClientInfo::from_request_parts(&mut parts, &()).await.unwrap()
    }

    #[tokio::test]
    async fn test_gathers_headers_and_cookie() {
        let request = Request::builder()
            .header("Host", "console.example:8443")
            .header("Cookie", "PorterSessionId-8443=sid-1")
            .header("Authorization", "Basic abc")
            .header("Accept-Language", "de-DE")
            .body(())
            .unwrap();
        let info = extract(request).await;
        assert_eq!(info.identity.cookie.as_deref(), Some("sid-1"));
        assert_eq!(info.identity.authorization.as_deref(), Some("Basic abc"));
        assert_eq!(info.identity.accept_language.as_deref(), Some("de-DE"));
        assert_eq!(info.host.as_deref(), Some("console.example:8443"));
        assert!(!info.iframe);
    }

    #[tokio::test]
    async fn test_last_forwarded_entry_wins() {
        let request = Request::builder()
            .header("X-Forwarded-For", "203.0.113.5, 10.0.0.2, 192.0.2.7")
            .body(())
            .unwrap();
        let info = extract(request).await;
        assert_eq!(info.identity.client_addr, "192.0.2.7");
    }

    #[tokio::test]
    async fn test_iframe_header_detected() {
        let request = Request::builder()
            .header("X-Iframe-Response", "true")
            .body(())
            .unwrap();
        assert!(extract(request).await.iframe);
    }
}
