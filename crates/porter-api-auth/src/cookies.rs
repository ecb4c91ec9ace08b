//! Session cookie contract
//!
//! Two cookies identify a console session: `PorterSessionId` carries the
//! session identifier and `PorterUsername` lets the frontend display the
//! logged-in user without a round trip. When the Host header names an
//! explicit port the cookie names are suffixed with it, so consoles on
//! different ports of the same host don't clobber each other.
//!
//! Neither cookie is HttpOnly: the frontend reads both.

use axum::http::header::{HeaderMap, HeaderValue, COOKIE, SET_COOKIE};
use chrono::{Duration, Utc};
use porter_core::SessionId;

pub const SESSION_COOKIE: &str = "PorterSessionId";
pub const USERNAME_COOKIE: &str = "PorterUsername";

/// Clearing expiry, predating every live session.
const EPOCH_EXPIRES: &str = "Thu, 01 Jan 1970 00:00:00 GMT";

const COOKIE_LIFETIME_DAYS: i64 = 5 * 365;

/// Appends the port of `host` to a cookie name, when one is present and
/// numeric.
pub fn suffixed_cookie_name(name: &str, host: Option<&str>) -> String {
    let port = host
        .and_then(|h| h.rsplit_once(':'))
        .map(|(_, port)| port)
        .filter(|port| port.parse::<u16>().is_ok());
    match port {
        Some(port) => format!("{name}-{port}"),
        None => name.to_string(),
    }
}

/// Reads a cookie, preferring the host-port-suffixed name over the plain
/// one.
pub fn read_cookie(headers: &HeaderMap, name: &str, host: Option<&str>) -> Option<String> {
    let suffixed = suffixed_cookie_name(name, host);
    find_cookie(headers, &suffixed).or_else(|| find_cookie(headers, name))
}

fn find_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    for header in headers.get_all(COOKIE) {
        let Ok(value) = header.to_str() else {
            continue;
        };
        for pair in value.split(';') {
            if let Some((key, val)) = pair.split_once('=') {
                if key.trim() == name {
                    return Some(val.trim().to_string());
                }
            }
        }
    }
    None
}

fn format_cookie(name: &str, value: &str, path: &str, expires: &str) -> String {
    format!("{name}={value}; Path={path}; Expires={expires}; SameSite=Strict")
}

fn long_lived_expires() -> String {
    (Utc::now() + Duration::days(COOKIE_LIFETIME_DAYS))
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}

/// Set-Cookie values establishing a session.
pub fn session_cookies(
    id: &SessionId,
    username: &str,
    path: &str,
    host: Option<&str>,
) -> [String; 2] {
    let expires = long_lived_expires();
    [
        format_cookie(
            &suffixed_cookie_name(SESSION_COOKIE, host),
            id.as_str(),
            path,
            &expires,
        ),
        format_cookie(
            &suffixed_cookie_name(USERNAME_COOKIE, host),
            username,
            path,
            &expires,
        ),
    ]
}

/// Set-Cookie values clearing both session cookies.
pub fn clearing_cookies(path: &str, host: Option<&str>) -> [String; 2] {
    [
        format_cookie(
            &suffixed_cookie_name(SESSION_COOKIE, host),
            "",
            path,
            EPOCH_EXPIRES,
        ),
        format_cookie(
            &suffixed_cookie_name(USERNAME_COOKIE, host),
            "",
            path,
            EPOCH_EXPIRES,
        ),
    ]
}

/// Appends Set-Cookie headers; values that don't form a valid header are
/// dropped.
pub fn append(headers: &mut HeaderMap, cookies: impl IntoIterator<Item = String>) {
    for cookie in cookies {
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            headers.append(SET_COOKIE, value);
        }
    }
}
