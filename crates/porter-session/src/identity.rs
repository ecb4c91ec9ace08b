//! Session identifier derivation
//!
//! A request names its session in one of three ways, tried in order:
//! a session cookie (taken verbatim), a hash over the credential-bearing
//! request material, or a freshly minted random identifier. The hash path
//! gives header-authenticated clients (scripts using HTTP basic auth) a
//! stable identifier without cookie support.

use porter_core::SessionId;
use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use rand::Rng;
use sha2::{Digest, Sha256};

/// Length of a derived identifier, matching a UUID's textual form.
const DERIVED_ID_LEN: usize = 36;

/// Process-wide random salt mixed into credential hashing.
///
/// Fixed at startup so derivation is stable for the lifetime of the
/// process; a restart invalidates all derived identifiers.
#[derive(Debug, Clone)]
pub struct IdentitySalt(String);

impl IdentitySalt {
    /// Generates a fresh salt from the OS random source.
    pub fn generate() -> Self {
        let salt: String = (0..32).map(|_| OsRng.sample(Alphanumeric) as char).collect();
        Self(salt)
    }

    /// Wraps a fixed salt value. Intended for tests that need stable
    /// derivation across gateway instances.
    pub fn from_value(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The request material a session identifier is derived from.
#[derive(Debug, Clone, Default)]
pub struct RequestIdentity {
    /// Session cookie value, verbatim.
    pub cookie: Option<String>,
    /// Raw Authorization header.
    pub authorization: Option<String>,
    /// Raw Accept-Language header.
    pub accept_language: Option<String>,
    /// Client address: the last X-Forwarded-For entry when present,
    /// otherwise the peer socket address.
    pub client_addr: String,
}

impl RequestIdentity {
    /// Hash of the credential-bearing request material, truncated to the
    /// length of a UUID. Deterministic for fixed inputs and salt.
    pub fn credential_hash(&self, salt: &IdentitySalt) -> SessionId {
        let mut hasher = Sha256::new();
        hasher.update(self.authorization.as_deref().unwrap_or_default());
        hasher.update(self.accept_language.as_deref().unwrap_or_default());
        hasher.update(&self.client_addr);
        hasher.update(salt.as_str());
        let digest = hex::encode(hasher.finalize());
        SessionId::from_raw(&digest[..DERIVED_ID_LEN])
    }

    /// The identifier this request claims: the cookie when present,
    /// otherwise the credential hash.
    pub fn claimed_id(&self, salt: &IdentitySalt) -> SessionId {
        match &self.cookie {
            Some(cookie) => SessionId::from_raw(cookie),
            None => self.credential_hash(salt),
        }
    }

    /// The cookie-claimed identifier alone, when a cookie was sent.
    pub fn cookie_id(&self) -> Option<SessionId> {
        self.cookie.as_deref().map(SessionId::from_raw)
    }
}
