//! Session data model
//!
//! A [`Session`] is the in-memory record of one authenticated console
//! user. It carries the credential material needed to act on the user's
//! behalf towards the backend, optional federated (SSO) metadata, and a
//! rolling idle deadline.

use chrono::{DateTime, Duration, Utc};
use porter_core::SessionId;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Identity material asserted by an external identity provider.
#[derive(Debug, Clone)]
pub struct FederatedIdentity {
    /// Encoded name identifier, the key under which the provider tracks
    /// logout state for this subject.
    pub name_id: String,
    /// The raw assertion message; stands in for a password towards
    /// backends that accept it as a credential.
    pub message: String,
    /// Expiry asserted by the provider, when it reported one.
    pub expires_at: Option<DateTime<Utc>>,
}

impl FederatedIdentity {
    pub fn new(
        name_id: impl Into<String>,
        message: impl Into<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            name_id: name_id.into(),
            message: message.into(),
            expires_at,
        }
    }
}

/// Handle used to disarm a session's scheduled expiry.
///
/// Cancellation is idempotent: [`cancel`](ExpiryTimer::cancel) returns
/// `true` for exactly one caller, no matter how often or from how many
/// threads it is invoked. Replacement and sweeping both funnel through
/// it, so a session is never expired twice.
#[derive(Debug, Clone, Default)]
pub struct ExpiryTimer {
    cancelled: Arc<AtomicBool>,
}

impl ExpiryTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Disarms the timer. Returns `true` only on the first call.
    pub fn cancel(&self) -> bool {
        !self.cancelled.swap(true, Ordering::SeqCst)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// One authenticated console session.
#[derive(Debug, Clone)]
pub struct Session {
    id: SessionId,
    username: String,
    password: Option<String>,
    federated: Option<FederatedIdentity>,
    idle_deadline: DateTime<Utc>,
    timer: ExpiryTimer,
}

impl Session {
    /// Creates a session whose idle deadline is `idle_timeout` from now.
    pub fn new(
        id: SessionId,
        username: impl Into<String>,
        password: Option<String>,
        federated: Option<FederatedIdentity>,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            id,
            username: username.into(),
            password,
            federated,
            idle_deadline: Utc::now() + idle_timeout,
            timer: ExpiryTimer::new(),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// The credential to present to the backend: the password when one is
    /// set, otherwise the federated assertion message.
    pub fn credential(&self) -> Option<&str> {
        self.password
            .as_deref()
            .or_else(|| self.federated.as_ref().map(|f| f.message.as_str()))
    }

    /// Federated metadata, if any, regardless of how the session is
    /// currently classified.
    pub fn federated(&self) -> Option<&FederatedIdentity> {
        self.federated.as_ref()
    }

    /// Whether logout must go through the identity provider.
    ///
    /// Only true while the session holds federated metadata and no
    /// password: setting a password after an SSO upgrade reclassifies the
    /// session as locally authenticated while the metadata is kept for
    /// backend single-logout.
    pub fn is_federated(&self) -> bool {
        self.password.is_none() && self.federated.is_some()
    }

    /// Label reported by session introspection, `"SAML"` for federated
    /// sessions.
    pub fn auth_type(&self) -> Option<&'static str> {
        if self.is_federated() {
            Some("SAML")
        } else {
            None
        }
    }

    pub fn set_password(&mut self, password: impl Into<String>) {
        self.password = Some(password.into());
    }

    pub fn set_federated(&mut self, federated: FederatedIdentity) {
        self.federated = Some(federated);
    }

    pub fn clear_federated(&mut self) -> Option<FederatedIdentity> {
        self.federated.take()
    }

    /// Effective expiry instant: the later of the rolling idle deadline
    /// and the provider-asserted expiry when one is present.
    pub fn expires_at(&self) -> DateTime<Utc> {
        match self.federated.as_ref().and_then(|f| f.expires_at) {
            Some(asserted) if asserted > self.idle_deadline => asserted,
            _ => self.idle_deadline,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at()
    }

    /// Seconds until expiry, clamped at zero.
    pub fn remaining_secs(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at() - now).num_seconds().max(0)
    }

    /// Pushes the idle deadline `idle_timeout` past `now`.
    pub fn touch(&mut self, idle_timeout: Duration, now: DateTime<Utc>) {
        self.idle_deadline = now + idle_timeout;
    }

    pub fn timer(&self) -> &ExpiryTimer {
        &self.timer
    }
}
