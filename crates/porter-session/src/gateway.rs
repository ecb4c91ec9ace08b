//! Authentication gateway
//!
//! The single entry point front-ends use to establish, resume, upgrade
//! and end sessions. Credential verification is delegated to the backend
//! through the [`Authenticator`] trait.

use crate::identity::{IdentitySalt, RequestIdentity};
use crate::registry::SessionRegistry;
use crate::session::{FederatedIdentity, Session};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use porter_core::SessionId;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Credential verification failed. Terminal: the gateway never retries.
#[derive(Debug, Error)]
#[error("the authentication has failed")]
pub struct Unauthenticated;

/// Identity confirmed by the authentication backend.
#[derive(Debug, Clone)]
pub struct VerifiedUser {
    /// Canonical username as the backend knows it.
    pub username: String,
}

/// Backend credential verification.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn verify(&self, username: &str, password: &str)
        -> Result<VerifiedUser, Unauthenticated>;
}

/// Establishes and resumes console sessions.
pub struct AuthenticationGateway {
    registry: Arc<SessionRegistry>,
    authenticator: Arc<dyn Authenticator>,
    salt: IdentitySalt,
    idle_timeout: Duration,
}

impl AuthenticationGateway {
    pub fn new(
        registry: Arc<SessionRegistry>,
        authenticator: Arc<dyn Authenticator>,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            authenticator,
            salt: IdentitySalt::generate(),
            idle_timeout,
        }
    }

    /// Like [`new`](Self::new) but with a caller-supplied salt, for tests
    /// needing stable identifier derivation.
    pub fn with_salt(
        registry: Arc<SessionRegistry>,
        authenticator: Arc<dyn Authenticator>,
        idle_timeout: Duration,
        salt: IdentitySalt,
    ) -> Self {
        Self {
            registry,
            authenticator,
            salt,
            idle_timeout,
        }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub fn salt(&self) -> &IdentitySalt {
        &self.salt
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// The identifier a request claims, per the derivation rules.
    pub fn claimed_id(&self, identity: &RequestIdentity) -> SessionId {
        identity.claimed_id(&self.salt)
    }

    /// Picks the identifier for a session about to be established.
    ///
    /// An identifier naming a live session is always reused, never
    /// regenerated; otherwise `random` selects between a fresh UUID and
    /// the deterministic credential hash.
    pub fn allocate_id(&self, identity: &RequestIdentity, random: bool) -> SessionId {
        let claimed = identity.claimed_id(&self.salt);
        if self.registry.get(&claimed).is_some() {
            return claimed;
        }
        if random {
            SessionId::random()
        } else {
            identity.credential_hash(&self.salt)
        }
    }

    /// Verifies `username`/`password` against the backend and stores a
    /// fresh session under `id`.
    ///
    /// A replacement under the same identifier inherits the prior
    /// occupant's federated identity, so re-authenticating with a
    /// password keeps single-logout working.
    pub async fn authenticate(
        &self,
        id: SessionId,
        username: &str,
        password: &str,
    ) -> Result<Session, Unauthenticated> {
        let verified = self.authenticator.verify(username, password).await?;
        let inherited = self
            .registry
            .get(&id)
            .and_then(|old| old.federated().cloned());
        let session = Session::new(
            id,
            verified.username,
            Some(password.to_string()),
            inherited,
            self.idle_timeout,
        );
        info!(session_id = %session.id(), username = %session.username(), "session established");
        self.registry.put(session.clone());
        Ok(session)
    }

    /// Resumes the session stored under `id`.
    ///
    /// An expired session is treated as absent and proactively removed.
    pub fn resume(&self, id: &SessionId) -> Option<Session> {
        let session = self.registry.get(id)?;
        if session.is_expired(Utc::now()) {
            debug!(session_id = %id, "resumption of expired session refused");
            if let Some(expired) = self.registry.remove(id) {
                self.registry.teardown(&expired);
            }
            return None;
        }
        Some(session)
    }

    /// Resumes and resets the expiry of the session stored under `id`.
    pub fn refresh(&self, id: &SessionId) -> Option<Session> {
        self.resume(id)?;
        self.registry.touch(id, self.idle_timeout)
    }

    /// Re-validates a federated session against the backend, presenting
    /// the stored assertion message as the credential.
    ///
    /// Returns `Ok(None)` when no live federated session exists under
    /// `id`; verification failure is surfaced so callers can distinguish
    /// a missing session from a provider/backend problem.
    pub async fn revalidate_federated(
        &self,
        id: &SessionId,
    ) -> Result<Option<Session>, Unauthenticated> {
        let Some(session) = self.resume(id) else {
            return Ok(None);
        };
        let Some(federated) = session.federated().cloned() else {
            return Ok(None);
        };
        let verified = self
            .authenticator
            .verify(session.username(), &federated.message)
            .await?;
        Ok(Some(self.upgrade_with_federated_identity(
            id.clone(),
            &verified.username,
            federated,
        )))
    }

    /// Stores a session established through an identity provider.
    pub fn upgrade_with_federated_identity(
        &self,
        id: SessionId,
        username: &str,
        federated: FederatedIdentity,
    ) -> Session {
        let session = Session::new(id, username, None, Some(federated), self.idle_timeout);
        info!(
            session_id = %session.id(),
            username = %session.username(),
            "session established via identity provider"
        );
        self.registry.put(session.clone());
        session
    }

    /// Ends the session stored under `id`, tearing it down.
    pub fn expire(&self, id: &SessionId) -> Option<Session> {
        let session = self.registry.remove(id)?;
        self.registry.teardown(&session);
        Some(session)
    }
}
