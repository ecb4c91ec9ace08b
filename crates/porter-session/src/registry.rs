//! Process-wide session registry
//!
//! A shared map from [`SessionId`] to [`Session`]. Operations never fail;
//! absence is `None`. The map is guarded by a `std::sync::RwLock` and no
//! I/O happens under the lock: the federated-logout hook runs after the
//! critical section.

use crate::session::{FederatedIdentity, Session};
use chrono::{Duration, Utc};
use porter_core::SessionId;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Error reported by a [`FederatedLogout`] hook.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ReleaseError(pub String);

/// Releases provider-held logout state for a subject.
///
/// Wired to the SSO protocol collaborator by the application; failures
/// are logged by the registry and never propagated.
pub trait FederatedLogout: Send + Sync {
    fn release(&self, name_id: &str) -> Result<(), ReleaseError>;
}

/// Shared registry of live sessions.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, Session>>,
    logout_hook: RwLock<Option<Arc<dyn FederatedLogout>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs the hook notified when a federated session is torn down.
    pub fn set_logout_hook(&self, hook: Arc<dyn FederatedLogout>) {
        *self.logout_hook.write().unwrap_or_else(|e| e.into_inner()) = Some(hook);
    }

    /// Returns a snapshot of the session stored under `id`.
    pub fn get(&self, id: &SessionId) -> Option<Session> {
        self.sessions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned()
    }

    /// Inserts `session`, replacing any prior occupant of the identifier.
    ///
    /// The displaced occupant's timer is cancelled inside the critical
    /// section, so at most one armed timer exists per identifier at any
    /// instant; its federated teardown runs after the lock is released.
    /// Returns the displaced session, already torn down.
    pub fn put(&self, session: Session) -> Option<Session> {
        let id = session.id().clone();
        let displaced = {
            let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
            let old = sessions.insert(id.clone(), session);
            if let Some(old) = &old {
                old.timer().cancel();
            }
            old
        };
        if let Some(old) = &displaced {
            debug!(session_id = %id, "session replaced");
            self.notify_federated_logout(old);
        }
        displaced
    }

    /// Removes and returns the session stored under `id`.
    ///
    /// Teardown is caller-driven: invoke [`teardown`](Self::teardown) on
    /// the returned session once it is truly finished.
    pub fn remove(&self, id: &SessionId) -> Option<Session> {
        self.sessions
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(id)
    }

    /// Resets the expiry of the session stored under `id` and returns a
    /// snapshot of it.
    pub fn touch(&self, id: &SessionId, idle_timeout: Duration) -> Option<Session> {
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        let session = sessions.get_mut(id)?;
        session.touch(idle_timeout, Utc::now());
        Some(session.clone())
    }

    /// Applies `f` to the session stored under `id`, if present.
    pub fn with_mut<R>(&self, id: &SessionId, f: impl FnOnce(&mut Session) -> R) -> Option<R> {
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        sessions.get_mut(id).map(f)
    }

    /// Drops the federated metadata of the session stored under `id`.
    pub fn clear_federated(&self, id: &SessionId) -> Option<FederatedIdentity> {
        self.with_mut(id, Session::clear_federated).flatten()
    }

    /// Identifiers of all stored sessions.
    pub fn ids(&self) -> Vec<SessionId> {
        self.sessions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Finalizes a session that has been removed (or is being expired):
    /// cancels its timer and releases provider logout state best-effort.
    ///
    /// Returns `true` only for the call that actually performed the
    /// cancellation, so concurrent teardown paths cannot double-count an
    /// expiry or release provider state twice.
    pub fn teardown(&self, session: &Session) -> bool {
        if !session.timer().cancel() {
            return false;
        }
        info!(session_id = %session.id(), username = %session.username(), "session closed");
        self.notify_federated_logout(session);
        true
    }

    fn notify_federated_logout(&self, session: &Session) {
        // Any federated metadata triggers the release, even when a
        // password set later reclassified the session as local.
        let Some(federated) = session.federated() else {
            return;
        };
        let hook = self
            .logout_hook
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        let Some(hook) = hook else {
            return;
        };
        if let Err(error) = hook.release(&federated.name_id) {
            warn!(
                session_id = %session.id(),
                error = %error,
                "could not release provider logout state"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn session(id: &SessionId) -> Session {
        Session::new(
            id.clone(),
            "alice",
            Some("secret".into()),
            None,
            Duration::minutes(5),
        )
    }

    struct CountingHook(AtomicUsize);

    impl FederatedLogout for CountingHook {
        fn release(&self, _name_id: &str) -> Result<(), ReleaseError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_put_get_remove() {
        let registry = SessionRegistry::new();
        let id = SessionId::random();
        assert!(registry.put(session(&id)).is_none());
        assert_eq!(registry.get(&id).unwrap().username(), "alice");
        assert!(registry.remove(&id).is_some());
        assert!(registry.get(&id).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_replacement_cancels_displaced_timer() {
        let registry = SessionRegistry::new();
        let id = SessionId::random();

        let mut displaced_timers = Vec::new();
        for _ in 0..1_000 {
            let next = session(&id);
            let timer = next.timer().clone();
            if let Some(old) = registry.put(next) {
                // put() already cancelled it; a second cancel must lose.
                assert!(!old.timer().cancel());
            }
            displaced_timers.push(timer);
        }

        // 1,000 insertions displaced 999 sessions; every displaced timer
        // is cancelled, only the final occupant's is still armed.
        let cancelled = displaced_timers
            .iter()
            .filter(|t| t.is_cancelled())
            .count();
        assert_eq!(cancelled, 999);
        assert!(!registry.get(&id).unwrap().timer().is_cancelled());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_replacement_releases_federated_state() {
        let registry = SessionRegistry::new();
        let hook = Arc::new(CountingHook(AtomicUsize::new(0)));
        registry.set_logout_hook(hook.clone());

        let id = SessionId::random();
        let mut federated = session(&id);
        federated.set_federated(FederatedIdentity::new("name-id", "msg", None));
        registry.put(federated);
        registry.put(session(&id));

        assert_eq!(hook.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_teardown_counts_once() {
        let registry = SessionRegistry::new();
        let id = SessionId::random();
        registry.put(session(&id));

        let removed = registry.remove(&id).unwrap();
        assert!(registry.teardown(&removed));
        assert!(!registry.teardown(&removed));
    }

    #[test]
    fn test_touch_resets_expiry() {
        let registry = SessionRegistry::new();
        let id = SessionId::random();
        registry.put(Session::new(
            id.clone(),
            "alice",
            Some("pw".into()),
            None,
            Duration::seconds(1),
        ));
        let before = registry.get(&id).unwrap().expires_at();
        let touched = registry.touch(&id, Duration::hours(1)).unwrap();
        assert!(touched.expires_at() > before);
    }

    #[test]
    fn test_clear_federated() {
        let registry = SessionRegistry::new();
        let id = SessionId::random();
        let mut s = session(&id);
        s.set_federated(FederatedIdentity::new("n", "m", None));
        registry.put(s);

        assert!(registry.clear_federated(&id).is_some());
        assert!(registry.get(&id).unwrap().federated().is_none());
        assert!(registry.clear_federated(&id).is_none());
    }
}
