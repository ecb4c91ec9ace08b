//! Periodic expiry sweeper
//!
//! One background task walks the registry and reaps expired sessions,
//! instead of arming a timer per session. A session with outstanding
//! backend work is deferred and re-evaluated on the next pass.

use crate::registry::SessionRegistry;
use chrono::{DateTime, Utc};
use porter_core::SessionId;
use std::sync::Arc;
use tokio::time::MissedTickBehavior;
use tracing::debug;

/// Reports whether the backend still owes a session a response.
pub trait LivenessOracle: Send + Sync {
    fn has_outstanding_work(&self, id: &SessionId) -> bool;
}

/// Oracle for deployments without a request-tracking dispatcher.
pub struct NoOutstandingWork;

impl LivenessOracle for NoOutstandingWork {
    fn has_outstanding_work(&self, _id: &SessionId) -> bool {
        false
    }
}

/// Walks the registry on a fixed interval and removes expired sessions.
pub struct ExpirySweeper {
    registry: Arc<SessionRegistry>,
    oracle: Arc<dyn LivenessOracle>,
    interval: std::time::Duration,
}

impl ExpirySweeper {
    pub fn new(
        registry: Arc<SessionRegistry>,
        oracle: Arc<dyn LivenessOracle>,
        interval: std::time::Duration,
    ) -> Self {
        Self {
            registry,
            oracle,
            interval,
        }
    }

    /// One sweep pass. Returns how many sessions were expired.
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let mut expired = 0;
        for id in self.registry.ids() {
            let Some(session) = self.registry.get(&id) else {
                continue;
            };
            if !session.is_expired(now) {
                continue;
            }
            if self.oracle.has_outstanding_work(&id) {
                debug!(session_id = %id, "expiry deferred, backend work outstanding");
                continue;
            }
            let Some(removed) = self.registry.remove(&id) else {
                continue;
            };
            // teardown() is false when another path already cancelled the
            // timer; that occupant was expired elsewhere, don't count it.
            if self.registry.teardown(&removed) {
                expired += 1;
            }
        }
        expired
    }

    /// Runs forever, sweeping once per interval.
    pub async fn run(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            self.sweep(Utc::now());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;
    use chrono::Duration;
    use std::collections::HashSet;
    use std::sync::Mutex;

    fn expired_session(id: &SessionId) -> Session {
        Session::new(
            id.clone(),
            "alice",
            Some("pw".into()),
            None,
            Duration::seconds(-1),
        )
    }

    fn sweeper_with(
        registry: Arc<SessionRegistry>,
        oracle: Arc<dyn LivenessOracle>,
    ) -> ExpirySweeper {
        ExpirySweeper::new(registry, oracle, std::time::Duration::from_secs(1))
    }

    struct BusySessions(Mutex<HashSet<SessionId>>);

    impl LivenessOracle for BusySessions {
        fn has_outstanding_work(&self, id: &SessionId) -> bool {
            self.0.lock().unwrap().contains(id)
        }
    }

    #[test]
    fn test_sweep_removes_only_expired() {
        let registry = Arc::new(SessionRegistry::new());
        let live = SessionId::random();
        let stale = SessionId::random();
        registry.put(Session::new(
            live.clone(),
            "alice",
            Some("pw".into()),
            None,
            Duration::hours(1),
        ));
        registry.put(expired_session(&stale));

        let sweeper = sweeper_with(registry.clone(), Arc::new(NoOutstandingWork));
        assert_eq!(sweeper.sweep(Utc::now()), 1);
        assert!(registry.get(&live).is_some());
        assert!(registry.get(&stale).is_none());

        // Nothing left to reap.
        assert_eq!(sweeper.sweep(Utc::now()), 0);
    }

    #[test]
    fn test_sweep_defers_sessions_with_outstanding_work() {
        let registry = Arc::new(SessionRegistry::new());
        let id = SessionId::random();
        registry.put(expired_session(&id));

        let busy = Arc::new(BusySessions(Mutex::new(HashSet::from([id.clone()]))));
        let sweeper = sweeper_with(registry.clone(), busy.clone());

        assert_eq!(sweeper.sweep(Utc::now()), 0);
        assert!(registry.get(&id).is_some());

        // Backend work finished; the next pass reaps it.
        busy.0.lock().unwrap().clear();
        assert_eq!(sweeper.sweep(Utc::now()), 1);
        assert!(registry.get(&id).is_none());
    }

    #[test]
    fn test_no_duplicate_expirations_after_replacement_churn() {
        let registry = Arc::new(SessionRegistry::new());
        let id = SessionId::random();
        for _ in 0..1_000 {
            registry.put(expired_session(&id));
        }

        let sweeper = sweeper_with(registry.clone(), Arc::new(NoOutstandingWork));
        // Only the final occupant is reaped; the 999 displaced sessions
        // were already cancelled by replacement.
        assert_eq!(sweeper.sweep(Utc::now()), 1);
        assert_eq!(sweeper.sweep(Utc::now()), 0);
    }
}
