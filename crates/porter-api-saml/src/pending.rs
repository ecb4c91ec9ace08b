//! Outstanding authentication exchanges
//!
//! Every authentication request this service provider sends is recorded
//! under its correlation id until the matching response arrives. An
//! entry is consumed exactly once; a response whose correlation id is no
//! longer (or never was) outstanding is unsolicited.
//!
//! Entries for exchanges that never see a response are not reaped. The
//! table grows with abandoned logins until the process restarts; the
//! entries are two short strings each.

use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Debug, Default)]
pub struct PendingExchanges {
    inner: RwLock<HashMap<String, String>>,
}

impl PendingExchanges {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `correlation_id` as outstanding for `service_url`.
    pub fn insert(&self, correlation_id: impl Into<String>, service_url: impl Into<String>) {
        self.inner
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(correlation_id.into(), service_url.into());
    }

    /// Consumes an entry. `None` when the id is not outstanding.
    pub fn take(&self, correlation_id: &str) -> Option<String> {
        self.inner
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(correlation_id)
    }

    /// Copy of the table, handed to the protocol collaborator for
    /// response validation.
    pub fn snapshot(&self) -> HashMap<String, String> {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consumed_exactly_once() {
        let pending = PendingExchanges::new();
        pending.insert("corr-1", "https://sp.example/saml/");

        assert!(pending.snapshot().contains_key("corr-1"));
        assert_eq!(pending.take("corr-1").as_deref(), Some("https://sp.example/saml/"));
        // Second consumption finds nothing.
        assert!(pending.take("corr-1").is_none());
        assert!(pending.is_empty());
    }

    #[test]
    fn test_unanswered_entries_stay() {
        let pending = PendingExchanges::new();
        pending.insert("corr-1", "u1");
        pending.insert("corr-2", "u2");
        pending.take("corr-1");
        assert_eq!(pending.len(), 1);
        assert!(pending.snapshot().contains_key("corr-2"));
    }
}
