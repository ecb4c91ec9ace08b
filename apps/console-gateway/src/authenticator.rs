//! Config-backed authentication backend.

use crate::config::UserEntry;
use async_trait::async_trait;
use porter_session::{Authenticator, Unauthenticated, VerifiedUser};
use std::collections::HashMap;
use tracing::debug;

/// Verifies credentials against the accounts listed in the config file.
///
/// A stand-in for a real backend (PAM, LDAP); deployments fronting a
/// command processor plug their own [`Authenticator`] into the gateway.
pub struct ConfigAuthenticator {
    users: HashMap<String, String>,
}

impl ConfigAuthenticator {
    pub fn new(entries: &[UserEntry]) -> Self {
        Self {
            users: entries
                .iter()
                .map(|e| (e.username.clone(), e.password.clone()))
                .collect(),
        }
    }
}

#[async_trait]
impl Authenticator for ConfigAuthenticator {
    async fn verify(
        &self,
        username: &str,
        password: &str,
    ) -> Result<VerifiedUser, Unauthenticated> {
        match self.users.get(username) {
            Some(expected) if expected == password => Ok(VerifiedUser {
                username: username.to_string(),
            }),
            _ => {
                debug!(username = %username, "credential verification failed");
                Err(Unauthenticated)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> ConfigAuthenticator {
        ConfigAuthenticator::new(&[UserEntry {
            username: "admin".into(),
            password: "hunter2".into(),
        }])
    }

    #[tokio::test]
    async fn test_accepts_configured_credentials() {
        let verified = backend().verify("admin", "hunter2").await.unwrap();
        assert_eq!(verified.username, "admin");
    }

    #[tokio::test]
    async fn test_rejects_wrong_password_and_unknown_user() {
        assert!(backend().verify("admin", "wrong").await.is_err());
        assert!(backend().verify("nobody", "hunter2").await.is_err());
    }
}
