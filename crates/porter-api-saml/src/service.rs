//! SSO state machine
//!
//! [`SsoService`] owns the protocol collaborator, the outstanding-
//! exchange table and the provider-selection rules, and drives session
//! upgrades through the authentication gateway.

use crate::error::SsoError;
use crate::pending::PendingExchanges;
use crate::provider::{Binding, GlobalLogoutError, LogoutKind, ProtocolClient, Transport};
use porter_core::SessionId;
use porter_session::registry::{FederatedLogout, ReleaseError};
use porter_session::{AuthenticationGateway, FederatedIdentity, Session};
use std::sync::{Arc, RwLock};
use tracing::{info, warn};

/// Builds (or rebuilds) the protocol collaborator from configuration.
pub type ProviderFactory =
    Box<dyn Fn() -> Result<Arc<dyn ProtocolClient>, String> + Send + Sync>;

#[derive(Debug, Clone)]
pub struct SsoConfig {
    /// Query parameter disambiguating between identity providers.
    pub idp_query_param: String,
    /// Assertion consumer service URL of this service provider.
    pub acs_url: String,
    /// Default redirect target after a successful sign-on.
    pub default_target: String,
    /// Local logout route completing provider-driven logouts.
    pub logout_landing: String,
}

impl Default for SsoConfig {
    fn default() -> Self {
        Self {
            idp_query_param: "idp".into(),
            acs_url: "/saml/".into(),
            default_target: "/console/manage/".into(),
            logout_landing: "/logout".into(),
        }
    }
}

pub struct SsoService {
    gateway: Arc<AuthenticationGateway>,
    provider: RwLock<Option<Arc<dyn ProtocolClient>>>,
    factory: ProviderFactory,
    pending: PendingExchanges,
    config: SsoConfig,
}

impl SsoService {
    /// Creates the service, attempting an initial provider construction.
    ///
    /// Construction failure is not fatal: the failure is cached and every
    /// SSO operation reports the service as unavailable until
    /// [`reload`](Self::reload) succeeds.
    pub fn new(
        gateway: Arc<AuthenticationGateway>,
        factory: ProviderFactory,
        config: SsoConfig,
    ) -> Arc<Self> {
        let service = Arc::new(Self {
            gateway,
            provider: RwLock::new(None),
            factory,
            pending: PendingExchanges::new(),
            config,
        });
        service.reload();
        service
    }

    /// Creates the service around an already-built collaborator.
    pub fn with_provider(
        gateway: Arc<AuthenticationGateway>,
        provider: Arc<dyn ProtocolClient>,
        config: SsoConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            gateway,
            provider: RwLock::new(Some(provider)),
            factory: Box::new(|| Err("no provider factory configured".into())),
            pending: PendingExchanges::new(),
            config,
        })
    }

    /// Rebuilds the protocol collaborator. Returns whether it succeeded.
    pub fn reload(&self) -> bool {
        info!("reloading single sign-on provider configuration");
        match (self.factory)() {
            Ok(provider) => {
                *self.provider.write().unwrap_or_else(|e| e.into_inner()) = Some(provider);
                true
            }
            Err(error) => {
                warn!(error = %error, "single sign-on provider could not be constructed");
                *self.provider.write().unwrap_or_else(|e| e.into_inner()) = None;
                false
            }
        }
    }

    fn provider(&self) -> Result<Arc<dyn ProtocolClient>, SsoError> {
        if let Some(provider) = self
            .provider
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
        {
            return Ok(provider);
        }
        // One retry, mirroring the lazily-reloading provider property.
        if self.reload() {
            if let Some(provider) = self
                .provider
                .read()
                .unwrap_or_else(|e| e.into_inner())
                .clone()
            {
                return Ok(provider);
            }
        }
        Err(SsoError::ProviderUnavailable)
    }

    pub fn config(&self) -> &SsoConfig {
        &self.config
    }

    pub fn pending(&self) -> &PendingExchanges {
        &self.pending
    }

    /// A registry teardown hook releasing provider state through this
    /// service's collaborator.
    pub fn logout_hook(self: &Arc<Self>) -> Arc<dyn FederatedLogout> {
        Arc::new(ProviderLogoutHook(Arc::clone(self)))
    }

    /// Picks the identity provider for a sign-on.
    ///
    /// A requested entity id wins when it is actually configured. With
    /// exactly one provider the choice is implicit; zero or several
    /// without disambiguation are errors naming the way out.
    pub fn select_identity_provider(&self, requested: Option<&str>) -> Result<String, SsoError> {
        let provider = self.provider()?;
        let candidates = provider.identity_providers();
        if let Some(requested) = requested {
            if candidates.iter().any(|c| c == requested) {
                return Ok(requested.to_string());
            }
        }
        match candidates.len() {
            1 => Ok(candidates.into_iter().next().unwrap_or_default()),
            0 => Err(SsoError::NoIdentityProvider),
            _ => Err(SsoError::AmbiguousIdentityProvider {
                candidates,
                query_param: self.config.idp_query_param.clone(),
            }),
        }
    }

    /// Starts a sign-on: builds the authentication request and records
    /// the exchange as outstanding.
    pub fn initiate(
        &self,
        requested_idp: Option<&str>,
        passive: bool,
        relay_state: Option<&str>,
    ) -> Result<Transport, SsoError> {
        let provider = self.provider()?;
        let idp = self.select_identity_provider(requested_idp)?;
        let (correlation_id, transport) =
            provider.create_authn_request(&idp, &self.config.acs_url, passive, relay_state)?;
        info!(idp = %idp, correlation_id = %correlation_id, passive, "authentication request created");
        self.pending.insert(correlation_id, self.config.acs_url.clone());
        Ok(transport)
    }

    /// Consumes an authentication response and upgrades the session
    /// stored under `session_id`.
    pub async fn consume(
        &self,
        message: &str,
        binding: Binding,
        session_id: SessionId,
    ) -> Result<Session, SsoError> {
        let provider = self.provider()?;
        let outstanding = self.pending.snapshot();
        let assertion = provider
            .parse_authn_response(message, binding, &outstanding)
            .await?;
        if let Some(correlation_id) = &assertion.in_response_to {
            self.pending.take(correlation_id);
        }
        let federated =
            FederatedIdentity::new(&assertion.name_id, message, assertion.not_on_or_after);
        Ok(self.gateway.upgrade_with_federated_identity(
            session_id,
            &assertion.username,
            federated,
        ))
    }

    pub async fn resolve_artifact(&self, artifact: &str) -> Result<String, SsoError> {
        Ok(self.provider()?.resolve_artifact(artifact).await?)
    }

    pub fn classify_logout_message(&self, message: &str) -> Result<LogoutKind, SsoError> {
        Ok(self.provider()?.classify_logout_message(message))
    }

    /// Answers a provider-initiated logout request.
    ///
    /// The local session's federated identity is dropped; a session that
    /// is already gone still gets a response, built for a null identity.
    pub async fn handle_logout_request(
        &self,
        message: &str,
        binding: Binding,
        relay_state: Option<&str>,
        claimed: &SessionId,
    ) -> Result<Transport, SsoError> {
        let provider = self.provider()?;
        let name_id = self
            .gateway
            .resume(claimed)
            .and_then(|session| session.federated().map(|f| f.name_id.clone()));
        if name_id.is_some() {
            self.gateway.registry().clear_federated(claimed);
        }
        info!(known_session = name_id.is_some(), "answering provider logout request");
        Ok(provider
            .handle_logout_request(message, name_id.as_deref(), binding, relay_state)
            .await?)
    }

    /// Completes a logout this service provider started.
    pub async fn finish_logout(&self, message: &str, binding: Binding) -> Result<(), SsoError> {
        Ok(self.provider()?.finish_logout(message, binding).await?)
    }

    /// Fans logout out to the providers holding a session for the user.
    ///
    /// `Ok(None)` means there is nothing (left) to do at any provider: no
    /// local federated session, every provider already done, or the
    /// principal is unknown provider-side (treated as already logged
    /// out). `Ok(Some(_))` carries the browser leg of the logout.
    pub async fn global_logout(&self, claimed: &SessionId) -> Result<Option<Transport>, SsoError> {
        let Some(session) = self.gateway.resume(claimed) else {
            return Ok(None);
        };
        let Some(name_id) = session.federated().map(|f| f.name_id.clone()) else {
            return Ok(None);
        };
        let provider = self.provider()?;

        match provider.global_logout(&name_id).await {
            Ok(directives) => {
                for directive in directives {
                    match directive.binding {
                        Binding::Redirect | Binding::Post => {
                            info!(entity_id = %directive.entity_id, "starting provider logout");
                            return Ok(Some(directive.transport));
                        }
                        other => {
                            return Err(SsoError::UnknownLogoutBinding(other.to_string()));
                        }
                    }
                }
                Ok(None)
            }
            Err(GlobalLogoutError::UnknownPrincipal) => {
                // Provider restart or an already-finished logout; count
                // the session as logged out provider-side.
                info!("principal unknown to the identity provider, finishing locally");
                self.gateway.registry().clear_federated(claimed);
                Ok(None)
            }
            Err(GlobalLogoutError::Provider(error)) => Err(SsoError::Internal(error)),
        }
    }

    /// Drops the federated identity of the session stored under
    /// `claimed`, ending a provider-driven logout locally.
    pub fn finish_local(&self, claimed: &SessionId) {
        self.gateway.registry().clear_federated(claimed);
    }

    pub fn metadata(&self) -> Result<String, SsoError> {
        Ok(self.provider()?.metadata_document()?)
    }
}

struct ProviderLogoutHook(Arc<SsoService>);

impl FederatedLogout for ProviderLogoutHook {
    fn release(&self, name_id: &str) -> Result<(), ReleaseError> {
        let provider = self
            .0
            .provider()
            .map_err(|e| ReleaseError(e.to_string()))?;
        provider.release(name_id)
    }
}
