//! Porter SSO Library
//!
//! Service-provider side of single sign-on for the console gateway. The
//! protocol wire format lives entirely behind the [`ProtocolClient`]
//! trait; this crate owns the state machine around it: identity-provider
//! selection, the outstanding-exchange table, message extraction, and
//! the ACS / single-logout / passive-iframe / logout endpoints.
//!
//! # Modules
//!
//! - [`provider`] - The protocol collaborator seam
//! - [`pending`] - Outstanding authentication exchanges
//! - [`message`] - Extracting protocol messages from HTTP requests
//! - [`service`] - The SSO state machine ([`SsoService`])
//! - [`handlers`] / [`router`] - The HTTP surface

pub mod error;
pub mod handlers;
pub mod message;
pub mod pending;
pub mod provider;
pub mod router;
pub mod service;

pub use error::{ProtocolViolation, SsoError};
pub use handlers::SamlState;
pub use pending::PendingExchanges;
pub use provider::{
    Assertion, Binding, GlobalLogoutError, LogoutDirective, LogoutKind, ProtocolClient, Transport,
};
pub use router::saml_router;
pub use service::{SsoConfig, SsoService};
