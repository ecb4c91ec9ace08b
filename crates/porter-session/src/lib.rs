//! Porter Session Library
//!
//! The in-process session layer of the console gateway: the session data
//! model, the process-wide registry, request-identity derivation, the
//! periodic expiry sweeper and the authentication gateway that front-ends
//! build on.
//!
//! # Modules
//!
//! - [`session`] - Session, FederatedIdentity and the cancellable expiry timer
//! - [`registry`] - Shared registry keyed by [`porter_core::SessionId`]
//! - [`identity`] - Deriving a session identifier from request material
//! - [`sweeper`] - Background task reaping idle sessions
//! - [`gateway`] - Credential login, resumption and SSO upgrade

pub mod gateway;
pub mod identity;
pub mod registry;
pub mod session;
pub mod sweeper;

pub use gateway::{Authenticator, AuthenticationGateway, Unauthenticated, VerifiedUser};
pub use identity::{IdentitySalt, RequestIdentity};
pub use registry::{FederatedLogout, ReleaseError, SessionRegistry};
pub use session::{ExpiryTimer, FederatedIdentity, Session};
pub use sweeper::{ExpirySweeper, LivenessOracle, NoOutstandingWork};
