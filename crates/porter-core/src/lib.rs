//! Porter Core Library
//!
//! Shared types for the Porter console gateway.
//!
//! # Modules
//!
//! - [`ids`] - Strongly typed identifiers (SessionId, RequestId)
//! - [`error`] - The JSON error envelope shared by all HTTP surfaces
//! - [`redirect`] - Sanitization of client-supplied redirect targets

pub mod error;
pub mod ids;
pub mod redirect;

// Re-export main types for convenient access
pub use error::ErrorBody;
pub use ids::{RequestId, SessionId};
pub use redirect::sanitize_redirect_target;
