//! Porter Console API
//!
//! The credential-facing HTTP surface of the console gateway: login,
//! session introspection, logout, command forwarding and upload staging.
//!
//! # Modules
//!
//! - [`cookies`] - The session cookie contract
//! - [`extract`] - Request-identity extraction ([`extract::ClientInfo`])
//! - [`credential`] - HTTP basic authentication middleware
//! - [`dispatch`] - The backend command dispatcher seam
//! - [`staging`] - Temporary staging of multipart uploads
//! - [`handlers`] - Route handlers
//! - [`router`] - Router assembly

pub mod cookies;
pub mod credential;
pub mod dispatch;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod response;
pub mod router;
pub mod staging;

pub use dispatch::{CommandDispatcher, CommandRequest, DispatchError, StagedUpload};
pub use error::AuthApiError;
pub use extract::ClientInfo;
pub use router::{auth_router, not_found, ConsoleState};
pub use staging::{DiskProbe, StagingError, StatvfsProbe, UploadStaging};
