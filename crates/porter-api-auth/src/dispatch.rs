//! Command dispatcher seam
//!
//! The gateway does not process console commands itself; it resolves the
//! session, stages any uploads and hands the request to a
//! [`CommandDispatcher`]. Deployments plug in a dispatcher that forwards
//! to the backend command processor.

use async_trait::async_trait;
use porter_core::RequestId;
use porter_session::Session;
use serde_json::Value;
use std::path::PathBuf;
use thiserror::Error;

/// One file staged for an upload command.
#[derive(Debug, Clone)]
pub struct StagedUpload {
    /// Form field name the file arrived under.
    pub name: String,
    /// Sanitized client filename.
    pub filename: String,
    pub content_type: Option<String>,
    /// Location of the staged bytes; valid only until the request's
    /// staging record is cleaned up.
    pub path: PathBuf,
    pub size: u64,
}

/// A command or upload request bound for the backend.
#[derive(Debug)]
pub struct CommandRequest {
    pub id: RequestId,
    /// Command path, e.g. `udm/query`.
    pub path: String,
    pub options: Value,
    pub flavor: Option<String>,
    pub uploads: Vec<StagedUpload>,
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("command failed: {0}")]
    Failed(String),
    #[error("the backend is unavailable: {0}")]
    Unavailable(String),
}

/// Forwards console commands to the backend.
#[async_trait]
pub trait CommandDispatcher: Send + Sync {
    async fn dispatch(
        &self,
        session: &Session,
        request: CommandRequest,
    ) -> Result<Value, DispatchError>;
}
