//! Local command dispatcher.

use async_trait::async_trait;
use porter_api_auth::{CommandDispatcher, CommandRequest, DispatchError};
use porter_core::SessionId;
use porter_session::{LivenessOracle, Session};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::info;

/// Handles a small built-in command set in-process.
///
/// A stand-in for a dispatcher forwarding to the backend command
/// processor. Doubles as the sweeper's [`LivenessOracle`]: a session with
/// a dispatch still in flight is not reaped even when its idle deadline
/// has passed.
pub struct LocalDispatcher {
    in_flight: Mutex<HashMap<SessionId, usize>>,
}

impl LocalDispatcher {
    pub fn new() -> Self {
        Self {
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    fn begin(&self, id: &SessionId) -> InFlightGuard<'_> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        *in_flight.entry(id.clone()).or_insert(0) += 1;
        InFlightGuard {
            dispatcher: self,
            id: id.clone(),
        }
    }

    fn finish(&self, id: &SessionId) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(count) = in_flight.get_mut(id) {
            *count -= 1;
            if *count == 0 {
                in_flight.remove(id);
            }
        }
    }
}

impl Default for LocalDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

struct InFlightGuard<'a> {
    dispatcher: &'a LocalDispatcher,
    id: SessionId,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.dispatcher.finish(&self.id);
    }
}

#[async_trait]
impl CommandDispatcher for LocalDispatcher {
    async fn dispatch(
        &self,
        session: &Session,
        request: CommandRequest,
    ) -> Result<Value, DispatchError> {
        let _guard = self.begin(session.id());
        info!(
            request_id = %request.id,
            command = %request.path,
            username = %session.username(),
            "dispatching command"
        );

        match request.path.as_str() {
            "sysinfo/general" => Ok(json!({
                "gateway": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
            })),
            "echo" => Ok(request.options),
            "upload" => Ok(Value::Array(
                request
                    .uploads
                    .iter()
                    .map(|u| {
                        json!({
                            "name": u.name,
                            "filename": u.filename,
                            "size": u.size,
                        })
                    })
                    .collect(),
            )),
            other => Err(DispatchError::UnknownCommand(other.to_string())),
        }
    }
}

impl LivenessOracle for LocalDispatcher {
    fn has_outstanding_work(&self, id: &SessionId) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use porter_core::RequestId;

    fn session() -> Session {
        Session::new(
            SessionId::random(),
            "alice",
            Some("pw".into()),
            None,
            Duration::minutes(5),
        )
    }

    fn request(path: &str) -> CommandRequest {
        CommandRequest {
            id: RequestId::new(),
            path: path.to_string(),
            options: json!({"key": "value"}),
            flavor: None,
            uploads: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_echo_returns_options() {
        let dispatcher = LocalDispatcher::new();
        let result = dispatcher.dispatch(&session(), request("echo")).await.unwrap();
        assert_eq!(result, json!({"key": "value"}));
    }

    #[tokio::test]
    async fn test_unknown_command() {
        let dispatcher = LocalDispatcher::new();
        let err = dispatcher.dispatch(&session(), request("no/such")).await;
        assert!(matches!(err, Err(DispatchError::UnknownCommand(_))));
    }

    #[tokio::test]
    async fn test_in_flight_tracking_clears_after_dispatch() {
        let dispatcher = LocalDispatcher::new();
        let session = session();
        assert!(!dispatcher.has_outstanding_work(session.id()));

        let guard = dispatcher.begin(session.id());
        assert!(dispatcher.has_outstanding_work(session.id()));
        drop(guard);
        assert!(!dispatcher.has_outstanding_work(session.id()));

        // A completed dispatch leaves no residue either.
        dispatcher.dispatch(&session, request("echo")).await.unwrap();
        assert!(!dispatcher.has_outstanding_work(session.id()));
    }
}
