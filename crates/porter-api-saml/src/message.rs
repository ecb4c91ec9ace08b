//! Protocol message extraction
//!
//! A protocol message arrives in the query string (GET, Redirect
//! binding) or the form body (POST, Post binding), under one of three
//! parameters checked in order: `SAMLResponse`, `SAMLRequest`,
//! `SAMLart`. An artifact still has to be resolved through the
//! collaborator before it can be parsed.

use crate::provider::Binding;
use axum::http::Method;
use std::collections::HashMap;

/// Which protocol parameter carried the message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolParam {
    Response(String),
    Request(String),
    Artifact(String),
}

#[derive(Debug, Clone)]
pub struct ExtractedMessage {
    /// Binding implied by the HTTP method. Artifact messages switch to
    /// [`Binding::Artifact`] after resolution.
    pub binding: Binding,
    pub param: Option<ProtocolParam>,
    pub relay_state: Option<String>,
}

/// Extracts the protocol message from the request parameters.
pub fn extract_message(method: &Method, params: &HashMap<String, String>) -> ExtractedMessage {
    let binding = if method == Method::POST {
        Binding::Post
    } else {
        Binding::Redirect
    };
    let relay_state = params.get("RelayState").cloned().filter(|v| !v.is_empty());

    let param = if let Some(message) = params.get("SAMLResponse") {
        Some(ProtocolParam::Response(message.clone()))
    } else if let Some(message) = params.get("SAMLRequest") {
        Some(ProtocolParam::Request(message.clone()))
    } else {
        params
            .get("SAMLart")
            .map(|artifact| ProtocolParam::Artifact(artifact.clone()))
    };

    ExtractedMessage {
        binding,
        param,
        relay_state,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_binding_follows_method() {
        let extracted = extract_message(&Method::GET, &params(&[("SAMLResponse", "m")]));
        assert_eq!(extracted.binding, Binding::Redirect);
        let extracted = extract_message(&Method::POST, &params(&[("SAMLResponse", "m")]));
        assert_eq!(extracted.binding, Binding::Post);
    }

    #[test]
    fn test_parameter_precedence() {
        let all = params(&[("SAMLResponse", "r"), ("SAMLRequest", "q"), ("SAMLart", "a")]);
        assert_eq!(
            extract_message(&Method::GET, &all).param,
            Some(ProtocolParam::Response("r".into()))
        );

        let two = params(&[("SAMLRequest", "q"), ("SAMLart", "a")]);
        assert_eq!(
            extract_message(&Method::GET, &two).param,
            Some(ProtocolParam::Request("q".into()))
        );

        let one = params(&[("SAMLart", "a")]);
        assert_eq!(
            extract_message(&Method::GET, &one).param,
            Some(ProtocolParam::Artifact("a".into()))
        );
    }

    #[test]
    fn test_no_message_is_none() {
        let extracted = extract_message(&Method::GET, &params(&[("location", "/x")]));
        assert!(extracted.param.is_none());
    }

    #[test]
    fn test_relay_state_carried() {
        let extracted = extract_message(
            &Method::POST,
            &params(&[("SAMLResponse", "m"), ("RelayState", "/console/")]),
        );
        assert_eq!(extracted.relay_state.as_deref(), Some("/console/"));
    }
}
