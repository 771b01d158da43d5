//! WebSocket message envelope.
//!
//! Frames are JSON objects discriminated by a `kind` field, in both
//! directions. Request ids are chosen by the server and echoed verbatim, so
//! they are kept as raw JSON.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::aspect::{AspectValue, Aspects};

/// Which key/value store a storage frame addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageArea {
    Session,
    Local,
}

impl StorageArea {
    /// `"session"` selects session storage, anything else (including no
    /// field at all) the persistent store.
    pub fn from_field(field: Option<&str>) -> Self {
        match field {
            Some("session") => StorageArea::Session,
            _ => StorageArea::Local,
        }
    }
}

/// `{identity, aspect}` pair naming one aspect of one component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AspectRef {
    pub identity: String,
    pub aspect: String,
}

impl AspectRef {
    pub fn new(identity: impl Into<String>, aspect: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            aspect: aspect.into(),
        }
    }

    /// The `"{identity}.{aspect}"` lookup key used by the binding table.
    pub fn binding_key(&self) -> String {
        binding_key(&self.identity, &self.aspect)
    }
}

pub fn binding_key(identity: &str, aspect: &str) -> String {
    format!("{}.{}", identity, aspect)
}

/// Server-declared rule pushing an aspect change back to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindingRule {
    pub key: String,
    pub trigger: AspectRef,
    #[serde(default)]
    pub states: Vec<AspectRef>,
}

/// An aspect reference with the value it held when a frame was built.
///
/// `value` is absent when the aspect (or its component) does not exist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundAspect {
    pub identity: String,
    pub aspect: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<AspectValue>,
}

impl BoundAspect {
    pub fn new(target: &AspectRef, value: Option<AspectValue>) -> Self {
        Self {
            identity: target.identity.clone(),
            aspect: target.aspect.clone(),
            value,
        }
    }
}

/// Frames pushed by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ServerMessage {
    SetAspect {
        identity: String,
        payload: Aspects,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        storage: Option<String>,
    },
    GetAspect {
        identity: String,
        aspect: String,
        request_id: Value,
    },
    SetStorage {
        identity: String,
        payload: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        storage: Option<String>,
    },
    GetStorage {
        identity: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        storage: Option<String>,
        request_id: Value,
    },
    Ping,
    /// Any kind this client does not know about.
    #[serde(other)]
    Unknown,
}

/// Frames sent by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ClientMessage {
    Binding {
        page: String,
        key: String,
        trigger: BoundAspect,
        states: Vec<BoundAspect>,
    },
    Error {
        error: String,
    },
    GetAspect {
        identity: String,
        aspect: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<AspectValue>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        request_id: Value,
    },
    GetStorage {
        identity: String,
        request_id: Value,
        value: Value,
    },
}

impl ClientMessage {
    pub fn component_not_found(identity: &str) -> Self {
        ClientMessage::Error {
            error: format!("Component not found: {}", identity),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_server_kinds() {
        let msg: ServerMessage = serde_json::from_value(json!({
            "kind": "set-aspect",
            "identity": "a",
            "payload": {"x": 1},
        }))
        .unwrap();
        assert!(matches!(msg, ServerMessage::SetAspect { ref identity, .. } if identity == "a"));

        let msg: ServerMessage = serde_json::from_value(json!({
            "kind": "get-storage",
            "identity": "k",
            "storage": "session",
            "request_id": "r",
        }))
        .unwrap();
        assert_eq!(
            msg,
            ServerMessage::GetStorage {
                identity: "k".into(),
                storage: Some("session".into()),
                request_id: json!("r"),
            }
        );

        let msg: ServerMessage = serde_json::from_value(json!({"kind": "ping"})).unwrap();
        assert_eq!(msg, ServerMessage::Ping);
    }

    #[test]
    fn unknown_kind_is_tolerated() {
        let msg: ServerMessage =
            serde_json::from_value(json!({"kind": "reload", "foo": 1})).unwrap();
        assert_eq!(msg, ServerMessage::Unknown);
    }

    #[test]
    fn binding_frame_shape() {
        let frame = ClientMessage::Binding {
            page: "home".into(),
            key: "r1".into(),
            trigger: BoundAspect::new(&AspectRef::new("a", "x"), Some(AspectValue::from(5_i64))),
            states: vec![BoundAspect::new(&AspectRef::new("b", "y"), None)],
        };
        assert_eq!(
            serde_json::to_value(&frame).unwrap(),
            json!({
                "kind": "binding",
                "page": "home",
                "key": "r1",
                "trigger": {"identity": "a", "aspect": "x", "value": 5},
                "states": [{"identity": "b", "aspect": "y"}],
            })
        );
    }

    #[test]
    fn get_aspect_error_reply_echoes_request() {
        let frame = ClientMessage::GetAspect {
            identity: "missing".into(),
            aspect: "value".into(),
            value: None,
            error: Some("Component not found: missing".into()),
            request_id: json!(42),
        };
        assert_eq!(
            serde_json::to_value(&frame).unwrap(),
            json!({
                "kind": "get-aspect",
                "identity": "missing",
                "aspect": "value",
                "error": "Component not found: missing",
                "request_id": 42,
            })
        );
    }

    #[test]
    fn storage_area_selection() {
        assert_eq!(StorageArea::from_field(Some("session")), StorageArea::Session);
        assert_eq!(StorageArea::from_field(Some("local")), StorageArea::Local);
        assert_eq!(StorageArea::from_field(None), StorageArea::Local);
    }
}
