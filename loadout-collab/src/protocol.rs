//! JSON wire protocol between clients, the relay, and the persistence
//! publisher.
//!
//! Two frame kinds travel over the socket as UTF-8 text:
//!
//! ```text
//! { "type": "joinRoom",   "roomKey": "…" }
//! { "type": "itemStream", "roomKey": "…", "event": { … } }
//! ```
//!
//! The `event` object is the change-event wire shape
//! (`{action, timestamp, …}`) and crosses the relay as opaque JSON:
//! classification happens at the consuming client, so one malformed
//! publisher cannot poison a room or crash the relay.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single protocol frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Frame {
    /// Subscribe the sending connection to a room. No response; rejoining
    /// is idempotent.
    #[serde(rename = "joinRoom", rename_all = "camelCase")]
    JoinRoom { room_key: String },
    /// Publish (toward the relay) or deliver (toward a client) one event.
    #[serde(rename = "itemStream", rename_all = "camelCase")]
    ItemStream { room_key: String, event: Value },
}

impl Frame {
    /// Serialize to wire text.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(|e| ProtocolError::SerializationError(e.to_string()))
    }

    /// Deserialize from wire text.
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(text).map_err(|e| ProtocolError::DeserializationError(e.to_string()))
    }
}

/// Protocol errors.
#[derive(Debug, Clone)]
pub enum ProtocolError {
    SerializationError(String),
    DeserializationError(String),
    ConnectionClosed,
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SerializationError(e) => write!(f, "Serialization error: {e}"),
            Self::DeserializationError(e) => write!(f, "Deserialization error: {e}"),
            Self::ConnectionClosed => write!(f, "Connection closed"),
        }
    }
}

impl std::error::Error for ProtocolError {}
