//! Realtime push protocol: `{type, payload}` JSON text frames.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{Event, EventId, Notification};

/// Frame type names understood by the client.
pub mod kinds {
    pub const NOTIFICATION: &str = "notification";
    pub const EVENT_CREATED: &str = "event.created";
    pub const EVENT_UPDATED: &str = "event.updated";
    pub const EVENT_DELETED: &str = "event.deleted";
}

/// A single frame on the push socket, in either direction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Frame {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: Value,
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// Not JSON, or no string `type` field.
    #[error("malformed frame: {0}")]
    Malformed(#[source] serde_json::Error),
    /// A known frame type whose payload does not match its schema.
    #[error("invalid `{kind}` payload: {source}")]
    Payload {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

impl Frame {
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }

    pub fn decode(text: &str) -> Result<Self, FrameError> {
        serde_json::from_str(text).map_err(FrameError::Malformed)
    }

    pub fn encode(&self) -> Result<String, FrameError> {
        serde_json::to_string(self).map_err(FrameError::Malformed)
    }
}

#[derive(Debug, Deserialize)]
struct DeletedPayload {
    id: EventId,
}

/// Typed view of an inbound frame.
///
/// Frame types this client does not know yet are kept as `Unknown` so newer
/// servers can add types without breaking older clients.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    Notification(Notification),
    EventCreated(Event),
    EventUpdated(Event),
    EventDeleted { id: EventId },
    Unknown { kind: String, payload: Value },
}

impl ServerMessage {
    pub fn from_frame(frame: Frame) -> Result<Self, FrameError> {
        let Frame { kind, payload } = frame;
        let typed = match kind.as_str() {
            kinds::NOTIFICATION => serde_json::from_value(payload).map(ServerMessage::Notification),
            kinds::EVENT_CREATED => serde_json::from_value(payload).map(ServerMessage::EventCreated),
            kinds::EVENT_UPDATED => serde_json::from_value(payload).map(ServerMessage::EventUpdated),
            kinds::EVENT_DELETED => serde_json::from_value::<DeletedPayload>(payload)
                .map(|p| ServerMessage::EventDeleted { id: p.id }),
            _ => return Ok(ServerMessage::Unknown { kind, payload }),
        };
        typed.map_err(|source| FrameError::Payload { kind, source })
    }

    /// The frame type this message was decoded from.
    pub fn kind(&self) -> &str {
        match self {
            ServerMessage::Notification(_) => kinds::NOTIFICATION,
            ServerMessage::EventCreated(_) => kinds::EVENT_CREATED,
            ServerMessage::EventUpdated(_) => kinds::EVENT_UPDATED,
            ServerMessage::EventDeleted { .. } => kinds::EVENT_DELETED,
            ServerMessage::Unknown { kind, .. } => kind,
        }
    }
}

#[cfg(test)]
#[path = "protocol_test.rs"]
mod tests;
