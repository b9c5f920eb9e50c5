//! WebSocket wire protocol envelopes.
//!
//! JSON text frames in both directions:
//!
//! - inbound  `{"type": "message:send",      "data": {…NewMessage…}}`
//! - outbound `{"type": "message:saved",     "data": {"id": …, "success": true}}`
//! - outbound `{"type": "message:error",     "data": {"id": …|null, "success": false, "error": …}}`
//! - outbound `{"type": "message:broadcast", "data": {…message, "is_own_message": false}}`
//! - outbound `{"type": "ai:error",          "data": {"message": …}}`
//!
//! The inbound `type` is kept as a raw string (not a serde-tagged enum) so
//! that unsupported kinds can be echoed back by name in the rejection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::message::{AuthorKind, ChatMessage};

/// The only inbound frame kind currently supported.
pub const KIND_SEND: &str = "message:send";

/// Raw inbound envelope: a kind discriminator plus an opaque payload.
///
/// The payload stays as `serde_json::Value` until the kind has been matched,
/// so a rejection for an unknown kind never depends on the payload shape.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientEnvelope {
    /// Frame kind, e.g. `"message:send"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Kind-specific payload.
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

/// A broadcast copy of a persisted message.
///
/// `is_own_message` is a wire-only flag: every recipient copy carries
/// `false` because the recipient did not author the message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastPayload {
    pub id: String,
    pub channel_id: String,
    pub user_id: String,
    pub user_name: String,
    pub user_type: AuthorKind,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub is_own_message: bool,
}

impl BroadcastPayload {
    /// Build a recipient copy from a persisted message.
    pub fn from_persisted(msg: &ChatMessage) -> Self {
        BroadcastPayload {
            id: msg.id.clone(),
            channel_id: msg.channel_id.clone(),
            user_id: msg.user_id.clone(),
            user_name: msg.user_name.clone(),
            user_type: msg.user_type,
            content: msg.content.clone(),
            timestamp: msg.timestamp,
            is_own_message: false,
        }
    }
}

/// Outbound frame sent to WebSocket clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerFrame {
    /// Persistence acknowledgment to the sender.
    #[serde(rename = "message:saved")]
    Saved { id: String, success: bool },

    /// Structured rejection to the sender only. `id` echoes the offending
    /// message id when known; `error` is a generic code, never raw
    /// internals.
    #[serde(rename = "message:error")]
    Error {
        id: Option<String>,
        success: bool,
        error: String,
    },

    /// A persisted message fanned out to recipients.
    #[serde(rename = "message:broadcast")]
    Broadcast(BroadcastPayload),

    /// AI-pipeline failure notice to the sender.
    #[serde(rename = "ai:error")]
    AiError { message: String },
}

impl ServerFrame {
    /// Ack for a successfully persisted message.
    pub fn saved(id: impl Into<String>) -> Self {
        ServerFrame::Saved {
            id: id.into(),
            success: true,
        }
    }

    /// Rejection with the offending id (when known) and a generic code.
    pub fn error(id: Option<String>, error: impl Into<String>) -> Self {
        ServerFrame::Error {
            id,
            success: false,
            error: error.into(),
        }
    }

    /// Broadcast copy of a persisted message.
    pub fn broadcast(msg: &ChatMessage) -> Self {
        ServerFrame::Broadcast(BroadcastPayload::from_persisted(msg))
    }

    /// Serialize to the JSON text frame sent on the wire.
    ///
    /// Infallible for these shapes; kept as a method so call sites never
    /// repeat the serde plumbing.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("ServerFrame serialization cannot fail")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
