//! Chat message domain types for Agora.
//!
//! Defines the `ChatMessage` record persisted for every channel message,
//! the `NewMessage` input accepted from clients and the responder pipeline,
//! and the `AuthorKind` discriminator between human users and AI personas.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum accepted message content length in characters.
pub const MAX_CONTENT_LENGTH: usize = 10_000;

/// Who authored a message: a human user or an AI persona.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthorKind {
    /// A human participant. Wire/DB string: `"user"`.
    #[serde(rename = "user")]
    Human,
    /// An AI persona. Wire/DB string: `"ai"`.
    Ai,
}

impl Default for AuthorKind {
    fn default() -> Self {
        AuthorKind::Human
    }
}

impl fmt::Display for AuthorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthorKind::Human => write!(f, "user"),
            AuthorKind::Ai => write!(f, "ai"),
        }
    }
}

impl FromStr for AuthorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(AuthorKind::Human),
            "ai" => Ok(AuthorKind::Ai),
            other => Err(format!("invalid author kind: '{other}'")),
        }
    }
}

/// A message as accepted for persistence.
///
/// Carries the client-supplied identity and logical timestamp. The
/// authoritative persisted timestamp (`created_at`) is assigned by the
/// repository and returned on the [`ChatMessage`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMessage {
    /// Client- or responder-supplied unique message ID.
    pub id: String,
    /// Channel the message belongs to. Existence is assumed, not enforced.
    pub channel_id: String,
    /// Stable author ID (`ai_NNN` for personas).
    pub user_id: String,
    /// Display name of the author (denormalized).
    pub user_name: String,
    /// Human or AI author.
    #[serde(default)]
    pub user_type: AuthorKind,
    /// Message body text.
    pub content: String,
    /// Client-side logical timestamp.
    pub timestamp: DateTime<Utc>,
    /// Echo flag as supplied by the sender. Never stored as `true` for
    /// recipients; re-derived per broadcast copy.
    pub is_own_message: bool,
}

impl NewMessage {
    /// Validate the payload-level invariants: non-blank, length-bounded content.
    ///
    /// Field presence and types are already guaranteed by deserialization;
    /// this covers the semantic checks on top.
    pub fn validate(&self) -> Result<(), String> {
        if self.content.trim().is_empty() {
            return Err("message content must not be empty".to_string());
        }
        if self.content.chars().count() > MAX_CONTENT_LENGTH {
            return Err("message content is too long".to_string());
        }
        if self.id.trim().is_empty() {
            return Err("message id must not be empty".to_string());
        }
        if self.channel_id.trim().is_empty() {
            return Err("channel id must not be empty".to_string());
        }
        Ok(())
    }
}

/// A persisted chat message.
///
/// Immutable once saved; never deleted by the dispatch subsystem. The
/// `created_at` field is the persisted timestamp that acknowledgments and
/// broadcasts must reflect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Unique message ID.
    pub id: String,
    /// Channel the message belongs to.
    pub channel_id: String,
    /// Stable author ID.
    pub user_id: String,
    /// Display name of the author.
    pub user_name: String,
    /// Human or AI author.
    pub user_type: AuthorKind,
    /// Message body text.
    pub content: String,
    /// Client-side logical timestamp.
    pub timestamp: DateTime<Utc>,
    /// Echo flag as stored (always the sender's view).
    pub is_own_message: bool,
    /// Persisted timestamp, assigned by the repository.
    pub created_at: DateTime<Utc>,
}

/// A chat channel messages belong to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    /// Channel ID (unique identifier, referenced by messages).
    pub id: String,
    /// Display name.
    pub name: String,
    /// Optional channel description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// When the channel was created.
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
