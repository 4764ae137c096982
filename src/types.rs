use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Opaque connection identifier assigned by the transport (ULID text form)
pub type ConnectionId = String;

/// Synthetic sender id carried by every assistant-authored message
pub const ASSISTANT_SID: &str = "AI_ASSISTANT_SID";

/// A single chat message as broadcast to every open connection.
///
/// Transient; nothing is ever persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub sender_sid: ConnectionId,
    pub text: String,
    /// RFC 3339 UTC timestamp
    pub timestamp: String,
    pub is_ai: bool,
}

impl ChatMessage {
    /// A message submitted by a connected user
    pub fn from_user(sender_sid: &str, text: String) -> Self {
        Self {
            sender_sid: sender_sid.to_string(),
            text,
            timestamp: Utc::now().to_rfc3339(),
            is_ai: false,
        }
    }

    /// A message authored by the assistant (or the server speaking as it)
    pub fn from_assistant(text: impl Into<String>) -> Self {
        Self {
            sender_sid: ASSISTANT_SID.to_string(),
            text: text.into(),
            timestamp: Utc::now().to_rfc3339(),
            is_ai: true,
        }
    }
}
