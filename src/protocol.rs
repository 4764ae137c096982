use crate::types::ChatMessage;
use serde::{Deserialize, Serialize};

/// Events a client may send over the WebSocket.
///
/// Envelope framing: every frame is a JSON object tagged with `t`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientEvent {
    ChatMessage {
        #[serde(default)]
        text: Option<String>,
    },
    /// Any tag the protocol doesn't recognize; logged and ignored
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Post-connect identity ack, sent to the new connection only
    ServerRegisteredSid { sid: String },
    /// Broadcast chat message (user or assistant)
    NewMessage(ChatMessage),
    /// Private error report to the offending connection
    Error {
        #[serde(rename = "type")]
        kind: ErrorKind,
        message: String,
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed or missing inbound payload; the connection stays open
    ValidationError,
    /// Failure while generating or broadcasting a reply
    ServerError,
    /// Catch-all for anything outside the validation and relay paths
    UnexpectedError,
}
