//! Wire events exchanged over `/ws`.
//!
//! One JSON object per text frame, discriminated by a kebab-case `type` field:
//!   client -> server: join, message, typing-start, typing-stop
//!   server -> client: join-accepted, join-rejected, presence-joined, presence-left,
//!                     message, typing-started, typing-stopped, error

use serde::{Deserialize, Serialize};

use crate::chat::messages::ChatMessage;
use crate::chat::presence::PresenceChange;

/// Events a client may send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientEvent {
    Join { name: String },
    Message { body: String },
    TypingStart,
    TypingStop,
}

impl ClientEvent {
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Events the server emits, either unicast or broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerEvent {
    JoinAccepted { name: String },
    JoinRejected { reason: String },
    PresenceJoined(PresenceChange),
    PresenceLeft(PresenceChange),
    Message(ChatMessage),
    TypingStarted { name: String },
    TypingStopped { name: String },
    Error { code: String, message: String },
}

impl ServerEvent {
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Error codes carried by `ServerEvent::Error` that are not session errors.
pub const INVALID_EVENT: &str = "invalid-event";
