//! Channel message types.

use serde::{Deserialize, Serialize};

/// Inbound message from a channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Channel-assigned message ID
    pub id: String,
    /// Sender identifier (user ID in the channel)
    pub sender_id: String,
    /// Sender display name (if available)
    pub sender_name: Option<String>,
    /// Conversation identifier, the key into conversation memory
    pub chat_id: String,
    /// Message text
    pub text: String,
    /// Timestamp (milliseconds since epoch)
    pub timestamp: i64,
}

impl InboundMessage {
    pub fn new(
        id: impl Into<String>,
        sender_id: impl Into<String>,
        chat_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            sender_id: sender_id.into(),
            sender_name: None,
            chat_id: chat_id.into(),
            text: text.into(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn with_sender_name(mut self, name: impl Into<String>) -> Self {
        self.sender_name = Some(name.into());
        self
    }
}

/// Outbound message to a channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Conversation identifier
    pub chat_id: String,
    /// Message text
    pub text: String,
    /// Reply to a specific message ID
    pub reply_to: Option<String>,
}

impl OutboundMessage {
    pub fn new(chat_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            chat_id: chat_id.into(),
            text: text.into(),
            reply_to: None,
        }
    }

    pub fn with_reply_to(mut self, reply_to: impl Into<String>) -> Self {
        self.reply_to = Some(reply_to.into());
        self
    }
}
