//! Channel trait definition.

use std::pin::Pin;

use anyhow::Result;
use async_trait::async_trait;
use futures::Stream;

use super::types::{InboundMessage, OutboundMessage};

/// A bidirectional chat transport.
///
/// `start_receiving` hands back a stream of inbound messages; the polling or
/// connection machinery behind it runs in a background task owned by the
/// channel.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Display name for logs
    fn name(&self) -> &str;

    /// Check if the channel has the credentials it needs
    fn is_configured(&self) -> bool;

    /// Send a message to the channel
    async fn send(&self, message: OutboundMessage) -> Result<()>;

    /// Send a simple text message
    async fn send_text(&self, chat_id: &str, text: &str) -> Result<()> {
        self.send(OutboundMessage::new(chat_id, text)).await
    }

    /// Show a typing indicator, where the transport supports one.
    /// Best-effort; failures are the caller's to ignore.
    async fn send_typing(&self, chat_id: &str) -> Result<()> {
        let _ = chat_id;
        Ok(())
    }

    /// Start receiving messages (returns None if the channel is not
    /// configured for receiving)
    fn start_receiving(&self) -> Option<Pin<Box<dyn Stream<Item = InboundMessage> + Send>>>;

    /// Stop the receive loop, if one is running.
    fn stop_receiving(&self) {}
}
