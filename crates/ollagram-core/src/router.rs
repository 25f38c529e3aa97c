//! Message router.
//!
//! Threads each inbound message through conversation memory, the model,
//! and back out the channel: read memory, build the prompt, call the model,
//! send the reply, then record the turn. Messages are handled to completion
//! one at a time, so no two updates to the same chat interleave.

use std::sync::Arc;

use anyhow::{Result, anyhow};
use futures::StreamExt;
use ollagram_ai::{CompletionRequest, LlmClient, Message};
use ollagram_memory::MemoryStore;
use tracing::{debug, info, warn};

use crate::channel::{Channel, InboundMessage};
use crate::commands::{Command, format_stats};

/// Preamble for the context message injected ahead of the user's prompt.
const MEMORY_PREAMBLE: &str = "DO NOT FORGET PREVIOUS CONVERSATION:";
/// Reply sent when inference fails. The turn is not recorded in memory.
const APOLOGY: &str = "Sorry, I'm having technical trouble right now.";

/// Routes inbound chat messages to commands or the model.
pub struct MessageRouter {
    channel: Arc<dyn Channel>,
    llm: Arc<dyn LlmClient>,
    memory: Arc<MemoryStore>,
    system_prompt: Option<String>,
}

impl MessageRouter {
    pub fn new(
        channel: Arc<dyn Channel>,
        llm: Arc<dyn LlmClient>,
        memory: Arc<MemoryStore>,
        system_prompt: Option<String>,
    ) -> Self {
        Self {
            channel,
            llm,
            memory,
            system_prompt,
        }
    }

    /// Drain the channel's inbound stream until it ends.
    pub async fn run(&self) -> Result<()> {
        let mut stream = self
            .channel
            .start_receiving()
            .ok_or_else(|| anyhow!("{} channel cannot receive messages", self.channel.name()))?;

        info!(channel = self.channel.name(), "Router started");

        while let Some(message) = stream.next().await {
            if let Err(e) = self.handle_message(message).await {
                warn!(error = %e, "Failed to handle message");
            }
        }

        info!("Inbound stream ended, router stopping");
        Ok(())
    }

    /// Handle one inbound message to completion.
    pub async fn handle_message(&self, message: InboundMessage) -> Result<()> {
        debug!(
            chat_id = %message.chat_id,
            sender = message.sender_name.as_deref().unwrap_or("unknown"),
            "Handling message"
        );

        match Command::parse(&message.text) {
            Some(command) => self.handle_command(&message, command).await,
            None => self.relay_to_model(&message).await,
        }
    }

    async fn handle_command(&self, message: &InboundMessage, command: Command) -> Result<()> {
        match command {
            Command::Echo(text) => self.channel.send_text(&message.chat_id, &text).await,
            Command::MemoryStats => {
                let stats = self.memory.stats();
                self.channel
                    .send_text(&message.chat_id, &format_stats(&stats))
                    .await
            }
            Command::ClearMemory => {
                self.memory.clear(&message.chat_id);
                self.channel
                    .send_text(&message.chat_id, "🧹 Memory cleared for this chat.")
                    .await
            }
        }
    }

    async fn relay_to_model(&self, message: &InboundMessage) -> Result<()> {
        let context = self.memory.get(&message.chat_id);

        let mut messages = Vec::new();
        if let Some(prompt) = &self.system_prompt {
            messages.push(Message::system(prompt.as_str()));
        }
        if !context.is_empty() {
            messages.push(Message::system(format!("{}\n{}", MEMORY_PREAMBLE, context)));
        }
        messages.push(Message::user(message.text.as_str()));

        // Best-effort; a failed typing indicator never blocks the reply.
        if let Err(e) = self.channel.send_typing(&message.chat_id).await {
            debug!(error = %e, "Failed to send typing indicator");
        }

        match self.llm.complete(CompletionRequest::new(messages)).await {
            Ok(response) => {
                if let Some(usage) = response.usage {
                    debug!(
                        prompt_tokens = usage.prompt_tokens,
                        completion_tokens = usage.completion_tokens,
                        "Model reply received"
                    );
                }
                self.channel
                    .send_text(&message.chat_id, &response.content)
                    .await?;
                // Record the turn only after the reply went out.
                self.memory
                    .update(&message.chat_id, &message.text, &response.content);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, chat_id = %message.chat_id, "Inference failed");
                self.channel.send_text(&message.chat_id, APOLOGY).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::OutboundMessage;
    use async_trait::async_trait;
    use futures::Stream;
    use ollagram_ai::{MockLlmClient, MockStep, Role};
    use ollagram_memory::MemoryConfig;
    use std::pin::Pin;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    #[derive(Default)]
    struct MockChannel {
        sent: Mutex<Vec<OutboundMessage>>,
        typing: AtomicUsize,
    }

    impl MockChannel {
        fn sent_texts(&self) -> Vec<String> {
            self.sent.lock().unwrap().iter().map(|m| m.text.clone()).collect()
        }
    }

    #[async_trait]
    impl Channel for MockChannel {
        fn name(&self) -> &str {
            "mock"
        }

        fn is_configured(&self) -> bool {
            true
        }

        async fn send(&self, message: OutboundMessage) -> Result<()> {
            self.sent.lock().unwrap().push(message);
            Ok(())
        }

        async fn send_typing(&self, _chat_id: &str) -> Result<()> {
            self.typing.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn start_receiving(&self) -> Option<Pin<Box<dyn Stream<Item = InboundMessage> + Send>>> {
            None
        }
    }

    struct Fixture {
        channel: Arc<MockChannel>,
        llm: Arc<MockLlmClient>,
        memory: Arc<MemoryStore>,
        router: MessageRouter,
        _dir: TempDir,
    }

    fn fixture(steps: Vec<MockStep>, system_prompt: Option<&str>) -> Fixture {
        let dir = TempDir::new().unwrap();
        let channel = Arc::new(MockChannel::default());
        let llm = Arc::new(MockLlmClient::from_steps("test-model", steps));
        let memory = Arc::new(MemoryStore::open(MemoryConfig {
            path: dir.path().join("memory.json"),
            ..Default::default()
        }));
        let router = MessageRouter::new(
            channel.clone(),
            llm.clone(),
            memory.clone(),
            system_prompt.map(String::from),
        );
        Fixture {
            channel,
            llm,
            memory,
            router,
            _dir: dir,
        }
    }

    fn inbound(chat_id: &str, text: &str) -> InboundMessage {
        InboundMessage::new("tg_1", "42", chat_id, text)
    }

    #[tokio::test]
    async fn test_echo_command_bypasses_model() {
        let f = fixture(vec![], None);
        f.router
            .handle_message(inbound("1", "/echo repeat me"))
            .await
            .unwrap();

        assert_eq!(f.channel.sent_texts(), vec!["repeat me".to_string()]);
        assert!(f.memory.is_empty());
    }

    #[tokio::test]
    async fn test_memory_stats_command() {
        let f = fixture(vec![], None);
        f.memory.update("1", "hi", "hello");

        f.router.handle_message(inbound("1", "/memory")).await.unwrap();

        let sent = f.channel.sent_texts();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("Memory Stats"));
        assert!(sent[0].contains("Total chats: 1"));
    }

    #[tokio::test]
    async fn test_clear_memory_command() {
        let f = fixture(vec![], None);
        f.memory.update("1", "hi", "hello");

        f.router
            .handle_message(inbound("1", "/clearmemory"))
            .await
            .unwrap();

        assert_eq!(f.memory.get("1"), "");
        assert!(f.channel.sent_texts()[0].contains("Memory cleared"));
    }

    #[tokio::test]
    async fn test_chat_flow_replies_and_records_turn() {
        let f = fixture(vec![MockStep::text("hello there")], Some("be helpful"));

        f.router.handle_message(inbound("1", "hi")).await.unwrap();

        assert_eq!(f.channel.sent_texts(), vec!["hello there".to_string()]);
        assert_eq!(f.memory.get("1"), "User: hi\nBot: hello there");
        assert_eq!(f.channel.typing.load(Ordering::SeqCst), 1);

        // First turn: no stored context yet, so the prompt is just the
        // system prompt plus the user message.
        let request = f.llm.last_request().await.unwrap();
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, Role::System);
        assert_eq!(request.messages[0].content, "be helpful");
        assert_eq!(request.messages[1].role, Role::User);
    }

    #[tokio::test]
    async fn test_second_turn_includes_memory_context() {
        let f = fixture(
            vec![MockStep::text("first reply"), MockStep::text("second reply")],
            Some("be helpful"),
        );

        f.router.handle_message(inbound("1", "hi")).await.unwrap();
        f.router.handle_message(inbound("1", "and again")).await.unwrap();

        let request = f.llm.last_request().await.unwrap();
        assert_eq!(request.messages.len(), 3);
        assert!(request.messages[1]
            .content
            .starts_with("DO NOT FORGET PREVIOUS CONVERSATION:"));
        assert!(request.messages[1].content.contains("User: hi\nBot: first reply"));
    }

    #[tokio::test]
    async fn test_no_system_prompt_means_no_system_message() {
        let f = fixture(vec![MockStep::text("ok")], None);

        f.router.handle_message(inbound("1", "hi")).await.unwrap();

        let request = f.llm.last_request().await.unwrap();
        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.messages[0].role, Role::User);
    }

    #[tokio::test]
    async fn test_inference_failure_sends_apology_and_skips_memory() {
        let f = fixture(vec![MockStep::error("model exploded")], None);

        f.router.handle_message(inbound("1", "hi")).await.unwrap();

        assert_eq!(f.channel.sent_texts(), vec![APOLOGY.to_string()]);
        assert!(f.memory.is_empty());
    }

    #[tokio::test]
    async fn test_chats_have_separate_memory() {
        let f = fixture(
            vec![MockStep::text("reply a"), MockStep::text("reply b")],
            None,
        );

        f.router.handle_message(inbound("a", "from a")).await.unwrap();
        f.router.handle_message(inbound("b", "from b")).await.unwrap();

        assert_eq!(f.memory.get("a"), "User: from a\nBot: reply a");
        assert_eq!(f.memory.get("b"), "User: from b\nBot: reply b");
    }
}
