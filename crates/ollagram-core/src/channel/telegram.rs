//! Telegram channel implementation.
//!
//! Bidirectional Bot API client: `getUpdates` long-polling for inbound
//! messages, `sendMessage` for replies (split to fit the 4096-char cap),
//! `sendChatAction` for a typing indicator while inference runs.

use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use futures::Stream;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::chunk::{TELEGRAM_MAX_LEN, split_text};
use super::traits::Channel;
use super::types::{InboundMessage, OutboundMessage};

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";
/// Default timeout for Telegram API calls (seconds)
const API_TIMEOUT_SECS: u64 = 30;
/// Backoff after a failed poll (seconds)
const POLL_ERROR_BACKOFF_SECS: u64 = 5;

/// Telegram channel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot token from @BotFather
    pub bot_token: String,
    /// Long-polling timeout in seconds (default: 30)
    #[serde(default = "default_polling_timeout")]
    pub polling_timeout: u32,
}

fn default_polling_timeout() -> u32 {
    30
}

impl TelegramConfig {
    pub fn new(bot_token: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            polling_timeout: default_polling_timeout(),
        }
    }

    pub fn with_polling_timeout(mut self, timeout: u32) -> Self {
        self.polling_timeout = timeout;
        self
    }
}

/// Telegram channel implementation
pub struct TelegramChannel {
    config: TelegramConfig,
    client: Client,
    api_base: String,
    /// Whether polling is active
    polling_active: Arc<AtomicBool>,
    /// Last processed update ID for long-polling
    last_update_id: Arc<AtomicI64>,
}

impl TelegramChannel {
    /// Create a new Telegram channel
    pub fn new(config: TelegramConfig) -> Self {
        Self {
            config,
            client: Client::new(),
            api_base: TELEGRAM_API_BASE.to_string(),
            polling_active: Arc::new(AtomicBool::new(false)),
            last_update_id: Arc::new(AtomicI64::new(0)),
        }
    }

    /// Create with just a bot token
    pub fn with_token(bot_token: impl Into<String>) -> Self {
        Self::new(TelegramConfig::new(bot_token))
    }

    /// Override the API base URL. Tests point this at a mock server.
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into().trim_end_matches('/').to_string();
        self
    }

    /// Get the API URL for a method
    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.config.bot_token, method)
    }

    /// Send one message via the Bot API
    async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        reply_to_message_id: Option<&str>,
    ) -> Result<()> {
        let url = self.api_url("sendMessage");

        let mut params = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
        });

        // Message ids arrive in our "tg_<id>" form; the API wants the number.
        if let Some(reply_id) = reply_to_message_id
            && let Some(numeric_id) = reply_id.strip_prefix("tg_")
            && let Ok(id) = numeric_id.parse::<i64>()
        {
            params["reply_to_message_id"] = serde_json::Value::Number(id.into());
        }

        let response = self
            .client
            .post(&url)
            .json(&params)
            .timeout(std::time::Duration::from_secs(API_TIMEOUT_SECS))
            .send()
            .await?;

        if response.status().is_success() {
            let api_response: TelegramResponse<TelegramMessageResponse> = response.json().await?;
            if api_response.ok {
                Ok(())
            } else {
                Err(anyhow!(
                    "Telegram API error: {}",
                    api_response.description.unwrap_or_default()
                ))
            }
        } else {
            let error = response.text().await.unwrap_or_default();
            Err(anyhow!("Telegram HTTP error: {}", error))
        }
    }

    /// Poll for updates using long-polling
    async fn poll_updates(&self) -> Result<Vec<TelegramUpdate>> {
        let url = self.api_url("getUpdates");

        let offset = self.last_update_id.load(Ordering::SeqCst);
        let params = serde_json::json!({
            "offset": if offset > 0 { offset + 1 } else { 0 },
            "timeout": self.config.polling_timeout,
            "allowed_updates": ["message"],
        });

        let response = self
            .client
            .post(&url)
            .json(&params)
            .timeout(std::time::Duration::from_secs(
                self.config.polling_timeout as u64 + 10,
            ))
            .send()
            .await?;

        let body: TelegramResponse<Vec<TelegramUpdate>> = response.json().await?;

        if !body.ok {
            return Err(anyhow!(
                "Telegram API error: {}",
                body.description.unwrap_or_default()
            ));
        }

        let updates = body.result.unwrap_or_default();

        if let Some(last) = updates.last() {
            self.last_update_id.store(last.update_id, Ordering::SeqCst);
        }

        Ok(updates)
    }

    /// Convert a Telegram update to an InboundMessage. Non-text updates
    /// (stickers, media, joins) are skipped.
    fn convert_update(update: TelegramUpdate) -> Option<InboundMessage> {
        let message = update.message?;
        let text = message.text?;
        let from = message.from?;

        let sender_name = from
            .username
            .clone()
            .or_else(|| {
                let full = match (&from.first_name, &from.last_name) {
                    (Some(first), Some(last)) => format!("{} {}", first, last),
                    (Some(first), None) => first.clone(),
                    (None, Some(last)) => last.clone(),
                    (None, None) => String::new(),
                };
                Some(full)
            })
            .filter(|s| !s.is_empty());

        let mut inbound = InboundMessage::new(
            format!("tg_{}", message.message_id),
            from.id.to_string(),
            message.chat.id.to_string(),
            text,
        );
        if let Some(name) = sender_name {
            inbound = inbound.with_sender_name(name);
        }
        Some(inbound)
    }

    /// Sanity-check credentials by calling getMe
    pub async fn test_connection(&self) -> Result<TelegramUser> {
        let url = self.api_url("getMe");
        let response = self
            .client
            .get(&url)
            .timeout(std::time::Duration::from_secs(API_TIMEOUT_SECS))
            .send()
            .await?;

        let body: TelegramResponse<TelegramUser> = response.json().await?;

        if body.ok {
            body.result
                .ok_or_else(|| anyhow!("Telegram returned ok but no result"))
        } else {
            Err(anyhow!(
                "Telegram API error: {}",
                body.description.unwrap_or_default()
            ))
        }
    }

    async fn send_typing_action(&self, chat_id: &str) -> Result<()> {
        let url = self.api_url("sendChatAction");

        let params = serde_json::json!({
            "chat_id": chat_id,
            "action": "typing",
        });

        let response = self
            .client
            .post(&url)
            .json(&params)
            .timeout(std::time::Duration::from_secs(API_TIMEOUT_SECS))
            .send()
            .await?;

        if response.status().is_success() {
            debug!(chat_id, "Sent typing indicator");
            Ok(())
        } else {
            let error = response.text().await.unwrap_or_default();
            Err(anyhow!("Telegram HTTP error: {}", error))
        }
    }

    fn clone_for_polling(&self) -> Self {
        Self {
            config: self.config.clone(),
            client: self.client.clone(),
            api_base: self.api_base.clone(),
            polling_active: self.polling_active.clone(),
            last_update_id: self.last_update_id.clone(),
        }
    }
}

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "Telegram"
    }

    fn is_configured(&self) -> bool {
        !self.config.bot_token.is_empty()
    }

    async fn send(&self, message: OutboundMessage) -> Result<()> {
        for chunk in split_text(&message.text, TELEGRAM_MAX_LEN) {
            self.send_message(&message.chat_id, &chunk, message.reply_to.as_deref())
                .await?;
        }
        Ok(())
    }

    async fn send_typing(&self, chat_id: &str) -> Result<()> {
        self.send_typing_action(chat_id).await
    }

    fn start_receiving(&self) -> Option<Pin<Box<dyn Stream<Item = InboundMessage> + Send>>> {
        if !self.is_configured() {
            return None;
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let channel = self.clone_for_polling();

        tokio::spawn(async move {
            channel.polling_active.store(true, Ordering::SeqCst);
            info!("Starting Telegram polling");

            while channel.polling_active.load(Ordering::SeqCst) {
                match channel.poll_updates().await {
                    Ok(updates) => {
                        for update in updates {
                            if let Some(message) = Self::convert_update(update) {
                                debug!(
                                    id = %message.id,
                                    sender = %message.sender_id,
                                    "Received Telegram message"
                                );
                                if tx.send(message).is_err() {
                                    warn!("Message receiver dropped, stopping polling");
                                    channel.polling_active.store(false, Ordering::SeqCst);
                                    break;
                                }
                            }
                        }
                    }
                    Err(e) => {
                        error!(error = %e, "Telegram polling error");
                        tokio::time::sleep(std::time::Duration::from_secs(
                            POLL_ERROR_BACKOFF_SECS,
                        ))
                        .await;
                    }
                }
            }

            info!("Telegram polling stopped");
        });

        Some(Box::pin(
            tokio_stream::wrappers::UnboundedReceiverStream::new(rx),
        ))
    }

    fn stop_receiving(&self) {
        self.polling_active.store(false, Ordering::SeqCst);
    }
}

// ============================================================================
// Telegram API Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct TelegramResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TelegramUpdate {
    update_id: i64,
    message: Option<TelegramMessage>,
}

#[derive(Debug, Deserialize)]
struct TelegramMessage {
    message_id: i64,
    from: Option<TelegramUser>,
    chat: TelegramChat,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TelegramUser {
    pub id: i64,
    pub is_bot: bool,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TelegramChat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct TelegramMessageResponse {
    #[allow(dead_code)]
    message_id: i64,
}
