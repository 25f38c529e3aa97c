//! Bot configuration
//!
//! Loaded from `~/.config/ollagram/config.toml`, then overridden by the
//! environment variables the stock deployment uses (`TELEGRAM_BOT_TOKEN`,
//! `OLLAMA_HOST`, `MODEL`, `SYSTEM_PROMPT`). Env wins so a container can
//! run with no config file at all.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use ollagram_memory::MemoryConfig;
use serde::{Deserialize, Serialize};
use tracing::warn;

const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";
const DEFAULT_MODEL: &str = "qwen2.5-coder:7b-instruct";

/// Top-level bot configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BotConfig {
    #[serde(default)]
    pub telegram: TelegramSection,
    #[serde(default)]
    pub ollama: OllamaSection,
    #[serde(default)]
    pub memory: MemorySection,
    /// System prompt prepended to every model request
    pub system_prompt: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelegramSection {
    /// Bot token from @BotFather
    pub bot_token: Option<String>,
    /// Long-polling timeout in seconds
    pub polling_timeout: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OllamaSection {
    /// Ollama server base URL
    pub host: Option<String>,
    /// Model identifier
    pub model: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemorySection {
    /// Snapshot file path
    pub file: Option<PathBuf>,
    /// Character cap per chat transcript
    pub max_transcript_chars: Option<usize>,
    /// Entry cap for the store
    pub max_chats: Option<usize>,
    /// Sweep period and inactivity threshold, in hours
    pub cleanup_interval_hours: Option<u64>,
}

impl BotConfig {
    /// Load from the default path, then apply env overrides.
    pub fn load() -> Self {
        Self::load_from_path(Self::default_path()).with_env_overrides()
    }

    /// Load from a specific path, then apply env overrides. A missing file
    /// yields defaults; a malformed one is logged and yields defaults.
    pub fn load_file(path: PathBuf) -> Self {
        Self::load_from_path(Some(path)).with_env_overrides()
    }

    fn load_from_path(path: Option<PathBuf>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&path) {
            Ok(content) => toml::from_str(&content).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "Malformed config file, using defaults");
                Self::default()
            }),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Unreadable config file, using defaults");
                Self::default()
            }
        }
    }

    /// Default configuration file path
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("ollagram").join("config.toml"))
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(token) = std::env::var("TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = Some(token);
        }
        if let Ok(host) = std::env::var("OLLAMA_HOST") {
            self.ollama.host = Some(host);
        }
        if let Ok(model) = std::env::var("MODEL") {
            self.ollama.model = Some(model);
        }
        if let Ok(prompt) = std::env::var("SYSTEM_PROMPT") {
            self.system_prompt = Some(prompt);
        }
        self
    }

    /// The bot token. The one fatal startup error is its absence.
    pub fn bot_token(&self) -> Result<&str> {
        self.telegram
            .bot_token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .context("no Telegram bot token configured (set TELEGRAM_BOT_TOKEN)")
    }

    pub fn ollama_host(&self) -> &str {
        self.ollama.host.as_deref().unwrap_or(DEFAULT_OLLAMA_HOST)
    }

    pub fn model(&self) -> &str {
        self.ollama.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    /// Memory store configuration with section values over defaults.
    pub fn memory_config(&self) -> MemoryConfig {
        let defaults = MemoryConfig::default();
        MemoryConfig {
            path: self.memory.file.clone().unwrap_or(defaults.path),
            max_transcript_chars: self
                .memory
                .max_transcript_chars
                .unwrap_or(defaults.max_transcript_chars),
            max_chats: self.memory.max_chats.unwrap_or(defaults.max_chats),
            cleanup_interval: self
                .memory
                .cleanup_interval_hours
                .map(|hours| Duration::from_secs(hours * 60 * 60))
                .unwrap_or(defaults.cleanup_interval),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = BotConfig::load_from_path(Some(PathBuf::from("/nonexistent/config.toml")));
        assert!(config.telegram.bot_token.is_none());
        assert_eq!(config.ollama_host(), DEFAULT_OLLAMA_HOST);
        assert_eq!(config.model(), DEFAULT_MODEL);
    }

    #[test]
    fn test_malformed_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[telegram\nbroken").unwrap();

        let config = BotConfig::load_from_path(Some(path));
        assert!(config.telegram.bot_token.is_none());
    }

    #[test]
    fn test_file_values_parse() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
system_prompt = "be brief"

[telegram]
bot_token = "123:ABC"
polling_timeout = 45

[ollama]
host = "http://gpu-box:11434"
model = "llama3.2"

[memory]
file = "/var/lib/ollagram/memory.json"
max_transcript_chars = 10000
max_chats = 50
cleanup_interval_hours = 12
"#,
        )
        .unwrap();

        let config = BotConfig::load_from_path(Some(path));
        assert_eq!(config.bot_token().unwrap(), "123:ABC");
        assert_eq!(config.ollama_host(), "http://gpu-box:11434");
        assert_eq!(config.model(), "llama3.2");
        assert_eq!(config.system_prompt.as_deref(), Some("be brief"));

        let memory = config.memory_config();
        assert_eq!(memory.path, PathBuf::from("/var/lib/ollagram/memory.json"));
        assert_eq!(memory.max_transcript_chars, 10_000);
        assert_eq!(memory.max_chats, 50);
        assert_eq!(memory.cleanup_interval, Duration::from_secs(12 * 60 * 60));
    }

    #[test]
    fn test_missing_token_is_error() {
        let config = BotConfig::default();
        assert!(config.bot_token().is_err());

        let blank = BotConfig {
            telegram: TelegramSection {
                bot_token: Some("   ".to_string()),
                polling_timeout: None,
            },
            ..Default::default()
        };
        assert!(blank.bot_token().is_err());
    }

    #[test]
    fn test_memory_defaults_mirror_stock_deployment() {
        let memory = BotConfig::default().memory_config();
        assert_eq!(memory.max_transcript_chars, 30_000);
        assert_eq!(memory.max_chats, 100);
        assert_eq!(memory.cleanup_interval, Duration::from_secs(24 * 60 * 60));
    }
}
