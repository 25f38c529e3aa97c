mod cli;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use ollagram_ai::OllamaClient;
use ollagram_core::channel::{Channel, TelegramChannel, TelegramConfig};
use ollagram_core::{BotConfig, MessageRouter};
use ollagram_memory::{MemoryStore, Sweeper};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, MemoryCommands};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match args.config.clone() {
        Some(path) => BotConfig::load_file(path),
        None => BotConfig::load(),
    };

    match args.command {
        Some(Commands::Memory { command }) => run_memory_command(&config, command),
        Some(Commands::Run) | None => run_relay(config).await,
    }
}

/// Offline inspection of the persisted store; no network components touched.
fn run_memory_command(config: &BotConfig, command: MemoryCommands) -> Result<()> {
    let store = MemoryStore::open(config.memory_config());

    match command {
        MemoryCommands::Stats => {
            let stats = store.stats();
            println!("Total chats: {}", stats.total_chats);
            println!("Total size:  {:.2} KB", stats.total_size as f64 / 1024.0);
        }
        MemoryCommands::Clear { chat_id } => {
            if store.clear(&chat_id) {
                println!("Cleared memory for chat {}", chat_id);
            } else {
                println!("No memory for chat {}", chat_id);
            }
        }
    }

    Ok(())
}

async fn run_relay(config: BotConfig) -> Result<()> {
    let token = config.bot_token()?.to_string();

    let mut telegram_config = TelegramConfig::new(token);
    if let Some(timeout) = config.telegram.polling_timeout {
        telegram_config = telegram_config.with_polling_timeout(timeout);
    }
    let channel = Arc::new(TelegramChannel::new(telegram_config));

    let me = channel.test_connection().await?;
    info!(
        bot = me.username.as_deref().unwrap_or("unknown"),
        "Connected to Telegram"
    );

    let llm = Arc::new(OllamaClient::new(config.model()).with_base_url(config.ollama_host()));
    info!(host = config.ollama_host(), model = config.model(), "Using Ollama");

    let memory = Arc::new(MemoryStore::open(config.memory_config()));
    let sweeper = Sweeper::spawn_for(memory.clone());

    let router = MessageRouter::new(
        channel.clone(),
        llm,
        memory.clone(),
        config.system_prompt.clone(),
    );

    info!("Relay ready, listening for messages");

    tokio::select! {
        result = router.run() => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
    }

    channel.stop_receiving();
    sweeper.stop().await;
    if let Err(e) = memory.flush() {
        warn!(error = %e, "Failed to flush memory on shutdown");
    } else {
        info!("Memory saved, goodbye");
    }

    Ok(())
}
