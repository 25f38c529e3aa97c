use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "ollagram")]
#[command(version, about = "Ollagram - Telegram relay for a local Ollama model")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Config file path (defaults to ~/.config/ollagram/config.toml)
    #[arg(long, global = true, env = "OLLAGRAM_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the relay (default when no subcommand is given)
    Run,

    /// Inspect or clear the persisted conversation memory
    Memory {
        #[command(subcommand)]
        command: MemoryCommands,
    },
}

#[derive(Subcommand)]
pub enum MemoryCommands {
    /// Print store stats
    Stats,

    /// Clear one chat's memory
    Clear {
        /// Chat id to clear
        chat_id: String,
    },
}
