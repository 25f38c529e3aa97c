//! Ollagram Core - the relay between Telegram and the local model.
//!
//! Wires the channel layer (long-polling Telegram client), the command
//! parser, and the message router that threads conversation memory through
//! every model request.

pub mod channel;
pub mod commands;
pub mod config;
pub mod router;

pub use config::BotConfig;
pub use router::MessageRouter;
