//! Channel layer
//!
//! A channel is anything that can deliver inbound chat messages and accept
//! outbound replies. The only production channel is Telegram; the trait is
//! the seam router tests mock.

mod chunk;
mod telegram;
mod traits;
mod types;

pub use chunk::split_text;
pub use telegram::{TelegramChannel, TelegramConfig};
pub use traits::Channel;
pub use types::{InboundMessage, OutboundMessage};
