//! Ollagram Memory - bounded, persisted per-chat conversation context.
//!
//! This crate owns the one piece of stateful logic in the relay: a map from
//! chat id to accumulated transcript, bounded per chat (suffix truncation)
//! and globally (count-based eviction), mirrored to a flat JSON file after
//! every mutation and swept for stale entries on a fixed interval.
//!
//! The store never surfaces an error to its callers: a missing or corrupt
//! snapshot means "no prior memory", and a failed write is logged while the
//! in-memory state stays authoritative.

pub mod persist;
pub mod store;
pub mod sweeper;

pub use store::{ConversationRecord, MemoryConfig, MemoryStats, MemoryStore};
pub use sweeper::Sweeper;
