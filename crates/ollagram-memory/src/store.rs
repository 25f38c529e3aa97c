//! The conversation memory store.
//!
//! Maps chat ids to bounded transcripts. Every mutation rewrites the flat
//! snapshot file; every read is served from memory. All read-modify-write
//! sequences (including the persist step) run under a single store-wide
//! lock, so a cleanup sweep serializes with concurrent updates.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::persist::{self, Snapshot};

/// One chat's accumulated context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationRecord {
    /// Flat rendering of prior turns, newest last.
    pub transcript: String,
    /// Timestamp of the most recent update. Records restored from a legacy
    /// snapshot without a timestamp parse as the Unix epoch, so they sort
    /// as oldest and are evicted first.
    #[serde(default = "unix_epoch")]
    pub last_activity: DateTime<Utc>,
}

fn unix_epoch() -> DateTime<Utc> {
    DateTime::UNIX_EPOCH
}

/// Store configuration. Defaults mirror the stock deployment: 30k chars per
/// chat, 100 chats, daily sweep, `bot_memory.json` in the working directory.
#[derive(Debug, Clone)]
pub struct MemoryConfig {
    /// Snapshot file path.
    pub path: PathBuf,
    /// Character cap per chat transcript.
    pub max_transcript_chars: usize,
    /// Entry cap for the whole store.
    pub max_chats: usize,
    /// Sweep period, doubling as the inactivity threshold.
    pub cleanup_interval: Duration,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("bot_memory.json"),
            max_transcript_chars: 30_000,
            max_chats: 100,
            cleanup_interval: Duration::from_secs(24 * 60 * 60),
        }
    }
}

/// Read-only stats for the `/memory` command.
#[derive(Debug, Clone, Serialize)]
pub struct MemoryStats {
    /// Current entry count.
    pub total_chats: usize,
    /// Byte length of the serialized snapshot.
    pub total_size: usize,
    /// Most recent sweep, or store-open time if none has run.
    pub last_cleanup: DateTime<Utc>,
}

struct Inner {
    chats: HashMap<String, ConversationRecord>,
    last_cleanup: DateTime<Utc>,
}

/// Bounded, persisted per-chat transcript store.
pub struct MemoryStore {
    config: MemoryConfig,
    inner: RwLock<Inner>,
}

impl MemoryStore {
    /// Open a store backed by `config.path`.
    ///
    /// A missing snapshot starts empty; an unreadable or corrupt one is
    /// logged and also starts empty. Opening never fails.
    pub fn open(config: MemoryConfig) -> Self {
        let chats = match persist::load(&config.path) {
            Ok(snapshot) => {
                if !snapshot.is_empty() {
                    info!(chats = snapshot.len(), "Loaded conversation memory");
                }
                snapshot.into_iter().collect()
            }
            Err(e) => {
                warn!(error = %e, "Failed to load memory, starting empty");
                HashMap::new()
            }
        };

        Self {
            config,
            inner: RwLock::new(Inner {
                chats,
                last_cleanup: Utc::now(),
            }),
        }
    }

    /// Current transcript for a chat. Absence is not an error: unknown chats
    /// yield an empty string.
    pub fn get(&self, chat_id: &str) -> String {
        self.inner
            .read()
            .chats
            .get(chat_id)
            .map(|record| record.transcript.clone())
            .unwrap_or_default()
    }

    /// Append one turn to a chat's transcript, re-truncate, and persist.
    ///
    /// When the appended transcript exceeds the character cap, only the
    /// trailing `max_transcript_chars` characters are kept; the oldest
    /// content is silently dropped, even mid-turn.
    pub fn update(&self, chat_id: &str, user_message: &str, bot_response: &str) {
        let entry = format!("User: {}\nBot: {}", user_message, bot_response);

        let mut inner = self.inner.write();
        let current = inner
            .chats
            .get(chat_id)
            .map(|record| record.transcript.as_str())
            .unwrap_or_default();

        let mut transcript = if current.is_empty() {
            entry
        } else {
            format!("{}\n{}", current, entry)
        };
        transcript = retain_suffix(transcript, self.config.max_transcript_chars);

        inner.chats.insert(
            chat_id.to_string(),
            ConversationRecord {
                transcript,
                last_activity: Utc::now(),
            },
        );
        self.persist_locked(&inner);
    }

    /// Remove a chat's record unconditionally. Idempotent: clearing an
    /// unknown chat leaves the store unchanged. Returns whether a record
    /// existed.
    pub fn clear(&self, chat_id: &str) -> bool {
        let mut inner = self.inner.write();
        let existed = inner.chats.remove(chat_id).is_some();
        self.persist_locked(&inner);
        existed
    }

    /// Run the cleanup sweep: expire inactive chats, then evict oldest
    /// entries until the count bound holds. Persists afterward.
    pub fn cleanup(&self) {
        self.cleanup_at(Utc::now());
    }

    fn cleanup_at(&self, now: DateTime<Utc>) {
        let cutoff = now
            - chrono::Duration::from_std(self.config.cleanup_interval)
                .unwrap_or_else(|_| chrono::Duration::hours(24));

        let mut inner = self.inner.write();

        let before = inner.chats.len();
        inner.chats.retain(|chat_id, record| {
            let keep = record.last_activity >= cutoff;
            if !keep {
                debug!(%chat_id, "Expired inactive chat memory");
            }
            keep
        });
        let expired = before - inner.chats.len();

        // Count-based eviction, oldest activity first.
        let mut evicted = 0;
        if inner.chats.len() > self.config.max_chats {
            let mut by_age: Vec<(String, DateTime<Utc>)> = inner
                .chats
                .iter()
                .map(|(id, record)| (id.clone(), record.last_activity))
                .collect();
            by_age.sort_by_key(|(_, last_activity)| *last_activity);

            let excess = by_age.len() - self.config.max_chats;
            for (chat_id, _) in by_age.into_iter().take(excess) {
                inner.chats.remove(&chat_id);
                debug!(%chat_id, "Evicted chat memory over capacity");
                evicted += 1;
            }
        }

        inner.last_cleanup = now;
        self.persist_locked(&inner);

        if expired > 0 || evicted > 0 {
            info!(expired, evicted, remaining = inner.chats.len(), "Memory cleanup finished");
        }
    }

    /// Store stats. Pure read, no side effects.
    pub fn stats(&self) -> MemoryStats {
        let inner = self.inner.read();
        MemoryStats {
            total_chats: inner.chats.len(),
            total_size: persist::serialized_len(&snapshot_of(&inner)),
            last_cleanup: inner.last_cleanup,
        }
    }

    /// Write the snapshot now, propagating failure. Used at shutdown, where
    /// a failed final save is worth reporting rather than swallowing.
    pub fn flush(&self) -> anyhow::Result<()> {
        let inner = self.inner.read();
        persist::save(&self.config.path, &snapshot_of(&inner))
    }

    pub fn len(&self) -> usize {
        self.inner.read().chats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().chats.is_empty()
    }

    /// Sweep period configured for this store.
    pub fn cleanup_interval(&self) -> Duration {
        self.config.cleanup_interval
    }

    /// Persist under the write lock. A failed write is logged and skipped:
    /// the in-memory state stays authoritative until the next attempt.
    fn persist_locked(&self, inner: &Inner) {
        if let Err(e) = persist::save(&self.config.path, &snapshot_of(inner)) {
            warn!(error = %e, "Failed to persist memory, keeping in-memory state");
        }
    }
}

fn snapshot_of(inner: &Inner) -> Snapshot {
    inner
        .chats
        .iter()
        .map(|(id, record)| (id.clone(), record.clone()))
        .collect()
}

/// Keep the trailing `max_chars` characters of `text`.
fn retain_suffix(text: String, max_chars: usize) -> String {
    let total = text.chars().count();
    if total <= max_chars {
        return text;
    }
    text.chars().skip(total - max_chars).collect()
}
