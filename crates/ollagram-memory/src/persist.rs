//! Snapshot persistence for the memory store.
//!
//! The on-disk format is a JSON array of `(chat_id, record)` pairs, written
//! in full on every mutation. There is no incremental or append mode and no
//! crash-safety guarantee: a kill between mutation and write loses at most
//! the turns since the last successful write.

use std::path::Path;

use anyhow::{Context, Result};

use crate::store::ConversationRecord;

/// Ordered list of `(chat_id, record)` pairs as serialized to disk.
pub type Snapshot = Vec<(String, ConversationRecord)>;

/// Read a snapshot from `path`.
///
/// Returns an empty snapshot when the file does not exist. A file that
/// exists but cannot be read or parsed is an error; the caller decides how
/// to degrade (the store logs and starts empty).
pub fn load(path: &Path) -> Result<Snapshot> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let data = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read memory file {}", path.display()))?;
    let snapshot: Snapshot = serde_json::from_str(&data)
        .with_context(|| format!("failed to parse memory file {}", path.display()))?;

    Ok(snapshot)
}

/// Write a snapshot to `path`, replacing the previous contents.
pub fn save(path: &Path, snapshot: &Snapshot) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let data = serde_json::to_string_pretty(snapshot).context("failed to serialize memory")?;
    std::fs::write(path, data)
        .with_context(|| format!("failed to write memory file {}", path.display()))?;

    Ok(())
}

/// Serialized length of a snapshot, in bytes.
///
/// Matches what `save` writes, so stats report the real on-disk size.
pub fn serialized_len(snapshot: &Snapshot) -> usize {
    serde_json::to_string_pretty(snapshot)
        .map(|s| s.len())
        .unwrap_or(0)
}
