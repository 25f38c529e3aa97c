//! Bot command parsing.
//!
//! Commands are slash-prefixed. Anything else, including unknown slash
//! commands, falls through to the model.

use chrono::{DateTime, Utc};
use ollagram_memory::MemoryStats;

/// A recognized bot command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/echo <text>` — repeat the text back verbatim.
    Echo(String),
    /// `/memory` — report store stats.
    MemoryStats,
    /// `/clearmemory` — drop this chat's transcript.
    ClearMemory,
}

impl Command {
    /// Parse a message into a command, if it is one.
    ///
    /// Telegram appends `@botname` to commands in group chats; the suffix
    /// is stripped before matching.
    pub fn parse(text: &str) -> Option<Self> {
        let trimmed = text.trim();
        if !trimmed.starts_with('/') {
            return None;
        }

        let (word, rest) = match trimmed.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (trimmed, ""),
        };
        let name = word[1..].split('@').next().unwrap_or_default();

        match name {
            "echo" if !rest.is_empty() => Some(Self::Echo(rest.to_string())),
            "memory" => Some(Self::MemoryStats),
            "clearmemory" => Some(Self::ClearMemory),
            _ => None,
        }
    }
}

/// Render stats for the `/memory` reply.
pub fn format_stats(stats: &MemoryStats) -> String {
    format!(
        "📊 Memory Stats:\n• Total chats: {}\n• Total size: {:.2} KB\n• Last cleanup: {}",
        stats.total_chats,
        stats.total_size as f64 / 1024.0,
        format_timestamp(stats.last_cleanup),
    )
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_echo() {
        assert_eq!(
            Command::parse("/echo hello world"),
            Some(Command::Echo("hello world".to_string()))
        );
    }

    #[test]
    fn test_parse_echo_without_text_is_not_a_command() {
        assert_eq!(Command::parse("/echo"), None);
        assert_eq!(Command::parse("/echo   "), None);
    }

    #[test]
    fn test_parse_memory_and_clear() {
        assert_eq!(Command::parse("/memory"), Some(Command::MemoryStats));
        assert_eq!(Command::parse("/clearmemory"), Some(Command::ClearMemory));
    }

    #[test]
    fn test_parse_strips_bot_mention() {
        assert_eq!(Command::parse("/memory@ollagram_bot"), Some(Command::MemoryStats));
        assert_eq!(
            Command::parse("/echo@ollagram_bot hi"),
            Some(Command::Echo("hi".to_string()))
        );
    }

    #[test]
    fn test_plain_text_is_not_a_command() {
        assert_eq!(Command::parse("hello"), None);
        assert_eq!(Command::parse("what is /memory?"), None);
    }

    #[test]
    fn test_unknown_command_falls_through() {
        assert_eq!(Command::parse("/start"), None);
    }

    #[test]
    fn test_format_stats() {
        let stats = MemoryStats {
            total_chats: 3,
            total_size: 2048,
            last_cleanup: DateTime::UNIX_EPOCH,
        };
        let rendered = format_stats(&stats);
        assert!(rendered.contains("Total chats: 3"));
        assert!(rendered.contains("2.00 KB"));
        assert!(rendered.contains("1970-01-01 00:00:00 UTC"));
    }
}
