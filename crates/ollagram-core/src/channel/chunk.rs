//! Message splitting for Telegram's 4096-character cap.
//!
//! Long model replies are split at paragraph boundaries where possible,
//! then line boundaries, then a hard cut on a `char` boundary.

/// Telegram hard limit for text messages.
pub const TELEGRAM_MAX_LEN: usize = 4096;

/// Split `text` into chunks of at most `limit` bytes, preferring natural
/// boundaries. Chunks are trimmed of the boundary newlines themselves.
pub fn split_text(text: &str, limit: usize) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    while remaining.len() > limit {
        let window = largest_char_prefix(remaining, limit);
        let mut cut = remaining[..window]
            .rfind("\n\n")
            .or_else(|| remaining[..window].rfind('\n'))
            .filter(|&pos| pos > 0)
            .unwrap_or(window);
        if cut == 0 {
            // Limit smaller than the first char; take that char whole
            // rather than looping.
            cut = remaining.chars().next().map_or(remaining.len(), char::len_utf8);
        }

        chunks.push(remaining[..cut].to_string());
        remaining = remaining[cut..].trim_start_matches('\n');
    }

    if !remaining.is_empty() {
        chunks.push(remaining.to_string());
    }

    chunks
}

/// Largest prefix length <= `limit` that ends on a char boundary.
fn largest_char_prefix(text: &str, limit: usize) -> usize {
    let mut end = limit.min(text.len());
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    end
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_single_chunk() {
        assert_eq!(split_text("hello", 100), vec!["hello".to_string()]);
    }

    #[test]
    fn test_empty_text_yields_nothing() {
        assert!(split_text("", 100).is_empty());
    }

    #[test]
    fn test_splits_at_paragraph_boundary() {
        let text = "first paragraph\n\nsecond paragraph";
        let chunks = split_text(text, 20);
        assert_eq!(chunks, vec!["first paragraph", "second paragraph"]);
    }

    #[test]
    fn test_falls_back_to_line_boundary() {
        let text = "line one\nline two\nline three";
        let chunks = split_text(text, 12);
        assert_eq!(chunks, vec!["line one", "line two", "line three"]);
    }

    #[test]
    fn test_hard_cut_without_newlines() {
        let text = "a".repeat(25);
        let chunks = split_text(&text, 10);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.len() <= 10));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_never_splits_inside_multibyte_char() {
        let text = "ü".repeat(20); // 2 bytes each
        let chunks = split_text(&text, 5);
        for chunk in &chunks {
            assert!(chunk.len() <= 5);
            assert!(chunk.chars().all(|c| c == 'ü'));
        }
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_respects_telegram_limit() {
        let text = "word ".repeat(2000);
        for chunk in split_text(&text, TELEGRAM_MAX_LEN) {
            assert!(chunk.len() <= TELEGRAM_MAX_LEN);
        }
    }
}
