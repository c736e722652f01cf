//! Greedy character-window text splitter.
//!
//! Splits document text into overlapping chunks of a fixed character size
//! (default 300 with 100 characters of overlap). Window ends snap back to
//! the nearest whitespace so words are not cut mid-way. Splitting is fully
//! deterministic: the same input always yields the same chunk boundaries.
//!
//! Sizes are measured in characters, not bytes, so multi-byte text never
//! splits inside a code point.

/// Split text into overlapping chunks.
///
/// Each window is at most `chunk_size` characters; consecutive windows share
/// `overlap` characters of context. Whitespace-only input yields no chunks.
pub fn split_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    assert!(chunk_size > 0, "chunk_size must be > 0");
    assert!(overlap < chunk_size, "overlap must be < chunk_size");

    let chars: Vec<char> = text.chars().collect();
    let mut chunks = Vec::new();
    let mut start = 0usize;

    while start < chars.len() {
        let hard_end = (start + chunk_size).min(chars.len());
        let mut end = hard_end;

        // Snap back to the last whitespace inside the window, unless that
        // would leave an empty window.
        if hard_end < chars.len() {
            if let Some(ws) = chars[start..hard_end].iter().rposition(|c| c.is_whitespace()) {
                if ws > 0 {
                    end = start + ws + 1;
                }
            }
        }

        let piece: String = chars[start..end].iter().collect();
        let trimmed = piece.trim();
        if !trimmed.is_empty() {
            chunks.push(trimmed.to_string());
        }

        if end >= chars.len() {
            break;
        }

        // Step forward, re-reading `overlap` characters of the previous
        // window. The max() guard guarantees progress even when the snapped
        // window is shorter than the overlap.
        start = end.saturating_sub(overlap).max(start + 1);
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_single_chunk() {
        let chunks = split_text("Hello, world!", 300, 100);
        assert_eq!(chunks, vec!["Hello, world!".to_string()]);
    }

    #[test]
    fn test_empty_text_no_chunks() {
        assert!(split_text("", 300, 100).is_empty());
        assert!(split_text("   \n\t  ", 300, 100).is_empty());
    }

    #[test]
    fn test_long_text_multiple_chunks() {
        let text = "word ".repeat(200);
        let chunks = split_text(&text, 300, 100);
        assert!(chunks.len() > 1);
        for c in &chunks {
            assert!(c.chars().count() <= 300, "chunk too long: {}", c.len());
        }
    }

    #[test]
    fn test_deterministic() {
        let text = (0..80)
            .map(|i| format!("Sentence number {} about therapy techniques.", i))
            .collect::<Vec<_>>()
            .join(" ");
        let a = split_text(&text, 300, 100);
        let b = split_text(&text, 300, 100);
        assert_eq!(a, b);
    }

    #[test]
    fn test_overlap_shares_context() {
        let text = "alpha beta gamma delta ".repeat(40);
        let chunks = split_text(&text, 100, 40);
        assert!(chunks.len() > 2);
        // Each chunk after the first starts with text present near the end
        // of its predecessor.
        for pair in chunks.windows(2) {
            let head: String = pair[1].chars().take(10).collect();
            assert!(
                pair[0].contains(head.trim()),
                "no overlap between '{}' and '{}'",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn test_window_ends_snap_to_whitespace() {
        // With the overlap aligned to the word length, every window starts
        // and ends on a word boundary.
        let text = "therapy ".repeat(100);
        for chunk in split_text(&text, 50, 16) {
            for word in chunk.split_whitespace() {
                assert_eq!(word, "therapy");
            }
        }
    }

    #[test]
    fn test_unbreakable_run_hard_splits() {
        let text = "x".repeat(1000);
        let chunks = split_text(&text, 300, 100);
        assert!(!chunks.is_empty());
        for c in &chunks {
            assert!(c.chars().count() <= 300);
        }
    }

    #[test]
    fn test_multibyte_text_safe() {
        let text = "терапия помогает людям ".repeat(30);
        let chunks = split_text(&text, 100, 30);
        assert!(!chunks.is_empty());
        let a = split_text(&text, 100, 30);
        assert_eq!(chunks, a);
    }
}
