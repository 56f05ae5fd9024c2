//! Overlapping, boundary-aware text chunking for retrieval

use crate::error::{Error, Result};

/// Sentence/paragraph boundary markers, in priority order
const BOUNDARY_MARKERS: [&str; 5] = ["\n\n", ". ", ".\n", "!\n", "?\n"];

/// Split text into overlapping chunks for better context preservation.
///
/// Walks the text in windows of `chunk_size` bytes. For each window that ends
/// before the end of the text, the window end is pulled back to the nearest
/// boundary marker, provided the boundary lies at or after the half-way point
/// of the window. Consecutive chunks share `overlap` bytes of context.
///
/// Chunks are trimmed of surrounding whitespace; chunks that trim to empty
/// are dropped. Returns an empty vector for empty input.
pub fn chunk_text_with_overlap(
    text: &str,
    chunk_size: usize,
    overlap: usize,
) -> Result<Vec<String>> {
    if chunk_size == 0 {
        return Err(Error::config("chunk_size must be greater than zero"));
    }
    if overlap >= chunk_size {
        return Err(Error::config(format!(
            "chunk overlap ({}) must be smaller than chunk size ({})",
            overlap, chunk_size
        )));
    }

    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    if text.len() <= chunk_size {
        return Ok(vec![trimmed.to_string()]);
    }

    let half_window = (chunk_size as f64 * 0.5) as usize;
    let mut chunks = Vec::new();
    let mut start = 0usize;

    while start < text.len() {
        let mut end = (start + chunk_size).min(text.len());
        while end < text.len() && !text.is_char_boundary(end) {
            end -= 1;
        }

        if end < text.len() {
            let window = &text[start..end];
            for marker in BOUNDARY_MARKERS {
                if let Some(pos) = window.rfind(marker) {
                    if pos >= half_window {
                        end = start + pos + marker.len();
                        break;
                    }
                }
            }
        }

        let chunk = text[start..end].trim();
        if !chunk.is_empty() {
            chunks.push(chunk.to_string());
        }

        if end >= text.len() {
            break;
        }

        let mut next = end.saturating_sub(overlap);
        while next > 0 && !text.is_char_boundary(next) {
            next -= 1;
        }
        // The loop must strictly advance; a boundary snapped far enough back
        // that `end - overlap` lands at or before `start` would stall it.
        if next <= start {
            next = end;
        }
        start = next;
    }

    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_returns_no_chunks() {
        assert!(chunk_text_with_overlap("", 500, 100).unwrap().is_empty());
        assert!(chunk_text_with_overlap("   \n\t ", 500, 100).unwrap().is_empty());
    }

    #[test]
    fn test_short_text_returns_single_trimmed_chunk() {
        let chunks = chunk_text_with_overlap("  Hello, world.  ", 500, 100).unwrap();
        assert_eq!(chunks, vec!["Hello, world."]);
    }

    #[test]
    fn test_overlap_must_be_smaller_than_chunk_size() {
        assert!(chunk_text_with_overlap("some text", 100, 100).is_err());
        assert!(chunk_text_with_overlap("some text", 100, 150).is_err());
    }

    #[test]
    fn test_no_empty_chunks() {
        let text = "word ".repeat(400);
        let chunks = chunk_text_with_overlap(&text, 100, 20).unwrap();
        assert!(!chunks.is_empty());
        assert!(chunks.iter().all(|c| !c.is_empty()));
    }

    #[test]
    fn test_adjacent_chunks_overlap() {
        // Uniform sentences so boundary snapping stays predictable
        let text = "The quick brown fox jumps over the dog. ".repeat(50);
        let chunks = chunk_text_with_overlap(&text, 200, 50).unwrap();
        assert!(chunks.len() > 1);
        for pair in chunks.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            // The head of each chunk must appear near the tail of the previous
            let head: String = next.chars().take(20).collect();
            assert!(
                prev.contains(&head),
                "chunks should share overlapping context: {:?} / {:?}",
                prev,
                next
            );
        }
    }

    #[test]
    fn test_prefers_sentence_boundary() {
        let mut text = String::new();
        text.push_str(&"a".repeat(380));
        text.push_str(". ");
        text.push_str(&"b".repeat(300));
        let chunks = chunk_text_with_overlap(&text, 500, 100).unwrap();
        // First window ends at the period, not at the raw 500-byte cut
        assert!(chunks[0].ends_with('.'));
        assert_eq!(chunks[0].len(), 381);
    }

    #[test]
    fn test_hard_split_without_boundary() {
        let text = "x".repeat(1200);
        let chunks = chunk_text_with_overlap(&text, 500, 100).unwrap();
        assert_eq!(chunks[0].len(), 500);
        assert!(chunks.len() >= 2);
    }

    #[test]
    fn test_boundary_before_half_window_is_ignored() {
        let mut text = String::new();
        text.push_str(&"a".repeat(100));
        text.push_str(". ");
        text.push_str(&"b".repeat(600));
        let chunks = chunk_text_with_overlap(&text, 500, 100).unwrap();
        // The only boundary sits at 20% of the window, so the cut is hard
        assert_eq!(chunks[0].len(), 500);
    }

    #[test]
    fn test_multibyte_text_respects_char_boundaries() {
        let text = "é".repeat(800);
        let chunks = chunk_text_with_overlap(&text, 500, 100).unwrap();
        assert!(chunks.iter().all(|c| c.chars().all(|ch| ch == 'é')));
    }

    #[test]
    fn test_terminates_with_large_overlap() {
        let text = "Sentence one here. ".repeat(100);
        // overlap beyond half the window can stall a naive implementation
        let chunks = chunk_text_with_overlap(&text, 200, 180).unwrap();
        assert!(!chunks.is_empty());
    }
}
