//! Character-window chunking with boundary snapping and overlap.
//!
//! Extracted PDF text is split into windows of at most `chunk_size` characters before it is
//! handed to the summarizer. Highlights:
//!
//! - Offsets are counted in characters (Unicode scalar values), never bytes, so multi-byte text
//!   is never cut inside a code point.
//! - Boundary snapping: a window that does not reach the end of the text is pulled back to the
//!   last sentence end (`". "`), blank line (`"\n\n"`) or line break (`"\n"`) inside it, in that
//!   order of preference. A boundary sitting on the window start is ignored.
//! - Overlap: the next window starts `overlap` characters before the previous end, so context
//!   around a boundary is visible to both summaries. The step is not clamped to the previous
//!   window's end, which means a snapped window can be partially re-read.
//! - Progress: a step that would not move past the current start either stops the loop
//!   (`overlap >= chunk_size`) or resumes at the snapped end without overlap.

use super::types::ChunkingError;

/// Default maximum number of characters per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;
/// Default number of characters repeated between consecutive chunks.
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// Validated chunking parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkConfig {
    chunk_size: usize,
    overlap: usize,
}

impl ChunkConfig {
    /// Build a configuration, rejecting sizes that cannot make forward progress.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self, ChunkingError> {
        if chunk_size == 0 {
            return Err(ChunkingError::InvalidChunkSize);
        }
        if overlap >= chunk_size {
            return Err(ChunkingError::OverlapTooLarge {
                overlap,
                chunk_size,
            });
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    /// Maximum characters per chunk.
    pub const fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Characters repeated between neighbouring chunks.
    pub const fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split `text` into chunk strings using this configuration.
    pub fn split(&self, text: &str) -> Vec<String> {
        chunk_text(text, self.chunk_size, self.overlap)
    }

    /// Split `text` into chunks carrying their character offsets.
    pub fn split_spans(&self, text: &str) -> Vec<TextChunk> {
        chunk_spans(text, self.chunk_size, self.overlap)
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

/// A contiguous `[start, end)` character range of the source text and its contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// Character offset of the first character in the chunk.
    pub start: usize,
    /// Character offset one past the last character in the chunk.
    pub end: usize,
    /// Materialized chunk contents.
    pub text: String,
}

impl TextChunk {
    /// Number of characters in the chunk.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether the chunk covers no characters.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Split `text` into overlapping chunks of at most `chunk_size` characters.
///
/// Accepts any configuration: a zero `chunk_size` is treated as `1`, and an `overlap` that is
/// not smaller than `chunk_size` stops after the first window instead of looping. Callers that
/// want such configurations rejected should go through [`ChunkConfig::new`].
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    chunk_spans(text, chunk_size, overlap)
        .into_iter()
        .map(|chunk| chunk.text)
        .collect()
}

/// Span-returning form of [`chunk_text`].
pub fn chunk_spans(text: &str, chunk_size: usize, overlap: usize) -> Vec<TextChunk> {
    let offsets = CharOffsets::new(text);
    let len = offsets.char_len();
    let chunk_size = chunk_size.max(1);

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < len {
        let mut end = start.saturating_add(chunk_size).min(len);
        if end < len {
            end = snap_boundary(text, &offsets, start, end);
        }

        chunks.push(TextChunk {
            start,
            end,
            text: text[offsets.byte(start)..offsets.byte(end)].to_string(),
        });

        if end >= len {
            break;
        }

        let mut next_start = end.saturating_sub(overlap);
        if next_start <= start {
            if overlap >= chunk_size {
                tracing::debug!(
                    chunk_size,
                    overlap,
                    emitted = chunks.len(),
                    "Overlap leaves no room to advance; stopping"
                );
                break;
            }
            next_start = end;
        }
        start = next_start;
    }

    chunks
}

/// Pull `end` back to the preferred boundary inside `[start, end)`, if one exists.
fn snap_boundary(text: &str, offsets: &CharOffsets, start: usize, end: usize) -> usize {
    const BOUNDARIES: [(&str, usize); 3] = [(". ", 1), ("\n\n", 2), ("\n", 1)];

    let window_start = offsets.byte(start);
    let window = &text[window_start..offsets.byte(end)];

    for (pattern, keep) in BOUNDARIES {
        if let Some(found) = window.rfind(pattern) {
            let position = offsets.char_at(window_start + found);
            if position > start {
                return position + keep;
            }
        }
    }

    end
}

/// Byte offset of every character boundary, plus the total byte length.
struct CharOffsets(Vec<usize>);

impl CharOffsets {
    fn new(text: &str) -> Self {
        let mut offsets: Vec<usize> = text.char_indices().map(|(index, _)| index).collect();
        offsets.push(text.len());
        Self(offsets)
    }

    fn char_len(&self) -> usize {
        self.0.len() - 1
    }

    fn byte(&self, char_index: usize) -> usize {
        self.0[char_index]
    }

    fn char_at(&self, byte_index: usize) -> usize {
        self.0
            .binary_search(&byte_index)
            .unwrap_or_else(|insert_at| insert_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_input_yields_single_chunk() {
        let chunks = chunk_text("hello world", 1000, 200);
        assert_eq!(chunks, vec!["hello world"]);
    }

    #[test]
    fn empty_input_yields_no_chunks() {
        assert!(chunk_text("", 1000, 200).is_empty());
    }

    #[test]
    fn snaps_to_sentence_end() {
        let text = format!("A. B. C. {}", "x".repeat(995));
        let chunks = chunk_text(&text, 1000, 0);
        assert_eq!(chunks[0], "A. B. C.");
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn prefers_blank_line_over_single_newline() {
        let text = format!("intro\n\nbody line\nmore{}", "y".repeat(40));
        let spans = chunk_spans(&text, 30, 0);
        assert_eq!(spans[0].text, "intro\n\n");
        assert_eq!(spans[1].start, 7);
    }

    #[test]
    fn falls_back_to_single_newline() {
        let text = format!("first line\nsecond{}", "z".repeat(40));
        let chunks = chunk_text(&text, 20, 0);
        assert_eq!(chunks[0], "first line\n");
    }

    #[test]
    fn hard_cut_without_boundaries() {
        let text = "a".repeat(25);
        let spans = chunk_spans(&text, 10, 0);
        let ranges: Vec<_> = spans.iter().map(|span| (span.start, span.end)).collect();
        assert_eq!(ranges, vec![(0, 10), (10, 20), (20, 25)]);
    }

    #[test]
    fn boundary_at_window_start_is_ignored() {
        // ". " sits at offset 0, so the window must fall through to a hard cut.
        let text = format!(". {}", "q".repeat(30));
        let spans = chunk_spans(&text, 10, 0);
        assert_eq!(spans[0].end, 10);
    }

    #[test]
    fn overlap_repeats_tail_as_next_head() {
        let text: String = ('a'..='z').cycle().take(60).collect();
        let chunks = chunk_text(&text, 20, 5);
        for pair in chunks.windows(2) {
            let tail: String = pair[0].chars().skip(pair[0].chars().count() - 5).collect();
            let head: String = pair[1].chars().take(5).collect();
            assert_eq!(tail, head);
        }
    }

    #[test]
    fn degenerate_overlap_terminates() {
        let chunks = chunk_text("abcdefghijklmnopqrstuvwxyz", 10, 10);
        assert_eq!(chunks, vec!["abcdefghij"]);
    }

    #[test]
    fn zero_chunk_size_is_treated_as_one() {
        let chunks = chunk_text("abc", 0, 0);
        assert_eq!(chunks, vec!["a", "b", "c"]);
    }

    #[test]
    fn snap_inside_overlap_resumes_at_end() {
        // The only sentence end is close to the window start, so `end - overlap` would step
        // backwards past `start`.
        let text = format!("Hi. {}", "w".repeat(40));
        let spans = chunk_spans(&text, 20, 10);
        assert_eq!(spans[0].text, "Hi.");
        assert_eq!(spans[1].start, 3);
        assert_eq!(spans.last().map(|span| span.end), Some(44));
    }

    #[test]
    fn counts_characters_not_bytes() {
        let text = "é".repeat(12);
        let chunks = chunk_text(&text, 5, 0);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].chars().count(), 5);
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn multibyte_text_snaps_on_char_offsets() {
        let text = format!("ünï. cødé {}", "ß".repeat(20));
        let spans = chunk_spans(&text, 15, 0);
        assert_eq!(spans[0].text, "ünï.");
        assert_eq!((spans[0].start, spans[0].end), (0, 4));
    }

    #[test]
    fn config_rejects_impossible_values() {
        assert!(matches!(
            ChunkConfig::new(0, 0),
            Err(ChunkingError::InvalidChunkSize)
        ));
        assert!(matches!(
            ChunkConfig::new(10, 10),
            Err(ChunkingError::OverlapTooLarge {
                overlap: 10,
                chunk_size: 10
            })
        ));
        let config = ChunkConfig::new(10, 3).expect("valid config");
        assert_eq!((config.chunk_size(), config.overlap()), (10, 3));
    }

    #[test]
    fn default_config_matches_documented_values() {
        let config = ChunkConfig::default();
        assert_eq!(config.chunk_size(), 1000);
        assert_eq!(config.overlap(), 200);
    }
}
