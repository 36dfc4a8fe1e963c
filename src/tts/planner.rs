//! Sentence splitting and length-bounded chunk packing.
//!
//! ```text
//! "First. Second! Third?"  ──split_sentences──▶  ["First.", "Second!", "Third?"]
//!                          ──pack (max 15)────▶  ["First. Second!", "Third?"]
//! ```
//!
//! [`ChunkPlanner::plan`] additionally rejects plans that are not worth
//! running in parallel (a single chunk, or a fragment too short to
//! synthesize reliably).  [`split_at_sentence_breaks`] is the simpler split
//! used by the sentence-by-sentence fallback tier.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::config::TtsConfig;

/// A run of terminal punctuation; it stays attached to its sentence.
static TERMINAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]+").expect("valid regex"));

/// Terminal punctuation followed by whitespace.
static SENTENCE_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]\s+").expect("valid regex"));

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One bounded piece of text destined for a single synthesis call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    pub content: String,
    /// Position in the original text, starting at 0.
    pub ordinal: usize,
}

/// Why a text was judged not chunkable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("text has no sentences")]
    Empty,

    /// Everything fits in one chunk; parallel synthesis gains nothing.
    #[error("plan has a single chunk")]
    SingleChunk,

    /// A chunk is too short to synthesize reliably.
    #[error("chunk {ordinal} has {len} chars, below the minimum of {min}")]
    UndersizedChunk { ordinal: usize, len: usize, min: usize },
}

// ---------------------------------------------------------------------------
// Splitting
// ---------------------------------------------------------------------------

/// Split `text` after every run of `.`, `!` or `?`, keeping the punctuation.
///
/// Pieces are trimmed and blank pieces dropped; trailing text without
/// terminal punctuation becomes the last sentence.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    for m in TERMINAL.find_iter(text) {
        let sentence = text[start..m.end()].trim();
        if !sentence.is_empty() {
            sentences.push(sentence);
        }
        start = m.end();
    }
    let rest = text[start..].trim();
    if !rest.is_empty() {
        sentences.push(rest);
    }
    sentences
}

/// Split `text` only where whitespace follows terminal punctuation.
///
/// Unlike [`split_sentences`], `"3.5"` or `"e.g.x"` never split.
pub fn split_at_sentence_breaks(text: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    for m in SENTENCE_BREAK.find_iter(text) {
        // Terminal punctuation is a single ASCII byte.
        pieces.push(&text[start..m.start() + 1]);
        start = m.end();
    }
    pieces.push(&text[start..]);
    pieces
        .into_iter()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

// ---------------------------------------------------------------------------
// ChunkPlanner
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct ChunkPlanner {
    pub max_chunk_chars: usize,
    pub min_chunk_chars: usize,
}

impl ChunkPlanner {
    pub fn new(max_chunk_chars: usize, min_chunk_chars: usize) -> Self {
        Self {
            max_chunk_chars,
            min_chunk_chars,
        }
    }

    pub fn from_config(config: &TtsConfig) -> Self {
        Self::new(config.max_chunk_chars, config.min_chunk_chars)
    }

    /// Greedily pack sentences into chunks of at most `max_chunk_chars`.
    ///
    /// Sentences are joined with a single space, which counts toward the
    /// bound.  A sentence longer than the bound becomes its own oversized
    /// chunk.  Lengths count `char`s.
    pub fn pack(&self, text: &str) -> Vec<TextChunk> {
        let mut contents: Vec<String> = Vec::new();
        let mut current = String::new();
        let mut current_len = 0;

        for sentence in split_sentences(text) {
            let len = sentence.chars().count();
            // Joining costs one space.
            if !current.is_empty() && current_len + 1 + len > self.max_chunk_chars {
                contents.push(std::mem::take(&mut current));
                current_len = 0;
            }
            if !current.is_empty() {
                current.push(' ');
                current_len += 1;
            }
            current.push_str(sentence);
            current_len += len;
        }
        if !current.is_empty() {
            contents.push(current);
        }

        contents
            .into_iter()
            .enumerate()
            .map(|(ordinal, content)| TextChunk { content, ordinal })
            .collect()
    }

    /// Pack `text` and accept the result only if it is worth parallelising.
    ///
    /// # Errors
    ///
    /// [`PlanError::SingleChunk`] when everything fits in one chunk, and
    /// [`PlanError::UndersizedChunk`] for the first chunk shorter than
    /// `min_chunk_chars`.
    pub fn plan(&self, text: &str) -> Result<Vec<TextChunk>, PlanError> {
        let chunks = self.pack(text);
        match chunks.len() {
            0 => return Err(PlanError::Empty),
            1 => return Err(PlanError::SingleChunk),
            _ => {}
        }
        if let Some(small) = chunks
            .iter()
            .find(|c| c.content.chars().count() < self.min_chunk_chars)
        {
            return Err(PlanError::UndersizedChunk {
                ordinal: small.ordinal,
                len: small.content.chars().count(),
                min: self.min_chunk_chars,
            });
        }
        Ok(chunks)
    }
}

impl Default for ChunkPlanner {
    fn default() -> Self {
        Self::from_config(&TtsConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // ---- split_sentences ---------------------------------------------------

    #[test]
    fn split_keeps_punctuation() {
        assert_eq!(
            split_sentences("Hello there. How are you? Fine!"),
            vec!["Hello there.", "How are you?", "Fine!"]
        );
    }

    #[test]
    fn split_keeps_punctuation_runs_together() {
        assert_eq!(split_sentences("Wait... What?!"), vec!["Wait...", "What?!"]);
    }

    #[test]
    fn split_keeps_unterminated_tail() {
        assert_eq!(split_sentences("One. and then"), vec!["One.", "and then"]);
    }

    #[test]
    fn split_empty_text() {
        assert!(split_sentences("   ").is_empty());
    }

    // ---- split_at_sentence_breaks ------------------------------------------

    #[test]
    fn sentence_breaks_need_whitespace() {
        assert_eq!(
            split_at_sentence_breaks("Pi is 3.14 roughly.  Next one!\nLast"),
            vec!["Pi is 3.14 roughly.", "Next one!", "Last"]
        );
    }

    #[test]
    fn sentence_breaks_skip_blank_pieces() {
        assert_eq!(split_at_sentence_breaks("Only. "), vec!["Only."]);
        assert!(split_at_sentence_breaks("  ").is_empty());
    }

    // ---- pack / plan -------------------------------------------------------

    #[test]
    fn pack_short_text_is_one_chunk_equal_to_input() {
        let planner = ChunkPlanner::new(150, 5);
        let chunks = planner.pack("Hello there.");
        assert_eq!(
            chunks,
            vec![TextChunk {
                content: "Hello there.".into(),
                ordinal: 0
            }]
        );
    }

    #[test]
    fn pack_respects_bound_and_order() {
        let planner = ChunkPlanner::new(20, 1);
        let chunks = planner.pack("Aaaa aaaa. Bbbb bbbb. Cccc cccc. Dddd.");
        let contents: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        // 10 + 1 + 10 = 21 chars would overflow the bound by the joining space.
        assert_eq!(contents, vec!["Aaaa aaaa.", "Bbbb bbbb.", "Cccc cccc. Dddd."]);
        let ordinals: Vec<usize> = chunks.iter().map(|c| c.ordinal).collect();
        assert_eq!(ordinals, vec![0, 1, 2]);
    }

    #[test]
    fn pack_fills_exactly_to_the_bound() {
        let planner = ChunkPlanner::new(21, 1);
        let chunks = planner.pack("Aaaa aaaa. Bbbb bbbb. Cccc.");
        assert_eq!(chunks[0].content, "Aaaa aaaa. Bbbb bbbb.");
        assert_eq!(chunks[1].content, "Cccc.");
    }

    #[test]
    fn multi_sentence_chunks_never_exceed_the_bound() {
        let text = "One two. Three four five! Six? Seven eight nine ten. Eleven. \
                    Twelve thirteen fourteen. Fifteen sixteen! Seventeen.";
        for max in 8..=40 {
            let planner = ChunkPlanner::new(max, 1);
            for chunk in planner.pack(text) {
                if split_sentences(&chunk.content).len() >= 2 {
                    let len = chunk.content.chars().count();
                    assert!(len <= max, "max {max}: {len} chars in {:?}", chunk.content);
                }
            }
        }
    }

    #[test]
    fn pack_keeps_oversized_sentence_whole() {
        let planner = ChunkPlanner::new(10, 1);
        let chunks = planner.pack("This sentence is far too long. Ok.");
        assert_eq!(chunks[0].content, "This sentence is far too long.");
        assert_eq!(chunks[1].content, "Ok.");
    }

    #[test]
    fn pack_counts_chars_not_bytes() {
        let planner = ChunkPlanner::new(13, 1);
        // 13 chars joined, but 15 bytes.
        let chunks = planner.pack("héllo. wörld.");
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn plan_single_chunk_is_not_chunkable() {
        let planner = ChunkPlanner::new(150, 5);
        assert_eq!(planner.plan("Just one sentence."), Err(PlanError::SingleChunk));
    }

    #[test]
    fn plan_undersized_chunk_is_not_chunkable() {
        let planner = ChunkPlanner::new(20, 5);
        let err = planner.plan("A fairly long sentence here. Ok.").unwrap_err();
        assert_eq!(
            err,
            PlanError::UndersizedChunk {
                ordinal: 1,
                len: 3,
                min: 5
            }
        );
    }

    #[test]
    fn plan_empty_text() {
        assert_eq!(ChunkPlanner::default().plan(""), Err(PlanError::Empty));
    }

    #[test]
    fn plan_long_prose_is_chunkable() {
        let text = "The quick brown fox jumps over the lazy dog near the river bank. ".repeat(5);
        let chunks = ChunkPlanner::default().plan(&text).unwrap();
        assert!(chunks.len() >= 2);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.ordinal, i);
            assert!(chunk.content.chars().count() <= 150);
        }
    }
}
