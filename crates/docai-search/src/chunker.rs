//! Sentence-based chunking of Markdown prose.
//!
//! Code is stripped before chunking: fenced blocks (```` ``` ```` or `~~~`)
//! and inline spans are discarded, so chunks carry prose only. Chunks are for
//! embedding and display, not for reconstructing the source document.

use docai_core::{Chunk, Metadata};
use once_cell::sync::Lazy;
use regex::Regex;

static FENCED_BACKTICK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```[\s\S]*?```").expect("valid fenced code regex"));
static FENCED_TILDE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"~~~[\s\S]*?~~~").expect("valid fenced code regex"));
static INLINE_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"`[^`\n]+`").expect("valid inline code regex"));
static SENTENCE_BOUNDARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.!?]+\s+").expect("valid sentence regex"));

/// Default maximum characters per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;
/// Default characters carried over from the previous chunk.
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// Splits document text into overlapping, size-bounded chunks.
///
/// # Examples
///
/// ```
/// use docai_core::Metadata;
/// use docai_search::chunker::Chunker;
///
/// let chunker = Chunker::default();
/// let chunks = chunker.chunk("Install it. Then run `mkdocs serve`. Done!", &Metadata::new());
/// assert_eq!(chunks.len(), 1);
/// assert_eq!(chunks[0].text, "Install it Then run Done!");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_OVERLAP)
    }
}

impl Chunker {
    /// Create a chunker with the given size and overlap, both in characters.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
        }
    }

    /// Maximum characters per chunk before a split.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Characters carried into the next chunk.
    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Chunk `text`, copying `metadata` onto every chunk.
    ///
    /// Sentences are joined with single spaces until the next one would push
    /// the chunk past `chunk_size`. The following chunk starts with the last
    /// `chunk_overlap` characters of the closed one, then the sentence that
    /// triggered the split. A sentence longer than `chunk_size` is kept whole.
    pub fn chunk(&self, text: &str, metadata: &Metadata) -> Vec<Chunk> {
        let prose = strip_code(text);

        let mut chunks = Vec::new();
        let mut current = String::new();
        let mut current_len = 0usize;

        for sentence in split_sentences(&prose) {
            let sentence_len = sentence.chars().count();

            if current.is_empty() {
                current.push_str(sentence);
                current_len = sentence_len;
                continue;
            }

            if current_len + 1 + sentence_len > self.chunk_size {
                let closed = std::mem::take(&mut current);
                let seed = tail_chars(&closed, self.chunk_overlap);
                if !seed.is_empty() {
                    current.push_str(seed);
                    current.push(' ');
                }
                current.push_str(sentence);
                current_len = current.chars().count();
                chunks.push(Chunk::new(closed, metadata.clone()));
            } else {
                current.push(' ');
                current.push_str(sentence);
                current_len += 1 + sentence_len;
            }
        }

        if !current.is_empty() {
            chunks.push(Chunk::new(current, metadata.clone()));
        }

        chunks
    }
}

/// Remove fenced code blocks and inline code spans.
///
/// Fences are matched lazily, so prose between two blocks survives.
///
/// # Examples
///
/// ```
/// use docai_search::chunker::strip_code;
///
/// let text = "Before.\n```rust\nfn main() {}\n```\nAfter `x` here.";
/// assert_eq!(strip_code(text), "Before.\n\nAfter  here.");
/// ```
pub fn strip_code(text: &str) -> String {
    let without_backticks = FENCED_BACKTICK.replace_all(text, "");
    let without_fences = FENCED_TILDE.replace_all(&without_backticks, "");
    INLINE_CODE.replace_all(&without_fences, "").into_owned()
}

/// Split prose into trimmed, non-empty sentences.
///
/// A boundary is a run of `.`, `!`, or `?` followed by whitespace; the
/// boundary itself is dropped. Abbreviations and decimals may mis-split.
///
/// # Examples
///
/// ```
/// use docai_search::chunker::split_sentences;
///
/// let sentences = split_sentences("Hello there. How are you?! Fine.");
/// assert_eq!(sentences, vec!["Hello there", "How are you", "Fine."]);
/// ```
pub fn split_sentences(text: &str) -> Vec<&str> {
    SENTENCE_BOUNDARY
        .split(text)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// The last `n` characters of `text` (all of it when shorter).
fn tail_chars(text: &str, n: usize) -> &str {
    if n == 0 {
        return "";
    }
    match text.char_indices().rev().nth(n - 1) {
        Some((idx, _)) => &text[idx..],
        None => text,
    }
}
