//! Text chunking.
//!
//! This module provides the [`Chunker`] trait and [`BoundaryChunker`], which splits
//! text into segments of at most `max_len` characters, preferring to cut on
//! whitespace found within a bounded look-back window.

/// Default number of characters the chunker walks back looking for whitespace.
pub const DEFAULT_LOOKBACK: usize = 200;

/// A strategy for splitting text into ordered segments.
pub trait Chunker: Send + Sync {
    /// Split `text` into chunks. Returns an empty `Vec` for empty text.
    fn chunk(&self, text: &str) -> Vec<String>;
}

/// Splits text by character count, cutting on whitespace when possible.
///
/// Cut points are measured in characters, never bytes, so multi-byte
/// characters are never split. When the remaining text is longer than
/// `max_len`, the cut starts at `max_len` and walks back up to `lookback`
/// characters to land on whitespace. The whitespace begins the next chunk, so
/// concatenating all chunks reproduces the input exactly. Without whitespace in
/// the window the cut falls at exactly `max_len`.
///
/// # Example
///
/// ```rust
/// use policy_rag::{BoundaryChunker, Chunker};
///
/// let chunker = BoundaryChunker::new(10);
/// let chunks = chunker.chunk("annual leave is twelve days");
/// assert_eq!(chunks.concat(), "annual leave is twelve days");
/// assert!(chunks.iter().all(|c| c.chars().count() <= 10));
/// ```
#[derive(Debug, Clone)]
pub struct BoundaryChunker {
    max_len: usize,
    lookback: usize,
}

impl BoundaryChunker {
    /// Create a chunker with the default look-back window.
    ///
    /// A `max_len` of zero is treated as one.
    pub fn new(max_len: usize) -> Self {
        Self { max_len: max_len.max(1), lookback: DEFAULT_LOOKBACK }
    }

    /// Set how many characters to walk back looking for whitespace.
    pub fn with_lookback(mut self, lookback: usize) -> Self {
        self.lookback = lookback;
        self
    }

    /// Return the maximum chunk length in characters.
    pub fn max_len(&self) -> usize {
        self.max_len
    }
}

impl Chunker for BoundaryChunker {
    fn chunk(&self, text: &str) -> Vec<String> {
        let chars: Vec<(usize, char)> = text.char_indices().collect();
        let mut chunks = Vec::new();
        let mut start = 0;

        while chars.len() - start > self.max_len {
            let limit = start + self.max_len;
            // Never walk back to `start` itself, so every chunk is non-empty.
            let floor = limit.saturating_sub(self.lookback).max(start);
            let cut = (floor + 1..=limit)
                .rev()
                .find(|&i| chars[i].1.is_whitespace())
                .unwrap_or(limit);

            chunks.push(text[chars[start].0..chars[cut].0].to_string());
            start = cut;
        }

        if start < chars.len() {
            chunks.push(text[chars[start].0..].to_string());
        }

        chunks
    }
}

/// Split `text` into chunks of at most `max_len` characters using the default look-back.
pub fn chunk_text(text: &str, max_len: usize) -> Vec<String> {
    BoundaryChunker::new(max_len).chunk(text)
}
