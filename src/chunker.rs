//! Query chunking
//!
//! Splits a free-form query into whitespace-bounded chunks of at most
//! `max_chars` characters so each sub-query fits the answer model's input.
//! Words are never broken: a word longer than the limit becomes its own chunk.

use crate::error::PipelineError;
use crate::Result;
use serde::{Deserialize, Serialize};

/// Default maximum chunk size, kept well below a 512-token model limit
pub const DEFAULT_CHUNK_SIZE: usize = 400;

/// A bounded piece of the original query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryChunk {
    /// Position of the chunk in the query (0-based)
    pub index: usize,
    pub text: String,
}

impl QueryChunk {
    /// Length in characters
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Greedy whitespace chunker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryChunker {
    max_chars: usize,
}

impl QueryChunker {
    /// Create a chunker. A zero size can never produce a valid chunk and is rejected.
    pub fn new(max_chars: usize) -> Result<Self> {
        if max_chars == 0 {
            return Err(PipelineError::ChunkingError(
                "chunk size must be greater than zero".to_string(),
            ));
        }

        Ok(Self { max_chars })
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    /// Split `query` into chunks, left to right.
    ///
    /// Runs of whitespace collapse into single spaces, so joining the chunks
    /// with `" "` yields the whitespace-normalized query.
    pub fn chunk(&self, query: &str) -> Vec<QueryChunk> {
        let mut chunks = Vec::new();
        let mut current = String::new();
        let mut current_len = 0usize;

        for word in query.split_whitespace() {
            let word_len = word.chars().count();

            if current_len > 0 && current_len + 1 + word_len > self.max_chars {
                Self::flush(&mut chunks, &mut current);
                current_len = 0;
            }

            if current_len > 0 {
                current.push(' ');
                current_len += 1;
            }
            current.push_str(word);
            current_len += word_len;
        }

        Self::flush(&mut chunks, &mut current);
        chunks
    }

    fn flush(chunks: &mut Vec<QueryChunk>, current: &mut String) {
        if current.is_empty() {
            return;
        }

        chunks.push(QueryChunk {
            index: chunks.len(),
            text: std::mem::take(current),
        });
    }
}

impl Default for QueryChunker {
    fn default() -> Self {
        Self {
            max_chars: DEFAULT_CHUNK_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalized(text: &str) -> String {
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    fn joined(chunks: &[QueryChunk]) -> String {
        chunks
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_zero_size_rejected() {
        let result = QueryChunker::new(0);
        assert!(matches!(result, Err(PipelineError::ChunkingError(_))));
    }

    #[test]
    fn test_empty_and_blank_queries() {
        let chunker = QueryChunker::default();
        assert!(chunker.chunk("").is_empty());
        assert!(chunker.chunk("   \n\t  ").is_empty());
    }

    #[test]
    fn test_short_query_single_chunk() {
        let chunker = QueryChunker::default();
        let chunks = chunker.chunk("What is the average price per region?");

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].index, 0);
        assert_eq!(chunks[0].text, "What is the average price per region?");
    }

    #[test]
    fn test_repeated_pattern_splits_at_space() {
        let chunker = QueryChunker::new(400).unwrap();
        let query = "a b ".repeat(150);
        assert_eq!(query.len(), 600);

        let chunks = chunker.chunk(&query);

        assert!(chunks.len() >= 2);
        for chunk in &chunks {
            assert!(chunk.char_len() <= 400);
            assert!(!chunk.text.starts_with(' '));
            assert!(!chunk.text.ends_with(' '));
        }
        assert_eq!(joined(&chunks), normalized(&query));
    }

    #[test]
    fn test_long_word_emitted_whole() {
        let chunker = QueryChunker::new(10).unwrap();
        let long_word = "x".repeat(25);
        let query = format!("tiny {} tail", long_word);

        let chunks = chunker.chunk(&query);

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["tiny", long_word.as_str(), "tail"]);
    }

    #[test]
    fn test_lossless_and_bounded_over_mixed_input() {
        let chunker = QueryChunker::new(16).unwrap();
        let query = "  the  quick\tbrown fox\njumps over   the lazy dog and keeps on running  ";

        let chunks = chunker.chunk(query);

        for chunk in &chunks {
            assert!(!chunk.text.is_empty());
            assert!(chunk.char_len() <= 16);
        }
        assert_eq!(joined(&chunks), normalized(query));

        let indices: Vec<usize> = chunks.iter().map(|c| c.index).collect();
        assert_eq!(indices, (0..chunks.len()).collect::<Vec<_>>());
    }

    #[test]
    fn test_counts_chars_not_bytes() {
        let chunker = QueryChunker::new(5).unwrap();
        let chunks = chunker.chunk("éé éé");

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "éé éé");
    }

    #[test]
    fn test_deterministic() {
        let chunker = QueryChunker::new(12).unwrap();
        let query = "same input gives the same chunks every single time";
        assert_eq!(chunker.chunk(query), chunker.chunk(query));
    }
}
