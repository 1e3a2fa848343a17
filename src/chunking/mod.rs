//! Document chunking
//!
//! Splits a document's text into fixed-size, overlapping character windows.
//! Consecutive chunks of one document share exactly `overlap` characters, so
//! any passage near a boundary appears verbatim in both neighbours. Multiple
//! documents are chunked independently and never overlap each other.

mod loader;

pub use loader::load_document;

use crate::error::{DocqaError, Result};
use serde::{Deserialize, Serialize};

/// Default characters per chunk
pub const DEFAULT_CHUNK_SIZE: usize = 200;

/// Default characters shared between consecutive chunks
pub const DEFAULT_CHUNK_OVERLAP: usize = 20;

/// Raw document text plus the identifier of where it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    source: String,
    text: String,
}

impl Document {
    pub fn new(source: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            text: text.into(),
        }
    }

    /// Source identifier (usually the file path)
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Length in characters
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Validated chunking parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkingParams {
    chunk_size: usize,
    overlap: usize,
}

impl ChunkingParams {
    /// Requires `chunk_size > 0` and `overlap < chunk_size`.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(DocqaError::InvalidArgument(
                "chunk_size must be greater than 0".to_string(),
            ));
        }
        if overlap >= chunk_size {
            return Err(DocqaError::InvalidArgument(format!(
                "overlap ({}) must be smaller than chunk_size ({})",
                overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Distance in characters between the starts of consecutive chunks
    pub fn step(&self) -> usize {
        self.chunk_size - self.overlap
    }
}

impl Default for ChunkingParams {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

/// A contiguous window of a document's text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Identifier of the document this chunk came from
    pub source: String,
    /// Zero-based position within its document
    pub ordinal: usize,
    /// Start offset in characters (inclusive)
    pub start: usize,
    /// End offset in characters (exclusive)
    pub end: usize,
    /// Start offset in bytes
    pub byte_start: usize,
    /// End offset in bytes
    pub byte_end: usize,
    /// Characters shared with the previous chunk (0 for the first chunk)
    pub overlap: usize,
    /// The chunk text, `document.text[byte_start..byte_end]`
    pub text: String,
}

impl Chunk {
    /// Length in characters
    pub fn char_len(&self) -> usize {
        self.end - self.start
    }

    /// The leading characters this chunk shares with its predecessor
    pub fn overlap_prefix(&self) -> &str {
        let cut = self
            .text
            .char_indices()
            .nth(self.overlap)
            .map(|(byte, _)| byte)
            .unwrap_or(self.text.len());
        &self.text[..cut]
    }

    /// The trailing `n` characters of this chunk
    pub fn suffix(&self, n: usize) -> &str {
        let skip = self.char_len().saturating_sub(n);
        let cut = self
            .text
            .char_indices()
            .nth(skip)
            .map(|(byte, _)| byte)
            .unwrap_or(self.text.len());
        &self.text[cut..]
    }
}

/// Split one document, validating the parameters first.
///
/// Fails with `InvalidArgument` unless `chunk_size > 0` and
/// `overlap < chunk_size`.
pub fn split(document: &Document, chunk_size: usize, overlap: usize) -> Result<Vec<Chunk>> {
    let params = ChunkingParams::new(chunk_size, overlap)?;
    Ok(split_with(document, &params))
}

/// Split one document into chunks of at most `chunk_size` characters.
///
/// A document no longer than `chunk_size` yields exactly one chunk equal to
/// the whole text; an empty document yields none.
pub fn split_with(document: &Document, params: &ChunkingParams) -> Vec<Chunk> {
    let text = document.text();

    // Byte offset of every char boundary, including the end of the text
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(byte, _)| byte)
        .chain(std::iter::once(text.len()))
        .collect();
    let char_count = boundaries.len() - 1;

    if char_count == 0 {
        return Vec::new();
    }

    let mut chunks = Vec::with_capacity(char_count / params.step() + 1);
    let mut start = 0;

    loop {
        let end = (start + params.chunk_size()).min(char_count);
        let ordinal = chunks.len();
        let byte_start = boundaries[start];
        let byte_end = boundaries[end];

        chunks.push(Chunk {
            source: document.source().to_string(),
            ordinal,
            start,
            end,
            byte_start,
            byte_end,
            overlap: if ordinal == 0 { 0 } else { params.overlap() },
            text: text[byte_start..byte_end].to_string(),
        });

        if end == char_count {
            break;
        }
        start += params.step();
    }

    chunks
}

/// Split several documents, keeping each document's chunk sequence intact
/// and in input order.
pub fn split_documents(documents: &[Document], params: &ChunkingParams) -> Vec<Chunk> {
    documents
        .iter()
        .flat_map(|document| split_with(document, params))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(text: &str) -> Document {
        Document::new("test.txt", text)
    }

    #[test]
    fn test_short_document_single_chunk() {
        let text = "C++ is a general-purpose programming language created by Bjarne Stroustrup.";
        let chunks = split(&doc(text), 200, 20).unwrap();

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, text);
        assert_eq!(chunks[0].start, 0);
        assert_eq!(chunks[0].end, text.chars().count());
        assert_eq!(chunks[0].overlap, 0);
    }

    #[test]
    fn test_five_hundred_chars_three_chunks() {
        let text: String = (0..500).map(|i| (b'a' + (i % 26) as u8) as char).collect();
        let chunks = split(&doc(&text), 200, 20).unwrap();

        assert_eq!(chunks.len(), 3);
        assert_eq!((chunks[0].start, chunks[0].end), (0, 200));
        assert_eq!((chunks[1].start, chunks[1].end), (180, 380));
        assert_eq!((chunks[2].start, chunks[2].end), (360, 500));
        assert_eq!(chunks[2].text.len(), 140);
    }

    #[test]
    fn test_overlap_is_shared_verbatim() {
        let text = "The quick brown fox jumps over the lazy dog. ".repeat(20);
        let chunks = split(&doc(&text), 64, 16).unwrap();

        assert!(chunks.len() > 2);
        for pair in chunks.windows(2) {
            assert_eq!(pair[1].overlap, 16);
            assert_eq!(pair[0].suffix(16), pair[1].overlap_prefix());
        }
    }

    #[test]
    fn test_multibyte_offsets() {
        let text = "café ☕ naïve 日本語 🎉 ".repeat(30);
        let document = doc(&text);
        let chunks = split(&document, 50, 10).unwrap();

        for chunk in &chunks {
            assert!(chunk.char_len() <= 50);
            assert_eq!(&text[chunk.byte_start..chunk.byte_end], chunk.text);
            assert_eq!(chunk.text.chars().count(), chunk.char_len());
        }
        assert_eq!(chunks.last().unwrap().end, document.char_len());
    }

    #[test]
    fn test_deterministic() {
        let text = "Templates enable generic programming. ".repeat(40);
        let first = split(&doc(&text), 120, 30).unwrap();
        let second = split(&doc(&text), 120, 30).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_document_has_no_chunks() {
        assert!(split(&doc(""), 200, 20).unwrap().is_empty());
    }

    #[test]
    fn test_exact_chunk_size_single_chunk() {
        let text = "x".repeat(200);
        let chunks = split(&doc(&text), 200, 20).unwrap();
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn test_invalid_params() {
        assert!(matches!(
            split(&doc("abc"), 0, 0),
            Err(DocqaError::InvalidArgument(_))
        ));
        assert!(matches!(
            split(&doc("abc"), 10, 10),
            Err(DocqaError::InvalidArgument(_))
        ));
        assert!(ChunkingParams::new(10, 9).is_ok());
    }

    #[test]
    fn test_documents_do_not_overlap_each_other() {
        let docs = vec![
            Document::new("a.txt", "a".repeat(300)),
            Document::new("b.txt", "b".repeat(150)),
        ];
        let chunks = split_documents(&docs, &ChunkingParams::default());

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].source, "a.txt");
        assert_eq!(chunks[1].source, "a.txt");
        assert_eq!(chunks[2].source, "b.txt");
        assert_eq!(chunks[2].ordinal, 0);
        assert_eq!(chunks[2].overlap, 0);
        assert!(chunks[2].text.chars().all(|c| c == 'b'));
    }
}
