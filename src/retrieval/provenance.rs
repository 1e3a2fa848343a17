//! Scored search results with source provenance

use crate::chunking::Chunk;
use crate::index::Neighbor;
use serde::{Deserialize, Serialize};

/// A retrieved chunk with its rank, similarity and distance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    /// Zero-based position in the result list
    pub rank: usize,

    /// Similarity (higher is better)
    pub score: f32,

    /// Distance under the index metric (lower is better)
    pub distance: f32,

    /// The chunk itself, carrying source path and offsets
    pub chunk: Chunk,
}

impl ScoredChunk {
    pub(crate) fn from_neighbor(rank: usize, neighbor: Neighbor<'_>) -> Self {
        Self {
            rank,
            score: neighbor.score,
            distance: neighbor.distance,
            chunk: neighbor.chunk.clone(),
        }
    }

    pub fn text(&self) -> &str {
        &self.chunk.text
    }

    pub fn source(&self) -> &str {
        &self.chunk.source
    }

    /// Character range `[start, end)` of the chunk in its source document
    pub fn span(&self) -> (usize, usize) {
        (self.chunk.start, self.chunk.end)
    }

    /// Get a short preview of the text (first N characters)
    pub fn preview(&self, max_chars: usize) -> String {
        let text = &self.chunk.text;
        match text.char_indices().nth(max_chars) {
            Some((cut, _)) => format!("{}...", &text[..cut]),
            None => text.clone(),
        }
    }
}
