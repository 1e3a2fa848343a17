//! Nearest-neighbour index over chunk embeddings
//!
//! The index is built once from the full set of (chunk, vector) entries and
//! is read-only afterwards, so it can be shared across concurrent queries
//! without locking. The distance metric is fixed at build time and used for
//! every search. Results are totally ordered by distance, ties broken by
//! entry position (document order, then chunk ordinal).

mod hnsw;
mod snapshot;

pub use snapshot::{
    IndexSnapshot, SnapshotError, SnapshotManifest, SourceFingerprint, SNAPSHOT_FORMAT_VERSION,
};

use crate::chunking::Chunk;
use hnsw::AnnGraph;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Distance metric, declared once per index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// `1 - cos(a, b)`; similarity score is `cos(a, b)`
    Cosine,
    /// Euclidean distance; similarity score is `1 / (1 + d)`
    L2,
}

impl Metric {
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Metric::Cosine => {
                let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
                let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
                let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
                if norm_a == 0.0 || norm_b == 0.0 {
                    // Zero vectors carry no direction: similarity 0
                    1.0
                } else {
                    1.0 - dot / (norm_a * norm_b)
                }
            }
            Metric::L2 => a
                .iter()
                .zip(b)
                .map(|(x, y)| (x - y) * (x - y))
                .sum::<f32>()
                .sqrt(),
        }
    }

    /// Convert a distance into a similarity where higher is better
    pub fn score(&self, distance: f32) -> f32 {
        match self {
            Metric::Cosine => 1.0 - distance,
            Metric::L2 => 1.0 / (1.0 + distance),
        }
    }
}

/// How nearest neighbours are found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexStrategy {
    /// Score every entry. Exact top-K.
    Exact,
    /// HNSW graph proposes candidates which are then rescored exactly
    Hnsw,
}

impl IndexStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexStrategy::Exact => "exact",
            IndexStrategy::Hnsw => "hnsw",
        }
    }
}

/// Build-time options
#[derive(Debug, Clone, PartialEq)]
pub struct IndexOptions {
    pub metric: Metric,
    pub strategy: IndexStrategy,
    /// Expected vector dimension; inferred from the first entry when `None`
    pub dimension: Option<usize>,
    /// HNSW M parameter (number of connections per layer)
    pub hnsw_m: usize,
    /// HNSW construction parameter (higher = better recall, slower build)
    pub hnsw_ef_construction: usize,
    /// HNSW search parameter (higher = better recall, slower search)
    pub hnsw_ef_search: usize,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            metric: Metric::Cosine,
            strategy: IndexStrategy::Exact,
            dimension: None,
            hnsw_m: 16,
            hnsw_ef_construction: 200,
            hnsw_ef_search: 64,
        }
    }
}

/// One chunk paired with its embedding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

impl IndexEntry {
    pub fn new(chunk: Chunk, vector: Vec<f32>) -> Self {
        Self { chunk, vector }
    }
}

/// A search hit borrowing its chunk from the index
#[derive(Debug, Clone, Copy)]
pub struct Neighbor<'a> {
    pub chunk: &'a Chunk,
    /// Position of the entry in build order
    pub position: usize,
    pub distance: f32,
    pub score: f32,
}

/// Immutable nearest-neighbour index
pub struct VectorIndex {
    entries: Vec<IndexEntry>,
    dimension: usize,
    metric: Metric,
    strategy: IndexStrategy,
    ef_search: usize,
    graph: Option<AnnGraph>,
}

impl VectorIndex {
    /// Build the index from all entries at once.
    ///
    /// Fails with `DimensionMismatch` if any vector disagrees with the
    /// expected dimension (or with the first vector when none is given).
    pub fn build(entries: Vec<IndexEntry>, options: &IndexOptions) -> Result<Self, IndexError> {
        let dimension = options
            .dimension
            .or_else(|| entries.first().map(|entry| entry.vector.len()))
            .unwrap_or(0);

        for entry in &entries {
            if entry.vector.len() != dimension {
                return Err(IndexError::DimensionMismatch {
                    expected: dimension,
                    actual: entry.vector.len(),
                });
            }
        }

        let graph = match options.strategy {
            IndexStrategy::Hnsw if !entries.is_empty() => Some(AnnGraph::build(
                &entries,
                options.metric,
                options.hnsw_m,
                options.hnsw_ef_construction,
            )),
            _ => None,
        };

        tracing::debug!(
            "Built {:?} index: {} entries, {}D, {:?}",
            options.strategy,
            entries.len(),
            dimension,
            options.metric
        );

        Ok(Self {
            entries,
            dimension,
            metric: options.metric,
            strategy: options.strategy,
            ef_search: options.hnsw_ef_search,
            graph,
        })
    }

    /// Return the `k` nearest entries, nearest first.
    ///
    /// `k` larger than the entry count is clamped; `k == 0` is rejected.
    /// Under HNSW, candidates are widened to every entry sharing a
    /// candidate's vector before the exact rescoring, so identical vectors
    /// still come back in position order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor<'_>>, IndexError> {
        if k == 0 {
            return Err(IndexError::InvalidArgument(
                "k must be greater than 0".to_string(),
            ));
        }

        if self.entries.is_empty() {
            return Ok(Vec::new());
        }

        if query.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let k = k.min(self.entries.len());

        let candidates = match &self.graph {
            Some(graph) => {
                let proposed = graph.search(query, k, self.ef_search.max(k));
                if proposed.len() < k {
                    tracing::debug!(
                        "HNSW returned {} of {} candidates, falling back to exact scan",
                        proposed.len(),
                        k
                    );
                    None
                } else {
                    Some(proposed)
                }
            }
            None => None,
        };

        let mut scored: Vec<(usize, f32)> = match candidates {
            Some(positions) => positions
                .into_iter()
                .map(|position| (position, self.distance_to(position, query)))
                .collect(),
            None => (0..self.entries.len())
                .map(|position| (position, self.distance_to(position, query)))
                .collect(),
        };

        scored.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(position, distance)| Neighbor {
                chunk: &self.entries[position].chunk,
                position,
                distance,
                score: self.metric.score(distance),
            })
            .collect())
    }

    fn distance_to(&self, position: usize, query: &[f32]) -> f32 {
        self.metric.distance(&self.entries[position].vector, query)
    }

    /// Get the number of entries in the index
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get vector dimension
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn strategy(&self) -> IndexStrategy {
        self.strategy
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Chunks in build order
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.entries.iter().map(|entry| &entry.chunk)
    }
}
