//! Index snapshots for restart-safe reuse
//!
//! A snapshot is a zstd-compressed JSON document holding a manifest and all
//! index entries. The manifest records everything that determines the
//! entries: embedding model identity, dimension, metric, chunking
//! parameters and a BLAKE3 fingerprint of every source document. A snapshot
//! is only reused when its manifest equals the one the caller expects.

use super::{IndexEntry, Metric};
use crate::chunking::{ChunkingParams, Document};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Bumped whenever the serialized layout changes
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// zstd compression level used for snapshots
const COMPRESSION_LEVEL: i32 = 3;

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("IO error: {context}: {source}")]
    Io {
        source: std::io::Error,
        context: String,
    },

    #[error("Snapshot encoding failed: {0}")]
    Encode(String),

    #[error("Snapshot decoding failed: {0}")]
    Decode(String),

    #[error("Snapshot incompatible: {field} is {found}, expected {expected}")]
    Incompatible {
        field: &'static str,
        expected: String,
        found: String,
    },
}

/// Content fingerprint of one source document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFingerprint {
    pub source: String,
    pub blake3: String,
}

impl SourceFingerprint {
    pub fn of(document: &Document) -> Self {
        Self {
            source: document.source().to_string(),
            blake3: blake3::hash(document.text().as_bytes()).to_hex().to_string(),
        }
    }
}

/// Everything that must match for a snapshot to be reused
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotManifest {
    pub format_version: u32,
    pub embedding_model: String,
    pub dimension: usize,
    pub metric: Metric,
    pub chunking: ChunkingParams,
    pub sources: Vec<SourceFingerprint>,
}

/// Persisted index contents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSnapshot {
    pub manifest: SnapshotManifest,
    pub created_at: DateTime<Utc>,
    pub entries: Vec<IndexEntry>,
}

impl IndexSnapshot {
    pub fn new(manifest: SnapshotManifest, entries: Vec<IndexEntry>) -> Self {
        Self {
            manifest,
            created_at: Utc::now(),
            entries,
        }
    }

    /// Write the snapshot atomically (temp file, then rename)
    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        let json = serde_json::to_vec(self).map_err(|e| SnapshotError::Encode(e.to_string()))?;
        let compressed = zstd::encode_all(&json[..], COMPRESSION_LEVEL).map_err(|e| SnapshotError::Io {
            source: e,
            context: "Failed to compress snapshot".to_string(),
        })?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| SnapshotError::Io {
                source: e,
                context: format!("Failed to create snapshot directory: {}", parent.display()),
            })?;
        }

        let temp_path = temp_path(path);
        let mut file = fs::File::create(&temp_path).map_err(|e| SnapshotError::Io {
            source: e,
            context: format!("Failed to create temp snapshot: {}", temp_path.display()),
        })?;
        file.write_all(&compressed).map_err(|e| SnapshotError::Io {
            source: e,
            context: format!("Failed to write snapshot: {}", temp_path.display()),
        })?;
        file.sync_all().map_err(|e| SnapshotError::Io {
            source: e,
            context: format!("Failed to sync snapshot: {}", temp_path.display()),
        })?;
        drop(file);

        fs::rename(&temp_path, path).map_err(|e| SnapshotError::Io {
            source: e,
            context: format!(
                "Failed to move snapshot into place: {} -> {}",
                temp_path.display(),
                path.display()
            ),
        })?;

        tracing::info!(
            "Saved index snapshot: {} entries -> {}",
            self.entries.len(),
            path.display()
        );
        Ok(())
    }

    /// Read a snapshot written by [`IndexSnapshot::save`]
    pub fn read(path: &Path) -> Result<Self, SnapshotError> {
        let compressed = fs::read(path).map_err(|e| SnapshotError::Io {
            source: e,
            context: format!("Failed to read snapshot: {}", path.display()),
        })?;
        let json = zstd::decode_all(&compressed[..])
            .map_err(|e| SnapshotError::Decode(format!("zstd: {}", e)))?;
        serde_json::from_slice(&json).map_err(|e| SnapshotError::Decode(e.to_string()))
    }

    /// Check this snapshot against the manifest the caller would build
    pub fn check_compatible(&self, expected: &SnapshotManifest) -> Result<(), SnapshotError> {
        let found = &self.manifest;

        if found.format_version != expected.format_version {
            return Err(incompatible(
                "format_version",
                expected.format_version,
                found.format_version,
            ));
        }
        if found.embedding_model != expected.embedding_model {
            return Err(incompatible(
                "embedding_model",
                &expected.embedding_model,
                &found.embedding_model,
            ));
        }
        if found.dimension != expected.dimension {
            return Err(incompatible("dimension", expected.dimension, found.dimension));
        }
        if found.metric != expected.metric {
            return Err(incompatible(
                "metric",
                format!("{:?}", expected.metric),
                format!("{:?}", found.metric),
            ));
        }
        if found.chunking != expected.chunking {
            return Err(incompatible(
                "chunking",
                format!("{:?}", expected.chunking),
                format!("{:?}", found.chunking),
            ));
        }
        if found.sources != expected.sources {
            return Err(incompatible(
                "sources",
                describe_sources(&expected.sources),
                describe_sources(&found.sources),
            ));
        }

        if let Some(entry) = self.entries.iter().find(|e| e.vector.len() != found.dimension) {
            return Err(incompatible("entry dimension", found.dimension, entry.vector.len()));
        }

        Ok(())
    }
}

fn incompatible(
    field: &'static str,
    expected: impl ToString,
    found: impl ToString,
) -> SnapshotError {
    SnapshotError::Incompatible {
        field,
        expected: expected.to_string(),
        found: found.to_string(),
    }
}

fn describe_sources(sources: &[SourceFingerprint]) -> String {
    sources
        .iter()
        .map(|s| format!("{}@{}", s.source, &s.blake3[..s.blake3.len().min(12)]))
        .collect::<Vec<_>>()
        .join(", ")
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
