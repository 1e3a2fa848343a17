//! Retrieval orchestration
//!
//! The [`Retriever`] owns the chunk → embed → index pipeline. `load` reads
//! the documents, embeds every chunk and publishes the finished index in one
//! step; `query` embeds the question once and searches the published index.
//! Queries never observe a partially built index and never mutate it.

mod provenance;

pub use provenance::ScoredChunk;

use crate::chunking::{load_document, split_documents, ChunkingParams, Document};
use crate::config::{expand_path, Config};
use crate::embedding::{embed_one, BatchEmbedder, EmbeddingProvider};
use crate::error::{DocqaError, Result};
use crate::index::{
    IndexEntry, IndexOptions, IndexSnapshot, SnapshotManifest, SourceFingerprint, VectorIndex,
    SNAPSHOT_FORMAT_VERSION,
};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

/// Retriever configuration
#[derive(Debug, Clone)]
pub struct RetrieverSettings {
    /// Metric, strategy and HNSW parameters. The dimension is always taken
    /// from the embedding provider.
    pub index: IndexOptions,
    pub batch_size: usize,
    pub max_concurrent: usize,
    /// Upper bound for one embedding backend call
    pub embed_timeout: Duration,
    /// Where to persist and reuse the built index
    pub snapshot_path: Option<PathBuf>,
}

impl RetrieverSettings {
    pub fn from_config(config: &Config) -> Result<Self> {
        let snapshot_path = match &config.index.snapshot_path {
            Some(path) => Some(expand_path(path)?),
            None => None,
        };

        Ok(Self {
            index: IndexOptions {
                metric: config.index.metric,
                strategy: config.index.strategy,
                dimension: None,
                hnsw_m: config.index.hnsw_m,
                hnsw_ef_construction: config.index.hnsw_ef_construction,
                hnsw_ef_search: config.index.hnsw_ef_search,
            },
            batch_size: config.embedding.batch_size,
            max_concurrent: config.embedding.max_concurrent,
            embed_timeout: config.embedding.timeout()?,
            snapshot_path,
        })
    }
}

impl Default for RetrieverSettings {
    fn default() -> Self {
        Self {
            index: IndexOptions::default(),
            batch_size: 32,
            max_concurrent: 4,
            embed_timeout: Duration::from_secs(30),
            snapshot_path: None,
        }
    }
}

/// Identity of a load request. Equal keys never trigger a rebuild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadKey {
    pub sources: Vec<PathBuf>,
    pub params: ChunkingParams,
    pub embedding_model: String,
}

/// A fully built index, published to queries as a unit
pub struct ReadyIndex {
    key: LoadKey,
    index: VectorIndex,
    manifest: SnapshotManifest,
    built_at: DateTime<Utc>,
    from_snapshot: bool,
}

impl ReadyIndex {
    /// Chunk, embed and index the given documents.
    ///
    /// Any embedding failure aborts the build. Documents are chunked
    /// independently, so no chunk spans two documents.
    pub async fn build(
        documents: &[Document],
        params: ChunkingParams,
        provider: Arc<dyn EmbeddingProvider>,
        settings: &RetrieverSettings,
    ) -> Result<Self> {
        let start = Instant::now();
        let chunks = split_documents(documents, &params);
        info!(
            "Chunked {} document(s) into {} chunks (size {}, overlap {})",
            documents.len(),
            chunks.len(),
            params.chunk_size(),
            params.overlap()
        );

        let embedder = BatchEmbedder::new(
            provider.clone(),
            settings.batch_size,
            settings.max_concurrent,
            settings.embed_timeout,
        );
        let texts = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let embedded = embedder.embed_all(texts).await?;

        let entries: Vec<IndexEntry> = chunks
            .into_iter()
            .zip(embedded.vectors)
            .map(|(chunk, vector)| IndexEntry::new(chunk, vector))
            .collect();

        let options = index_options(settings, provider.as_ref());
        let index = VectorIndex::build(entries, &options)?;

        info!(
            "Index ready: {} entries in {}ms",
            index.len(),
            start.elapsed().as_millis()
        );

        Ok(Self {
            key: load_key(documents, params, provider.as_ref()),
            index,
            manifest: manifest_for(documents, params, &options, provider.as_ref()),
            built_at: Utc::now(),
            from_snapshot: false,
        })
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    pub fn key(&self) -> &LoadKey {
        &self.key
    }

    pub fn manifest(&self) -> &SnapshotManifest {
        &self.manifest
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    /// Whether the entries were restored from a snapshot instead of embedded
    pub fn from_snapshot(&self) -> bool {
        self.from_snapshot
    }

    /// Persist this index so a later process can restore it
    pub fn save_snapshot(&self, path: &Path) -> Result<()> {
        IndexSnapshot::new(self.manifest.clone(), self.index.entries().to_vec()).save(path)?;
        Ok(())
    }
}

/// Owns the embedding provider and the currently published index
pub struct Retriever {
    provider: Arc<dyn EmbeddingProvider>,
    settings: RetrieverSettings,
    ready: RwLock<Option<Arc<ReadyIndex>>>,
    load_lock: Mutex<()>,
}

impl Retriever {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, settings: RetrieverSettings) -> Self {
        Self {
            provider,
            settings,
            ready: RwLock::new(None),
            load_lock: Mutex::new(()),
        }
    }

    /// Create a retriever around an index built elsewhere
    pub fn with_index(
        provider: Arc<dyn EmbeddingProvider>,
        settings: RetrieverSettings,
        ready: ReadyIndex,
    ) -> Result<Self> {
        if ready.key.embedding_model != provider.model_name() {
            return Err(DocqaError::InvalidArgument(format!(
                "Index was built with '{}', provider is '{}'",
                ready.key.embedding_model,
                provider.model_name()
            )));
        }
        if !ready.is_empty() && ready.index.dimension() != provider.dimension() {
            return Err(DocqaError::DimensionMismatch {
                expected: ready.index.dimension(),
                actual: provider.dimension(),
            });
        }

        Ok(Self {
            provider,
            settings,
            ready: RwLock::new(Some(Arc::new(ready))),
            load_lock: Mutex::new(()),
        })
    }

    /// Load a single document. See [`Retriever::load_all`].
    pub async fn load(&self, source: &Path, params: ChunkingParams) -> Result<Arc<ReadyIndex>> {
        self.load_all(&[source.to_path_buf()], params).await
    }

    /// Build (or reuse) the index for `sources` and publish it.
    ///
    /// Repeated calls with the same sources and parameters return the
    /// published index without reading or embedding anything.
    pub async fn load_all(
        &self,
        sources: &[PathBuf],
        params: ChunkingParams,
    ) -> Result<Arc<ReadyIndex>> {
        if sources.is_empty() {
            return Err(DocqaError::InvalidArgument(
                "At least one document source is required".to_string(),
            ));
        }

        let _guard = self.load_lock.lock().await;

        let key = LoadKey {
            sources: sources.to_vec(),
            params,
            embedding_model: self.provider.model_name().to_string(),
        };
        if let Some(ready) = self.ready.read().await.as_ref() {
            if ready.key == key {
                debug!("Index already loaded for {:?}, reusing", key.sources);
                return Ok(ready.clone());
            }
        }

        let mut documents = Vec::with_capacity(sources.len());
        for source in sources {
            documents.push(load_document(source).await?);
        }

        let mut ready = match self.restore_snapshot(&documents, params) {
            Some(ready) => ready,
            None => {
                let ready =
                    ReadyIndex::build(&documents, params, self.provider.clone(), &self.settings)
                        .await?;
                if let Some(path) = &self.settings.snapshot_path {
                    // The built index stays usable without its snapshot
                    if let Err(e) = ready.save_snapshot(path) {
                        warn!("Failed to write snapshot {}: {}", path.display(), e);
                    }
                }
                ready
            }
        };
        ready.key = key;

        let ready = Arc::new(ready);
        *self.ready.write().await = Some(ready.clone());
        Ok(ready)
    }

    /// Top-`k` chunks for `text`, nearest first.
    ///
    /// One embedding call, one in-memory search. Fails with `NotLoaded`
    /// before the first successful load.
    pub async fn query(&self, text: &str, k: usize) -> Result<Vec<ScoredChunk>> {
        if k == 0 {
            return Err(DocqaError::InvalidArgument(
                "k must be greater than 0".to_string(),
            ));
        }

        let ready = self.ready().await.ok_or(DocqaError::NotLoaded)?;

        let vector = embed_one(
            self.provider.clone(),
            text.to_string(),
            self.settings.embed_timeout,
        )
        .await?;

        let results = ready
            .index
            .search(&vector, k)?
            .into_iter()
            .enumerate()
            .map(|(rank, neighbor)| ScoredChunk::from_neighbor(rank, neighbor))
            .collect::<Vec<_>>();

        debug!("Query returned {} of k={} chunks", results.len(), k);
        Ok(results)
    }

    /// The currently published index, if any
    pub async fn ready(&self) -> Option<Arc<ReadyIndex>> {
        self.ready.read().await.clone()
    }

    /// Drop the published index so the next load rebuilds.
    ///
    /// Returns whether an index was loaded. In-flight queries keep the
    /// index they already hold.
    pub async fn invalidate(&self) -> bool {
        let _guard = self.load_lock.lock().await;
        let dropped = self.ready.write().await.take().is_some();
        if dropped {
            info!("Index invalidated");
        }
        dropped
    }

    /// Manifest a snapshot must carry to be reused for `documents`
    pub fn expected_manifest(&self, documents: &[Document], params: ChunkingParams) -> SnapshotManifest {
        let options = index_options(&self.settings, self.provider.as_ref());
        manifest_for(documents, params, &options, self.provider.as_ref())
    }

    pub fn provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.provider
    }

    pub fn settings(&self) -> &RetrieverSettings {
        &self.settings
    }

    /// Reuse a compatible snapshot. Unreadable or stale snapshots are
    /// reported and skipped; the caller rebuilds and rewrites it.
    fn restore_snapshot(&self, documents: &[Document], params: ChunkingParams) -> Option<ReadyIndex> {
        let path = self.settings.snapshot_path.as_ref()?;
        if !path.exists() {
            debug!("No snapshot at {}", path.display());
            return None;
        }

        let options = index_options(&self.settings, self.provider.as_ref());
        let expected = self.expected_manifest(documents, params);

        let snapshot = match IndexSnapshot::read(path) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Ignoring unreadable snapshot {}: {}", path.display(), e);
                return None;
            }
        };
        if let Err(e) = snapshot.check_compatible(&expected) {
            info!("Snapshot {} is stale, rebuilding: {}", path.display(), e);
            return None;
        }

        let built_at = snapshot.created_at;
        let index = match VectorIndex::build(snapshot.entries, &options) {
            Ok(index) => index,
            Err(e) => {
                warn!("Snapshot {} failed to index: {}", path.display(), e);
                return None;
            }
        };

        info!(
            "Restored {} entries from snapshot {}",
            index.len(),
            path.display()
        );

        Some(ReadyIndex {
            key: load_key(documents, params, self.provider.as_ref()),
            index,
            manifest: expected,
            built_at,
            from_snapshot: true,
        })
    }
}

fn index_options(settings: &RetrieverSettings, provider: &dyn EmbeddingProvider) -> IndexOptions {
    IndexOptions {
        dimension: Some(provider.dimension()),
        ..settings.index.clone()
    }
}

fn load_key(documents: &[Document], params: ChunkingParams, provider: &dyn EmbeddingProvider) -> LoadKey {
    LoadKey {
        sources: documents
            .iter()
            .map(|document| PathBuf::from(document.source()))
            .collect(),
        params,
        embedding_model: provider.model_name().to_string(),
    }
}

fn manifest_for(
    documents: &[Document],
    params: ChunkingParams,
    options: &IndexOptions,
    provider: &dyn EmbeddingProvider,
) -> SnapshotManifest {
    SnapshotManifest {
        format_version: SNAPSHOT_FORMAT_VERSION,
        embedding_model: provider.model_name().to_string(),
        dimension: provider.dimension(),
        metric: options.metric,
        chunking: params,
        sources: documents.iter().map(SourceFingerprint::of).collect(),
    }
}

impl std::fmt::Debug for ReadyIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadyIndex")
            .field("key", &self.key)
            .field("entries", &self.index.len())
            .field("strategy", &self.index.strategy())
            .field("built_at", &self.built_at)
            .field("from_snapshot", &self.from_snapshot)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{EmbeddingError, HashingProvider};
    use crate::index::IndexStrategy;
    use tempfile::TempDir;

    /// Hashing embedder that fails or stalls on specific query texts
    struct FlakyProvider {
        inner: HashingProvider,
    }

    impl EmbeddingProvider for FlakyProvider {
        fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, EmbeddingError> {
            match text {
                "backend down" => Err(EmbeddingError::InferenceError("model unavailable".to_string())),
                "stall" => {
                    std::thread::sleep(Duration::from_millis(300));
                    self.inner.embed(text)
                }
                _ => self.inner.embed(text),
            }
        }

        fn embed_batch(&self, texts: &[String]) -> std::result::Result<Vec<Vec<f32>>, EmbeddingError> {
            self.inner.embed_batch(texts)
        }

        fn dimension(&self) -> usize {
            self.inner.dimension()
        }

        fn model_name(&self) -> &str {
            self.inner.model_name()
        }
    }

    const CPP_SENTENCE: &str =
        "C++ is a general-purpose programming language created by Bjarne Stroustrup.";

    fn retriever(settings: RetrieverSettings) -> Retriever {
        Retriever::new(Arc::new(HashingProvider::new(128).unwrap()), settings)
    }

    fn write(dir: &TempDir, name: &str, text: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, text).unwrap();
        path
    }

    #[tokio::test]
    async fn test_query_before_load() {
        let retriever = retriever(RetrieverSettings::default());
        let result = retriever.query("anything", 3).await;
        assert!(matches!(result, Err(DocqaError::NotLoaded)));
    }

    #[tokio::test]
    async fn test_single_chunk_document() {
        let temp = TempDir::new().unwrap();
        let path = write(&temp, "intro.txt", CPP_SENTENCE);
        let retriever = retriever(RetrieverSettings::default());

        let ready = retriever
            .load(&path, ChunkingParams::default())
            .await
            .unwrap();
        assert_eq!(ready.len(), 1);

        let results = retriever.query("Who created C++?", 1).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].rank, 0);
        assert_eq!(results[0].text(), CPP_SENTENCE);
    }

    #[tokio::test]
    async fn test_load_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let path = write(&temp, "intro.txt", &"Templates and classes. ".repeat(40));
        let retriever = retriever(RetrieverSettings::default());

        let first = retriever
            .load(&path, ChunkingParams::default())
            .await
            .unwrap();
        let second = retriever
            .load(&path, ChunkingParams::default())
            .await
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let other = retriever
            .load(&path, ChunkingParams::new(100, 10).unwrap())
            .await
            .unwrap();
        assert!(!Arc::ptr_eq(&first, &other));
        assert!(other.len() > first.len());
    }

    #[tokio::test]
    async fn test_missing_source() {
        let temp = TempDir::new().unwrap();
        let retriever = retriever(RetrieverSettings::default());

        let result = retriever
            .load(&temp.path().join("missing.txt"), ChunkingParams::default())
            .await;
        assert!(matches!(result, Err(DocqaError::SourceNotFound { .. })));
        assert!(retriever.ready().await.is_none());
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_previous_index() {
        let temp = TempDir::new().unwrap();
        let path = write(&temp, "intro.txt", CPP_SENTENCE);
        let retriever = retriever(RetrieverSettings::default());
        retriever
            .load(&path, ChunkingParams::default())
            .await
            .unwrap();

        let result = retriever
            .load(&temp.path().join("missing.txt"), ChunkingParams::default())
            .await;
        assert!(result.is_err());
        assert_eq!(retriever.query("C++", 1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_k_zero_and_invalidate() {
        let temp = TempDir::new().unwrap();
        let path = write(&temp, "intro.txt", CPP_SENTENCE);
        let retriever = retriever(RetrieverSettings::default());
        retriever
            .load(&path, ChunkingParams::default())
            .await
            .unwrap();

        assert!(matches!(
            retriever.query("C++", 0).await,
            Err(DocqaError::InvalidArgument(_))
        ));

        assert!(retriever.invalidate().await);
        assert!(!retriever.invalidate().await);
        assert!(matches!(
            retriever.query("C++", 1).await,
            Err(DocqaError::NotLoaded)
        ));
    }

    #[tokio::test]
    async fn test_multiple_sources_keep_document_boundaries() {
        let temp = TempDir::new().unwrap();
        let first = write(&temp, "a.txt", &"a".repeat(250));
        let second = write(&temp, "b.txt", &"b".repeat(150));
        let retriever = retriever(RetrieverSettings::default());

        let ready = retriever
            .load_all(&[first, second], ChunkingParams::default())
            .await
            .unwrap();

        let chunks: Vec<_> = ready.index().chunks().collect();
        assert_eq!(chunks.len(), 3);
        assert!(chunks[0].text.chars().all(|c| c == 'a'));
        assert!(chunks[1].text.chars().all(|c| c == 'a'));
        assert_eq!(chunks[2].text, "b".repeat(150));
        assert_eq!(chunks[2].overlap, 0);
    }

    #[tokio::test]
    async fn test_snapshot_written_and_reused() {
        let temp = TempDir::new().unwrap();
        let path = write(&temp, "intro.txt", &"Classes, templates, RAII. ".repeat(30));
        let settings = RetrieverSettings {
            snapshot_path: Some(temp.path().join("index.snapshot")),
            ..RetrieverSettings::default()
        };

        let first = retriever(settings.clone())
            .load(&path, ChunkingParams::default())
            .await
            .unwrap();
        assert!(!first.from_snapshot());

        let second = retriever(settings.clone())
            .load(&path, ChunkingParams::default())
            .await
            .unwrap();
        assert!(second.from_snapshot());
        assert_eq!(second.len(), first.len());

        std::fs::write(&path, "A different document entirely.").unwrap();
        let third = retriever(settings)
            .load(&path, ChunkingParams::default())
            .await
            .unwrap();
        assert!(!third.from_snapshot());
        assert_eq!(third.len(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_is_rebuilt() {
        let temp = TempDir::new().unwrap();
        let path = write(&temp, "intro.txt", CPP_SENTENCE);
        let snapshot_path = temp.path().join("index.snapshot");
        std::fs::write(&snapshot_path, b"garbage").unwrap();

        let settings = RetrieverSettings {
            snapshot_path: Some(snapshot_path.clone()),
            ..RetrieverSettings::default()
        };
        let ready = retriever(settings)
            .load(&path, ChunkingParams::default())
            .await
            .unwrap();

        assert!(!ready.from_snapshot());
        assert!(IndexSnapshot::read(&snapshot_path).is_ok());
    }

    #[tokio::test]
    async fn test_with_index_rejects_other_model() {
        let provider: Arc<dyn EmbeddingProvider> = Arc::new(HashingProvider::new(64).unwrap());
        let documents = vec![Document::new("intro.txt", CPP_SENTENCE)];
        let ready = ReadyIndex::build(
            &documents,
            ChunkingParams::default(),
            provider.clone(),
            &RetrieverSettings::default(),
        )
        .await
        .unwrap();

        let other: Arc<dyn EmbeddingProvider> = Arc::new(HashingProvider::new(32).unwrap());
        assert!(Retriever::with_index(other, RetrieverSettings::default(), ready).is_err());
    }

    #[tokio::test]
    async fn test_with_index_serves_queries() {
        let provider: Arc<dyn EmbeddingProvider> = Arc::new(HashingProvider::new(64).unwrap());
        let documents = vec![Document::new("intro.txt", CPP_SENTENCE)];
        let ready = ReadyIndex::build(
            &documents,
            ChunkingParams::default(),
            provider.clone(),
            &RetrieverSettings::default(),
        )
        .await
        .unwrap();

        let retriever =
            Retriever::with_index(provider, RetrieverSettings::default(), ready).unwrap();
        let results = retriever.query("Stroustrup", 5).await.unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_settings_from_default_config() {
        let settings = RetrieverSettings::from_config(&Config::default()).unwrap();
        assert_eq!(settings.index.strategy, IndexStrategy::Exact);
        assert_eq!(settings.embed_timeout, Duration::from_secs(30));
        assert!(settings.snapshot_path.is_none());
    }

    #[tokio::test]
    async fn test_whitespace_runs_load() {
        let temp = TempDir::new().unwrap();
        let text = format!("Intro to C++.{}Templates are generic.", " ".repeat(400));
        let path = write(&temp, "spaced.txt", &text);
        let retriever = Retriever::new(
            Arc::new(HashingProvider::new(4096).unwrap()),
            RetrieverSettings::default(),
        );

        let ready = retriever
            .load(&path, ChunkingParams::default())
            .await
            .unwrap();
        assert!(ready
            .index()
            .chunks()
            .any(|chunk| chunk.text.trim().is_empty()));

        let results = retriever.query("Templates", 1).await.unwrap();
        assert!(results[0].text().contains("Templates"));
    }

    #[tokio::test]
    async fn test_newline_only_document_loads() {
        let temp = TempDir::new().unwrap();
        let path = write(&temp, "blank.txt", "\n");
        let retriever = retriever(RetrieverSettings::default());

        let ready = retriever
            .load(&path, ChunkingParams::default())
            .await
            .unwrap();
        assert_eq!(ready.len(), 1);
        assert_eq!(retriever.query("anything", 3).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_query_embedding_failure_is_recoverable() {
        let temp = TempDir::new().unwrap();
        let path = write(&temp, "intro.txt", CPP_SENTENCE);
        let settings = RetrieverSettings {
            embed_timeout: Duration::from_millis(50),
            ..RetrieverSettings::default()
        };
        let provider = FlakyProvider {
            inner: HashingProvider::new(128).unwrap(),
        };
        let retriever = Retriever::new(Arc::new(provider), settings);
        retriever
            .load(&path, ChunkingParams::default())
            .await
            .unwrap();

        let err = retriever.query("backend down", 1).await.unwrap_err();
        assert!(matches!(err, DocqaError::Embedding(EmbeddingError::InferenceError(_))));

        let err = retriever.query("stall", 1).await.unwrap_err();
        assert!(matches!(err, DocqaError::Embedding(EmbeddingError::Timeout(_))));
        assert!(err.is_retryable());

        // The published index is untouched and keeps serving
        let results = retriever.query("Who created C++?", 1).await.unwrap();
        assert_eq!(results[0].text(), CPP_SENTENCE);
    }

    #[tokio::test]
    async fn test_snapshot_write_failure_still_publishes() {
        let temp = TempDir::new().unwrap();
        let path = write(&temp, "intro.txt", CPP_SENTENCE);
        let blocker = write(&temp, "not-a-dir", "file");
        let settings = RetrieverSettings {
            snapshot_path: Some(blocker.join("index.snapshot")),
            ..RetrieverSettings::default()
        };
        let retriever = retriever(settings);

        let ready = retriever
            .load(&path, ChunkingParams::default())
            .await
            .unwrap();
        assert!(!ready.from_snapshot());
        assert!(ready.save_snapshot(&blocker.join("index.snapshot")).is_err());
        assert_eq!(retriever.query("C++", 1).await.unwrap().len(), 1);
    }
}
