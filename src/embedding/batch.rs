/// Batch embedding with bounded concurrency
use super::{EmbeddingError, EmbeddingProvider};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info};

/// Result of embedding a whole corpus
#[derive(Debug)]
pub struct BatchResult {
    /// One vector per input text, in input order
    pub vectors: Vec<Vec<f32>>,
    pub batches: usize,
    pub duration_ms: u64,
}

/// Batch embedder for index construction
///
/// Splits the texts into batches of `batch_size`, runs at most
/// `max_concurrent` batches at once on the blocking pool, and writes each
/// batch's vectors into its own slot so the output order matches the input.
/// The first failing batch aborts the rest.
pub struct BatchEmbedder {
    provider: Arc<dyn EmbeddingProvider>,
    batch_size: usize,
    max_concurrent: usize,
    timeout: Duration,
}

impl BatchEmbedder {
    /// Create a new batch embedder
    ///
    /// # Arguments
    /// * `provider` - Embedding provider
    /// * `batch_size` - Number of texts to embed in one backend call
    /// * `max_concurrent` - Maximum concurrent batch operations
    /// * `timeout` - Upper bound for a single backend call
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        batch_size: usize,
        max_concurrent: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            provider,
            batch_size: batch_size.max(1),
            max_concurrent: max_concurrent.max(1),
            timeout,
        }
    }

    /// Embed every text, failing on the first error.
    pub async fn embed_all(&self, texts: Vec<String>) -> Result<BatchResult, EmbeddingError> {
        let start = Instant::now();
        let total = texts.len();

        if texts.is_empty() {
            return Ok(BatchResult {
                vectors: Vec::new(),
                batches: 0,
                duration_ms: 0,
            });
        }

        info!(
            "Embedding {} texts in batches of {} ({} concurrent)",
            total, self.batch_size, self.max_concurrent
        );

        let batches: Vec<Vec<String>> = texts
            .chunks(self.batch_size)
            .map(|batch| batch.to_vec())
            .collect();
        let batch_count = batches.len();

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut tasks = JoinSet::new();

        for (batch_idx, batch) in batches.into_iter().enumerate() {
            let semaphore = semaphore.clone();
            let provider = self.provider.clone();
            let timeout = self.timeout;

            tasks.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| EmbeddingError::InferenceError(e.to_string()))?;

                let expected = batch.len();
                let vectors = run_blocking(timeout, move || provider.embed_batch(&batch)).await?;

                if vectors.len() != expected {
                    return Err(EmbeddingError::InferenceError(format!(
                        "Embedding count mismatch: expected {}, got {}",
                        expected,
                        vectors.len()
                    )));
                }

                Ok((batch_idx, vectors))
            });
        }

        let mut slots: Vec<Option<Vec<Vec<f32>>>> = vec![None; batch_count];

        while let Some(joined) = tasks.join_next().await {
            let outcome = joined
                .map_err(|e| EmbeddingError::InferenceError(format!("Batch task failed: {}", e)));

            match outcome.and_then(|result| result) {
                Ok((batch_idx, vectors)) => {
                    debug!("Embedded batch {} ({} vectors)", batch_idx, vectors.len());
                    slots[batch_idx] = Some(vectors);
                }
                Err(e) => {
                    tasks.abort_all();
                    return Err(e);
                }
            }
        }

        let mut vectors = Vec::with_capacity(total);
        for slot in slots {
            let batch = slot.ok_or_else(|| {
                EmbeddingError::InferenceError("Batch finished without output".to_string())
            })?;
            vectors.extend(batch);
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Embedding complete: {} vectors in {} batches, {}ms",
            vectors.len(),
            batch_count,
            duration_ms
        );

        Ok(BatchResult {
            vectors,
            batches: batch_count,
            duration_ms,
        })
    }
}

/// Embed a single text on the blocking pool, bounded by `timeout`.
pub async fn embed_one(
    provider: Arc<dyn EmbeddingProvider>,
    text: String,
    timeout: Duration,
) -> Result<Vec<f32>, EmbeddingError> {
    run_blocking(timeout, move || provider.embed(&text)).await
}

async fn run_blocking<T, F>(timeout: Duration, job: F) -> Result<T, EmbeddingError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, EmbeddingError> + Send + 'static,
{
    let handle = tokio::task::spawn_blocking(job);
    match tokio::time::timeout(timeout, handle).await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => Err(EmbeddingError::InferenceError(format!(
            "Embedding task failed: {}",
            e
        ))),
        Err(_) => Err(EmbeddingError::Timeout(timeout)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashingProvider;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fails on any batch containing the marker text
    struct PoisonProvider {
        inner: HashingProvider,
        calls: AtomicUsize,
    }

    impl EmbeddingProvider for PoisonProvider {
        fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            self.inner.embed(text)
        }

        fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if texts.iter().any(|t| t == "poison") {
                return Err(EmbeddingError::InferenceError("backend down".to_string()));
            }
            self.inner.embed_batch(texts)
        }

        fn dimension(&self) -> usize {
            self.inner.dimension()
        }

        fn model_name(&self) -> &str {
            "poison"
        }
    }

    struct SlowProvider;

    impl EmbeddingProvider for SlowProvider {
        fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
            std::thread::sleep(Duration::from_millis(300));
            Ok(vec![1.0])
        }

        fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            texts.iter().map(|t| self.embed(t)).collect()
        }

        fn dimension(&self) -> usize {
            1
        }

        fn model_name(&self) -> &str {
            "slow"
        }
    }

    #[tokio::test]
    async fn test_order_preserved_across_batches() {
        let provider: Arc<dyn EmbeddingProvider> = Arc::new(HashingProvider::new(64).unwrap());
        let embedder = BatchEmbedder::new(provider.clone(), 3, 4, Duration::from_secs(5));

        let texts: Vec<String> = (0..10).map(|i| format!("document number {}", i)).collect();
        let result = embedder.embed_all(texts.clone()).await.unwrap();

        assert_eq!(result.batches, 4);
        assert_eq!(result.vectors.len(), 10);
        for (text, vector) in texts.iter().zip(result.vectors.iter()) {
            assert_eq!(&provider.embed(text).unwrap(), vector);
        }
    }

    #[tokio::test]
    async fn test_empty_input() {
        let provider: Arc<dyn EmbeddingProvider> = Arc::new(HashingProvider::new(8).unwrap());
        let embedder = BatchEmbedder::new(provider, 32, 4, Duration::from_secs(5));

        let result = embedder.embed_all(Vec::new()).await.unwrap();
        assert!(result.vectors.is_empty());
        assert_eq!(result.batches, 0);
    }

    #[tokio::test]
    async fn test_fail_fast() {
        let provider = Arc::new(PoisonProvider {
            inner: HashingProvider::new(8).unwrap(),
            calls: AtomicUsize::new(0),
        });
        let embedder = BatchEmbedder::new(provider, 2, 1, Duration::from_secs(5));

        let texts = vec![
            "ok one".to_string(),
            "poison".to_string(),
            "ok two".to_string(),
        ];
        let result = embedder.embed_all(texts).await;
        assert!(matches!(result, Err(EmbeddingError::InferenceError(_))));
    }

    #[tokio::test]
    async fn test_timeout() {
        let provider: Arc<dyn EmbeddingProvider> = Arc::new(SlowProvider);
        let result = embed_one(provider, "slow".to_string(), Duration::from_millis(20)).await;
        assert!(matches!(result, Err(EmbeddingError::Timeout(_))));
    }
}
