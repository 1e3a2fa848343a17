/// Embedding provider trait and FastEmbed implementation
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("Model initialization failed: {0}")]
    InitializationError(String),

    #[error("Embedding inference failed: {0}")]
    InferenceError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Input too long: {len} characters exceeds the limit of {max}")]
    InputTooLong { len: usize, max: usize },

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Embedding backend timed out after {0:?}")]
    Timeout(Duration),
}

impl EmbeddingError {
    /// Backend hiccups and timeouts may succeed on a second attempt;
    /// malformed input never will.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EmbeddingError::InferenceError(_) | EmbeddingError::Timeout(_)
        )
    }
}

/// Trait for embedding providers
///
/// Allows abstraction over different embedding backends (FastEmbed, hashing, test stubs).
/// Implementations must be deterministic: the same text under the same
/// configuration always yields the same vector.
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embedding for a single text
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Generate embeddings for multiple texts (batched for efficiency).
    ///
    /// Must return exactly one vector per input, in input order, each equal
    /// to what `embed` returns for that text.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Get the embedding dimension
    fn dimension(&self) -> usize;

    /// Get the model name, recorded alongside persisted indexes
    fn model_name(&self) -> &str;
}

/// Reject empty and over-long inputs before they reach a model.
///
/// Whitespace-only text is valid input: documents may contain long blank
/// runs and every chunk must get a vector.
pub(crate) fn check_input(text: &str, max_chars: Option<usize>) -> Result<(), EmbeddingError> {
    if text.is_empty() {
        return Err(EmbeddingError::InvalidInput("Empty text".to_string()));
    }
    if let Some(max) = max_chars {
        let len = text.chars().count();
        if len > max {
            return Err(EmbeddingError::InputTooLong { len, max });
        }
    }
    Ok(())
}

/// Map a configured model name to the FastEmbed model and its dimension
fn resolve_model(model_name: &str) -> Option<(EmbeddingModel, usize)> {
    match model_name {
        "all-MiniLM-L6-v2"
        | "all-minilm-l6-v2"
        | "sentence-transformers/all-MiniLM-L6-v2" => Some((EmbeddingModel::AllMiniLML6V2, 384)),
        "bge-small-en-v1.5" | "BAAI/bge-small-en-v1.5" => {
            Some((EmbeddingModel::BGESmallENV15, 384))
        }
        "bge-base-en-v1.5" | "BAAI/bge-base-en-v1.5" => Some((EmbeddingModel::BGEBaseENV15, 768)),
        _ => None,
    }
}

/// FastEmbed provider for local embedding generation
///
/// Uses all-MiniLM-L6-v2 model (384 dimensions) by default.
/// Optimized for offline operation with no API calls.
pub struct FastEmbedProvider {
    model: Arc<TextEmbedding>,
    model_name: String,
    dimension: usize,
    max_input_chars: Option<usize>,
}

impl FastEmbedProvider {
    /// Create a new FastEmbed provider with the specified model
    ///
    /// **Important**: Models are downloaded on-demand to `~/.cache/huggingface/`
    /// on first use. The smallest model (all-MiniLM-L6-v2) is ~90MB.
    /// Larger models:
    /// - all-MiniLM-L6-v2: 90MB (384 dims) - recommended for most use cases
    /// - bge-small-en-v1.5: 130MB (384 dims) - better accuracy
    /// - bge-base-en-v1.5: 440MB (768 dims) - highest accuracy
    pub fn new(model_name: &str, max_input_chars: Option<usize>) -> Result<Self, EmbeddingError> {
        let (embedding_model, dimension) = resolve_model(model_name).ok_or_else(|| {
            EmbeddingError::InitializationError(format!(
                "Unsupported model: {}. Supported: all-MiniLM-L6-v2, bge-small-en-v1.5, bge-base-en-v1.5",
                model_name
            ))
        })?;

        tracing::info!(
            "Initializing embedding model: {} ({}D, downloaded on first use)",
            model_name,
            dimension
        );

        let init_options = InitOptions::new(embedding_model).with_show_download_progress(true);

        let model = TextEmbedding::try_new(init_options)
            .map_err(|e| EmbeddingError::InitializationError(e.to_string()))?;

        Ok(Self {
            model: Arc::new(model),
            model_name: model_name.to_string(),
            dimension,
            max_input_chars,
        })
    }

    /// Create provider with default model (all-MiniLM-L6-v2)
    pub fn with_default_model() -> Result<Self, EmbeddingError> {
        Self::new("all-MiniLM-L6-v2", None)
    }

    fn verify_dimension(&self, embedding: &[f32]) -> Result<(), EmbeddingError> {
        if embedding.len() != self.dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimension,
                actual: embedding.len(),
            });
        }
        Ok(())
    }
}

impl EmbeddingProvider for FastEmbedProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        check_input(text, self.max_input_chars)?;

        let embedding = self
            .model
            .embed(vec![text], None)
            .map_err(|e| EmbeddingError::InferenceError(e.to_string()))?
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::InferenceError("No embeddings generated".to_string()))?;

        self.verify_dimension(&embedding)?;
        Ok(embedding)
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        // Filtering bad inputs would misalign vectors with chunks, so reject instead
        for (i, text) in texts.iter().enumerate() {
            check_input(text, self.max_input_chars).map_err(|e| match e {
                EmbeddingError::InvalidInput(msg) => {
                    EmbeddingError::InvalidInput(format!("{} (batch item {})", msg, i))
                }
                other => other,
            })?;
        }

        let embeddings = self
            .model
            .embed(texts.to_vec(), None)
            .map_err(|e| EmbeddingError::InferenceError(e.to_string()))?;

        if embeddings.len() != texts.len() {
            return Err(EmbeddingError::InferenceError(format!(
                "Embedding count mismatch: expected {}, got {}",
                texts.len(),
                embeddings.len()
            )));
        }

        for embedding in &embeddings {
            self.verify_dimension(embedding)?;
        }

        Ok(embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
