/// Embedding generation
///
/// Architecture:
/// - EmbeddingProvider trait for abstraction
/// - FastEmbedProvider for local embedding (all-MiniLM-L6-v2, 384-dim)
/// - HashingProvider for deterministic, download-free embedding
/// - BatchEmbedder for bounded-concurrency corpus embedding
mod batch;
mod hashing;
mod provider;

pub use batch::{embed_one, BatchEmbedder, BatchResult};
pub use hashing::HashingProvider;
pub use provider::{EmbeddingError, EmbeddingProvider, FastEmbedProvider};

use crate::config::EmbeddingConfig;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Which embedding backend to construct
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// ONNX sentence-transformer models via fastembed
    FastEmbed,
    /// Feature hashing, no model download
    Hashing,
}

/// Construct the provider described by the configuration
pub fn build_provider(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>, EmbeddingError> {
    let provider: Arc<dyn EmbeddingProvider> = match config.backend {
        EmbeddingBackend::FastEmbed => Arc::new(FastEmbedProvider::new(
            &config.model,
            Some(config.max_input_chars),
        )?),
        EmbeddingBackend::Hashing => Arc::new(
            HashingProvider::new(config.dimension)?.with_max_input_chars(config.max_input_chars),
        ),
    };
    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_build_hashing_provider() {
        let mut config = Config::default().embedding;
        config.backend = EmbeddingBackend::Hashing;
        config.dimension = 96;

        let provider = build_provider(&config).unwrap();
        assert_eq!(provider.dimension(), 96);
        assert_eq!(provider.model_name(), "hashing-96");
    }
}
