//! Deterministic feature-hashing embedder
//!
//! Maps each lowercase word to a signed bucket chosen by its BLAKE3 hash and
//! L2-normalizes the counts. Needs no model download, so it serves as the
//! offline backend and as the fixture embedder in tests. Texts that share
//! words land close together under cosine similarity.

use super::provider::{check_input, EmbeddingError, EmbeddingProvider};

/// Feature-hashing embedding provider
#[derive(Debug, Clone)]
pub struct HashingProvider {
    dimension: usize,
    model_name: String,
    max_input_chars: Option<usize>,
}

impl HashingProvider {
    pub fn new(dimension: usize) -> Result<Self, EmbeddingError> {
        if dimension == 0 {
            return Err(EmbeddingError::InitializationError(
                "Hashing dimension must be greater than 0".to_string(),
            ));
        }
        Ok(Self {
            dimension,
            model_name: format!("hashing-{}", dimension),
            max_input_chars: None,
        })
    }

    /// Reject texts longer than `max` characters with `InputTooLong`
    pub fn with_max_input_chars(mut self, max: usize) -> Self {
        self.max_input_chars = Some(max);
        self
    }

    fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
        // '+' and '#' stay in tokens so "C++" and "C#" remain distinct words
        text.split(|c: char| !(c.is_alphanumeric() || c == '+' || c == '#'))
            .filter(|token| !token.is_empty())
            .map(|token| token.to_lowercase())
    }
}

impl EmbeddingProvider for HashingProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        check_input(text, self.max_input_chars)?;

        let mut vector = vec![0.0f32; self.dimension];
        for token in Self::tokens(text) {
            let hash = blake3::hash(token.as_bytes());
            let bytes = hash.as_bytes();

            let mut bucket_bytes = [0u8; 8];
            bucket_bytes.copy_from_slice(&bytes[..8]);
            let bucket = (u64::from_le_bytes(bucket_bytes) % self.dimension as u64) as usize;
            let sign = if bytes[8] & 1 == 0 { 1.0 } else { -1.0 };

            vector[bucket] += sign;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }

        Ok(vector)
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        texts.iter().map(|text| self.embed(text)).collect()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
