//! Answer synthesis from retrieved context
//!
//! Architecture:
//! - GenerationBackend trait for abstraction over model services
//! - OllamaBackend for a local Ollama server
//! - PromptBuilder for bounded, context-only prompts
//! - AnswerSynthesizer ties them together with a single retry

mod ollama;
mod prompt;

pub use ollama::OllamaBackend;
pub use prompt::{Prompt, PromptBuilder, Role, Turn, DEFAULT_PERSONA};

use crate::config::LlmConfig;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SynthesisError {
    #[error("Generation backend unreachable: {0}")]
    Unreachable(String),

    #[error("Generation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Generation backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed generation response: {0}")]
    BadResponse(String),

    #[error("Unsupported generation provider: {0}")]
    UnsupportedProvider(String),
}

impl SynthesisError {
    /// Transport failures, timeouts and server-side statuses may clear up
    pub fn is_retryable(&self) -> bool {
        match self {
            SynthesisError::Unreachable(_) | SynthesisError::Timeout(_) => true,
            SynthesisError::Status { status, .. } => *status >= 500 || *status == 429,
            SynthesisError::BadResponse(_) | SynthesisError::UnsupportedProvider(_) => false,
        }
    }
}

/// Capability of turning a fully formed prompt into text
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Single request/response call, no streaming
    async fn generate(&self, prompt: &str) -> Result<String, SynthesisError>;

    /// Model identity, for display and logs
    fn model_name(&self) -> &str;
}

/// Construct the backend described by the configuration
pub fn build_backend(config: &LlmConfig) -> crate::Result<Arc<dyn GenerationBackend>> {
    match config.provider.as_str() {
        "ollama" => {
            let backend = OllamaBackend::new(
                &config.base_url,
                config.model.clone(),
                config.temperature,
                config.timeout()?,
            )?;
            Ok(Arc::new(backend))
        }
        other => Err(SynthesisError::UnsupportedProvider(other.to_string()).into()),
    }
}

/// Produces answers constrained to the supplied context
pub struct AnswerSynthesizer {
    backend: Arc<dyn GenerationBackend>,
    prompt: PromptBuilder,
    retry_backoff: Duration,
}

impl AnswerSynthesizer {
    pub fn new(backend: Arc<dyn GenerationBackend>, prompt: PromptBuilder, retry_backoff: Duration) -> Self {
        Self {
            backend,
            prompt,
            retry_backoff,
        }
    }

    pub fn from_config(config: &LlmConfig) -> crate::Result<Self> {
        let prompt = PromptBuilder::new(config.max_context_chars).with_history_turns(config.history_turns);
        Ok(Self::new(build_backend(config)?, prompt, config.retry_backoff()?))
    }

    pub fn model_name(&self) -> &str {
        self.backend.model_name()
    }

    /// Answer `query` from `context_chunks` (in retrieved order)
    pub async fn synthesize(&self, query: &str, context_chunks: &[String]) -> Result<String, SynthesisError> {
        self.synthesize_with_history(query, context_chunks, &[]).await
    }

    /// Like [`AnswerSynthesizer::synthesize`], with earlier turns rendered
    /// into the prompt.
    pub async fn synthesize_with_history(
        &self,
        query: &str,
        context_chunks: &[String],
        history: &[Turn],
    ) -> Result<String, SynthesisError> {
        let prompt = self.prompt.build(query, context_chunks, history);
        if prompt.truncated {
            tracing::debug!(
                "Context trimmed to {} of {} chunks",
                prompt.chunks_used,
                context_chunks.len()
            );
        }

        match self.backend.generate(&prompt.text).await {
            Ok(answer) => Ok(answer),
            Err(e) if e.is_retryable() => {
                tracing::warn!(
                    "Generation failed ({}), retrying once in {:?}",
                    e,
                    self.retry_backoff
                );
                tokio::time::sleep(self.retry_backoff).await;
                self.backend.generate(&prompt.text).await
            }
            Err(e) => Err(e),
        }
    }
}
