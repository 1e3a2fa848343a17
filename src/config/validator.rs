use crate::config::{parse_duration, Config, SCHEMA_VERSION};
use crate::error::{DocqaError, Result, ValidationError};

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration, reporting every problem at once
    pub fn validate(config: &Config) -> Result<()> {
        let mut errors = Vec::new();

        Self::validate_schema_version(config, &mut errors);
        Self::validate_document(config, &mut errors);
        Self::validate_chunking(config, &mut errors);
        Self::validate_embedding(config, &mut errors);
        Self::validate_index(config, &mut errors);
        Self::validate_retrieval(config, &mut errors);
        Self::validate_llm(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(DocqaError::ConfigValidation { errors })
        }
    }

    fn validate_schema_version(config: &Config, errors: &mut Vec<ValidationError>) {
        let version = &config.meta.schema_version;
        if version != SCHEMA_VERSION {
            errors.push(ValidationError::new(
                "_meta.schema_version",
                format!("Unsupported schema version: {}", version),
            ));
        }
    }

    fn validate_document(config: &Config, errors: &mut Vec<ValidationError>) {
        // Existence is checked at load time; paths may still contain ~
        if config.document.sources.is_empty() {
            errors.push(ValidationError::new(
                "document.sources",
                "At least one document source is required",
            ));
        }

        if config
            .document
            .sources
            .iter()
            .any(|source| source.as_os_str().is_empty())
        {
            errors.push(ValidationError::new(
                "document.sources",
                "Document source path cannot be empty",
            ));
        }
    }

    fn validate_chunking(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.chunking.chunk_size == 0 {
            errors.push(ValidationError::new(
                "chunking.chunk_size",
                "Chunk size must be greater than 0",
            ));
        }

        if config.chunking.overlap >= config.chunking.chunk_size {
            errors.push(ValidationError::new(
                "chunking.overlap",
                format!(
                    "Overlap ({}) must be smaller than chunk size ({})",
                    config.chunking.overlap, config.chunking.chunk_size
                ),
            ));
        }
    }

    fn validate_embedding(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.embedding.model.is_empty() {
            errors.push(ValidationError::new(
                "embedding.model",
                "Model name cannot be empty",
            ));
        }

        if config.embedding.dimension == 0 {
            errors.push(ValidationError::new(
                "embedding.dimension",
                "Dimension must be greater than 0",
            ));
        }

        if config.embedding.batch_size == 0 {
            errors.push(ValidationError::new(
                "embedding.batch_size",
                "Batch size must be greater than 0",
            ));
        }

        if config.embedding.max_concurrent == 0 {
            errors.push(ValidationError::new(
                "embedding.max_concurrent",
                "Max concurrent batches must be greater than 0",
            ));
        }

        if config.embedding.max_input_chars == 0 {
            errors.push(ValidationError::new(
                "embedding.max_input_chars",
                "Max input characters must be greater than 0",
            ));
        } else if config.embedding.max_input_chars < config.chunking.chunk_size {
            errors.push(ValidationError::new(
                "embedding.max_input_chars",
                format!(
                    "Max input characters ({}) cannot hold a full chunk ({})",
                    config.embedding.max_input_chars, config.chunking.chunk_size
                ),
            ));
        }

        Self::check_duration("embedding.timeout", &config.embedding.timeout, errors);
    }

    fn validate_index(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.index.hnsw_ef_construction == 0 {
            errors.push(ValidationError::new(
                "index.hnsw_ef_construction",
                "HNSW ef_construction must be greater than 0",
            ));
        }

        if config.index.hnsw_ef_search == 0 {
            errors.push(ValidationError::new(
                "index.hnsw_ef_search",
                "HNSW ef_search must be greater than 0",
            ));
        }

        if config.index.hnsw_m == 0 {
            errors.push(ValidationError::new(
                "index.hnsw_m",
                "HNSW M must be greater than 0",
            ));
        }

        if let Some(path) = &config.index.snapshot_path {
            if path.as_os_str().is_empty() {
                errors.push(ValidationError::new(
                    "index.snapshot_path",
                    "Snapshot path cannot be empty when set",
                ));
            }
        }
    }

    fn validate_retrieval(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.retrieval.k == 0 {
            errors.push(ValidationError::new(
                "retrieval.k",
                "k must be greater than 0",
            ));
        }
    }

    fn validate_llm(config: &Config, errors: &mut Vec<ValidationError>) {
        let provider = &config.llm.provider;
        let valid_providers = ["ollama"];
        if !valid_providers.contains(&provider.as_str()) {
            errors.push(ValidationError::new(
                "llm.provider",
                format!(
                    "Provider must be one of {:?}, got '{}'",
                    valid_providers, provider
                ),
            ));
        }

        if config.llm.enabled && config.llm.model.is_empty() {
            errors.push(ValidationError::new(
                "llm.model",
                "Model name cannot be empty when synthesis is enabled",
            ));
        }

        if !config.llm.base_url.starts_with("http://") && !config.llm.base_url.starts_with("https://")
        {
            errors.push(ValidationError::new(
                "llm.base_url",
                format!("Base URL must be http(s), got '{}'", config.llm.base_url),
            ));
        }

        let temp = config.llm.temperature;
        if !(0.0..=2.0).contains(&temp) {
            errors.push(ValidationError::new(
                "llm.temperature",
                format!("Temperature must be between 0.0 and 2.0, got {}", temp),
            ));
        }

        if config.llm.max_context_chars == 0 {
            errors.push(ValidationError::new(
                "llm.max_context_chars",
                "Context budget must be greater than 0",
            ));
        }

        Self::check_duration("llm.timeout", &config.llm.timeout, errors);
        Self::check_duration("llm.retry_backoff", &config.llm.retry_backoff, errors);
    }

    fn check_duration(path: &str, value: &str, errors: &mut Vec<ValidationError>) {
        if parse_duration(value).is_none() {
            errors.push(ValidationError::new(
                path,
                format!("Invalid duration format: {}", value),
            ));
        }
    }
}
