//! Configuration management for docqa
//!
//! Loads the TOML configuration, applies profile and environment overrides,
//! and validates the result before anything else sees it.

use crate::chunking::{ChunkingParams, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use crate::embedding::EmbeddingBackend;
use crate::error::{DocqaError, Result};
use crate::index::{IndexStrategy, Metric};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

mod validator;

pub use validator::ConfigValidator;

/// Current configuration schema version
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "_meta")]
    pub meta: MetaConfig,
    pub document: DocumentConfig,
    pub chunking: ChunkingConfig,
    pub embedding: EmbeddingConfig,
    pub index: IndexConfig,
    pub retrieval: RetrievalConfig,
    pub llm: LlmConfig,
    #[serde(default)]
    pub profiles: HashMap<String, ProfileOverrides>,
}

/// Metadata about the configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaConfig {
    pub schema_version: String,
    #[serde(default = "current_timestamp")]
    pub created_at: String,
    #[serde(default = "current_timestamp")]
    pub last_modified: String,
}

fn current_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Documentation sources, chunked and indexed in order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentConfig {
    pub sources: Vec<PathBuf>,
}

/// Chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl ChunkingConfig {
    pub fn params(&self) -> Result<ChunkingParams> {
        ChunkingParams::new(self.chunk_size, self.overlap)
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub backend: EmbeddingBackend,
    pub model: String,
    /// Vector dimension for the hashing backend (fastembed models fix their own)
    pub dimension: usize,
    pub batch_size: usize,
    pub max_concurrent: usize,
    pub timeout: String,
    pub max_input_chars: usize,
}

impl EmbeddingConfig {
    pub fn timeout(&self) -> Result<Duration> {
        duration_value("embedding.timeout", &self.timeout)
    }
}

/// Indexing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    pub metric: Metric,
    pub strategy: IndexStrategy,
    pub hnsw_m: usize,
    pub hnsw_ef_construction: usize,
    pub hnsw_ef_search: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_path: Option<PathBuf>,
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Number of chunks retrieved per query
    pub k: usize,
}

/// LLM configuration for answer synthesis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub enabled: bool,
    pub provider: String,
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
    pub timeout: String,
    pub max_context_chars: usize,
    pub retry_backoff: String,
    pub degrade_to_retrieval: bool,
    pub history_turns: usize,
}

impl LlmConfig {
    pub fn timeout(&self) -> Result<Duration> {
        duration_value("llm.timeout", &self.timeout)
    }

    pub fn retry_backoff(&self) -> Result<Duration> {
        duration_value("llm.retry_backoff", &self.retry_backoff)
    }
}

/// Profile-specific configuration overrides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_backend: Option<EmbeddingBackend>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_strategy: Option<IndexStrategy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub k: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_model: Option<String>,
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(DocqaError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| DocqaError::Io {
            source: e,
            context: format!("Failed to read config file: {:?}", path),
        })?;
        let mut config: Config = toml::from_str(&content)?;

        // Apply environment variable overrides
        config.apply_env_overrides();

        // Validate configuration
        ConfigValidator::validate(&config)?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| DocqaError::Io {
            source: e,
            context: format!("Failed to write config file: {:?}", path),
        })?;
        Ok(())
    }

    /// Load configuration with a specific profile applied
    pub fn load_with_profile(path: &Path, profile: &str) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_profile(profile)?;
        ConfigValidator::validate(&config)?;
        Ok(config)
    }

    /// Apply a profile's overrides to the configuration
    pub fn apply_profile(&mut self, profile: &str) -> Result<()> {
        let overrides = self
            .profiles
            .get(profile)
            .cloned()
            .ok_or_else(|| DocqaError::Config(format!("Unknown profile: {}", profile)))?;

        if let Some(backend) = overrides.embedding_backend {
            self.embedding.backend = backend;
        }
        if let Some(model) = overrides.embedding_model {
            self.embedding.model = model;
        }
        if let Some(strategy) = overrides.index_strategy {
            self.index.strategy = strategy;
        }
        if let Some(k) = overrides.k {
            self.retrieval.k = k;
        }
        if let Some(enabled) = overrides.llm_enabled {
            self.llm.enabled = enabled;
        }
        if let Some(model) = overrides.llm_model {
            self.llm.model = model;
        }
        Ok(())
    }

    /// Apply environment variable overrides
    /// Environment variables in format: DOCQA_SECTION__KEY=value
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(std::env::vars());
    }

    /// Apply `DOCQA_`-prefixed overrides from any key/value source
    pub fn apply_overrides(&mut self, vars: impl IntoIterator<Item = (String, String)>) {
        for (key, value) in vars {
            if let Some(config_key) = key.strip_prefix("DOCQA_") {
                if let Err(e) = self.set_value_from_env(config_key, &value) {
                    tracing::warn!("Failed to apply env override {}: {}", key, e);
                }
            }
        }
    }

    fn set_value_from_env(&mut self, path: &str, value: &str) -> Result<()> {
        match path {
            "CHUNKING__CHUNK_SIZE" => self.chunking.chunk_size = parse_value(path, value)?,
            "CHUNKING__OVERLAP" => self.chunking.overlap = parse_value(path, value)?,
            "EMBEDDING__BACKEND" => {
                self.embedding.backend = match value {
                    "fastembed" => EmbeddingBackend::FastEmbed,
                    "hashing" => EmbeddingBackend::Hashing,
                    other => {
                        return Err(DocqaError::InvalidConfigValue {
                            path: path.to_string(),
                            message: format!("Unknown embedding backend '{}'", other),
                        })
                    }
                }
            }
            "EMBEDDING__MODEL" => self.embedding.model = value.to_string(),
            "INDEX__STRATEGY" => {
                self.index.strategy = match value {
                    "exact" => IndexStrategy::Exact,
                    "hnsw" => IndexStrategy::Hnsw,
                    other => {
                        return Err(DocqaError::InvalidConfigValue {
                            path: path.to_string(),
                            message: format!("Unknown index strategy '{}'", other),
                        })
                    }
                }
            }
            "INDEX__SNAPSHOT_PATH" => self.index.snapshot_path = Some(PathBuf::from(value)),
            "RETRIEVAL__K" => self.retrieval.k = parse_value(path, value)?,
            "LLM__ENABLED" => self.llm.enabled = parse_value(path, value)?,
            "LLM__MODEL" => self.llm.model = value.to_string(),
            "LLM__BASE_URL" => self.llm.base_url = value.to_string(),
            _ => {
                tracing::debug!("Unknown env config key: {}", path);
            }
        }
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| DocqaError::Config("Cannot determine config directory".to_string()))?;

        Ok(config_dir.join("docqa").join("config.toml"))
    }

    /// Get the default data directory
    pub fn default_data_dir() -> Result<PathBuf> {
        let home_dir = dirs::home_dir()
            .ok_or_else(|| DocqaError::Config("Cannot determine home directory".to_string()))?;

        Ok(home_dir.join(".docqa"))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            meta: MetaConfig {
                schema_version: SCHEMA_VERSION.to_string(),
                created_at: current_timestamp(),
                last_modified: current_timestamp(),
            },
            document: DocumentConfig {
                sources: vec![PathBuf::from("C++_Introduction.txt")],
            },
            chunking: ChunkingConfig {
                chunk_size: DEFAULT_CHUNK_SIZE,
                overlap: DEFAULT_CHUNK_OVERLAP,
            },
            embedding: EmbeddingConfig {
                backend: EmbeddingBackend::FastEmbed,
                model: "all-MiniLM-L6-v2".to_string(),
                dimension: 384,
                batch_size: 32,
                max_concurrent: 4,
                timeout: "30s".to_string(),
                max_input_chars: 8192,
            },
            index: IndexConfig {
                metric: Metric::Cosine,
                strategy: IndexStrategy::Exact,
                hnsw_m: 16,
                hnsw_ef_construction: 200,
                hnsw_ef_search: 64,
                snapshot_path: None,
            },
            retrieval: RetrievalConfig { k: 3 },
            llm: LlmConfig {
                enabled: false,
                provider: "ollama".to_string(),
                model: "gemma2:2b".to_string(),
                base_url: "http://localhost:11434".to_string(),
                temperature: 0.1,
                timeout: "60s".to_string(),
                max_context_chars: 4000,
                retry_backoff: "500ms".to_string(),
                degrade_to_retrieval: false,
                history_turns: 4,
            },
            profiles: HashMap::new(),
        }
    }
}

/// Parse durations such as "500ms", "30s", "2m", "1h". A bare number is seconds.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let (number, unit) = s.split_at(split);
    let value: u64 = number.parse().ok()?;

    match unit {
        "ms" => Some(Duration::from_millis(value)),
        "" | "s" => Some(Duration::from_secs(value)),
        "m" => Some(Duration::from_secs(value.checked_mul(60)?)),
        "h" => Some(Duration::from_secs(value.checked_mul(3600)?)),
        _ => None,
    }
}

fn duration_value(path: &str, value: &str) -> Result<Duration> {
    parse_duration(value).ok_or_else(|| DocqaError::InvalidConfigValue {
        path: path.to_string(),
        message: format!("Invalid duration format: {}", value),
    })
}

fn parse_value<T: std::str::FromStr>(path: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| DocqaError::InvalidConfigValue {
        path: path.to_string(),
        message: format!("Cannot parse '{}'", value),
    })
}

/// Expand a leading `~/` to the home directory
pub fn expand_path(path: &Path) -> Result<PathBuf> {
    let path_str = path
        .to_str()
        .ok_or_else(|| DocqaError::Config("Invalid path encoding".to_string()))?;

    if let Some(stripped) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| DocqaError::Config("Cannot determine home directory".to_string()))?;
        Ok(home.join(stripped))
    } else {
        Ok(path.to_path_buf())
    }
}
