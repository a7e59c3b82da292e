use serde::Deserialize;
use std::env;
use std::str::FromStr;
use thiserror::Error;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the pdfvector service.
///
/// Loaded once in `main` and passed by reference (`Arc`) into every long-lived
/// handle; there is no process-global configuration cache.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Base URL of the Qdrant instance that stores document vectors.
    pub qdrant_url: String,
    /// Name of the Qdrant collection used for document storage.
    pub qdrant_collection_name: String,
    /// Optional API key required to access Qdrant.
    pub qdrant_api_key: Option<String>,
    /// Embedding provider used to generate vector representations.
    pub embedding_provider: EmbeddingProvider,
    /// Embedding model identifier passed to the provider.
    pub embedding_model: String,
    /// Dimensionality of the produced vectors.
    pub embedding_dimension: usize,
    /// API key forwarded to OpenAI-compatible embedding endpoints.
    pub openai_api_key: Option<String>,
    /// Optional base URL override for OpenAI-compatible endpoints.
    pub openai_base_url: Option<String>,
    /// Optional base URL for a local Ollama runtime.
    pub ollama_url: Option<String>,
    /// Base URL of the document partitioning service.
    pub partitioner_url: String,
    /// Optional S3/MinIO-style endpoint documents are fetched from by key.
    pub storage_endpoint: Option<String>,
    /// Bucket name used when resolving storage keys.
    pub storage_bucket: Option<String>,
    /// Number of content units embedded per provider call.
    pub embedding_batch_size: usize,
    /// Maximum number of embedding batches in flight at once.
    pub embedding_max_concurrency: usize,
    /// Retry attempt budget for transient network failures.
    pub embedding_max_attempts: u32,
    /// Base delay in milliseconds for exponential retry backoff.
    pub embedding_retry_base_ms: u64,
    /// Minimum `text_content` length for a unit to survive noise filtering.
    pub min_unit_chars: usize,
    /// Result limit applied when a search request omits one.
    pub search_default_limit: usize,
    /// Upper bound on the search result limit.
    pub search_max_limit: usize,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

/// Supported embedding backends for the ingestion pipeline.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Local Ollama runtime.
    Ollama,
    /// Hosted OpenAI-compatible embeddings API.
    OpenAI,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Ok(Self {
            qdrant_url: load_env("QDRANT_URL")?,
            qdrant_collection_name: load_env("QDRANT_COLLECTION_NAME")?,
            qdrant_api_key: load_env_optional("QDRANT_API_KEY"),
            embedding_provider: load_env("EMBEDDING_PROVIDER")?
                .parse()
                .map_err(|()| ConfigError::InvalidValue("EMBEDDING_PROVIDER".to_string()))?,
            embedding_model: load_env("EMBEDDING_MODEL")?,
            embedding_dimension: parse_env("EMBEDDING_DIMENSION")?,
            openai_api_key: load_env_optional("OPENAI_API_KEY"),
            openai_base_url: load_env_optional("OPENAI_BASE_URL"),
            ollama_url: load_env_optional("OLLAMA_URL"),
            partitioner_url: load_env("PARTITIONER_URL")?,
            storage_endpoint: load_env_optional("STORAGE_ENDPOINT"),
            storage_bucket: load_env_optional("STORAGE_BUCKET"),
            embedding_batch_size: parse_env_or("EMBEDDING_BATCH_SIZE", 50)?,
            embedding_max_concurrency: parse_env_or("EMBEDDING_MAX_CONCURRENCY", 5)?,
            embedding_max_attempts: parse_env_or("EMBEDDING_MAX_ATTEMPTS", 3)?,
            embedding_retry_base_ms: parse_env_or("EMBEDDING_RETRY_BASE_MS", 500)?,
            min_unit_chars: parse_env_or("MIN_UNIT_CHARS", 10)?,
            search_default_limit: parse_env_or("SEARCH_DEFAULT_LIMIT", 5)?,
            search_max_limit: parse_env_or("SEARCH_MAX_LIMIT", 50)?,
            server_port: load_env_optional("SERVER_PORT")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".into()))
                })
                .transpose()?,
        })
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env<T: FromStr>(key: &str) -> Result<T, ConfigError> {
    load_env(key)?
        .parse()
        .map_err(|_| ConfigError::InvalidValue(key.to_string()))
}

fn parse_env_or<T: FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match load_env_optional(key) {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

impl FromStr for EmbeddingProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAI),
            _ => Err(()),
        }
    }
}
