//! Object storage gateway.
//!
//! Documents arrive either as a key in an S3/MinIO-style bucket or as a
//! public URL. Both resolve to the raw document bytes; "not found" and
//! "storage unreachable" stay distinct so callers can tell a terminal miss
//! from a retryable outage.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use thiserror::Error;

use crate::config::Config;

/// Errors raised while retrieving document bytes.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The requested object or URL does not exist.
    #[error("source not found: {0}")]
    NotFound(String),
    /// Storage keys were requested but no storage endpoint is configured.
    #[error("storage endpoint not configured; cannot resolve key '{0}'")]
    NotConfigured(String),
    /// HTTP layer failed before receiving a response.
    #[error("storage request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Storage responded with an unexpected status code.
    #[error("unexpected storage response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned from storage.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
}

impl StorageError {
    /// Whether a retry could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(error) => error.is_timeout() || error.is_connect() || error.is_request(),
            Self::UnexpectedStatus { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            Self::NotFound(_) | Self::NotConfigured(_) => false,
        }
    }
}

/// Interface for resolving document sources into bytes.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch an object from the configured bucket by key.
    async fn fetch_key(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Fetch a document from a public URL.
    async fn fetch_url(&self, url: &str) -> Result<Vec<u8>, StorageError>;
}

/// HTTP-backed object store speaking path-style S3/MinIO GETs.
pub struct HttpObjectStore {
    client: Client,
    endpoint: Option<String>,
    bucket: Option<String>,
}

impl HttpObjectStore {
    /// Construct the store from explicit configuration.
    pub fn new(config: &Config) -> Result<Self, StorageError> {
        let client = Client::builder().user_agent("pdfvector/0.2").build()?;
        Ok(Self {
            client,
            endpoint: config
                .storage_endpoint
                .as_ref()
                .map(|value| value.trim_end_matches('/').to_string()),
            bucket: config.storage_bucket.clone(),
        })
    }

    async fn get(&self, url: &str, source: &str) -> Result<Vec<u8>, StorageError> {
        let response = self.client.get(url).send().await?;

        match response.status() {
            status if status.is_success() => Ok(response.bytes().await?.to_vec()),
            StatusCode::NOT_FOUND => Err(StorageError::NotFound(source.to_string())),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(StorageError::UnexpectedStatus { status, body })
            }
        }
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn fetch_key(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let (Some(endpoint), Some(bucket)) = (self.endpoint.as_ref(), self.bucket.as_ref()) else {
            return Err(StorageError::NotConfigured(key.to_string()));
        };
        let url = format!("{endpoint}/{bucket}/{key}");
        tracing::debug!(key, "Fetching document from storage");
        self.get(&url, key).await
    }

    async fn fetch_url(&self, url: &str) -> Result<Vec<u8>, StorageError> {
        tracing::debug!(url, "Fetching document from URL");
        self.get(url, url).await
    }
}
