//! Shared types used by the Qdrant client and helpers.

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors returned while interacting with Qdrant.
#[derive(Debug, Error)]
pub enum QdrantError {
    /// Base URL failed to parse or normalize.
    #[error("Invalid Qdrant URL: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Qdrant responded with an unexpected status code.
    #[error("Unexpected Qdrant response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned from Qdrant.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// An existing collection is configured with a different vector size.
    ///
    /// This is a fatal schema conflict; the collection is never destroyed
    /// and recreated to resolve it.
    #[error(
        "collection '{collection}' already exists with dimension {actual}, expected {expected}"
    )]
    DimensionMismatch {
        /// Collection whose schema conflicts with the configuration.
        collection: String,
        /// Dimension required by the embedding configuration.
        expected: u64,
        /// Dimension declared on the existing collection.
        actual: u64,
    },
}

impl QdrantError {
    /// Whether a retry could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(error) => error.is_timeout() || error.is_connect() || error.is_request(),
            Self::UnexpectedStatus { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            Self::InvalidUrl(_) | Self::DimensionMismatch { .. } => false,
        }
    }
}

/// Prepared vector point ready for upsert.
#[derive(Debug, Clone)]
pub struct VectorRecord {
    /// Stringified content-unit identifier used as the point id.
    pub id: String,
    /// Embedding vector of the collection's declared dimension.
    pub vector: Vec<f32>,
    /// Flattened payload stored alongside the vector.
    pub payload: Value,
}

/// Filters that can be applied to Qdrant search queries.
#[derive(Debug, Default, Clone)]
pub struct SearchFilterArgs {
    /// Exact match constraint for the `file_hash` payload field.
    pub file_hash: Option<String>,
    /// Exact match constraint for the `content_type` payload field.
    pub content_type: Option<String>,
}

/// Scored payload returned by Qdrant queries.
#[derive(Debug, Clone)]
pub struct ScoredPoint {
    /// Identifier assigned to the vector.
    pub id: String,
    /// Similarity score computed by Qdrant.
    pub score: f32,
    /// Optional payload associated with the vector.
    pub payload: Option<Map<String, Value>>,
}

#[derive(Deserialize)]
pub(crate) struct CollectionInfoResponse {
    pub(crate) result: CollectionInfoResult,
}

#[derive(Deserialize)]
pub(crate) struct CollectionInfoResult {
    pub(crate) config: CollectionConfig,
}

#[derive(Deserialize)]
pub(crate) struct CollectionConfig {
    pub(crate) params: CollectionParams,
}

#[derive(Deserialize)]
pub(crate) struct CollectionParams {
    #[serde(default)]
    pub(crate) vectors: Value,
}

impl CollectionParams {
    /// Extract the declared vector size, handling both the plain and the
    /// named-vectors response shapes.
    pub(crate) fn vector_size(&self) -> Option<u64> {
        if let Some(size) = self.vectors.get("size").and_then(Value::as_u64) {
            return Some(size);
        }
        self.vectors
            .as_object()?
            .values()
            .find_map(|config| config.get("size").and_then(Value::as_u64))
    }
}

#[derive(Deserialize)]
pub(crate) struct QueryResponse {
    pub(crate) result: QueryResponseResult,
}

#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum QueryResponseResult {
    Points(Vec<QueryPoint>),
    Object {
        #[serde(default)]
        points: Vec<QueryPoint>,
    },
}

#[derive(Deserialize)]
pub(crate) struct QueryPoint {
    pub(crate) id: Value,
    pub(crate) score: f32,
    #[serde(default)]
    pub(crate) payload: Option<Map<String, Value>>,
}

#[derive(Deserialize)]
pub(crate) struct ScrollResponse {
    pub(crate) result: ScrollResult,
}

#[derive(Deserialize)]
pub(crate) struct ScrollResult {
    #[serde(default)]
    pub(crate) points: Vec<ScrollPoint>,
}

#[derive(Deserialize)]
pub(crate) struct ScrollPoint {
    #[serde(default)]
    pub(crate) id: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn vector_size_reads_plain_config() {
        let params = CollectionParams {
            vectors: json!({ "size": 1536, "distance": "Cosine" }),
        };
        assert_eq!(params.vector_size(), Some(1536));
    }

    #[test]
    fn vector_size_reads_named_config() {
        let params = CollectionParams {
            vectors: json!({ "dense": { "size": 768, "distance": "Cosine" } }),
        };
        assert_eq!(params.vector_size(), Some(768));
    }

    #[test]
    fn vector_size_handles_missing_config() {
        let params = CollectionParams {
            vectors: Value::Null,
        };
        assert_eq!(params.vector_size(), None);
    }
}
