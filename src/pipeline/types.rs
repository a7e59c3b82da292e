//! Core data types and error definitions for the ingestion pipeline.

use serde::Serialize;
use thiserror::Error;

use crate::embedding::EmbeddingClientError;
use crate::partition::PartitionError;
use crate::qdrant::QdrantError;
use crate::storage::StorageError;
use crate::structure::StructureError;

/// Reference to the document a caller wants ingested.
#[derive(Debug, Clone)]
pub enum DocumentSource {
    /// Key of an object in the configured storage bucket.
    StorageKey(String),
    /// Publicly reachable URL.
    Url(String),
}

impl std::fmt::Display for DocumentSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StorageKey(key) => write!(f, "key:{key}"),
            Self::Url(url) => write!(f, "url:{url}"),
        }
    }
}

/// Errors emitted by the ingestion pipeline.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Request carried neither a storage key nor a URL.
    #[error("no document source provided; supply source_key or source_url")]
    MissingSource,
    /// Request carried both a storage key and a URL.
    #[error("ambiguous document source; supply either source_key or source_url, not both")]
    ConflictingSource,
    /// The referenced source does not exist. Terminal for the request.
    #[error("source not found: {0}")]
    SourceNotFound(String),
    /// Storage or the URL host was unreachable. May warrant a caller retry.
    #[error("failed to retrieve '{source}': {error}")]
    Retrieval {
        /// Source reference that failed to resolve.
        source: String,
        /// Underlying storage failure.
        #[source]
        error: StorageError,
    },
    /// The partitioning engine could not parse the document.
    #[error("failed to partition document: {0}")]
    Partition(#[from] PartitionError),
    /// Structuring found nothing usable in the partitioned elements.
    #[error("failed to extract content: {0}")]
    Extraction(#[from] StructureError),
    /// Embedding provider failed beyond the local retry budget.
    #[error("failed to generate embeddings: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Vector store interaction failed beyond the local retry budget.
    #[error("vector store request failed: {0}")]
    VectorStore(#[from] QdrantError),
    /// Provider produced vectors of the wrong dimension. Fatal, never retried.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension declared on the collection.
        expected: usize,
        /// Dimension actually produced by the provider.
        actual: usize,
    },
}

/// Errors emitted while constructing the pipeline's long-lived handles.
#[derive(Debug, Error)]
pub enum InitError {
    /// Object store handle could not be constructed.
    #[error("failed to initialize object store: {0}")]
    Storage(#[from] StorageError),
    /// Partitioner handle could not be constructed.
    #[error("failed to initialize partitioner: {0}")]
    Partitioner(#[from] PartitionError),
    /// Embedding client could not be constructed.
    #[error("failed to initialize embedding client: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Qdrant handle or collection setup failed.
    #[error("failed to initialize vector store: {0}")]
    VectorStore(#[from] QdrantError),
}

/// Terminal state of an ingestion request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestStatus {
    /// Document was structured, embedded, and stored.
    Processed,
    /// Byte-identical content was already present; nothing was written.
    AlreadyProcessed,
    /// Document parsed successfully but yielded no embeddable content.
    NoContent,
}

/// Summary of a completed ingestion.
#[derive(Debug, Clone, Serialize)]
pub struct IngestOutcome {
    /// Terminal state of the request.
    pub status: IngestStatus,
    /// Fingerprint computed over the document bytes.
    pub fingerprint: String,
    /// Identifiers of the content units stored for this fingerprint.
    pub unit_ids: Vec<String>,
}

/// Errors emitted while orchestrating similarity searches.
///
/// A search that finds nothing returns an empty `Ok`; every variant here
/// means the search itself failed.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Embedding provider failed to return a vector for the query text.
    #[error("failed to embed query: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Qdrant search request returned an error response.
    #[error("vector store request failed: {0}")]
    VectorStore(#[from] QdrantError),
    /// Returned embedding dimension does not match configuration.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension declared on the collection.
        expected: usize,
        /// Dimension actually produced by the provider.
        actual: usize,
    },
    /// Embedding provider returned no vectors for the query.
    #[error("embedding provider returned no vectors for the query")]
    EmptyEmbedding,
}

/// Parameters supplied to the search pipeline.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    /// Natural language query text to embed.
    pub query_text: String,
    /// Maximum number of results to return (defaults applied downstream).
    pub limit: Option<usize>,
    /// Optional fingerprint restricting results to one document.
    pub file_hash: Option<String>,
}

/// Structured search hit returned to API consumers.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    /// Identifier assigned to the stored unit.
    pub id: String,
    /// Similarity score reported by Qdrant.
    pub score: f32,
    /// Stored text payload, if available.
    pub text: Option<String>,
    /// Originating page number, if available.
    pub page: Option<u32>,
    /// Section heading the unit was filed under, if available.
    pub section: Option<String>,
    /// Stored content type, if available.
    pub content_type: Option<String>,
    /// Image identifiers co-located with the unit, if any.
    pub related_images: Option<Vec<String>>,
    /// Fingerprint of the document the unit belongs to, if available.
    pub file_hash: Option<String>,
    /// Complete stored payload, for consumers that need fields beyond the
    /// flattened ones above.
    pub payload: Option<serde_json::Map<String, serde_json::Value>>,
}
