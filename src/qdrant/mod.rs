//! Qdrant vector store integration.

pub mod client;
pub mod filters;
pub mod payload;
pub mod types;

pub use client::QdrantService;
pub use filters::{build_search_filter, fingerprint_filter};
pub use payload::build_payload;
pub use types::{QdrantError, ScoredPoint, SearchFilterArgs, VectorRecord};
