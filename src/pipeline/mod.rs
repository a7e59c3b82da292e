//! Document ingestion pipeline: retrieval, structuring, embedding, and
//! vector-store orchestration, plus the semantic-search read path.

mod batcher;
mod mappers;
mod service;
pub mod types;

pub use service::{IngestService, PipelineApi};
pub use types::{
    DocumentSource, IngestError, IngestOutcome, IngestStatus, InitError, SearchError, SearchHit,
    SearchRequest,
};
