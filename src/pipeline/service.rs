//! Ingestion service coordinating retrieval, structuring, embedding, and
//! Qdrant operations.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    config::Config,
    embedding::{EmbeddingClient, EmbeddingClientError, build_embedding_client},
    fingerprint::fingerprint_bytes,
    metrics::{IngestMetrics, MetricsSnapshot},
    partition::{HttpPartitioner, Partitioner, partition_with_fallback},
    pipeline::{
        batcher,
        mappers::map_scored_point,
        types::{
            DocumentSource, IngestError, IngestOutcome, IngestStatus, InitError, SearchError,
            SearchHit, SearchRequest,
        },
    },
    qdrant::{QdrantError, QdrantService, SearchFilterArgs, build_search_filter},
    retry::{RetryPolicy, retry_with_backoff},
    storage::{HttpObjectStore, ObjectStore, StorageError},
    structure::structure,
};

/// Coordinates the full ingestion pipeline and the semantic-search read path.
///
/// The service owns long-lived handles to the object store, the partitioner,
/// the embedding client, the Qdrant transport, and the metrics registry.
/// Construct it once near process start and share it through an `Arc`; call
/// [`IngestService::shutdown`] before the process exits.
pub struct IngestService {
    config: Arc<Config>,
    storage: Arc<dyn ObjectStore>,
    partitioner: Arc<dyn Partitioner>,
    embedding_client: Arc<dyn EmbeddingClient>,
    qdrant: Arc<QdrantService>,
    metrics: Arc<IngestMetrics>,
    retry_policy: RetryPolicy,
}

/// Abstraction over the pipeline used by external surfaces (HTTP, tests).
#[async_trait]
pub trait PipelineApi: Send + Sync {
    /// Retrieve, structure, embed, and store one document.
    async fn ingest(
        &self,
        source: DocumentSource,
        force_reload: bool,
    ) -> Result<IngestOutcome, IngestError>;

    /// Embed a query and run a similarity search.
    async fn search(&self, request: SearchRequest) -> Result<Vec<SearchHit>, SearchError>;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

impl IngestService {
    /// Build a new service from configuration, verifying the collection on
    /// the way up.
    pub async fn new(config: Arc<Config>) -> Result<Self, InitError> {
        let storage = Arc::new(HttpObjectStore::new(&config)?);
        let partitioner = Arc::new(HttpPartitioner::new(&config)?);
        let embedding_client = build_embedding_client(&config)?;
        let qdrant = Arc::new(QdrantService::new(&config)?);

        Self::with_components(config, storage, partitioner, embedding_client, qdrant).await
    }

    /// Build a service from pre-constructed handles.
    ///
    /// Ensures the collection exists with the configured dimension; a
    /// dimension conflict on an existing collection is fatal here, before any
    /// request is accepted.
    pub async fn with_components(
        config: Arc<Config>,
        storage: Arc<dyn ObjectStore>,
        partitioner: Arc<dyn Partitioner>,
        embedding_client: Arc<dyn EmbeddingClient>,
        qdrant: Arc<QdrantService>,
    ) -> Result<Self, InitError> {
        let dimension = config.embedding_dimension as u64;
        tracing::debug!(
            collection = %config.qdrant_collection_name,
            dimension,
            "Ensuring primary collection"
        );
        qdrant
            .ensure_collection(&config.qdrant_collection_name, dimension)
            .await?;
        qdrant
            .ensure_payload_indexes(&config.qdrant_collection_name)
            .await?;
        tracing::debug!(collection = %config.qdrant_collection_name, "Primary collection ready");

        let retry_policy = RetryPolicy::from_config(&config);
        Ok(Self {
            config,
            storage,
            partitioner,
            embedding_client,
            qdrant,
            metrics: Arc::new(IngestMetrics::new()),
            retry_policy,
        })
    }

    /// Retrieve, structure, embed, and store one document.
    pub async fn ingest(
        &self,
        source: DocumentSource,
        force_reload: bool,
    ) -> Result<IngestOutcome, IngestError> {
        let source_label = source.to_string();
        tracing::info!(source = %source_label, force_reload, "Processing document");

        let bytes = Arc::new(self.fetch_source(&source).await?);

        // Fingerprinting is pure CPU work and independent of partitioning;
        // run both concurrently.
        let hash_input = Arc::clone(&bytes);
        let hash_task = tokio::task::spawn_blocking(move || fingerprint_bytes(&hash_input));
        let partition_result = partition_with_fallback(self.partitioner.as_ref(), &bytes).await;
        let fingerprint = hash_task.await.expect("fingerprint task panicked");
        let elements = partition_result?;

        let units = structure(elements, &fingerprint, self.config.min_unit_chars)?;
        if units.is_empty() {
            tracing::info!(
                source = %source_label,
                fingerprint,
                "Document parsed but produced no embeddable content"
            );
            return Ok(IngestOutcome {
                status: IngestStatus::NoContent,
                fingerprint,
                unit_ids: Vec::new(),
            });
        }

        let collection = &self.config.qdrant_collection_name;
        if !force_reload {
            let existing = retry_with_backoff(
                &self.retry_policy,
                "exists_by_fingerprint",
                QdrantError::is_transient,
                || self.qdrant.exists_by_fingerprint(collection, &fingerprint),
            )
            .await?;
            if !existing.is_empty() {
                tracing::info!(
                    source = %source_label,
                    fingerprint,
                    existing = existing.len(),
                    "Document already processed; skipping embedding"
                );
                self.metrics.record_duplicate();
                return Ok(IngestOutcome {
                    status: IngestStatus::AlreadyProcessed,
                    fingerprint,
                    unit_ids: existing,
                });
            }
        }

        let unit_ids = batcher::embed_and_upsert(
            self.embedding_client.as_ref(),
            &self.qdrant,
            &self.retry_policy,
            collection,
            self.config.embedding_dimension,
            self.config.embedding_batch_size,
            self.config.embedding_max_concurrency,
            &units,
            &fingerprint,
            force_reload,
        )
        .await?;

        self.metrics.record_document(unit_ids.len() as u64);
        tracing::info!(
            source = %source_label,
            fingerprint,
            units = unit_ids.len(),
            "Document ingested"
        );

        Ok(IngestOutcome {
            status: IngestStatus::Processed,
            fingerprint,
            unit_ids,
        })
    }

    /// Execute a semantic search against the collection.
    pub async fn search(&self, request: SearchRequest) -> Result<Vec<SearchHit>, SearchError> {
        let SearchRequest {
            query_text,
            limit,
            file_hash,
        } = request;

        let mut vectors = retry_with_backoff(
            &self.retry_policy,
            "embed_query",
            EmbeddingClientError::is_transient,
            || {
                self.embedding_client
                    .generate_embeddings(vec![query_text.clone()])
            },
        )
        .await?;
        let vector = vectors.pop().ok_or(SearchError::EmptyEmbedding)?;

        let expected = self.config.embedding_dimension;
        if vector.len() != expected {
            return Err(SearchError::DimensionMismatch {
                expected,
                actual: vector.len(),
            });
        }

        let limit = limit
            .unwrap_or(self.config.search_default_limit)
            .clamp(1, self.config.search_max_limit);
        let filter = build_search_filter(&SearchFilterArgs {
            file_hash,
            ..Default::default()
        });

        let hits = retry_with_backoff(
            &self.retry_policy,
            "search_points",
            QdrantError::is_transient,
            || {
                self.qdrant.search_points(
                    &self.config.qdrant_collection_name,
                    vector.clone(),
                    filter.clone(),
                    limit,
                )
            },
        )
        .await?;

        self.metrics.record_search();
        Ok(hits.into_iter().map(map_scored_point).collect())
    }

    /// Return the current ingestion metrics snapshot.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Release long-lived handles before process exit.
    ///
    /// The HTTP transports close their pooled connections on drop; this hook
    /// exists so the teardown point stays explicit and logged.
    pub fn shutdown(&self) {
        tracing::info!("Ingestion service shutting down");
    }

    async fn fetch_source(&self, source: &DocumentSource) -> Result<Vec<u8>, IngestError> {
        let result = retry_with_backoff(
            &self.retry_policy,
            "fetch_source",
            StorageError::is_transient,
            || async {
                match source {
                    DocumentSource::StorageKey(key) => self.storage.fetch_key(key).await,
                    DocumentSource::Url(url) => self.storage.fetch_url(url).await,
                }
            },
        )
        .await;

        result.map_err(|error| match error {
            StorageError::NotFound(reference) => IngestError::SourceNotFound(reference),
            other => IngestError::Retrieval {
                source: source.to_string(),
                error: other,
            },
        })
    }
}

#[async_trait]
impl PipelineApi for IngestService {
    async fn ingest(
        &self,
        source: DocumentSource,
        force_reload: bool,
    ) -> Result<IngestOutcome, IngestError> {
        IngestService::ingest(self, source, force_reload).await
    }

    async fn search(&self, request: SearchRequest) -> Result<Vec<SearchHit>, SearchError> {
        IngestService::search(self, request).await
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        IngestService::metrics_snapshot(self)
    }
}
