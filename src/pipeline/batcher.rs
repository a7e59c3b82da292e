//! Concurrency-controlled batch embedding and upsert.
//!
//! Content units are embedded in fixed-size batches with a bounded number of
//! batches in flight. Transient provider and vector-store failures retry with
//! exponential backoff; a batch that exhausts its budget fails the whole
//! ingestion. After the first permanent failure no new batches start, but
//! batches already in flight are awaited so their writes either complete or
//! fail cleanly — upserts are atomic at batch granularity.

use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::stream::{self, StreamExt};

use crate::embedding::{EmbeddingClient, EmbeddingClientError};
use crate::pipeline::types::IngestError;
use crate::qdrant::{QdrantError, QdrantService, VectorRecord, build_payload, payload};
use crate::retry::{RetryPolicy, retry_with_backoff};
use crate::structure::ContentUnit;

/// Embed every unit and upsert the resulting records for one fingerprint.
///
/// With `force_reload`, all records previously stored for the fingerprint are
/// deleted first so the collection never holds two generations at once.
/// Returns the ids of the stored units; batches complete in any order.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn embed_and_upsert(
    embedding_client: &dyn EmbeddingClient,
    qdrant: &QdrantService,
    policy: &RetryPolicy,
    collection: &str,
    dimension: usize,
    batch_size: usize,
    max_concurrency: usize,
    units: &[ContentUnit],
    file_hash: &str,
    force_reload: bool,
) -> Result<Vec<String>, IngestError> {
    if force_reload {
        retry_with_backoff(policy, "delete_by_fingerprint", QdrantError::is_transient, || {
            qdrant.delete_by_fingerprint(collection, file_hash)
        })
        .await?;
    }

    if units.is_empty() {
        return Ok(Vec::new());
    }

    let ingested_at = payload::current_timestamp_rfc3339();
    let failed = AtomicBool::new(false);
    let batches: Vec<(usize, &[ContentUnit])> =
        units.chunks(batch_size.max(1)).enumerate().collect();
    let batch_count = batches.len();

    tracing::debug!(
        file_hash,
        units = units.len(),
        batches = batch_count,
        batch_size,
        max_concurrency,
        "Embedding batches"
    );

    let mut batch_futures = Vec::with_capacity(batch_count);
    for (index, batch) in batches {
        batch_futures.push(run_batch(
            embedding_client,
            qdrant,
            policy,
            collection,
            dimension,
            &failed,
            ingested_at.as_str(),
            file_hash,
            index,
            batch,
        ));
    }
    let mut results = stream::iter(batch_futures).buffer_unordered(max_concurrency.max(1));

    let mut unit_ids = Vec::with_capacity(units.len());
    let mut first_error = None;
    while let Some(result) = results.next().await {
        match result {
            Ok(Some(ids)) => unit_ids.extend(ids),
            Ok(None) => {}
            Err(error) => {
                if first_error.is_none() {
                    first_error = Some(error);
                }
            }
        }
    }

    match first_error {
        Some(error) => Err(error),
        None => {
            tracing::debug!(file_hash, stored = unit_ids.len(), "All batches stored");
            Ok(unit_ids)
        }
    }
}

/// Run one batch, honoring the shared abort flag and recording permanent
/// failures. Extracted into a named async fn so the borrow of `batch` is
/// expressed with a higher-ranked lifetime the closure form cannot convey.
#[allow(clippy::too_many_arguments)]
async fn run_batch(
    embedding_client: &dyn EmbeddingClient,
    qdrant: &QdrantService,
    policy: &RetryPolicy,
    collection: &str,
    dimension: usize,
    failed: &AtomicBool,
    ingested_at: &str,
    file_hash: &str,
    index: usize,
    batch: &[ContentUnit],
) -> Result<Option<Vec<String>>, IngestError> {
    // A permanent failure elsewhere stops new batches from starting;
    // this batch has not done any work yet.
    if failed.load(Ordering::SeqCst) {
        return Ok(None);
    }
    match process_batch(
        embedding_client,
        qdrant,
        policy,
        collection,
        dimension,
        batch,
        ingested_at,
    )
    .await
    {
        Ok(ids) => Ok(Some(ids)),
        Err(error) => {
            failed.store(true, Ordering::SeqCst);
            tracing::error!(
                file_hash,
                batch = index,
                error = %error,
                "Batch failed permanently; aborting ingestion"
            );
            Err(error)
        }
    }
}

async fn process_batch(
    embedding_client: &dyn EmbeddingClient,
    qdrant: &QdrantService,
    policy: &RetryPolicy,
    collection: &str,
    dimension: usize,
    batch: &[ContentUnit],
    ingested_at: &str,
) -> Result<Vec<String>, IngestError> {
    let texts: Vec<String> = batch
        .iter()
        .map(|unit| normalize_text(&unit.text_content))
        .collect();

    let vectors = retry_with_backoff(
        policy,
        "generate_embeddings",
        EmbeddingClientError::is_transient,
        || embedding_client.generate_embeddings(texts.clone()),
    )
    .await?;

    if vectors.len() != batch.len() {
        return Err(IngestError::Embedding(
            EmbeddingClientError::InvalidResponse(format!(
                "provider returned {} vectors for {} units",
                vectors.len(),
                batch.len()
            )),
        ));
    }

    for vector in &vectors {
        if vector.len() != dimension {
            return Err(IngestError::DimensionMismatch {
                expected: dimension,
                actual: vector.len(),
            });
        }
    }

    let records: Vec<VectorRecord> = batch
        .iter()
        .zip(vectors)
        .map(|(unit, vector)| VectorRecord {
            id: unit.id.to_string(),
            vector,
            payload: build_payload(unit, ingested_at),
        })
        .collect();

    retry_with_backoff(policy, "upsert_points", QdrantError::is_transient, || {
        qdrant.upsert_points(collection, &records)
    })
    .await?;

    Ok(records.into_iter().map(|record| record.id).collect())
}

/// Collapse embedded line breaks before embedding.
fn normalize_text(text: &str) -> String {
    text.replace(['\n', '\r'], " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_text_collapses_line_breaks() {
        assert_eq!(normalize_text("a\nb\r\nc"), "a b  c");
        assert_eq!(normalize_text("plain"), "plain");
    }
}
