use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing ingestion and search activity.
#[derive(Default)]
pub struct IngestMetrics {
    documents_ingested: AtomicU64,
    documents_deduplicated: AtomicU64,
    units_stored: AtomicU64,
    searches_executed: AtomicU64,
}

impl IngestMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a freshly ingested document and the number of units stored for it.
    pub fn record_document(&self, unit_count: u64) {
        self.documents_ingested.fetch_add(1, Ordering::Relaxed);
        self.units_stored.fetch_add(unit_count, Ordering::Relaxed);
    }

    /// Record an ingestion that was skipped because the fingerprint already existed.
    pub fn record_duplicate(&self) {
        self.documents_deduplicated.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed similarity search.
    pub fn record_search(&self) {
        self.searches_executed.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            documents_ingested: self.documents_ingested.load(Ordering::Relaxed),
            documents_deduplicated: self.documents_deduplicated.load(Ordering::Relaxed),
            units_stored: self.units_stored.load(Ordering::Relaxed),
            searches_executed: self.searches_executed.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of ingestion counters used for reporting.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Number of documents ingested and stored since startup.
    pub documents_ingested: u64,
    /// Number of ingestion requests answered from the existing fingerprint.
    pub documents_deduplicated: u64,
    /// Total content units persisted across all ingested documents.
    pub units_stored: u64,
    /// Number of similarity searches served since startup.
    pub searches_executed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_documents_and_units() {
        let metrics = IngestMetrics::new();
        metrics.record_document(3);
        metrics.record_document(2);
        metrics.record_duplicate();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.documents_ingested, 2);
        assert_eq!(snapshot.units_stored, 5);
        assert_eq!(snapshot.documents_deduplicated, 1);
    }

    #[test]
    fn snapshot_starts_empty() {
        let metrics = IngestMetrics::new();
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.documents_ingested, 0);
        assert_eq!(snapshot.units_stored, 0);
        assert_eq!(snapshot.searches_executed, 0);
    }
}
