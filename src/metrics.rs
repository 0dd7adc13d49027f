use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing PDF pipeline activity.
#[derive(Default)]
pub struct PipelineMetrics {
    documents_processed: AtomicU64,
    documents_failed: AtomicU64,
    chunks_summarized: AtomicU64,
    summary_fallbacks: AtomicU64,
    last_chunk_count: AtomicU64,
}

impl PipelineMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed document and the number of chunks produced for it.
    pub fn record_document(&self, chunk_count: u64, fallbacks: u64) {
        self.documents_processed.fetch_add(1, Ordering::Relaxed);
        self.chunks_summarized
            .fetch_add(chunk_count, Ordering::Relaxed);
        self.summary_fallbacks.fetch_add(fallbacks, Ordering::Relaxed);
        self.last_chunk_count.store(chunk_count, Ordering::Relaxed);
    }

    /// Record a document whose processing failed.
    pub fn record_failure(&self) {
        self.documents_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let documents_processed = self.documents_processed.load(Ordering::Relaxed);
        MetricsSnapshot {
            documents_processed,
            documents_failed: self.documents_failed.load(Ordering::Relaxed),
            chunks_summarized: self.chunks_summarized.load(Ordering::Relaxed),
            summary_fallbacks: self.summary_fallbacks.load(Ordering::Relaxed),
            last_chunk_count: (documents_processed > 0)
                .then(|| self.last_chunk_count.load(Ordering::Relaxed)),
        }
    }
}

/// Immutable view of pipeline counters used for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Documents summarized successfully since startup.
    pub documents_processed: u64,
    /// Documents whose processing ended in an error.
    pub documents_failed: u64,
    /// Total chunks produced across all processed documents.
    pub chunks_summarized: u64,
    /// Chunks whose summary fell back to a truncated excerpt.
    pub summary_fallbacks: u64,
    /// Chunk count of the most recent document, if any completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_chunk_count: Option<u64>,
}
