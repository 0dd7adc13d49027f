//! In-memory job registry for background PDF processing.
//!
//! Every upload (and every synchronous `process_file` run) gets a record keyed by a UUID. Records
//! live for the lifetime of the process; there is no eviction.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tokio::sync::RwLock;

use crate::processing::PipelineReport;

/// Lifecycle stage of a processing job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// File stored, processing not yet started.
    Uploaded,
    /// Background task picked up the job.
    Processing,
    /// Text layer extracted.
    TextExtracted,
    /// Text split into chunks.
    TextChunked,
    /// Every chunk summarized.
    Summarized,
    /// Summary PDF written.
    Complete,
    /// Processing failed; see the record's `error`.
    Error,
}

impl JobStatus {
    /// Wire name of the status.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Uploaded => "uploaded",
            Self::Processing => "processing",
            Self::TextExtracted => "text_extracted",
            Self::TextChunked => "text_chunked",
            Self::Summarized => "summarized",
            Self::Complete => "complete",
            Self::Error => "error",
        }
    }

    /// Whether the job can no longer change.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Error)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a single job.
#[derive(Debug, Clone, Serialize)]
pub struct JobRecord {
    /// Unique job identifier.
    pub job_id: String,
    /// Current lifecycle stage.
    pub status: JobStatus,
    /// Path of the stored input PDF.
    pub file_path: String,
    /// File name supplied by the client.
    pub original_filename: String,
    /// Human-readable progress, e.g. `Summarized chunk 3/7`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<String>,
    /// Pipeline outcome once complete.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<PipelineReport>,
    /// Path of the generated summary PDF once complete.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_pdf: Option<String>,
    /// Failure description when `status` is `error`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
    /// RFC 3339 timestamp of the last change.
    pub updated_at: String,
}

/// Aggregate job counts used by status endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JobCounts {
    /// Number of known jobs.
    pub total: usize,
    /// Number of jobs per status name.
    pub by_status: BTreeMap<&'static str, usize>,
}

/// Thread-safe job registry shared by the HTTP, MCP, and background surfaces.
#[derive(Default)]
pub struct JobStore {
    jobs: RwLock<HashMap<String, JobRecord>>,
}

impl JobStore {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new job in the `uploaded` state.
    pub async fn create(
        &self,
        job_id: &str,
        file_path: String,
        original_filename: String,
    ) -> JobRecord {
        let now = timestamp();
        let record = JobRecord {
            job_id: job_id.to_string(),
            status: JobStatus::Uploaded,
            file_path,
            original_filename,
            progress: None,
            result: None,
            output_pdf: None,
            error: None,
            created_at: now.clone(),
            updated_at: now,
        };
        self.jobs
            .write()
            .await
            .insert(job_id.to_string(), record.clone());
        record
    }

    /// Return a copy of the job, if known.
    pub async fn get(&self, job_id: &str) -> Option<JobRecord> {
        self.jobs.read().await.get(job_id).cloned()
    }

    /// Move the job to `status`.
    pub async fn set_status(&self, job_id: &str, status: JobStatus) {
        self.update(job_id, |record| record.status = status).await;
    }

    /// Replace the job's progress message.
    pub async fn set_progress(&self, job_id: &str, progress: String) {
        self.update(job_id, |record| record.progress = Some(progress))
            .await;
    }

    /// Mark the job complete with its pipeline outcome.
    pub async fn complete(&self, job_id: &str, report: PipelineReport) {
        self.update(job_id, |record| {
            record.status = JobStatus::Complete;
            record.output_pdf = Some(report.output_pdf.display().to_string());
            record.result = Some(report);
        })
        .await;
    }

    /// Mark the job failed.
    pub async fn fail(&self, job_id: &str, error: String) {
        self.update(job_id, |record| {
            record.status = JobStatus::Error;
            record.error = Some(error);
        })
        .await;
    }

    /// Number of known jobs.
    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    /// Whether no job has been registered yet.
    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }

    /// Count jobs per status.
    pub async fn counts(&self) -> JobCounts {
        let jobs = self.jobs.read().await;
        let mut by_status = BTreeMap::new();
        for record in jobs.values() {
            *by_status.entry(record.status.as_str()).or_insert(0) += 1;
        }
        JobCounts {
            total: jobs.len(),
            by_status,
        }
    }

    /// All jobs, oldest first.
    pub async fn list(&self) -> Vec<JobRecord> {
        let mut records: Vec<_> = self.jobs.read().await.values().cloned().collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        records
    }

    async fn update(&self, job_id: &str, apply: impl FnOnce(&mut JobRecord)) {
        let mut jobs = self.jobs.write().await;
        match jobs.get_mut(job_id) {
            Some(record) => {
                apply(record);
                record.updated_at = timestamp();
            }
            None => tracing::warn!(job_id, "Update for unknown job ignored"),
        }
    }
}

fn timestamp() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}
