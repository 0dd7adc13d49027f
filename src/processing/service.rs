//! Processing service coordinating extraction, chunking, summarization, and rendering.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    config::Config,
    docs::{DocumentationIndex, build_documentation_index},
    jobs::{JobCounts, JobRecord, JobStatus, JobStore},
    llm::build_completion_client,
    metrics::{MetricsSnapshot, PipelineMetrics},
    pdf::{RenderOptions, extract_text, write_pdf},
    processing::{
        chunking::ChunkConfig,
        summarize::Summarizer,
        types::{PipelineReport, ProcessingError},
    },
};

/// Receives stage transitions and progress while a document moves through the pipeline.
#[async_trait]
pub trait PipelineObserver: Send + Sync {
    /// The pipeline entered `status`.
    async fn stage(&self, status: JobStatus);

    /// `completed` of `total` chunks have been summarized.
    async fn progress(&self, completed: usize, total: usize);
}

/// Observer that ignores every notification.
pub struct NoopObserver;

#[async_trait]
impl PipelineObserver for NoopObserver {
    async fn stage(&self, _status: JobStatus) {}

    async fn progress(&self, _completed: usize, _total: usize) {}
}

/// Mirrors pipeline progress onto a job record.
struct JobObserver<'a> {
    jobs: &'a JobStore,
    job_id: &'a str,
}

#[async_trait]
impl PipelineObserver for JobObserver<'_> {
    async fn stage(&self, status: JobStatus) {
        self.jobs.set_status(self.job_id, status).await;
    }

    async fn progress(&self, completed: usize, total: usize) {
        self.jobs
            .set_progress(self.job_id, format!("Summarized chunk {completed}/{total}"))
            .await;
    }
}

/// Extract → chunk → summarize → render for a single document.
pub struct Pipeline {
    chunking: ChunkConfig,
    summarizer: Summarizer,
    output_dir: PathBuf,
}

impl Pipeline {
    /// Assemble a pipeline writing summaries into `output_dir`.
    pub fn new(chunking: ChunkConfig, summarizer: Summarizer, output_dir: PathBuf) -> Self {
        Self {
            chunking,
            summarizer,
            output_dir,
        }
    }

    /// Directory summary PDFs are written to.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Process `input`, writing `{job_id}_summary.pdf` into the output directory.
    pub async fn run(
        &self,
        input: &Path,
        job_id: &str,
        observer: &dyn PipelineObserver,
    ) -> Result<PipelineReport, ProcessingError> {
        match tokio::fs::metadata(input).await {
            Ok(metadata) if metadata.is_file() => {}
            Ok(_) => return Err(ProcessingError::FileNotFound(input.display().to_string())),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return Err(ProcessingError::FileNotFound(input.display().to_string()));
            }
            Err(error) => return Err(error.into()),
        }

        observer.stage(JobStatus::Processing).await;
        let text = extract_text(input).await?;
        let extracted_text_length = text.chars().count();
        observer.stage(JobStatus::TextExtracted).await;

        let chunks = self.chunking.split(&text);
        let total = chunks.len();
        tracing::info!(
            job_id,
            characters = extracted_text_length,
            chunks = total,
            chunk_size = self.chunking.chunk_size(),
            overlap = self.chunking.overlap(),
            "Chunked document"
        );
        observer.stage(JobStatus::TextChunked).await;

        let mut summaries = Vec::with_capacity(total);
        let mut fallbacks = 0;
        for (index, chunk) in chunks.iter().enumerate() {
            let (summary, fell_back) = self.summarizer.summarize_chunk(chunk).await;
            if fell_back {
                fallbacks += 1;
            }
            summaries.push(summary);
            observer.progress(index + 1, total).await;
        }
        let summary = summaries.join("\n\n");
        observer.stage(JobStatus::Summarized).await;

        let title = input
            .file_name()
            .map(|name| format!("Summary of {}", name.to_string_lossy()));
        let output_pdf = self.output_dir.join(format!("{job_id}_summary.pdf"));
        let summary_length = summary.chars().count();
        write_pdf(summary, &output_pdf, RenderOptions { title }).await?;

        tracing::info!(
            job_id,
            chunks = total,
            fallbacks,
            summary_length,
            strategy = self.summarizer.strategy(),
            output = %output_pdf.display(),
            "Document summarized"
        );

        Ok(PipelineReport {
            input_pdf: input.to_path_buf(),
            extracted_text_length,
            num_chunks: total,
            summary_length,
            output_pdf,
            fallbacks,
        })
    }
}

/// A document processed synchronously through [`PdfService::process_file`].
#[derive(Debug, Clone)]
pub struct ProcessedFile {
    /// Job the run was recorded under.
    pub job_id: String,
    /// Pipeline outcome.
    pub report: PipelineReport,
}

/// Owns the job registry, pipeline, documentation index, and metrics.
///
/// Cloning is cheap; every clone shares the same state, which lets uploads hand a copy to the
/// background task that processes them.
#[derive(Clone)]
pub struct PdfService {
    jobs: Arc<JobStore>,
    pipeline: Arc<Pipeline>,
    docs: Option<Arc<dyn DocumentationIndex>>,
    metrics: Arc<PipelineMetrics>,
    upload_dir: PathBuf,
}

/// Abstraction over the service used by the HTTP surface.
#[async_trait]
pub trait PdfApi: Send + Sync {
    /// Store an uploaded PDF and start processing it in the background.
    async fn submit(&self, filename: &str, bytes: Vec<u8>) -> Result<JobRecord, ProcessingError>;

    /// Look up a job.
    async fn job(&self, job_id: &str) -> Option<JobRecord>;

    /// Job totals grouped by status.
    async fn job_counts(&self) -> JobCounts;

    /// Answer a documentation query, reporting failures as `"Error: …"` text.
    async fn query_documentation(&self, query: &str) -> String;

    /// Current pipeline counters.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

impl PdfService {
    /// Build the service and its clients from configuration.
    pub fn from_config(config: &Config) -> Result<Self, ProcessingError> {
        let chunking = ChunkConfig::new(config.chunk_size, config.chunk_overlap)?;
        let completion = build_completion_client(config)
            .map_err(|error| ProcessingError::Initialization(error.to_string()))?;
        let docs = build_documentation_index(config.llama_cloud.as_ref(), completion.clone())
            .map_err(|error| ProcessingError::Initialization(error.to_string()))?;
        let summarizer = Summarizer::new(completion, config.summary_max_length);
        let pipeline = Pipeline::new(chunking, summarizer, config.output_dir.clone());
        Ok(Self::new(pipeline, docs, config.upload_dir.clone()))
    }

    /// Assemble a service from prebuilt parts.
    pub fn new(
        pipeline: Pipeline,
        docs: Option<Arc<dyn DocumentationIndex>>,
        upload_dir: PathBuf,
    ) -> Self {
        Self {
            jobs: Arc::new(JobStore::new()),
            pipeline: Arc::new(pipeline),
            docs,
            metrics: Arc::new(PipelineMetrics::new()),
            upload_dir,
        }
    }

    /// Create the upload and output directories.
    pub async fn ensure_directories(&self) -> Result<(), ProcessingError> {
        tokio::fs::create_dir_all(&self.upload_dir).await?;
        tokio::fs::create_dir_all(self.pipeline.output_dir()).await?;
        Ok(())
    }

    /// Directory uploads are stored in.
    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// Directory summaries are written to.
    pub fn output_dir(&self) -> &Path {
        self.pipeline.output_dir()
    }

    /// Whether documentation queries can be answered.
    pub fn docs_enabled(&self) -> bool {
        self.docs.is_some()
    }

    /// Store an uploaded PDF and start processing it in the background.
    pub async fn submit(
        &self,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<JobRecord, ProcessingError> {
        let basename = sanitize_filename(filename);
        if !is_pdf_name(&basename) {
            return Err(ProcessingError::UnsupportedFile);
        }

        let job_id = uuid::Uuid::new_v4().to_string();
        tokio::fs::create_dir_all(&self.upload_dir).await?;
        let path = self.upload_dir.join(format!("{job_id}_{basename}"));
        tokio::fs::write(&path, &bytes).await?;

        let record = self
            .jobs
            .create(&job_id, path.display().to_string(), basename)
            .await;
        tracing::info!(job_id, bytes = bytes.len(), path = %path.display(), "Upload stored");

        let service = self.clone();
        tokio::spawn(async move {
            // Failures are recorded on the job.
            let _ = service.run_job(&job_id, &path).await;
        });

        Ok(record)
    }

    /// Process a PDF on disk and wait for the result; the run is recorded as a job.
    pub async fn process_file(&self, path: &Path) -> Result<ProcessedFile, ProcessingError> {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Err(ProcessingError::FileNotFound(path.display().to_string()));
        }
        let job_id = uuid::Uuid::new_v4().to_string();
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.jobs
            .create(&job_id, path.display().to_string(), filename)
            .await;

        let report = self.run_job(&job_id, path).await?;
        Ok(ProcessedFile { job_id, report })
    }

    async fn run_job(&self, job_id: &str, path: &Path) -> Result<PipelineReport, ProcessingError> {
        let observer = JobObserver {
            jobs: &self.jobs,
            job_id,
        };
        match self.pipeline.run(path, job_id, &observer).await {
            Ok(report) => {
                self.metrics
                    .record_document(report.num_chunks as u64, report.fallbacks as u64);
                self.jobs.complete(job_id, report.clone()).await;
                tracing::info!(job_id, "Job complete");
                Ok(report)
            }
            Err(error) => {
                self.metrics.record_failure();
                tracing::error!(job_id, error = %error, "Job failed");
                self.jobs
                    .fail(job_id, format!("Error processing PDF: {error}"))
                    .await;
                Err(error)
            }
        }
    }

    /// Look up a job.
    pub async fn job(&self, job_id: &str) -> Option<JobRecord> {
        self.jobs.get(job_id).await
    }

    /// All jobs, oldest first.
    pub async fn jobs(&self) -> Vec<JobRecord> {
        self.jobs.list().await
    }

    /// Job totals grouped by status.
    pub async fn job_counts(&self) -> JobCounts {
        self.jobs.counts().await
    }

    /// Answer a documentation query, reporting failures as `"Error: …"` text.
    pub async fn query_documentation(&self, query: &str) -> String {
        let Some(index) = &self.docs else {
            return "Error: LlamaCloud index not initialized".to_string();
        };
        match index.query(query).await {
            Ok(answer) => answer,
            Err(error) => {
                tracing::warn!(error = %error, "Documentation query failed");
                format!("Error: {error}")
            }
        }
    }

    /// Current pipeline counters.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[async_trait]
impl PdfApi for PdfService {
    async fn submit(&self, filename: &str, bytes: Vec<u8>) -> Result<JobRecord, ProcessingError> {
        PdfService::submit(self, filename, bytes).await
    }

    async fn job(&self, job_id: &str) -> Option<JobRecord> {
        PdfService::job(self, job_id).await
    }

    async fn job_counts(&self) -> JobCounts {
        PdfService::job_counts(self).await
    }

    async fn query_documentation(&self, query: &str) -> String {
        PdfService::query_documentation(self, query).await
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        PdfService::metrics_snapshot(self)
    }
}

/// Strip any client-supplied directory components from an upload name.
pub(crate) fn sanitize_filename(filename: &str) -> String {
    filename
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or_default()
        .trim()
        .to_string()
}

fn is_pdf_name(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .is_some_and(|extension| extension.eq_ignore_ascii_case("pdf"))
}
