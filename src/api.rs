//! HTTP surface for the PDF chunking back end.
//!
//! This module exposes an Axum router with the following endpoints:
//!
//! - `GET /` – Server name, version, and an endpoint catalog.
//! - `GET /test` – Liveness probe.
//! - `GET /api/llama-docs?query=` – Answer a documentation question from the LlamaCloud index.
//! - `POST /pdf/upload` – Store a multipart `file` and start background processing.
//! - `GET /pdf/status/:job_id` – Job record for a previous upload.
//! - `GET /pdf/download/:job_id` – Generated summary PDF once the job is complete.
//! - `GET /api-status`, `GET /status` – Server and job overviews.
//! - `GET /metrics` – Pipeline counters.
//!
//! The router is generic over [`PdfApi`] so tests can swap in a stub service. Upload bodies are
//! capped at `MAX_UPLOAD_BYTES` rather than axum's 2 MiB default.

use crate::config::get_config;
use crate::jobs::JobStatus;
use crate::processing::{PdfApi, ProcessingError};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State, multipart::MultipartError},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;

/// Build the HTTP router exposing the back-end API surface.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: PdfApi + 'static,
{
    Router::new()
        .route("/", get(root))
        .route("/test", get(test_endpoint))
        .route("/api/llama-docs", get(llama_docs::<S>))
        .route(
            "/pdf/upload",
            post(upload_pdf::<S>).layer(DefaultBodyLimit::max(get_config().max_upload_bytes)),
        )
        .route("/pdf/status/:job_id", get(job_status::<S>))
        .route("/pdf/download/:job_id", get(download_pdf::<S>))
        .route("/api-status", get(api_status::<S>))
        .route("/status", get(server_status::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .with_state(service)
}

/// Descriptor for a single endpoint in the discovery catalog.
#[derive(Serialize)]
struct EndpointDescriptor {
    method: &'static str,
    path: &'static str,
    description: &'static str,
}

const ENDPOINTS: [EndpointDescriptor; 8] = [
    EndpointDescriptor {
        method: "GET",
        path: "/test",
        description: "Liveness probe.",
    },
    EndpointDescriptor {
        method: "GET",
        path: "/api/llama-docs?query=",
        description: "Answer a question from the LlamaCloud documentation index.",
    },
    EndpointDescriptor {
        method: "POST",
        path: "/pdf/upload",
        description: "Upload a PDF as multipart field `file`; returns a job id.",
    },
    EndpointDescriptor {
        method: "GET",
        path: "/pdf/status/{job_id}",
        description: "Processing status of an uploaded PDF.",
    },
    EndpointDescriptor {
        method: "GET",
        path: "/pdf/download/{job_id}",
        description: "Download the summary PDF of a completed job.",
    },
    EndpointDescriptor {
        method: "GET",
        path: "/api-status",
        description: "Server configuration and health.",
    },
    EndpointDescriptor {
        method: "GET",
        path: "/status",
        description: "Job counts by status and working directories.",
    },
    EndpointDescriptor {
        method: "GET",
        path: "/metrics",
        description: "Pipeline counters.",
    },
];

async fn root() -> Json<Value> {
    Json(json!({
        "name": get_config().server_name,
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": ENDPOINTS,
    }))
}

async fn test_endpoint() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "server": get_config().server_name,
    }))
}

#[derive(Deserialize)]
struct DocsQuery {
    query: String,
}

/// Forward a documentation question; failures come back as `"Error: …"` in `result`.
async fn llama_docs<S>(
    State(service): State<Arc<S>>,
    Query(params): Query<DocsQuery>,
) -> Json<Value>
where
    S: PdfApi,
{
    tracing::info!(query = %params.query, "Documentation query");
    let result = service.query_documentation(&params.query).await;
    Json(json!({ "result": result }))
}

/// Success response for `POST /pdf/upload`.
#[derive(Serialize)]
struct UploadResponse {
    job_id: String,
    status: JobStatus,
    message: &'static str,
}

async fn upload_pdf<S>(
    State(service): State<Arc<S>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError>
where
    S: PdfApi,
{
    while let Some(field) = multipart.next_field().await.map_err(AppError::Upload)? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(AppError::Upload)?;

        let record = service.submit(&filename, bytes.to_vec()).await?;
        return Ok(Json(UploadResponse {
            job_id: record.job_id,
            status: record.status,
            message: "PDF uploaded successfully. Processing started.",
        }));
    }

    Err(AppError::BadRequest("No file uploaded".into()))
}

async fn job_status<S>(
    State(service): State<Arc<S>>,
    Path(job_id): Path<String>,
) -> Result<Response, AppError>
where
    S: PdfApi,
{
    let record = service
        .job(&job_id)
        .await
        .ok_or(AppError::NotFound("Job not found"))?;
    Ok(Json(record).into_response())
}

async fn download_pdf<S>(
    State(service): State<Arc<S>>,
    Path(job_id): Path<String>,
) -> Result<Response, AppError>
where
    S: PdfApi,
{
    let record = service
        .job(&job_id)
        .await
        .ok_or(AppError::NotFound("Job not found"))?;
    if record.status != JobStatus::Complete {
        return Err(AppError::BadRequest("PDF processing not complete".into()));
    }
    let output = record
        .output_pdf
        .as_deref()
        .ok_or(AppError::NotFound("Output file not found"))?;
    let bytes = tokio::fs::read(output)
        .await
        .map_err(|_| AppError::NotFound("Output file not found"))?;

    let disposition = format!(
        "attachment; filename=\"{}\"",
        download_name(&record.original_filename)
    );
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

/// `processed_<stem>.pdf` for an uploaded file name.
fn download_name(original_filename: &str) -> String {
    let stem = std::path::Path::new(original_filename)
        .file_stem()
        .map(|stem| stem.to_string_lossy().replace('"', ""))
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| "document".to_string());
    format!("processed_{stem}.pdf")
}

async fn api_status<S>(State(service): State<Arc<S>>) -> Json<Value>
where
    S: PdfApi,
{
    let config = get_config();
    let counts = service.job_counts().await;
    Json(json!({
        "status": "ok",
        "server": config.server_name,
        "port": config.server_port,
        "job_count": counts.total,
        "upload_dir": config.upload_dir.display().to_string(),
        "output_dir": config.output_dir.display().to_string(),
        "api_health": {
            "status": "healthy",
            "llama_cloud": config.llama_cloud.is_some(),
            "summarization_provider": format!("{:?}", config.summarization_provider).to_lowercase(),
        },
    }))
}

async fn server_status<S>(State(service): State<Arc<S>>) -> Json<Value>
where
    S: PdfApi,
{
    let config = get_config();
    let counts = service.job_counts().await;
    Json(json!({
        "status": "ok",
        "jobs": counts,
        "directories": {
            "upload_dir": config.upload_dir.display().to_string(),
            "output_dir": config.output_dir.display().to_string(),
        },
    }))
}

async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<Value>
where
    S: PdfApi,
{
    Json(json!(service.metrics_snapshot()))
}

enum AppError {
    Processing(ProcessingError),
    Upload(MultipartError),
    BadRequest(String),
    NotFound(&'static str),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            Self::Processing(error @ ProcessingError::UnsupportedFile) => {
                (StatusCode::BAD_REQUEST, error.to_string())
            }
            Self::Processing(error @ ProcessingError::FileNotFound(_)) => {
                (StatusCode::NOT_FOUND, error.to_string())
            }
            Self::Processing(error) => {
                tracing::error!(error = %error, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, error.to_string())
            }
            Self::Upload(error) => {
                tracing::warn!(error = %error, "Rejected upload body");
                (error.status(), format!("Failed to read upload: {}", error.body_text()))
            }
            Self::BadRequest(detail) => (StatusCode::BAD_REQUEST, detail),
            Self::NotFound(detail) => (StatusCode::NOT_FOUND, detail.to_string()),
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

impl From<ProcessingError> for AppError {
    fn from(inner: ProcessingError) -> Self {
        Self::Processing(inner)
    }
}
