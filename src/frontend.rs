//! Browser-facing proxy in front of the back-end API.
//!
//! Serves a single embedded HTML page and relays uploads, status polls, and downloads to the back
//! end so the browser only ever talks to one origin. Back-end failures are reshaped into
//! `{"error": "Backend error: …"}` bodies carrying the back end's status code.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, State, multipart::MultipartError},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use reqwest::{Client, multipart};
use serde_json::{Value, json};

use crate::config::DEFAULT_MAX_UPLOAD_BYTES;

const INDEX_HTML: &str = include_str!("../static/index.html");
const BACKEND_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_DOWNLOAD_NAME: &str = "processed.pdf";
const PROBE_PATHS: [&str; 3] = ["/api-status", "/test", "/"];

/// Shared state for the proxy handlers.
pub struct FrontendState {
    http: Client,
    backend_url: String,
    port: u16,
    max_upload_bytes: usize,
}

impl FrontendState {
    /// Create proxy state targeting `backend_url`.
    pub fn new(backend_url: impl Into<String>, port: u16) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .user_agent("pdfchunk/frontend")
            .timeout(BACKEND_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            backend_url: backend_url.into().trim_end_matches('/').to_string(),
            port,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        })
    }

    /// Override the largest upload body the proxy accepts.
    pub fn with_max_upload_bytes(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.backend_url)
    }
}

/// Build the frontend router.
pub fn create_frontend_router(state: Arc<FrontendState>) -> Router {
    let upload_limit = DefaultBodyLimit::max(state.max_upload_bytes);
    Router::new()
        .route("/", get(index))
        .route("/pdf/upload", post(proxy_upload).layer(upload_limit))
        .route("/pdf/status/:job_id", get(proxy_status))
        .route("/pdf/download/:job_id", get(proxy_download))
        .route("/status", get(status))
        .with_state(state)
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn proxy_upload(
    State(state): State<Arc<FrontendState>>,
    mut multipart: Multipart,
) -> Result<Json<Value>, ProxyError> {
    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(ProxyError::Upload)? {
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or("upload.pdf").to_string();
            let bytes = field.bytes().await.map_err(ProxyError::Upload)?;
            upload = Some((filename, bytes));
            break;
        }
    }
    let (filename, bytes) = upload.ok_or_else(|| ProxyError::BadRequest("No file uploaded".into()))?;
    tracing::info!(filename = %filename, bytes = bytes.len(), "Forwarding upload");

    let part = multipart::Part::bytes(bytes.to_vec())
        .file_name(filename.clone())
        .mime_str("application/pdf")
        .map_err(ProxyError::Transport)?;
    let form = multipart::Form::new().part("file", part);

    let response = state
        .http
        .post(state.url("/pdf/upload"))
        .multipart(form)
        .send()
        .await
        .map_err(ProxyError::Transport)?;
    let mut body: Value = backend_json(response).await?;
    if let Some(object) = body.as_object_mut() {
        object.insert("original_filename".into(), Value::String(filename));
    }
    Ok(Json(body))
}

async fn proxy_status(
    State(state): State<Arc<FrontendState>>,
    Path(job_id): Path<String>,
) -> Result<Json<Value>, ProxyError> {
    let response = state
        .http
        .get(state.url(&format!("/pdf/status/{job_id}")))
        .send()
        .await
        .map_err(ProxyError::Transport)?;
    Ok(Json(backend_json(response).await?))
}

async fn proxy_download(
    State(state): State<Arc<FrontendState>>,
    Path(job_id): Path<String>,
) -> Result<Response, ProxyError> {
    let response = state
        .http
        .get(state.url(&format!("/pdf/download/{job_id}")))
        .send()
        .await
        .map_err(ProxyError::Transport)?;
    let response = ensure_success(response).await?;

    let filename = response
        .headers()
        .get(reqwest::header::CONTENT_DISPOSITION)
        .and_then(|value| value.to_str().ok())
        .and_then(disposition_filename)
        .unwrap_or_else(|| DEFAULT_DOWNLOAD_NAME.to_string());
    let bytes = response.bytes().await.map_err(ProxyError::Transport)?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        bytes.to_vec(),
    )
        .into_response())
}

/// Report proxy liveness and whether any back-end probe endpoint answers.
async fn status(State(state): State<Arc<FrontendState>>) -> Json<Value> {
    let mut last_error = None;
    for path in PROBE_PATHS {
        match state.http.get(state.url(path)).send().await {
            Ok(response) if response.status().is_success() => {
                return Json(json!({
                    "frontend": { "status": "running", "port": state.port },
                    "backend": {
                        "status": "connected",
                        "url": state.backend_url,
                        "endpoint": path,
                    },
                }));
            }
            Ok(response) => last_error = Some(format!("{path} returned {}", response.status())),
            Err(error) => last_error = Some(format!("{path}: {error}")),
        }
    }

    tracing::warn!(backend = %state.backend_url, error = ?last_error, "Back end unreachable");
    Json(json!({
        "frontend": { "status": "running", "port": state.port },
        "backend": {
            "status": "disconnected",
            "url": state.backend_url,
            "error": last_error,
        },
    }))
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ProxyError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = StatusCode::from_u16(response.status().as_u16())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = response.text().await.unwrap_or_default();
    Err(ProxyError::Backend { status, body })
}

async fn backend_json(response: reqwest::Response) -> Result<Value, ProxyError> {
    ensure_success(response)
        .await?
        .json()
        .await
        .map_err(ProxyError::Transport)
}

/// Extract `filename` from a `Content-Disposition` header value.
fn disposition_filename(value: &str) -> Option<String> {
    value
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("filename="))
        .map(|name| name.trim_matches('"').to_string())
        .filter(|name| !name.is_empty())
}

enum ProxyError {
    Backend { status: StatusCode, body: String },
    Transport(reqwest::Error),
    Upload(MultipartError),
    BadRequest(String),
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Backend { status, body } => (status, format!("Backend error: {body}")),
            Self::Transport(error) => {
                tracing::error!(error = %error, "Back-end request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Error connecting to backend: {error}"),
                )
            }
            Self::Upload(error) => {
                tracing::warn!(error = %error, "Rejected upload body");
                (error.status(), format!("Failed to read upload: {}", error.body_text()))
            }
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Method, Request};
    use httpmock::{Method::GET, Method::POST, MockServer};
    use tower::ServiceExt;

    const BOUNDARY: &str = "frontend-boundary";

    fn router(backend_url: String) -> Router {
        let state = FrontendState::new(backend_url, 8080).expect("client");
        create_frontend_router(Arc::new(state))
    }

    fn upload_request(filename: &str, contents: &[u8]) -> Request<Body> {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: application/pdf\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(contents);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method(Method::POST)
            .uri("/pdf/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .expect("request")
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder()
            .method(Method::GET)
            .uri(uri)
            .body(Body::empty())
            .expect("request")
    }

    async fn body_json(response: Response) -> Value {
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        serde_json::from_slice(&body).expect("json body")
    }

    #[test]
    fn disposition_filename_parsing() {
        assert_eq!(
            disposition_filename("attachment; filename=\"processed_a.pdf\""),
            Some("processed_a.pdf".into())
        );
        assert_eq!(
            disposition_filename("attachment; filename=plain.pdf"),
            Some("plain.pdf".into())
        );
        assert_eq!(disposition_filename("attachment"), None);
    }

    #[tokio::test]
    async fn index_serves_embedded_page() {
        let response = router("http://127.0.0.1:9".into())
            .oneshot(get_request("/"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        assert!(String::from_utf8_lossy(&body).contains("<form"));
    }

    #[tokio::test]
    async fn upload_is_forwarded_with_original_filename() {
        let backend = MockServer::start_async().await;
        let mock = backend
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/pdf/upload")
                    .body_contains("filename=\"report.pdf\"");
                then.status(200).json_body(json!({
                    "job_id": "abc",
                    "status": "uploaded",
                    "message": "PDF uploaded successfully. Processing started."
                }));
            })
            .await;

        let body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"report.pdf\"\r\nContent-Type: application/pdf\r\n\r\n%PDF-1.5\r\n--{BOUNDARY}--\r\n"
        );
        let request = Request::builder()
            .method(Method::POST)
            .uri("/pdf/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .expect("request");

        let response = router(backend.base_url())
            .oneshot(request)
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["job_id"], "abc");
        assert_eq!(json["original_filename"], "report.pdf");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn large_upload_is_forwarded() {
        let backend = MockServer::start_async().await;
        let mock = backend
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/pdf/upload")
                    .body_contains("filename=\"big.pdf\"");
                then.status(200).json_body(json!({ "job_id": "big", "status": "uploaded" }));
            })
            .await;

        let response = router(backend.base_url())
            .oneshot(upload_request("big.pdf", &vec![b'x'; 3 * 1024 * 1024]))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["original_filename"], "big.pdf");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn upload_over_configured_limit_is_rejected() {
        let state = FrontendState::new("http://127.0.0.1:9", 8080)
            .expect("client")
            .with_max_upload_bytes(1024);
        let response = create_frontend_router(Arc::new(state))
            .oneshot(upload_request("big.pdf", &[b'x'; 4096]))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(
            body_json(response).await["error"]
                .as_str()
                .is_some_and(|message| message.starts_with("Failed to read upload"))
        );
    }

    #[tokio::test]
    async fn backend_errors_keep_status() {
        let backend = MockServer::start_async().await;
        backend
            .mock_async(|when, then| {
                when.method(GET).path("/pdf/status/missing");
                then.status(404).body("{\"detail\":\"Job not found\"}");
            })
            .await;

        let response = router(backend.base_url())
            .oneshot(get_request("/pdf/status/missing"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(response).await["error"],
            "Backend error: {\"detail\":\"Job not found\"}"
        );
    }

    #[tokio::test]
    async fn transport_failures_are_500() {
        let response = router("http://127.0.0.1:9".into())
            .oneshot(get_request("/pdf/status/any"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert!(
            json["error"]
                .as_str()
                .is_some_and(|message| message.starts_with("Error connecting to backend"))
        );
    }

    #[tokio::test]
    async fn download_reuses_backend_filename() {
        let backend = MockServer::start_async().await;
        backend
            .mock_async(|when, then| {
                when.method(GET).path("/pdf/download/abc");
                then.status(200)
                    .header("content-type", "application/pdf")
                    .header(
                        "content-disposition",
                        "attachment; filename=\"processed_report.pdf\"",
                    )
                    .body("%PDF-data");
            })
            .await;
        backend
            .mock_async(|when, then| {
                when.method(GET).path("/pdf/download/bare");
                then.status(200).body("%PDF-bare");
            })
            .await;

        let app = router(backend.base_url());
        let response = app
            .clone()
            .oneshot(get_request("/pdf/download/abc"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"processed_report.pdf\""
        );

        let bare = app
            .oneshot(get_request("/pdf/download/bare"))
            .await
            .expect("response");
        assert_eq!(
            bare.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"processed.pdf\""
        );
    }

    #[tokio::test]
    async fn status_probes_backend_endpoints_in_order() {
        let backend = MockServer::start_async().await;
        backend
            .mock_async(|when, then| {
                when.method(GET).path("/api-status");
                then.status(500);
            })
            .await;
        backend
            .mock_async(|when, then| {
                when.method(GET).path("/test");
                then.status(200).json_body(json!({ "status": "ok" }));
            })
            .await;

        let json = body_json(
            router(backend.base_url())
                .oneshot(get_request("/status"))
                .await
                .expect("response"),
        )
        .await;
        assert_eq!(json["frontend"]["status"], "running");
        assert_eq!(json["frontend"]["port"], 8080);
        assert_eq!(json["backend"]["status"], "connected");
        assert_eq!(json["backend"]["endpoint"], "/test");
    }

    #[tokio::test]
    async fn status_reports_disconnected_backend() {
        let json = body_json(
            router("http://127.0.0.1:9".into())
                .oneshot(get_request("/status"))
                .await
                .expect("response"),
        )
        .await;
        assert_eq!(json["backend"]["status"], "disconnected");
        assert_eq!(json["backend"]["url"], "http://127.0.0.1:9");
    }
}
