use std::path::PathBuf;
use std::sync::Arc;

use pdfchunk::{
    config, logging,
    mcp::PdfChunkMcpServer,
    pdf::{RenderOptions, render_pdf},
    processing::PdfService,
};
use rmcp::{
    handler::client::ClientHandler,
    model::{self, CallToolRequestParam, ClientInfo, PaginatedRequestParam, ReadResourceRequestParam},
    service::{RoleClient, RoleServer, RunningService, Service, serve_directly},
    transport::async_rw::AsyncRwTransport,
};
use serde_json::{Value, json};
use tokio::{io::split, sync::OnceCell};

static INIT: OnceCell<PathBuf> = OnceCell::const_new();

fn set_env(key: &str, value: &str) {
    // SAFETY: Tests run in a single process and establish deterministic configuration upfront.
    unsafe { std::env::set_var(key, value) }
}

fn remove_env(key: &str) {
    // SAFETY: See `set_env`.
    unsafe { std::env::remove_var(key) }
}

fn arguments(value: Value) -> Option<model::JsonObject> {
    value.as_object().cloned()
}

#[derive(Clone, Default)]
struct DummyClientHandler;

impl ClientHandler for DummyClientHandler {
    fn get_info(&self) -> ClientInfo {
        ClientInfo::default()
    }
}

struct TestHarness {
    service: RunningService<RoleClient, DummyClientHandler>,
    server: RunningService<RoleServer, PdfChunkMcpServer>,
    workdir: PathBuf,
}

impl TestHarness {
    async fn new() -> Self {
        let workdir = INIT
            .get_or_init(|| async {
                let dir = tempfile::tempdir().expect("tempdir").keep();
                set_env("PDF_UPLOAD_DIR", &dir.join("uploads").display().to_string());
                set_env("PDF_OUTPUT_DIR", &dir.join("outputs").display().to_string());
                set_env("PDFCHUNK_LOG_FILE", &dir.join("test.log").display().to_string());
                set_env("SUMMARIZATION_PROVIDER", "none");
                set_env("CHUNK_SIZE", "200");
                set_env("CHUNK_OVERLAP", "20");
                for key in [
                    "OPENAI_API_KEY",
                    "LLAMA_CLOUD_INDEX_NAME",
                    "LLAMA_CLOUD_PROJECT_NAME",
                    "LLAMA_CLOUD_ORG_ID",
                    "LLAMA_CLOUD_API_KEY",
                ] {
                    remove_env(key);
                }

                config::init_config();
                logging::init_tracing(logging::ConsoleOutput::Stderr);
                dir
            })
            .await
            .clone();

        let processing =
            PdfService::from_config(config::get_config()).expect("service from config");
        let server = PdfChunkMcpServer::new(Arc::new(processing));

        let (client_stream, server_stream) = tokio::io::duplex(64 * 1024);
        let (client_read, client_write) = split(client_stream);
        let (server_read, server_write) = split(server_stream);

        let client_transport = AsyncRwTransport::new_client(client_read, client_write);
        let server_transport = AsyncRwTransport::new_server(server_read, server_write);

        let server_info = server.get_info();
        let client_handler = DummyClientHandler;
        let client_info = ClientHandler::get_info(&client_handler);

        let server =
            serve_directly::<RoleServer, _, _, _, _>(server, server_transport, Some(client_info));
        let service = serve_directly::<RoleClient, _, _, _, _>(
            client_handler,
            client_transport,
            Some(server_info),
        );

        Self {
            service,
            server,
            workdir,
        }
    }

    fn sample_pdf(&self, name: &str) -> PathBuf {
        let text = "Quarterly Results\n\n".to_string()
            + &"Revenue grew in every region during the quarter. Costs stayed flat. "
                .repeat(12);
        let bytes = render_pdf(
            &text,
            &RenderOptions {
                title: Some("Report".into()),
            },
        )
        .expect("render sample");
        let path = self.workdir.join(name);
        std::fs::write(&path, bytes).expect("write sample");
        path
    }

    async fn shutdown(self) {
        let Self {
            service, server, ..
        } = self;
        let _ = service.cancel().await;
        let _ = server.cancel().await;
    }
}

fn assert_invalid_params(err: rmcp::service::ServiceError) {
    match err {
        rmcp::service::ServiceError::McpError(data) => {
            assert_eq!(data.code, model::ErrorCode::INVALID_PARAMS);
        }
        other => panic!("expected MCP error, got {other:?}"),
    }
}

#[tokio::test]
async fn initialize_and_list_tools() {
    let harness = TestHarness::new().await;
    let service = &harness.service;

    let info = service
        .peer_info()
        .expect("server info should be initialized");
    assert_eq!(info.server_info.name, "pdfchunk");
    assert!(info.capabilities.tools.is_some());
    assert!(info.capabilities.resources.is_some());

    let tools_result = service
        .list_tools(Some(PaginatedRequestParam { cursor: None }))
        .await
        .expect("list_tools");
    let names: Vec<_> = tools_result
        .tools
        .iter()
        .map(|tool| tool.name.as_ref())
        .collect();

    assert!(names.contains(&"llama_index_documentation"));
    assert!(names.contains(&"process_pdf"));
    assert!(names.contains(&"get_processing_status"));

    harness.shutdown().await;
}

#[tokio::test]
async fn process_pdf_writes_summary_and_records_job() {
    let harness = TestHarness::new().await;
    let input = harness.sample_pdf("report.pdf");
    let service = &harness.service;

    let response = service
        .call_tool(CallToolRequestParam {
            name: "process_pdf".into(),
            arguments: arguments(json!({ "file_path": input.display().to_string() })),
        })
        .await
        .expect("process tool call");
    assert_eq!(response.is_error, Some(false));
    let payload = response.structured_content.expect("structured payload");
    assert_eq!(payload["status"], "success");
    assert!(payload["numChunks"].as_u64().is_some_and(|count| count >= 2));
    assert!(payload["extractedTextLength"].as_u64().is_some_and(|len| len > 200));
    let output = PathBuf::from(payload["outputPdf"].as_str().expect("output path"));
    assert!(output.exists());
    assert!(
        output
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.ends_with("_summary.pdf"))
    );

    let job_id = payload["jobId"].as_str().expect("job id").to_string();
    let status = service
        .call_tool(CallToolRequestParam {
            name: "get_processing_status".into(),
            arguments: arguments(json!({ "job_id": job_id })),
        })
        .await
        .expect("status tool call");
    assert_eq!(status.is_error, Some(false));
    let record = status.structured_content.expect("job record");
    assert_eq!(record["status"], "complete");
    assert_eq!(record["original_filename"], "report.pdf");
    assert_eq!(record["result"]["num_chunks"], payload["numChunks"]);

    harness.shutdown().await;
}

#[tokio::test]
async fn process_pdf_reports_missing_file() {
    let harness = TestHarness::new().await;
    let missing = harness.workdir.join("absent.pdf");

    let response = harness
        .service
        .call_tool(CallToolRequestParam {
            name: "process_pdf".into(),
            arguments: arguments(json!({ "file_path": missing.display().to_string() })),
        })
        .await
        .expect("process tool call");
    assert_eq!(response.is_error, Some(true));
    let payload = response.structured_content.expect("structured error");
    assert_eq!(payload["status"], "error");
    assert!(
        payload["message"]
            .as_str()
            .is_some_and(|message| message.contains("absent.pdf"))
    );

    harness.shutdown().await;
}

#[tokio::test]
async fn unknown_job_is_a_tool_error() {
    let harness = TestHarness::new().await;

    let response = harness
        .service
        .call_tool(CallToolRequestParam {
            name: "get_processing_status".into(),
            arguments: arguments(json!({ "job_id": "no-such-job" })),
        })
        .await
        .expect("status tool call");
    assert_eq!(response.is_error, Some(true));
    let payload = response.structured_content.expect("structured error");
    assert_eq!(payload["message"], "Job not found: no-such-job");

    harness.shutdown().await;
}

#[tokio::test]
async fn documentation_without_index_reports_error_text() {
    let harness = TestHarness::new().await;

    let response = harness
        .service
        .call_tool(CallToolRequestParam {
            name: "llama_index_documentation".into(),
            arguments: arguments(json!({ "query": "How do I build an index?" })),
        })
        .await
        .expect("docs tool call");
    assert_eq!(response.is_error, Some(false));
    let payload = response.structured_content.expect("structured payload");
    assert_eq!(payload["result"], "Error: LlamaCloud index not initialized");

    harness.shutdown().await;
}

#[tokio::test]
async fn invalid_payload_returns_error() {
    let harness = TestHarness::new().await;
    let service = &harness.service;

    let err = service
        .call_tool(CallToolRequestParam {
            name: "llama_index_documentation".into(),
            arguments: arguments(json!({ "query": "   " })),
        })
        .await
        .expect_err("blank query should fail");
    assert_invalid_params(err);

    let err = service
        .call_tool(CallToolRequestParam {
            name: "process_pdf".into(),
            arguments: arguments(json!({})),
        })
        .await
        .expect_err("missing file_path should fail");
    assert_invalid_params(err);

    harness.shutdown().await;
}

#[tokio::test]
async fn settings_resource_reflects_configuration() {
    let harness = TestHarness::new().await;

    let result = harness
        .service
        .read_resource(ReadResourceRequestParam {
            uri: "mcp://pdfchunk/settings".into(),
        })
        .await
        .expect("read settings");
    let text = match result.contents.first().expect("one content item") {
        model::ResourceContents::TextResourceContents { text, .. } => text.clone(),
        other => panic!("expected text contents, got {other:?}"),
    };
    let settings: Value = serde_json::from_str(&text).expect("settings json");
    assert_eq!(settings["chunk_size"], 200);
    assert_eq!(settings["chunk_overlap"], 20);
    assert_eq!(settings["summarization_provider"], "none");
    assert_eq!(settings["documentation_enabled"], false);

    harness.shutdown().await;
}
