//! MCP server bootstrap and request dispatch.

use std::{borrow::Cow, sync::Arc};

use crate::{
    config::get_config,
    mcp::{
        format::{JobsSnapshot, SettingsSnapshot, json_resource_contents, serialize_json},
        handlers::{
            docs::handle_docs_query, process::handle_process_pdf, status::handle_job_status,
        },
        registry, schemas,
    },
    processing::PdfService,
};
use rmcp::{
    ErrorData as McpError,
    handler::server::ServerHandler,
    model::{
        AnnotateAble, CallToolRequestParam, CallToolResult, ListResourcesResult, ListToolsResult,
        RawResource, ReadResourceRequestParam, ReadResourceResult, Resource, ServerCapabilities,
        ServerInfo, Tool, ToolAnnotations,
    },
};

const SETTINGS_URI: &str = "mcp://pdfchunk/settings";
const JOBS_URI: &str = "mcp://pdfchunk/jobs";

/// MCP server exposing PDF summarization and documentation lookup.
#[derive(Clone)]
pub struct PdfChunkMcpServer {
    service: Arc<PdfService>,
    registry: Arc<registry::Registry>,
}

impl PdfChunkMcpServer {
    /// Create a new MCP server backed by `service`.
    pub fn new(service: Arc<PdfService>) -> Self {
        let mut registry = registry::Registry::new();
        registry.register_resource(SETTINGS_URI, resource_settings);
        registry.register_resource(JOBS_URI, resource_jobs);

        registry.register_tool("llama_index_documentation", tool_docs);
        registry.register_tool("process_pdf", tool_process_pdf);
        registry.register_tool("get_processing_status", tool_job_status);

        Self {
            service,
            registry: Arc::new(registry),
        }
    }

    fn describe_tools(&self) -> Vec<Tool> {
        vec![
            Tool {
                name: Cow::Borrowed("llama_index_documentation"),
                title: Some("Query Documentation".to_string()),
                description: Some(Cow::Borrowed(
                    "Answer a question from the LlamaCloud documentation index.",
                )),
                input_schema: Arc::new(schemas::docs_input_schema()),
                output_schema: None,
                annotations: Some(
                    ToolAnnotations::with_title("Query Documentation")
                        .read_only(true)
                        .idempotent(true)
                        .open_world(true),
                ),
                icons: None,
            },
            Tool {
                name: Cow::Borrowed("process_pdf"),
                title: Some("Summarize PDF".to_string()),
                description: Some(Cow::Borrowed(
                    "Extract, chunk, and summarize a local PDF; writes a summary PDF and returns its path.",
                )),
                input_schema: Arc::new(schemas::process_input_schema()),
                output_schema: None,
                annotations: Some(
                    ToolAnnotations::with_title("Summarize PDF")
                        .destructive(false)
                        .idempotent(false)
                        .open_world(false),
                ),
                icons: None,
            },
            Tool {
                name: Cow::Borrowed("get_processing_status"),
                title: Some("Job Status".to_string()),
                description: Some(Cow::Borrowed(
                    "Look up the status and result of a PDF processing job.",
                )),
                input_schema: Arc::new(schemas::status_input_schema()),
                output_schema: None,
                annotations: Some(
                    ToolAnnotations::with_title("Job Status")
                        .read_only(true)
                        .idempotent(true)
                        .open_world(false),
                ),
                icons: None,
            },
        ]
    }

    fn describe_resources(&self) -> Vec<Resource> {
        let mut settings = RawResource::new(SETTINGS_URI, "settings");
        settings.description =
            Some("Chunking, summarization, and directory settings in effect".into());
        settings.mime_type = Some(super::format::APPLICATION_JSON.into());

        let mut jobs = RawResource::new(JOBS_URI, "jobs");
        jobs.description = Some("Processing jobs known to this server".into());
        jobs.mime_type = Some(super::format::APPLICATION_JSON.into());

        vec![settings.no_annotation(), jobs.no_annotation()]
    }
}

fn resource_settings(
    server: &PdfChunkMcpServer,
    _request: ReadResourceRequestParam,
) -> registry::ResourceFuture {
    let service = server.service.clone();
    Box::pin(async move {
        let payload = SettingsSnapshot::new(get_config(), &service);
        Ok(ReadResourceResult {
            contents: vec![json_resource_contents(
                SETTINGS_URI,
                serialize_json(&payload, SETTINGS_URI),
            )],
        })
    })
}

fn resource_jobs(
    server: &PdfChunkMcpServer,
    _request: ReadResourceRequestParam,
) -> registry::ResourceFuture {
    let service = server.service.clone();
    Box::pin(async move {
        let payload = JobsSnapshot {
            counts: service.job_counts().await,
            jobs: service.jobs().await,
        };
        Ok(ReadResourceResult {
            contents: vec![json_resource_contents(
                JOBS_URI,
                serialize_json(&payload, JOBS_URI),
            )],
        })
    })
}

fn tool_docs(server: &PdfChunkMcpServer, request: CallToolRequestParam) -> registry::ToolFuture {
    let service = server.service.clone();
    Box::pin(async move { handle_docs_query(&service, request.arguments).await })
}

fn tool_process_pdf(
    server: &PdfChunkMcpServer,
    request: CallToolRequestParam,
) -> registry::ToolFuture {
    let service = server.service.clone();
    Box::pin(async move { handle_process_pdf(&service, request.arguments).await })
}

fn tool_job_status(
    server: &PdfChunkMcpServer,
    request: CallToolRequestParam,
) -> registry::ToolFuture {
    let service = server.service.clone();
    Box::pin(async move { handle_job_status(&service, request.arguments).await })
}

impl ServerHandler for PdfChunkMcpServer {
    fn get_info(&self) -> ServerInfo {
        let mut implementation = rmcp::model::Implementation::from_build_env();
        implementation.name = "pdfchunk".to_string();
        implementation.title = Some("PDF Chunking MCP".to_string());
        implementation.version = env!("CARGO_PKG_VERSION").to_string();

        ServerInfo {
            capabilities: ServerCapabilities::builder()
                .enable_resources()
                .enable_tools()
                .build(),
            server_info: implementation,
            instructions: Some(
                "Summarize local PDFs with process_pdf and follow jobs with get_processing_status; ask llama_index_documentation for answers from the configured documentation index.".into(),
            ),
            ..ServerInfo::default()
        }
    }

    fn list_resources(
        &self,
        _request: Option<rmcp::model::PaginatedRequestParam>,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListResourcesResult, McpError>> + Send + '_ {
        let resources = self.describe_resources();
        std::future::ready(Ok(ListResourcesResult::with_all_items(resources)))
    }

    fn list_tools(
        &self,
        _request: Option<rmcp::model::PaginatedRequestParam>,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        let tools = self.describe_tools();
        std::future::ready(Ok(ListToolsResult::with_all_items(tools)))
    }

    fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ReadResourceResult, McpError>> + Send + '_ {
        async move {
            if let Some(handler) = self.registry.resources.get(request.uri.as_str()) {
                return handler(self, request).await;
            }

            Err(McpError::invalid_params(
                format!("Unknown resource URI: {}", request.uri),
                None,
            ))
        }
    }

    #[allow(clippy::manual_async_fn)]
    fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<CallToolResult, McpError>> + Send + '_ {
        async move {
            if let Some(handler) = self.registry.tools.get(request.name.as_ref()) {
                return handler(self, request).await;
            }

            Err(McpError::invalid_params(
                format!("Unknown tool: {}", request.name),
                None,
            ))
        }
    }
}
