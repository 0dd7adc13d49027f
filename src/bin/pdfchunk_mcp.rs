//! MCP server entrypoint (stdio transport).
//!
//! Exposes the PDF pipeline and documentation lookup to editor and agent hosts such as Claude
//! Desktop. Logs go to stderr and the log file; stdout carries the protocol.
use anyhow::{Context, Result};
use pdfchunk::{config, logging, mcp::PdfChunkMcpServer, processing::PdfService};
use rmcp::{service::ServiceExt, transport::stdio};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    config::init_config();
    logging::init_tracing(logging::ConsoleOutput::Stderr);

    let service =
        PdfService::from_config(config::get_config()).context("failed to build PDF service")?;
    service
        .ensure_directories()
        .await
        .context("failed to create working directories")?;
    let server = PdfChunkMcpServer::new(Arc::new(service));

    let service = server
        .serve(stdio())
        .await
        .context("failed to start MCP server over stdio")?;

    service
        .waiting()
        .await
        .context("MCP server terminated unexpectedly")?;

    Ok(())
}
