//! Model Context Protocol (MCP) integration.
//!
//! Exposes the PDF pipeline and the documentation index to editors and agent hosts over stdio:
//!
//! - Tools: `llama_index_documentation`, `process_pdf`, and `get_processing_status`.
//! - Resources: `mcp://pdfchunk/settings` and `mcp://pdfchunk/jobs`.

mod format;
pub mod handlers;
mod registry;
mod schemas;
mod server;

pub use server::PdfChunkMcpServer;
