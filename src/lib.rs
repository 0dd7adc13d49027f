#![deny(missing_docs)]

//! Core library for the PDF chunking and summarization server.

/// HTTP routing and REST handlers for the back end.
pub mod api;
/// Claude Desktop configuration generation.
pub mod claude_desktop;
/// Environment-driven configuration management.
pub mod config;
/// Documentation queries against a LlamaCloud index.
pub mod docs;
/// Browser-facing proxy in front of the back end.
pub mod frontend;
/// In-memory job tracking.
pub mod jobs;
/// Completion clients for summaries and documentation answers.
pub mod llm;
/// Structured logging and tracing setup.
pub mod logging;
/// Model Context Protocol server implementation.
pub mod mcp;
/// Pipeline metrics helpers.
pub mod metrics;
/// PDF text extraction and generation.
pub mod pdf;
/// Document processing pipeline.
pub mod processing;
