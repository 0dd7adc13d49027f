//! Formatting helpers shared across MCP handlers and resources.

use crate::{
    config::Config,
    jobs::{JobCounts, JobRecord},
    processing::PdfService,
};
use rmcp::model::ResourceContents;
use schemars::JsonSchema;
use serde::Serialize;

pub(crate) const APPLICATION_JSON: &str = "application/json";

/// Serialize a value as pretty JSON, falling back to compact output.
pub(crate) fn serialize_json<T: Serialize>(value: &T, context_uri: &str) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|error| {
        tracing::warn!(uri = context_uri, %error, "Failed to serialize JSON prettily");
        serde_json::to_string(value).unwrap_or_else(|_| "{}".into())
    })
}

/// Build JSON resource contents for MCP resource responses.
pub(crate) fn json_resource_contents(uri: &str, text: String) -> ResourceContents {
    ResourceContents::TextResourceContents {
        uri: uri.to_string(),
        mime_type: Some(APPLICATION_JSON.into()),
        text,
        meta: None,
    }
}

/// Effective pipeline settings returned by the `settings` resource.
#[derive(Debug, Serialize, JsonSchema)]
pub(crate) struct SettingsSnapshot {
    /// Maximum characters per chunk.
    pub(crate) chunk_size: usize,
    /// Characters shared by neighbouring chunks.
    pub(crate) chunk_overlap: usize,
    /// Character budget per chunk summary.
    pub(crate) summary_max_length: usize,
    /// Summarization provider (`openai`, `ollama`, or `none`).
    pub(crate) summarization_provider: String,
    /// Whether documentation queries are available.
    pub(crate) documentation_enabled: bool,
    /// Directory uploads are stored in.
    pub(crate) upload_dir: String,
    /// Directory summaries are written to.
    pub(crate) output_dir: String,
}

impl SettingsSnapshot {
    pub(crate) fn new(config: &Config, service: &PdfService) -> Self {
        Self {
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
            summary_max_length: config.summary_max_length,
            summarization_provider: format!("{:?}", config.summarization_provider).to_lowercase(),
            documentation_enabled: service.docs_enabled(),
            upload_dir: service.upload_dir().display().to_string(),
            output_dir: service.output_dir().display().to_string(),
        }
    }
}

/// Jobs overview returned by the `jobs` resource.
#[derive(Debug, Serialize)]
pub(crate) struct JobsSnapshot {
    pub(crate) counts: JobCounts,
    pub(crate) jobs: Vec<JobRecord>,
}
