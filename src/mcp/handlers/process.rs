//! Handler for the `process_pdf` tool.

use std::path::PathBuf;
use std::sync::Arc;

use crate::processing::PdfService;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, JsonObject},
};
use serde::Deserialize;
use serde_json::json;

use super::{parse_arguments, require_non_empty};

/// Request payload accepted by the `process_pdf` tool.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ProcessToolRequest {
    /// Path of a PDF readable by the server process.
    pub(crate) file_path: String,
}

/// Run the full pipeline on a local PDF and wait for the summary.
pub(crate) async fn handle_process_pdf(
    service: &Arc<PdfService>,
    arguments: Option<JsonObject>,
) -> Result<CallToolResult, McpError> {
    let args: ProcessToolRequest = parse_arguments(arguments)?;
    require_non_empty(&args.file_path, "file_path")?;
    let path = PathBuf::from(args.file_path.trim());

    match service.process_file(&path).await {
        Ok(processed) => {
            let report = processed.report;
            Ok(CallToolResult::structured(json!({
                "status": "success",
                "jobId": processed.job_id,
                "inputPdf": report.input_pdf.display().to_string(),
                "outputPdf": report.output_pdf.display().to_string(),
                "extractedTextLength": report.extracted_text_length,
                "numChunks": report.num_chunks,
                "summaryLength": report.summary_length,
            })))
        }
        Err(error) => {
            tracing::warn!(path = %path.display(), error = %error, "process_pdf failed");
            Ok(CallToolResult::structured_error(json!({
                "status": "error",
                "message": format!("Error processing PDF: {error}"),
            })))
        }
    }
}
