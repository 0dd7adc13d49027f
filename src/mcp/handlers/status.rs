//! Handler for the `get_processing_status` tool.

use std::sync::Arc;

use crate::processing::PdfService;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, JsonObject},
};
use serde::Deserialize;
use serde_json::json;

use super::{parse_arguments, require_non_empty};

/// Request payload accepted by the status tool.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct StatusToolRequest {
    /// Identifier returned by an upload or a `process_pdf` call.
    pub(crate) job_id: String,
}

/// Return the job record for `job_id`.
pub(crate) async fn handle_job_status(
    service: &Arc<PdfService>,
    arguments: Option<JsonObject>,
) -> Result<CallToolResult, McpError> {
    let args: StatusToolRequest = parse_arguments(arguments)?;
    require_non_empty(&args.job_id, "job_id")?;

    match service.job(args.job_id.trim()).await {
        Some(record) => {
            let payload = serde_json::to_value(&record)
                .map_err(|err| McpError::internal_error(err.to_string(), None))?;
            Ok(CallToolResult::structured(payload))
        }
        None => Ok(CallToolResult::structured_error(json!({
            "status": "error",
            "message": format!("Job not found: {}", args.job_id),
        }))),
    }
}
