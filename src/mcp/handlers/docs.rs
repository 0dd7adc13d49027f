//! Handler for the `llama_index_documentation` tool.

use std::sync::Arc;

use crate::processing::PdfService;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, JsonObject},
};
use serde::Deserialize;
use serde_json::json;

use super::{parse_arguments, require_non_empty};

/// Request payload accepted by the documentation tool.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct DocsToolRequest {
    /// Natural-language question about the indexed documentation.
    pub(crate) query: String,
}

/// Answer a documentation question. Index failures are returned as `"Error: …"` text rather
/// than protocol errors so the host can show them to the user.
pub(crate) async fn handle_docs_query(
    service: &Arc<PdfService>,
    arguments: Option<JsonObject>,
) -> Result<CallToolResult, McpError> {
    let args: DocsToolRequest = parse_arguments(arguments)?;
    require_non_empty(&args.query, "query")?;

    let result = service.query_documentation(&args.query).await;
    Ok(CallToolResult::structured(json!({
        "query": args.query,
        "result": result,
    })))
}
