//! JSON schema builders for MCP tools.

use serde_json::{Map, Value};

/// Schema for `llama_index_documentation`.
pub(crate) fn docs_input_schema() -> Map<String, Value> {
    let mut properties = Map::new();
    properties.insert(
        "query".into(),
        string_schema("Question about the indexed documentation"),
    );
    finalize_object_schema(properties, &["query"])
}

/// Schema for `process_pdf`.
pub(crate) fn process_input_schema() -> Map<String, Value> {
    let mut properties = Map::new();
    properties.insert(
        "file_path".into(),
        string_schema("Path of a PDF on the server's filesystem"),
    );
    finalize_object_schema(properties, &["file_path"])
}

/// Schema for `get_processing_status`.
pub(crate) fn status_input_schema() -> Map<String, Value> {
    let mut properties = Map::new();
    properties.insert(
        "job_id".into(),
        string_schema("Job identifier returned by an upload or process_pdf"),
    );
    finalize_object_schema(properties, &["job_id"])
}

fn string_schema(description: &str) -> Value {
    let mut schema = Map::new();
    schema.insert("type".into(), Value::String("string".into()));
    schema.insert("description".into(), Value::String(description.into()));
    Value::Object(schema)
}

fn finalize_object_schema(properties: Map<String, Value>, required: &[&str]) -> Map<String, Value> {
    let mut schema = Map::new();
    schema.insert("type".into(), Value::String("object".into()));
    schema.insert("properties".into(), Value::Object(properties));
    if !required.is_empty() {
        schema.insert(
            "required".into(),
            Value::Array(
                required
                    .iter()
                    .map(|&key| Value::String(key.into()))
                    .collect(),
            ),
        );
    }
    schema.insert("additionalProperties".into(), Value::Bool(false));
    schema
}
