//! Claude Desktop integration.
//!
//! Claude Desktop launches MCP servers listed under `mcpServers` in its JSON config. These helpers
//! build an entry for the `pdfchunk-mcp` binary and merge it into an existing config without
//! disturbing other servers or top-level settings.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Key the server is registered under.
pub const SERVER_KEY: &str = "pdfchunk";

/// Environment variables copied into the generated entry when set.
const FORWARDED_ENV: [&str; 14] = [
    "PDF_UPLOAD_DIR",
    "PDF_OUTPUT_DIR",
    "CHUNK_SIZE",
    "CHUNK_OVERLAP",
    "SUMMARY_MAX_LENGTH",
    "SUMMARIZATION_PROVIDER",
    "OPENAI_API_KEY",
    "OPENAI_MODEL",
    "OLLAMA_URL",
    "OLLAMA_MODEL",
    "LLAMA_CLOUD_INDEX_NAME",
    "LLAMA_CLOUD_PROJECT_NAME",
    "LLAMA_CLOUD_ORG_ID",
    "LLAMA_CLOUD_API_KEY",
];

/// Errors raised while reading or writing Claude Desktop configuration.
#[derive(Debug, Error)]
pub enum ClaudeConfigError {
    /// Config file could not be read or written.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File being accessed.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// Existing config is not valid JSON.
    #[error("Invalid JSON in {path}: {source}")]
    Json {
        /// File being parsed.
        path: String,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },
    /// Existing config is JSON but not an object, or `mcpServers` is not an object.
    #[error("Unexpected config layout: {0}")]
    Layout(String),
}

/// A single `mcpServers` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct McpServerEntry {
    /// Executable Claude Desktop launches.
    pub command: String,
    /// Command-line arguments.
    pub args: Vec<String>,
    /// Environment passed to the server.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

impl McpServerEntry {
    /// Entry launching `command` with the forwarded variables that are set in `lookup`.
    pub fn new(command: &Path, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let env = FORWARDED_ENV
            .iter()
            .filter_map(|key| {
                lookup(key)
                    .filter(|value| !value.trim().is_empty())
                    .map(|value| (key.to_string(), value))
            })
            .collect();
        Self {
            command: command.display().to_string(),
            args: Vec::new(),
            env,
        }
    }

    /// Entry for the `pdfchunk-mcp` binary installed next to the running executable.
    pub fn for_current_install() -> std::io::Result<Self> {
        let exe = std::env::current_exe()?;
        let binary = exe.with_file_name(format!("pdfchunk-mcp{}", std::env::consts::EXE_SUFFIX));
        Ok(Self::new(&binary, |key| std::env::var(key).ok()))
    }
}

/// A fresh config containing only this server.
pub fn standalone_config(entry: &McpServerEntry) -> Value {
    let mut servers = Map::new();
    servers.insert(SERVER_KEY.into(), entry_value(entry));
    let mut root = Map::new();
    root.insert("mcpServers".into(), Value::Object(servers));
    Value::Object(root)
}

/// Insert or replace this server's entry inside `existing`.
pub fn merge_entry(existing: Value, entry: &McpServerEntry) -> Result<Value, ClaudeConfigError> {
    let Value::Object(mut root) = existing else {
        return Err(ClaudeConfigError::Layout(
            "top-level value is not an object".into(),
        ));
    };
    let servers = root
        .entry("mcpServers")
        .or_insert_with(|| Value::Object(Map::new()));
    let Value::Object(servers) = servers else {
        return Err(ClaudeConfigError::Layout(
            "`mcpServers` is not an object".into(),
        ));
    };
    servers.insert(SERVER_KEY.into(), entry_value(entry));
    Ok(Value::Object(root))
}

/// Merge the entry into the config at `path`, creating the file if needed.
///
/// An existing file is copied to `<path>.backup` first; the backup path is returned.
pub fn install(path: &Path, entry: &McpServerEntry) -> Result<Option<PathBuf>, ClaudeConfigError> {
    let (config, backup) = if path.exists() {
        let raw = std::fs::read_to_string(path).map_err(|source| io_error(path, source))?;
        let existing = if raw.trim().is_empty() {
            Value::Object(Map::new())
        } else {
            serde_json::from_str(&raw).map_err(|source| ClaudeConfigError::Json {
                path: path.display().to_string(),
                source,
            })?
        };
        let backup = backup_path(path);
        std::fs::copy(path, &backup).map_err(|source| io_error(&backup, source))?;
        (merge_entry(existing, entry)?, Some(backup))
    } else {
        (standalone_config(entry), None)
    };

    write_json(path, &config)?;
    tracing::info!(path = %path.display(), backup = ?backup, "Claude Desktop config updated");
    Ok(backup)
}

/// Write `value` as pretty JSON, creating parent directories.
pub fn write_json(path: &Path, value: &Value) -> Result<(), ClaudeConfigError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| io_error(parent, source))?;
    }
    let mut text = serde_json::to_string_pretty(value).map_err(|source| ClaudeConfigError::Json {
        path: path.display().to_string(),
        source,
    })?;
    text.push('\n');
    std::fs::write(path, text).map_err(|source| io_error(path, source))
}

/// Platform default location of `claude_desktop_config.json`.
pub fn default_config_path() -> Option<PathBuf> {
    let base = if cfg!(target_os = "macos") {
        PathBuf::from(std::env::var_os("HOME")?).join("Library/Application Support")
    } else if cfg!(target_os = "windows") {
        PathBuf::from(std::env::var_os("APPDATA")?)
    } else {
        std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))?
    };
    Some(base.join("Claude").join("claude_desktop_config.json"))
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".backup");
    PathBuf::from(name)
}

fn entry_value(entry: &McpServerEntry) -> Value {
    serde_json::to_value(entry).unwrap_or(Value::Null)
}

fn io_error(path: &Path, source: std::io::Error) -> ClaudeConfigError {
    ClaudeConfigError::Io {
        path: path.display().to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry() -> McpServerEntry {
        McpServerEntry::new(Path::new("/opt/pdfchunk/pdfchunk-mcp"), |key| match key {
            "CHUNK_SIZE" => Some("800".into()),
            "OPENAI_API_KEY" => Some("  ".into()),
            _ => None,
        })
    }

    #[test]
    fn entry_forwards_only_set_variables() {
        let entry = entry();
        assert_eq!(entry.command, "/opt/pdfchunk/pdfchunk-mcp");
        assert_eq!(entry.env.len(), 1);
        assert_eq!(entry.env.get("CHUNK_SIZE").map(String::as_str), Some("800"));
    }

    #[test]
    fn merge_preserves_other_servers() {
        let existing = json!({
            "theme": "dark",
            "mcpServers": { "other": { "command": "other-server", "args": [] } }
        });
        let merged = merge_entry(existing, &entry()).expect("merge");
        assert_eq!(merged["theme"], "dark");
        assert_eq!(merged["mcpServers"]["other"]["command"], "other-server");
        assert_eq!(
            merged["mcpServers"][SERVER_KEY]["command"],
            "/opt/pdfchunk/pdfchunk-mcp"
        );
    }

    #[test]
    fn merge_rejects_non_object_servers() {
        let error = merge_entry(json!({ "mcpServers": [] }), &entry()).expect_err("layout");
        assert!(matches!(error, ClaudeConfigError::Layout(_)));
    }

    #[test]
    fn install_backs_up_existing_config() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("claude_desktop_config.json");
        std::fs::write(&path, r#"{"mcpServers":{"other":{"command":"x","args":[]}}}"#)
            .expect("seed");

        let backup = install(&path, &entry()).expect("install").expect("backup");
        assert_eq!(backup, dir.path().join("claude_desktop_config.json.backup"));
        let backed_up: Value =
            serde_json::from_str(&std::fs::read_to_string(&backup).expect("backup")).expect("json");
        assert!(backed_up["mcpServers"].get(SERVER_KEY).is_none());

        let written: Value =
            serde_json::from_str(&std::fs::read_to_string(&path).expect("config")).expect("json");
        assert_eq!(written["mcpServers"]["other"]["command"], "x");
        assert_eq!(written["mcpServers"][SERVER_KEY]["env"]["CHUNK_SIZE"], "800");
    }

    #[test]
    fn install_creates_missing_config() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("Claude/claude_desktop_config.json");
        let backup = install(&path, &entry()).expect("install");
        assert!(backup.is_none());
        let written: Value =
            serde_json::from_str(&std::fs::read_to_string(&path).expect("config")).expect("json");
        assert!(written["mcpServers"][SERVER_KEY]["args"].is_array());
    }

    #[test]
    fn invalid_existing_json_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").expect("seed");
        let error = install(&path, &entry()).expect_err("invalid");
        assert!(matches!(error, ClaudeConfigError::Json { .. }));
    }
}
