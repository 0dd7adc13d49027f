use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;
use thiserror::Error;

use crate::processing::chunking::{ChunkConfig, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};

const DEFAULT_SERVER_NAME: &str = "pdf-chunking-server";
const DEFAULT_SERVER_PORT: u16 = 8000;
const DEFAULT_FRONTEND_PORT: u16 = 8080;
const DEFAULT_UPLOAD_DIR: &str = "./data/uploads";
const DEFAULT_OUTPUT_DIR: &str = "./data/outputs";
const DEFAULT_SUMMARY_MAX_LENGTH: usize = 500;
const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
/// Default cap on an uploaded request body (100 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_OPENAI_MODEL: &str = "gpt-3.5-turbo";
const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";
const DEFAULT_OLLAMA_MODEL: &str = "llama3";
const DEFAULT_LLAMA_CLOUD_BASE_URL: &str = "https://api.cloud.llamaindex.ai";

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration shared by the back end, frontend proxy, MCP server, and CLI.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Display name reported by status endpoints.
    pub server_name: String,
    /// Port the back-end HTTP server binds to.
    pub server_port: u16,
    /// Directory uploaded PDFs are written to.
    pub upload_dir: PathBuf,
    /// Directory generated summary PDFs are written to.
    pub output_dir: PathBuf,
    /// Maximum characters per chunk.
    pub chunk_size: usize,
    /// Characters repeated between neighbouring chunks.
    pub chunk_overlap: usize,
    /// Character budget requested from the summarizer for each chunk.
    pub summary_max_length: usize,
    /// Largest accepted upload request body, in bytes.
    pub max_upload_bytes: usize,
    /// Backend used for chunk summaries and documentation answers.
    pub summarization_provider: SummarizationProvider,
    /// API key for the hosted OpenAI endpoint.
    pub openai_api_key: Option<String>,
    /// OpenAI chat model identifier.
    pub openai_model: String,
    /// Base URL of the OpenAI-compatible API.
    pub openai_base_url: String,
    /// Base URL of the local Ollama runtime.
    pub ollama_url: String,
    /// Ollama model identifier.
    pub ollama_model: String,
    /// LlamaCloud connection settings; `None` when any required value is missing.
    pub llama_cloud: Option<LlamaCloudSettings>,
    /// Port the frontend proxy binds to.
    pub frontend_port: u16,
    /// Base URL of the back end, as seen by the frontend proxy and the CLI.
    pub backend_url: String,
}

/// Connection settings for the managed documentation index.
#[derive(Debug, Clone, Deserialize)]
pub struct LlamaCloudSettings {
    /// Index (pipeline) name.
    pub index_name: String,
    /// Project containing the index.
    pub project_name: String,
    /// Organization owning the project.
    pub organization_id: String,
    /// API key sent as a bearer token.
    pub api_key: String,
    /// Base URL of the LlamaCloud API.
    pub base_url: String,
}

/// Supported completion backends for summaries and documentation answers.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SummarizationProvider {
    /// No model; summaries fall back to sentence extraction.
    None,
    /// Hosted OpenAI chat completions.
    OpenAI,
    /// Local Ollama runtime.
    Ollama,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        let openai_api_key = load_env_optional("OPENAI_API_KEY");
        let summarization_provider = match load_env_optional("SUMMARIZATION_PROVIDER") {
            Some(value) => value
                .parse()
                .map_err(|()| ConfigError::InvalidValue("SUMMARIZATION_PROVIDER".to_string()))?,
            None if openai_api_key.is_some() => SummarizationProvider::OpenAI,
            None => SummarizationProvider::None,
        };

        let config = Self {
            server_name: load_env_or("SERVER_NAME", DEFAULT_SERVER_NAME),
            server_port: parse_env_or("SERVER_PORT", DEFAULT_SERVER_PORT)?,
            upload_dir: PathBuf::from(load_env_or("PDF_UPLOAD_DIR", DEFAULT_UPLOAD_DIR)),
            output_dir: PathBuf::from(load_env_or("PDF_OUTPUT_DIR", DEFAULT_OUTPUT_DIR)),
            chunk_size: parse_env_or("CHUNK_SIZE", DEFAULT_CHUNK_SIZE)?,
            chunk_overlap: parse_env_or("CHUNK_OVERLAP", DEFAULT_CHUNK_OVERLAP)?,
            summary_max_length: parse_env_or("SUMMARY_MAX_LENGTH", DEFAULT_SUMMARY_MAX_LENGTH)?,
            max_upload_bytes: parse_env_or("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            summarization_provider,
            openai_api_key,
            openai_model: load_env_or("OPENAI_MODEL", DEFAULT_OPENAI_MODEL),
            openai_base_url: load_env_or("OPENAI_BASE_URL", DEFAULT_OPENAI_BASE_URL),
            ollama_url: load_env_or("OLLAMA_URL", DEFAULT_OLLAMA_URL),
            ollama_model: load_env_or("OLLAMA_MODEL", DEFAULT_OLLAMA_MODEL),
            llama_cloud: load_llama_cloud(),
            frontend_port: parse_env_or("FRONTEND_PORT", DEFAULT_FRONTEND_PORT)?,
            backend_url: load_env_optional("BACKEND_URL")
                .or_else(|| load_env_optional("MCP_SERVER_URL"))
                .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string()),
        };

        config.chunk_config()?;
        if config.summarization_provider == SummarizationProvider::OpenAI
            && config.openai_api_key.is_none()
        {
            return Err(ConfigError::MissingVariable("OPENAI_API_KEY".to_string()));
        }
        Ok(config)
    }

    /// Validated chunking parameters derived from `CHUNK_SIZE` / `CHUNK_OVERLAP`.
    pub fn chunk_config(&self) -> Result<ChunkConfig, ConfigError> {
        ChunkConfig::new(self.chunk_size, self.chunk_overlap).map_err(|error| {
            ConfigError::InvalidValue(format!("CHUNK_SIZE/CHUNK_OVERLAP ({error})"))
        })
    }
}

fn load_llama_cloud() -> Option<LlamaCloudSettings> {
    let index_name = load_env_optional("LLAMA_CLOUD_INDEX_NAME");
    let project_name = load_env_optional("LLAMA_CLOUD_PROJECT_NAME");
    let organization_id = load_env_optional("LLAMA_CLOUD_ORG_ID");
    let api_key = load_env_optional("LLAMA_CLOUD_API_KEY");

    match (index_name, project_name, organization_id, api_key) {
        (Some(index_name), Some(project_name), Some(organization_id), Some(api_key)) => {
            Some(LlamaCloudSettings {
                index_name,
                project_name,
                organization_id,
                api_key,
                base_url: load_env_or("LLAMA_CLOUD_BASE_URL", DEFAULT_LLAMA_CLOUD_BASE_URL),
            })
        }
        _ => None,
    }
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn load_env_or(key: &str, default: &str) -> String {
    load_env_optional(key).unwrap_or_else(|| default.to_string())
}

fn parse_env_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
        .map(|value| value.unwrap_or(default))
}

impl std::str::FromStr for SummarizationProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" | "off" => Ok(Self::None),
            "openai" => Ok(Self::OpenAI),
            "ollama" => Ok(Self::Ollama),
            _ => Err(()),
        }
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() {
    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("Failed to load config from environment");
    tracing::debug!(
        server_name = %config.server_name,
        server_port = config.server_port,
        upload_dir = %config.upload_dir.display(),
        output_dir = %config.output_dir.display(),
        chunk_size = config.chunk_size,
        chunk_overlap = config.chunk_overlap,
        summarization_provider = ?config.summarization_provider,
        llama_cloud = config.llama_cloud.is_some(),
        "Loaded configuration"
    );
    if config.llama_cloud.is_none() {
        tracing::warn!("Missing LlamaCloud configuration; documentation queries are disabled");
    }
    if config.summarization_provider == SummarizationProvider::None {
        tracing::warn!("No summarization provider configured; using extractive fallback");
    }
    let _ = CONFIG.set(config);
}

/// Configuration with fixed values for unit tests.
#[cfg(test)]
pub(crate) fn test_config(chunk_size: usize, chunk_overlap: usize) -> Config {
    Config {
        server_name: "test".into(),
        server_port: 8000,
        upload_dir: PathBuf::from("uploads"),
        output_dir: PathBuf::from("outputs"),
        chunk_size,
        chunk_overlap,
        summary_max_length: 500,
        max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        summarization_provider: SummarizationProvider::None,
        openai_api_key: None,
        openai_model: DEFAULT_OPENAI_MODEL.into(),
        openai_base_url: DEFAULT_OPENAI_BASE_URL.into(),
        ollama_url: DEFAULT_OLLAMA_URL.into(),
        ollama_model: DEFAULT_OLLAMA_MODEL.into(),
        llama_cloud: None,
        frontend_port: 8080,
        backend_url: DEFAULT_BACKEND_URL.into(),
    }
}
