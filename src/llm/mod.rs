//! Completion clients for hosted and local language models.
//!
//! Chunk summaries and documentation answers both go through [`CompletionClient`]. Two adapters
//! issue HTTP requests directly with `reqwest`: OpenAI chat completions and the Ollama
//! `/api/generate` endpoint. When no provider is configured, callers receive `None` from
//! [`build_completion_client`] and fall back to extractive behavior.

use crate::config::{Config, SummarizationProvider};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Errors surfaced while requesting a completion.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Provider was unreachable or the client could not be built.
    #[error("LLM provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider returned an error response.
    #[error("Failed to generate completion: {0}")]
    GenerationFailed(String),
    /// Provider response could not be parsed.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

/// Request payload passed to a completion provider.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Prompt assembled by the caller.
    pub prompt: String,
    /// Sampling temperature; low values keep summaries deterministic.
    pub temperature: f32,
}

impl CompletionRequest {
    /// Build a low-temperature request for the given prompt.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            temperature: 0.1,
        }
    }
}

/// Interface implemented by completion providers.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Generate a completion for the prompt.
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError>;

    /// Short provider label for logs and status payloads.
    fn provider(&self) -> &'static str;
}

/// Build a completion client based on configuration.
pub fn build_completion_client(
    config: &Config,
) -> Result<Option<Arc<dyn CompletionClient>>, LlmError> {
    match config.summarization_provider {
        SummarizationProvider::None => Ok(None),
        SummarizationProvider::OpenAI => {
            let api_key = config.openai_api_key.clone().ok_or_else(|| {
                LlmError::ProviderUnavailable("OPENAI_API_KEY is not set".to_string())
            })?;
            let client = OpenAiClient::new(
                config.openai_base_url.clone(),
                api_key,
                config.openai_model.clone(),
            )?;
            tracing::info!(model = %config.openai_model, "OpenAI completion client initialized");
            Ok(Some(Arc::new(client)))
        }
        SummarizationProvider::Ollama => {
            let client = OllamaClient::new(config.ollama_url.clone(), config.ollama_model.clone())?;
            tracing::info!(model = %config.ollama_model, "Ollama completion client initialized");
            Ok(Some(Arc::new(client)))
        }
    }
}

fn http_client(user_agent: &str) -> Result<Client, LlmError> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|error| LlmError::ProviderUnavailable(format!("failed to build client: {error}")))
}

/// OpenAI chat-completions adapter.
pub struct OpenAiClient {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiClient {
    /// Create a client targeting `base_url` (e.g. `https://api.openai.com`).
    pub fn new(base_url: String, api_key: String, model: String) -> Result<Self, LlmError> {
        Ok(Self {
            http: http_client("pdfchunk/llm")?,
            base_url,
            api_key,
            model,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
        let payload = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": request.prompt }],
            "temperature": request.temperature,
        });

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                LlmError::ProviderUnavailable(format!(
                    "failed to reach OpenAI at {}: {error}",
                    self.base_url
                ))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::GenerationFailed(format!(
                "OpenAI returned {status}: {body}"
            )));
        }

        let body: ChatCompletionResponse = response.json().await.map_err(|error| {
            LlmError::InvalidResponse(format!("failed to decode OpenAI response: {error}"))
        })?;

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .ok_or_else(|| LlmError::InvalidResponse("response contained no choices".into()))
    }

    fn provider(&self) -> &'static str {
        "openai"
    }
}

/// Ollama `/api/generate` adapter.
pub struct OllamaClient {
    http: Client,
    base_url: String,
    model: String,
}

impl OllamaClient {
    /// Create a client for the Ollama runtime at `base_url`.
    pub fn new(base_url: String, model: String) -> Result<Self, LlmError> {
        Ok(Self {
            http: http_client("pdfchunk/llm")?,
            base_url,
            model,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
    done: bool,
}

#[async_trait]
impl CompletionClient for OllamaClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
        let payload = json!({
            "model": self.model,
            "prompt": request.prompt,
            "stream": false,
            "options": {
                "temperature": request.temperature,
            }
        });

        let response = self
            .http
            .post(self.endpoint())
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                LlmError::ProviderUnavailable(format!(
                    "failed to reach Ollama at {}: {error}",
                    self.base_url
                ))
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(LlmError::ProviderUnavailable(format!(
                "Ollama endpoint {} returned 404",
                self.endpoint()
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::GenerationFailed(format!(
                "Ollama returned {status}: {body}"
            )));
        }

        let body: OllamaResponse = response.json().await.map_err(|error| {
            LlmError::InvalidResponse(format!("failed to decode Ollama response: {error}"))
        })?;

        if !body.done {
            return Err(LlmError::InvalidResponse(
                "Ollama response incomplete (streaming not supported)".into(),
            ));
        }

        Ok(body.response.trim().to_string())
    }

    fn provider(&self) -> &'static str {
        "ollama"
    }
}
