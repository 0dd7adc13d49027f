//! Documentation queries against a managed LlamaCloud index.
//!
//! The index is addressed by name; the pipeline id behind it is resolved on first use and cached
//! for the lifetime of the client. Retrieved passages are turned into an answer by the configured
//! completion client, or returned verbatim when no model is available.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tokio::sync::OnceCell;

use crate::config::LlamaCloudSettings;
use crate::llm::{CompletionClient, CompletionRequest, LlmError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const PASSAGE_SEPARATOR: &str = "\n\n---\n\n";

/// Errors surfaced while answering documentation queries.
#[derive(Debug, Error)]
pub enum DocsError {
    /// No index settings were supplied.
    #[error("LlamaCloud index not initialized")]
    NotConfigured,
    /// The HTTP client could not be built or the service could not be reached.
    #[error("LlamaCloud request failed: {0}")]
    Request(String),
    /// No pipeline matches the configured index name.
    #[error("LlamaCloud index '{0}' not found")]
    IndexNotFound(String),
    /// LlamaCloud answered with an unexpected payload.
    #[error("Malformed LlamaCloud response: {0}")]
    InvalidResponse(String),
    /// The answer could not be synthesized from the retrieved passages.
    #[error("Failed to synthesize answer: {0}")]
    Synthesis(#[from] LlmError),
}

/// Query interface over a documentation corpus.
#[async_trait]
pub trait DocumentationIndex: Send + Sync {
    /// Answer `query` from the indexed documentation.
    async fn query(&self, query: &str) -> Result<String, DocsError>;
}

/// Build the configured documentation index, if any.
pub fn build_documentation_index(
    settings: Option<&LlamaCloudSettings>,
    completion: Option<Arc<dyn CompletionClient>>,
) -> Result<Option<Arc<dyn DocumentationIndex>>, DocsError> {
    let Some(settings) = settings else {
        return Ok(None);
    };
    let index = LlamaCloudIndex::new(settings.clone(), completion)?;
    tracing::info!(
        index = %settings.index_name,
        project = %settings.project_name,
        "LlamaCloud index configured"
    );
    Ok(Some(Arc::new(index)))
}

/// LlamaCloud retrieval client.
pub struct LlamaCloudIndex {
    http: Client,
    settings: LlamaCloudSettings,
    completion: Option<Arc<dyn CompletionClient>>,
    pipeline_id: OnceCell<String>,
}

#[derive(Debug, Deserialize)]
struct Pipeline {
    id: String,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RetrieveResponse {
    #[serde(default)]
    retrieval_nodes: Vec<RetrievalNode>,
}

#[derive(Debug, Deserialize)]
struct RetrievalNode {
    node: NodeBody,
}

#[derive(Debug, Deserialize)]
struct NodeBody {
    #[serde(default)]
    text: String,
}

impl LlamaCloudIndex {
    /// Create a client; no request is issued until the first query.
    pub fn new(
        settings: LlamaCloudSettings,
        completion: Option<Arc<dyn CompletionClient>>,
    ) -> Result<Self, DocsError> {
        let http = Client::builder()
            .user_agent("pdfchunk/docs")
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|error| DocsError::Request(format!("failed to build client: {error}")))?;
        Ok(Self {
            http,
            settings,
            completion,
            pipeline_id: OnceCell::new(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.settings.base_url.trim_end_matches('/'))
    }

    async fn pipeline_id(&self) -> Result<&str, DocsError> {
        let id = self
            .pipeline_id
            .get_or_try_init(|| self.resolve_pipeline_id())
            .await?;
        Ok(id.as_str())
    }

    async fn resolve_pipeline_id(&self) -> Result<String, DocsError> {
        let response = self
            .http
            .get(self.url("/api/v1/pipelines"))
            .bearer_auth(&self.settings.api_key)
            .query(&[
                ("project_name", self.settings.project_name.as_str()),
                ("pipeline_name", self.settings.index_name.as_str()),
                ("organization_id", self.settings.organization_id.as_str()),
            ])
            .send()
            .await
            .map_err(|error| DocsError::Request(error.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DocsError::Request(format!(
                "pipeline lookup returned {status}: {body}"
            )));
        }

        let pipelines: Vec<Pipeline> = response
            .json()
            .await
            .map_err(|error| DocsError::InvalidResponse(error.to_string()))?;

        let pipeline = pipelines
            .into_iter()
            .find(|pipeline| {
                pipeline
                    .name
                    .as_deref()
                    .is_none_or(|name| name == self.settings.index_name)
            })
            .ok_or_else(|| DocsError::IndexNotFound(self.settings.index_name.clone()))?;

        tracing::info!(
            index = %self.settings.index_name,
            pipeline_id = %pipeline.id,
            "Resolved LlamaCloud pipeline"
        );
        Ok(pipeline.id)
    }

    async fn retrieve(&self, query: &str) -> Result<Vec<String>, DocsError> {
        let pipeline_id = self.pipeline_id().await?;
        let response = self
            .http
            .post(self.url(&format!("/api/v1/pipelines/{pipeline_id}/retrieve")))
            .bearer_auth(&self.settings.api_key)
            .json(&json!({ "query": query }))
            .send()
            .await
            .map_err(|error| DocsError::Request(error.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DocsError::Request(format!(
                "retrieval returned {status}: {body}"
            )));
        }

        let body: RetrieveResponse = response
            .json()
            .await
            .map_err(|error| DocsError::InvalidResponse(error.to_string()))?;

        Ok(body
            .retrieval_nodes
            .into_iter()
            .map(|node| node.node.text.trim().to_string())
            .filter(|text| !text.is_empty())
            .collect())
    }
}

#[async_trait]
impl DocumentationIndex for LlamaCloudIndex {
    async fn query(&self, query: &str) -> Result<String, DocsError> {
        let passages = self.retrieve(query).await?;
        tracing::debug!(passages = passages.len(), "Retrieved documentation passages");
        if passages.is_empty() {
            return Ok("No relevant documentation found.".to_string());
        }

        match &self.completion {
            Some(client) => {
                let prompt = build_answer_prompt(query, &passages);
                Ok(client.complete(CompletionRequest::new(prompt)).await?)
            }
            None => Ok(passages.join(PASSAGE_SEPARATOR)),
        }
    }
}

fn build_answer_prompt(query: &str, passages: &[String]) -> String {
    let context = passages.join(PASSAGE_SEPARATOR);
    format!(
        "Answer the question using only the documentation excerpts below. \
         If the excerpts do not contain the answer, say so.\n\n\
         DOCUMENTATION:\n{context}\n\nQUESTION: {query}\n\nANSWER:"
    )
}
