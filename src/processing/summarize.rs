//! Chunk summarization with abstractive and extractive strategies.
//!
//! With a [`CompletionClient`] configured, each chunk is summarized by the model. Without one the
//! summarizer extracts the leading sentences, so the pipeline always produces output.

use std::sync::Arc;

use crate::llm::{CompletionClient, CompletionRequest, LlmError};

const EXTRACTIVE_SENTENCES: usize = 5;
const EXCERPT_CHARS: usize = 500;

/// Summarizes chunk text within a character budget.
#[derive(Clone)]
pub struct Summarizer {
    client: Option<Arc<dyn CompletionClient>>,
    max_length: usize,
}

impl Summarizer {
    /// Create a summarizer; `client == None` selects the extractive strategy.
    pub fn new(client: Option<Arc<dyn CompletionClient>>, max_length: usize) -> Self {
        Self { client, max_length }
    }

    /// Label of the active provider, or `extractive`.
    pub fn strategy(&self) -> &'static str {
        self.client
            .as_ref()
            .map_or("extractive", |client| client.provider())
    }

    /// Summarize `text`, failing only when the configured provider fails.
    pub async fn summarize(&self, text: &str) -> Result<String, LlmError> {
        match &self.client {
            Some(client) => {
                client
                    .complete(CompletionRequest::new(build_prompt(text, self.max_length)))
                    .await
            }
            None => Ok(extractive_summary(text, self.max_length)),
        }
    }

    /// Summarize a chunk, replacing a failed summary with a truncated excerpt.
    ///
    /// Returns the summary and whether the excerpt fallback was used.
    pub async fn summarize_chunk(&self, chunk: &str) -> (String, bool) {
        match self.summarize(chunk).await {
            Ok(summary) => (summary, false),
            Err(error) => {
                tracing::warn!(error = %error, "Chunk summary failed; using excerpt");
                (truncated_excerpt(chunk), true)
            }
        }
    }
}

/// Prompt asking the model for a concise summary under `max_length` characters.
pub fn build_prompt(text: &str, max_length: usize) -> String {
    format!(
        "Summarize the following text concisely, highlighting the key points. \
         Keep the summary under {max_length} characters.\n\nTEXT:\n{text}\n\nSUMMARY:"
    )
}

/// First sentences of `text`, joined with `". "` and cut to `max_length` characters.
pub fn extractive_summary(text: &str, max_length: usize) -> String {
    let summary = text
        .split('.')
        .take(EXTRACTIVE_SENTENCES)
        .map(str::trim)
        .filter(|sentence| !sentence.is_empty())
        .collect::<Vec<_>>()
        .join(". ");

    if summary.chars().count() <= max_length {
        return summary;
    }
    let kept: String = summary
        .chars()
        .take(max_length.saturating_sub(3))
        .collect();
    format!("{kept}...")
}

/// Stand-in for a chunk whose summary could not be generated.
pub fn truncated_excerpt(chunk: &str) -> String {
    let excerpt: String = chunk.chars().take(EXCERPT_CHARS).collect();
    format!("{excerpt}...(truncated)")
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FailingClient;

    #[async_trait]
    impl CompletionClient for FailingClient {
        async fn complete(&self, _request: CompletionRequest) -> Result<String, LlmError> {
            Err(LlmError::GenerationFailed("quota exceeded".into()))
        }

        fn provider(&self) -> &'static str {
            "failing"
        }
    }

    struct EchoClient;

    #[async_trait]
    impl CompletionClient for EchoClient {
        async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
            Ok(format!("{} chars of prompt", request.prompt.len()))
        }

        fn provider(&self) -> &'static str {
            "echo"
        }
    }

    #[test]
    fn extractive_keeps_first_five_sentences() {
        let text = "One. Two. Three. Four. Five. Six. Seven.";
        assert_eq!(extractive_summary(text, 500), "One. Two. Three. Four. Five");
    }

    #[test]
    fn empty_splits_count_toward_the_five() {
        let text = "One.. Two. Three. Four. Five. Six.";
        assert_eq!(extractive_summary(text, 500), "One. Two. Three. Four");
    }

    #[test]
    fn extractive_truncates_to_budget() {
        let text = "Alpha beta gamma delta epsilon zeta eta theta.";
        let summary = extractive_summary(text, 20);
        assert_eq!(summary, "Alpha beta gamma ...");
        assert_eq!(summary.chars().count(), 20);
    }

    #[test]
    fn extractive_of_blank_text_is_empty() {
        assert_eq!(extractive_summary(" . .. ", 100), "");
    }

    #[test]
    fn excerpt_is_capped() {
        let chunk = "z".repeat(800);
        let excerpt = truncated_excerpt(&chunk);
        assert!(excerpt.ends_with("...(truncated)"));
        assert_eq!(excerpt.chars().count(), 500 + "...(truncated)".len());
    }

    #[test]
    fn prompt_carries_budget_and_text() {
        let prompt = build_prompt("Body text", 250);
        assert!(prompt.contains("under 250 characters"));
        assert!(prompt.contains("TEXT:\nBody text"));
        assert!(prompt.ends_with("SUMMARY:"));
    }

    #[tokio::test]
    async fn failing_provider_falls_back_to_excerpt() {
        let summarizer = Summarizer::new(Some(Arc::new(FailingClient)), 100);
        let (summary, fell_back) = summarizer.summarize_chunk("Some chunk text.").await;
        assert!(fell_back);
        assert_eq!(summary, "Some chunk text....(truncated)");
    }

    #[tokio::test]
    async fn provider_output_is_used_when_available() {
        let summarizer = Summarizer::new(Some(Arc::new(EchoClient)), 100);
        assert_eq!(summarizer.strategy(), "echo");
        let (summary, fell_back) = summarizer.summarize_chunk("abc").await;
        assert!(!fell_back);
        assert!(summary.ends_with("chars of prompt"));
    }

    #[tokio::test]
    async fn no_provider_uses_extraction() {
        let summarizer = Summarizer::new(None, 100);
        assert_eq!(summarizer.strategy(), "extractive");
        let summary = summarizer.summarize("First. Second.").await.expect("summary");
        assert_eq!(summary, "First. Second");
    }
}
