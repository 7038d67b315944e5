//! Cohere API clients - embeddings and chat generation
//!
//! Both external model services used by the assistant live behind small
//! async traits so the orchestrator can be exercised with test doubles.
//! The real implementation talks to the Cohere v1 REST API over reqwest.
//!
//! Embedding requests carry an input type: `search_document` at indexing
//! time, `search_query` at query time. The two must not be mixed or the
//! similarity space degrades.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Cohere API base URL.
pub const COHERE_API_BASE: &str = "https://api.cohere.ai";

// ============================================================================
// Traits
// ============================================================================

/// Text embedding provider.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single query string (input type `search_query`).
    ///
    /// Exactly one vector must come back; any other response shape is an
    /// error. Never retried - this sits on the online request path.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a batch of documents (input type `search_document`).
    ///
    /// Used by the offline loaders; transport failures and rate limits are
    /// retried per the client's [`RetryPolicy`].
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embedding dimension.
    fn dimension(&self) -> usize;

    /// Provider name for logging.
    fn name(&self) -> &str;
}

/// Generative chat provider.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Generate free-text output for a fully assembled prompt.
    async fn generate(&self, prompt: &str, temperature: f32, max_tokens: u32) -> Result<String>;
}

// ============================================================================
// Retry Policy
// ============================================================================

/// Retry policy for offline batch embedding.
///
/// Bulk loading hits trial-key rate limits; one retry after a long
/// pause is usually enough to get the batch through.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay between attempts.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            backoff: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// No retries at all.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            backoff: Duration::ZERO,
        }
    }
}

// ============================================================================
// CohereClient
// ============================================================================

/// Cohere REST client implementing both provider traits.
#[derive(Debug)]
pub struct CohereClient {
    api_key: String,
    base_url: String,
    embedding_model: String,
    chat_model: String,
    dimension: usize,
    embed_client: reqwest::Client,
    chat_client: reqwest::Client,
    retry: RetryPolicy,
}

/// Settings for constructing a [`CohereClient`].
#[derive(Debug, Clone)]
pub struct CohereSettings {
    pub api_key: String,
    pub base_url: String,
    pub embedding_model: String,
    pub chat_model: String,
    pub dimension: usize,
    pub embed_timeout: Duration,
    pub chat_timeout: Duration,
    pub retry: RetryPolicy,
}

impl CohereSettings {
    /// Settings derived from the application configuration.
    pub fn from_config(config: &crate::config::AppConfig) -> Self {
        Self {
            api_key: config.cohere_api_key.clone(),
            base_url: config.cohere_base_url.clone(),
            embedding_model: config.embedding_model.clone(),
            chat_model: config.chat_model.clone(),
            dimension: config.embedding_dimension,
            embed_timeout: config.embed_timeout,
            chat_timeout: config.chat_timeout,
            retry: RetryPolicy::default(),
        }
    }
}

impl CohereClient {
    /// Create a client from settings.
    pub fn new(settings: CohereSettings) -> Result<Self> {
        let embed_client = reqwest::Client::builder()
            .timeout(settings.embed_timeout)
            .build()
            .context("Failed to create embedding HTTP client")?;

        // Generation runs much longer than embedding; separate timeout.
        let chat_client = reqwest::Client::builder()
            .timeout(settings.chat_timeout)
            .build()
            .context("Failed to create chat HTTP client")?;

        Ok(Self {
            api_key: settings.api_key,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            embedding_model: settings.embedding_model,
            chat_model: settings.chat_model,
            dimension: settings.dimension,
            embed_client,
            chat_client,
            retry: settings.retry,
        })
    }

    fn embed_url(&self) -> String {
        format!("{}/v1/embed", self.base_url)
    }

    fn chat_url(&self) -> String {
        format!("{}/v1/chat", self.base_url)
    }

    /// Single embed API call, no retry.
    async fn embed_once(&self, texts: &[String], input_type: InputType) -> Result<Vec<Vec<f32>>> {
        let request = EmbedRequest {
            model: &self.embedding_model,
            texts,
            input_type: input_type.as_str(),
        };

        let response = self
            .embed_client
            .post(self.embed_url())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to send embedding request")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read embedding response body")?;

        if !status.is_success() {
            anyhow::bail!("Cohere embed error ({}): {}", status, api_error_message(&body));
        }

        let parsed: EmbedResponse =
            serde_json::from_str(&body).context("Failed to parse embedding response")?;

        if parsed.embeddings.len() != texts.len() {
            anyhow::bail!(
                "Cohere returned {} embeddings for {} texts",
                parsed.embeddings.len(),
                texts.len()
            );
        }

        Ok(parsed.embeddings)
    }
}

/// Embedding usage mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputType {
    /// Query-time embedding.
    SearchQuery,
    /// Index-time embedding.
    SearchDocument,
}

impl InputType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputType::SearchQuery => "search_query",
            InputType::SearchDocument => "search_document",
        }
    }
}

#[async_trait]
impl EmbeddingProvider for CohereClient {
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let texts = [text.to_string()];
        let mut embeddings = self.embed_once(&texts, InputType::SearchQuery).await?;

        if embeddings.len() != 1 {
            anyhow::bail!(
                "Expected exactly one query embedding, got {}",
                embeddings.len()
            );
        }

        let vector = embeddings.remove(0);
        if vector.is_empty() {
            anyhow::bail!("Cohere returned an empty query embedding");
        }

        Ok(vector)
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let mut last_error: Option<anyhow::Error> = None;

        for attempt in 1..=self.retry.max_attempts {
            match self.embed_once(texts, InputType::SearchDocument).await {
                Ok(embeddings) => return Ok(embeddings),
                Err(e) => {
                    if attempt < self.retry.max_attempts && is_retryable(&e) {
                        tracing::warn!(
                            "Batch embedding failed ({}), retrying in {:?} (attempt {}/{})",
                            e,
                            self.retry.backoff,
                            attempt,
                            self.retry.max_attempts
                        );
                        tokio::time::sleep(self.retry.backoff).await;
                        last_error = Some(e);
                    } else {
                        return Err(e);
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("Batch embedding failed")))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        &self.embedding_model
    }
}

#[async_trait]
impl ChatProvider for CohereClient {
    async fn generate(&self, prompt: &str, temperature: f32, max_tokens: u32) -> Result<String> {
        let request = ChatRequest {
            model: &self.chat_model,
            message: prompt,
            temperature,
            max_tokens,
        };

        let response = self
            .chat_client
            .post(self.chat_url())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to send chat request")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read chat response body")?;

        if !status.is_success() {
            anyhow::bail!("Cohere chat error ({}): {}", status, api_error_message(&body));
        }

        let parsed: ChatResponse =
            serde_json::from_str(&body).context("Failed to parse chat response")?;

        Ok(parsed.text)
    }
}

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    texts: &'a [String],
    input_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    message: &'a str,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    text: String,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

fn api_error_message(body: &str) -> String {
    serde_json::from_str::<ApiError>(body)
        .map(|e| e.message)
        .unwrap_or_else(|_| body.to_string())
}

/// Rate limits and transport failures are worth a second attempt; other
/// API errors (bad key, bad request) are not.
fn is_retryable(error: &anyhow::Error) -> bool {
    let text = error.to_string();
    text.contains("429") || text.contains("Failed to send")
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(base_url: &str) -> CohereClient {
        CohereClient::new(CohereSettings {
            api_key: "test-key".to_string(),
            base_url: base_url.to_string(),
            embedding_model: "embed-multilingual-v3.0".to_string(),
            chat_model: "c4ai-aya-23".to_string(),
            dimension: 4,
            embed_timeout: Duration::from_secs(5),
            chat_timeout: Duration::from_secs(5),
            retry: RetryPolicy::none(),
        })
        .expect("client creation failed")
    }

    #[test]
    fn test_input_type_strings() {
        assert_eq!(InputType::SearchQuery.as_str(), "search_query");
        assert_eq!(InputType::SearchDocument.as_str(), "search_document");
    }

    #[test]
    fn test_api_error_message_falls_back_to_body() {
        assert_eq!(api_error_message("not json"), "not json");
        assert_eq!(
            api_error_message(r#"{"message": "invalid api token"}"#),
            "invalid api token"
        );
    }

    #[tokio::test]
    async fn test_embed_query_returns_single_vector() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/embed"))
            .and(body_partial_json(
                serde_json::json!({"input_type": "search_query"}),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "embeddings": [[0.1, 0.2, 0.3, 0.4]]
            })))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let vector = client.embed_query("theft at night").await.unwrap();
        assert_eq!(vector, vec![0.1, 0.2, 0.3, 0.4]);
    }

    #[tokio::test]
    async fn test_embed_query_rejects_zero_vectors() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/embed"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"embeddings": []})),
            )
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let result = client.embed_query("theft at night").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_embed_documents_count_mismatch_is_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/embed"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "embeddings": [[0.1, 0.2, 0.3, 0.4]]
            })))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let texts = vec!["one".to_string(), "two".to_string()];
        let result = client.embed_documents(&texts).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_chat_generate() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "text": "**Verdict:** Guilty"
            })))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let answer = client.generate("some prompt", 0.3, 800).await.unwrap();
        assert_eq!(answer, "**Verdict:** Guilty");
    }

    #[tokio::test]
    async fn test_chat_error_surfaces_api_message() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(serde_json::json!({"message": "model not found"})),
            )
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let err = client.generate("p", 0.3, 800).await.unwrap_err();
        assert!(err.to_string().contains("model not found"));
    }
}
