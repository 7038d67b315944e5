//! Verdict orchestrator - the retrieval-and-ranking query pipeline
//!
//! One request runs the linear pipeline:
//! validate -> embed -> search(statutes) -> search(precedents)
//! -> [short-circuit if both empty] -> assemble context -> build prompt
//! -> generate -> format references -> respond.
//!
//! Every external-call failure is caught here and converted into one
//! [`VerdictError`] variant; nothing propagates unhandled, and no step is
//! retried on this path. All client handles are injected so the pipeline
//! can run against test doubles.

pub mod prompt;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cohere::{ChatProvider, EmbeddingProvider};
use crate::config::AppConfig;
use crate::knowledge::{PrecedentRecord, PrecedentStore, StatuteRecord, StatuteStore};

pub use prompt::{NO_MATCH_ANSWER, PRECEDENT_EMPTY_CONTEXT, STATUTE_EMPTY_CONTEXT};

/// Statute reference snippets keep this many characters of body text.
const REFERENCE_SNIPPET_CHARS: usize = 75;

// ============================================================================
// Types
// ============================================================================

/// The externally visible ruling result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RulingResponse {
    /// Generated ruling text, or the fixed no-match explanation.
    pub answer: String,
    /// Statute references, 1:1 with the statute result set, same order.
    pub references: Vec<String>,
    /// Precedent references, 1:1 with the precedent result set, same order.
    pub precedent_references: Vec<String>,
}

/// Failure taxonomy for the query pipeline.
///
/// "Zero matches" is deliberately absent: an empty result set is a valid
/// outcome, handled as a success response.
#[derive(Debug, Error)]
pub enum VerdictError {
    /// Query was empty after trimming. No external call was made.
    #[error("Query cannot be empty")]
    EmptyQuery,

    /// Embedding provider failed or returned a malformed response.
    #[error("Embedding generation failed. Error: {0}")]
    Embedding(anyhow::Error),

    /// A vector-store search call itself failed.
    #[error("Error retrieving from the knowledge base. Error: {0}")]
    Retrieval(anyhow::Error),

    /// The generative-model call failed.
    #[error("Failed to generate answer. Error: {0}")]
    Generation(anyhow::Error),
}

/// Fixed per-deployment pipeline settings. Callers cannot override these
/// per request.
#[derive(Debug, Clone)]
pub struct VerdictOptions {
    pub statute_limit: usize,
    pub precedent_limit: usize,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl Default for VerdictOptions {
    fn default() -> Self {
        Self {
            statute_limit: crate::config::STATUTE_SEARCH_LIMIT,
            precedent_limit: crate::config::PRECEDENT_SEARCH_LIMIT,
            temperature: crate::config::GENERATION_TEMPERATURE,
            max_output_tokens: crate::config::GENERATION_MAX_TOKENS,
        }
    }
}

impl From<&AppConfig> for VerdictOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            statute_limit: config.statute_limit,
            precedent_limit: config.precedent_limit,
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
        }
    }
}

// ============================================================================
// VerdictOrchestrator
// ============================================================================

/// Query-time orchestrator over the two knowledge collections.
pub struct VerdictOrchestrator {
    embedder: Arc<dyn EmbeddingProvider>,
    generator: Arc<dyn ChatProvider>,
    statutes: Arc<dyn StatuteStore>,
    precedents: Arc<dyn PrecedentStore>,
    options: VerdictOptions,
}

impl VerdictOrchestrator {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn ChatProvider>,
        statutes: Arc<dyn StatuteStore>,
        precedents: Arc<dyn PrecedentStore>,
        options: VerdictOptions,
    ) -> Self {
        Self {
            embedder,
            generator,
            statutes,
            precedents,
            options,
        }
    }

    /// Run the full pipeline for one query.
    pub async fn handle(&self, query: &str) -> Result<RulingResponse, VerdictError> {
        // Step 1: validation, before any external call.
        let query = query.trim();
        if query.is_empty() {
            return Err(VerdictError::EmptyQuery);
        }

        tracing::info!("New query received: {}", query);

        // Step 2: exactly one query embedding, reused by both searches.
        let query_embedding = self
            .embedder
            .embed_query(query)
            .await
            .map_err(VerdictError::Embedding)?;
        tracing::debug!("Query embedding generated ({} dims)", query_embedding.len());

        // Step 3: dual retrieval. A failing call is terminal; zero matches
        // is not.
        let statute_results = self
            .statutes
            .search(&query_embedding, self.options.statute_limit)
            .await
            .map_err(VerdictError::Retrieval)?;
        tracing::debug!("Retrieved {} statute results", statute_results.len());

        let precedent_results = self
            .precedents
            .search(&query_embedding, self.options.precedent_limit)
            .await
            .map_err(VerdictError::Retrieval)?;
        tracing::debug!("Retrieved {} precedent results", precedent_results.len());

        if statute_results.is_empty() && precedent_results.is_empty() {
            tracing::warn!("No matching statute sections or precedents found");
            return Ok(RulingResponse {
                answer: NO_MATCH_ANSWER.to_string(),
                references: vec![],
                precedent_references: vec![],
            });
        }

        // Steps 4-5: context assembly and prompt construction.
        let statute_context = prompt::render_statute_context(&statute_results);
        let precedent_context = prompt::render_precedent_context(&precedent_results);
        let full_prompt = prompt::build_prompt(&statute_context, &precedent_context, query);

        // Step 6: generation.
        let answer = self
            .generator
            .generate(
                &full_prompt,
                self.options.temperature,
                self.options.max_output_tokens,
            )
            .await
            .map_err(VerdictError::Generation)?;

        // Step 7: references, 1:1 with the result sets, in order.
        Ok(RulingResponse {
            answer: answer.trim().to_string(),
            references: statute_results.iter().map(statute_reference).collect(),
            precedent_references: precedent_results
                .iter()
                .map(precedent_reference)
                .collect(),
        })
    }
}

// ============================================================================
// Reference Formatting
// ============================================================================

fn statute_reference(record: &StatuteRecord) -> String {
    format!(
        "{}: \"{}\"",
        record.source,
        snippet(&record.text, REFERENCE_SNIPPET_CHARS)
    )
}

fn precedent_reference(record: &PrecedentRecord) -> String {
    format!("{} ({})", record.case_name, record.citation)
}

/// First `max_chars` characters of `text`, with an ellipsis marker when
/// anything was cut. Text at or under the limit passes through verbatim.
fn snippet(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}

// ============================================================================
// Tests
// ============================================================================
