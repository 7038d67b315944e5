//! Startup configuration
//!
//! Everything the assistant needs from the environment is read once at
//! process start into an immutable [`AppConfig`], which is then passed by
//! reference into the components that need it. Missing required settings
//! fail fast with a descriptive error instead of surfacing mid-request.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;

/// Default Cohere embedding model.
pub const DEFAULT_EMBEDDING_MODEL: &str = "embed-multilingual-v3.0";

/// Default Cohere chat model used for ruling generation.
pub const DEFAULT_CHAT_MODEL: &str = "c4ai-aya-23";

/// Embedding dimension of `embed-multilingual-v3.0`.
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 1024;

/// Top-K for the statute-section search. Fixed; callers cannot override it.
pub const STATUTE_SEARCH_LIMIT: usize = 3;

/// Top-K for the precedent search. Fixed; callers cannot override it.
pub const PRECEDENT_SEARCH_LIMIT: usize = 2;

/// Sampling temperature for ruling generation. Low variance on purpose.
pub const GENERATION_TEMPERATURE: f32 = 0.3;

/// Maximum output length for ruling generation, in tokens.
pub const GENERATION_MAX_TOKENS: u32 = 800;

/// Application configuration, constructed once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Cohere API key.
    pub cohere_api_key: String,
    /// Cohere API base URL (overridable for tests).
    pub cohere_base_url: String,
    /// Embedding model name.
    pub embedding_model: String,
    /// Chat model name.
    pub chat_model: String,
    /// Embedding dimension; must match between index time and query time.
    pub embedding_dimension: usize,
    /// Data directory holding the LanceDB collections.
    pub data_dir: PathBuf,
    /// Statute-search result limit (K1).
    pub statute_limit: usize,
    /// Precedent-search result limit (K2).
    pub precedent_limit: usize,
    /// Sampling temperature for generation.
    pub temperature: f32,
    /// Maximum generated tokens.
    pub max_output_tokens: u32,
    /// HTTP timeout for embedding calls.
    pub embed_timeout: Duration,
    /// HTTP timeout for generation calls.
    pub chat_timeout: Duration,
}

impl AppConfig {
    /// Build the configuration from environment variables.
    ///
    /// Required: `COHERE_API_KEY`. Optional: `EMBEDDING_MODEL`,
    /// `CHAT_MODEL`, `LEXVERDICT_DATA_DIR`.
    pub fn from_env() -> Result<Self> {
        let cohere_api_key = get_api_key()?;

        let embedding_model = env_or("EMBEDDING_MODEL", DEFAULT_EMBEDDING_MODEL);
        let chat_model = env_or("CHAT_MODEL", DEFAULT_CHAT_MODEL);

        let data_dir = std::env::var("LEXVERDICT_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_data_dir());

        Ok(Self {
            cohere_api_key,
            cohere_base_url: crate::cohere::COHERE_API_BASE.to_string(),
            embedding_model,
            chat_model,
            embedding_dimension: DEFAULT_EMBEDDING_DIMENSION,
            data_dir,
            statute_limit: STATUTE_SEARCH_LIMIT,
            precedent_limit: PRECEDENT_SEARCH_LIMIT,
            temperature: GENERATION_TEMPERATURE,
            max_output_tokens: GENERATION_MAX_TOKENS,
            embed_timeout: Duration::from_secs(15),
            chat_timeout: Duration::from_secs(60),
        })
    }
}

/// Default data directory (~/.lexverdict/).
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".lexverdict")
}

/// Read the Cohere API key from the environment.
pub fn get_api_key() -> Result<String> {
    if let Ok(key) = std::env::var("COHERE_API_KEY") {
        if !key.is_empty() {
            return Ok(key);
        }
    }

    anyhow::bail!(
        "API key not found. Set the COHERE_API_KEY environment variable.\n\
         Get your API key at: https://dashboard.cohere.com/api-keys"
    )
}

/// Whether a Cohere API key is configured.
pub fn has_api_key() -> bool {
    std::env::var("COHERE_API_KEY")
        .map(|key| !key.is_empty())
        .unwrap_or(false)
}

fn env_or(name: &str, default: &str) -> String {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => value,
        _ => default.to_string(),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_data_dir_not_empty() {
        let dir = default_data_dir();
        assert!(dir.ends_with(".lexverdict"));
    }

    #[test]
    fn test_env_or_falls_back() {
        assert_eq!(
            env_or("LEXVERDICT_TEST_UNSET_VAR", "fallback"),
            "fallback"
        );
    }

    #[test]
    fn test_fixed_limits() {
        assert_eq!(STATUTE_SEARCH_LIMIT, 3);
        assert_eq!(PRECEDENT_SEARCH_LIMIT, 2);
    }
}
