//! Model client configuration
//!
//! Built once at process startup from the environment and handed to the
//! generator constructor; nothing in the pipeline reads the environment
//! after that point.

use crate::client::GenerationError;
use std::time::Duration;

/// Default OpenAI-compatible chat endpoint
pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
/// Default model
pub const DEFAULT_MODEL: &str = "gpt-4o";
/// Upper bound on a single generation call
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Configuration for the generation client
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub api_key: String,
    pub endpoint: String,
    pub model: String,
    pub timeout: Duration,
}

impl ModelConfig {
    /// Read configuration from the environment.
    ///
    /// `OPENAI_API_KEY` is mandatory; absence is a configuration error
    /// surfaced before any call. `ICEBOX_MODEL_ENDPOINT`,
    /// `ICEBOX_MODEL` and `ICEBOX_MODEL_TIMEOUT_SECS` override the
    /// defaults.
    pub fn from_env() -> Result<Self, GenerationError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or(GenerationError::MissingCredentials)?;

        let endpoint = std::env::var("ICEBOX_MODEL_ENDPOINT")
            .unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());
        let model = std::env::var("ICEBOX_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let timeout = std::env::var("ICEBOX_MODEL_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS), Duration::from_secs);

        Ok(Self {
            api_key,
            endpoint,
            model,
            timeout,
        })
    }
}
