//! Generation client
//!
//! Single-shot call against an OpenAI-compatible chat completion
//! endpoint, requesting the JSON-object response format. Exactly one
//! attempt per pipeline run: a retry against a non-deterministic
//! generator combined with persistence could duplicate side effects, so
//! retries belong to the caller and must be idempotent end to end.

use crate::config::ModelConfig;
use crate::prompt::AssembledPrompt;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

const ERROR_BODY_PREVIEW: usize = 320;

/// Errors from the generation client
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// Credentials absent - fatal, surfaced before any call is attempted
    #[error("model credentials are not configured")]
    MissingCredentials,

    /// Upstream rejected the request as malformed
    #[error("generation request invalid: {0}")]
    InvalidRequest(String),

    /// Transport failure or any other upstream error
    #[error("generation failed: {0}")]
    Upstream(String),

    /// Upstream answered but the completion carried no text
    #[error("model returned an empty completion")]
    EmptyCompletion,
}

/// One request to the generative model: the assembled system instruction
/// plus a user turn carrying the structured analysis serialized as JSON
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub system: String,
    pub user: String,
}

impl GenerationRequest {
    /// Build the request from an assembled prompt and the diagnostic's
    /// structured analysis
    #[must_use]
    pub fn new(prompt: &AssembledPrompt, structured_analysis: &Value) -> Self {
        let analysis = serde_json::to_string_pretty(structured_analysis)
            .unwrap_or_else(|_| structured_analysis.to_string());
        Self {
            system: prompt.system_content(),
            user: format!("Contexto estruturado:\n{analysis}"),
        }
    }
}

/// Single-shot text generation seam.
///
/// The pipeline only depends on this trait; the concrete client is
/// constructed once at startup and passed in.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Perform exactly one generation attempt and return the raw text
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Value,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

/// OpenAI-compatible chat completion client
#[derive(Debug, Clone)]
pub struct OpenAiGenerator {
    http: reqwest::Client,
    config: ModelConfig,
}

impl OpenAiGenerator {
    /// Build the client, verifying credentials before any call can be
    /// attempted
    pub fn new(config: ModelConfig) -> Result<Self, GenerationError> {
        if config.api_key.is_empty() {
            return Err(GenerationError::MissingCredentials);
        }
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GenerationError::Upstream(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http, config })
    }
}

#[async_trait]
impl GenerationBackend for OpenAiGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let payload = json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": request.user },
            ],
            "response_format": { "type": "json_object" },
        });

        tracing::debug!(model = %self.config.model, "dispatching generation request");

        let response = self
            .http
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| GenerationError::Upstream(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let preview = truncate(&body, ERROR_BODY_PREVIEW);
            return Err(if status == reqwest::StatusCode::BAD_REQUEST {
                GenerationError::InvalidRequest(preview)
            } else {
                GenerationError::Upstream(format!("upstream error {status}: {preview}"))
            });
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Upstream(format!("invalid upstream response: {e}")))?;

        let choice = body.choices.first().ok_or(GenerationError::EmptyCompletion)?;
        let text = extract_text(&choice.message.content);
        if text.trim().is_empty() {
            return Err(GenerationError::EmptyCompletion);
        }
        Ok(text)
    }
}

/// Completion content is a plain string for most providers, an array of
/// text parts for some
fn extract_text(content: &Value) -> String {
    match content {
        Value::String(text) => text.clone(),
        Value::Array(parts) => parts
            .iter()
            .filter_map(|part| part.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("\n"),
        _ => String::new(),
    }
}

fn truncate(value: &str, max_chars: usize) -> String {
    let mut chars = value.chars();
    let truncated: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{truncated}...")
    } else {
        truncated
    }
}
