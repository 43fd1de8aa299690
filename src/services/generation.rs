use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::models::Role;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const REQUEST_TIMEOUT_SECS: u64 = 120;
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Model identifiers the client may select from.
pub const SUPPORTED_MODELS: &[&str] = &["gemini-2.0-flash", "gpt-3.5-turbo", "gpt-4"];
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

pub fn is_supported_model(id: &str) -> bool {
    SUPPORTED_MODELS.contains(&id)
}

#[derive(Debug, Error)]
pub enum GenerationError {
    /// Network-level failure reaching the endpoint.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The endpoint answered, but without the expected response shape or
    /// with an empty text.
    #[error("Structural error: {0}")]
    Structural(String),

    #[error("HTTP client build failed: {0}")]
    ClientBuild(String),
}

/// One turn of conversation history sent to the generation endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationTurn {
    pub role: Role,
    pub text: String,
}

impl GenerationTurn {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
        }
    }
}

/// Outbound call to a hosted text-generation endpoint.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    async fn generate(
        &self,
        history: &[GenerationTurn],
        model: &str,
    ) -> Result<String, GenerationError>;
}

/// Client for the Gemini `generateContent` REST endpoint.
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self, GenerationError> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, GenerationError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| GenerationError::ClientBuild(e.to_string()))?;

        Ok(Self {
            http,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl GenerationClient for GeminiClient {
    async fn generate(
        &self,
        history: &[GenerationTurn],
        model: &str,
    ) -> Result<String, GenerationError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, model, self.api_key
        );
        let body = build_generate_request(history);

        debug!(model = %model, turns = history.len(), "Calling generation endpoint");

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        // Error statuses still carry a JSON body; a body without the
        // expected path is reported as a structural failure, not transport.
        let text = response
            .text()
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        parse_generate_response(&text)
    }
}

// ===== wire types =====

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<ContentEntry>,
}

#[derive(Serialize)]
struct ContentEntry {
    role: String,
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

fn build_generate_request(history: &[GenerationTurn]) -> impl Serialize {
    GenerateRequest {
        contents: history
            .iter()
            .map(|turn| ContentEntry {
                role: match turn.role {
                    Role::System => "system".to_string(),
                    Role::User => "user".to_string(),
                    Role::Ai => "ai".to_string(),
                },
                parts: vec![Part {
                    text: turn.text.clone(),
                }],
            })
            .collect(),
    }
}

/// Extract `candidates[0].content.parts[0].text` from a response body.
pub(crate) fn parse_generate_response(json_text: &str) -> Result<String, GenerationError> {
    let root: Value = serde_json::from_str(json_text)
        .map_err(|e| GenerationError::Structural(format!("response is not JSON: {e}")))?;

    let text = root
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|arr| arr.first())
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(Value::as_array)
        .and_then(|arr| arr.first())
        .and_then(|p| p.get("text"))
        .and_then(Value::as_str)
        .ok_or_else(|| {
            GenerationError::Structural(
                "missing candidates[0].content.parts[0].text".to_string(),
            )
        })?;

    if text.trim().is_empty() {
        return Err(GenerationError::Structural("empty response text".to_string()));
    }

    Ok(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_response() {
        let json = serde_json::json!({
            "candidates": [{
                "content": { "parts": [{ "text": "Hello there" }] }
            }]
        })
        .to_string();
        assert_eq!(parse_generate_response(&json).unwrap(), "Hello there");
    }

    #[test]
    fn parse_missing_candidates_is_structural() {
        let json = serde_json::json!({ "error": { "code": 400 } }).to_string();
        assert!(matches!(
            parse_generate_response(&json),
            Err(GenerationError::Structural(_))
        ));
    }

    #[test]
    fn parse_empty_candidates_is_structural() {
        let json = serde_json::json!({ "candidates": [] }).to_string();
        assert!(matches!(
            parse_generate_response(&json),
            Err(GenerationError::Structural(_))
        ));
    }

    #[test]
    fn parse_blank_text_is_structural() {
        let json = serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": "   " }] } }]
        })
        .to_string();
        assert!(matches!(
            parse_generate_response(&json),
            Err(GenerationError::Structural(_))
        ));
    }

    #[test]
    fn request_body_shape() {
        let history = vec![
            GenerationTurn::new(Role::System, "style"),
            GenerationTurn::new(Role::User, "hi"),
            GenerationTurn::new(Role::Ai, "hello"),
        ];
        let body = serde_json::to_value(build_generate_request(&history)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "contents": [
                    { "role": "system", "parts": [{ "text": "style" }] },
                    { "role": "user", "parts": [{ "text": "hi" }] },
                    { "role": "ai", "parts": [{ "text": "hello" }] },
                ]
            })
        );
    }

    #[test]
    fn model_allow_list() {
        assert!(is_supported_model(DEFAULT_MODEL));
        assert!(!is_supported_model("made-up-model"));
    }
}
