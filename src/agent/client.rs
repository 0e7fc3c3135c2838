//! Client for the external evaluator (OpenAI-compatible chat completions).
//!
//! The client makes exactly one request per call, bounded by the configured
//! timeout. Retrying is left to the caller.

use crate::agent::prompt::EVALUATOR_SYSTEM_PROMPT;
use crate::error::UpstreamError;
use crate::models::EvaluationDraft;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

/// Configuration for the evaluator client.
#[derive(Debug, Clone)]
pub struct EvaluatorConfig {
    pub api_url: String,
    pub model_name: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_seconds: u64,
    pub api_key: Option<String>,
    /// Environment variable the key is read from, named in error messages.
    pub api_key_env: String,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.groq.com/openai/v1/chat/completions".to_string(),
            model_name: "llama3-70b-8192".to_string(),
            temperature: 0.7,
            max_tokens: 2048,
            timeout_seconds: 120,
            api_key: None,
            api_key_env: "GROQ_API_KEY".to_string(),
        }
    }
}

/// Message in a chat completion request.
#[derive(Debug, Clone, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

/// Chat completion request body.
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Value,
}

/// The evaluator client.
pub struct EvaluatorClient {
    config: EvaluatorConfig,
    http_client: reqwest::Client,
}

impl EvaluatorClient {
    /// Create a new client.
    pub fn new(config: EvaluatorConfig) -> Result<Self, UpstreamError> {
        info!(
            "Initializing evaluator client with model {} at {}",
            config.model_name, config.api_url
        );

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| UpstreamError::Connectivity(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    /// Request an evaluation for an assembled prompt.
    pub async fn evaluate(&self, prompt: &str) -> Result<EvaluationDraft, UpstreamError> {
        let request = ChatRequest {
            model: self.config.model_name.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: EVALUATOR_SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: prompt.to_string(),
                },
            ],
            temperature: Some(self.config.temperature),
            max_tokens: Some(self.config.max_tokens),
            response_format: Some(ResponseFormat {
                format_type: "json_object",
            }),
        };

        let body = self.send(&request).await?;
        let content = parse_completion(&body)?;
        debug!("Evaluator content: {} bytes", content.len());
        parse_draft(&content)
    }

    /// Send a minimal request to confirm the API is reachable and the key works.
    pub async fn check_connection(&self) -> Result<(), UpstreamError> {
        let request = ChatRequest {
            model: self.config.model_name.clone(),
            messages: vec![ChatMessage {
                role: "user",
                content: "Hello".to_string(),
            }],
            temperature: None,
            max_tokens: Some(8),
            response_format: None,
        };

        self.send(&request).await.map(|_| ())
    }

    async fn send(&self, request: &ChatRequest) -> Result<String, UpstreamError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| UpstreamError::MissingApiKey(self.config.api_key_env.clone()))?;

        debug!(
            "Sending chat request with {} messages",
            request.messages.len()
        );

        let response = self
            .http_client
            .post(&self.config.api_url)
            .bearer_auth(api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    UpstreamError::Connectivity(format!(
                        "request timed out after {}s",
                        self.config.timeout_seconds
                    ))
                } else if e.is_connect() {
                    UpstreamError::Connectivity(format!(
                        "cannot connect to {}",
                        self.config.api_url
                    ))
                } else {
                    UpstreamError::Connectivity(e.to_string())
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| UpstreamError::MalformedResponse(format!("unreadable body: {e}")))?;

        if !status.is_success() {
            return Err(classify_status(status.as_u16(), body));
        }

        Ok(body)
    }
}

/// Map a non-success HTTP status to an error kind.
pub fn classify_status(status: u16, body: String) -> UpstreamError {
    match status {
        401 | 403 => UpstreamError::Authentication,
        429 => UpstreamError::RateLimited,
        _ => UpstreamError::Service { status, body },
    }
}

/// Extract `choices[0].message.content` from a completion body.
pub fn parse_completion(body: &str) -> Result<String, UpstreamError> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| UpstreamError::MalformedResponse(format!("invalid completion JSON: {e}")))?;

    let message = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .ok_or_else(|| UpstreamError::MalformedResponse("no choices in response".to_string()))?;

    match message.content {
        Value::String(s) => Ok(s),
        object @ Value::Object(_) => Ok(object.to_string()),
        _ => Err(UpstreamError::MalformedResponse(
            "message has no content".to_string(),
        )),
    }
}

/// Decode the evaluator's JSON object, tolerating a Markdown code fence.
pub fn parse_draft(content: &str) -> Result<EvaluationDraft, UpstreamError> {
    let trimmed = strip_code_fence(content.trim());

    serde_json::from_str(trimmed)
        .map_err(|e| UpstreamError::MalformedResponse(format!("invalid evaluation JSON: {e}")))
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluator_config_default() {
        let config = EvaluatorConfig::default();
        assert_eq!(config.model_name, "llama3-70b-8192");
        assert_eq!(config.max_tokens, 2048);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_classify_status() {
        assert!(matches!(
            classify_status(401, String::new()),
            UpstreamError::Authentication
        ));
        assert!(matches!(
            classify_status(403, String::new()),
            UpstreamError::Authentication
        ));
        assert!(matches!(
            classify_status(429, String::new()),
            UpstreamError::RateLimited
        ));
        assert!(matches!(
            classify_status(500, "boom".to_string()),
            UpstreamError::Service { status: 500, .. }
        ));
    }

    #[test]
    fn test_parse_completion_string_content() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"{\"summary\":\"ok\"}"}}]}"#;
        let content = parse_completion(body).unwrap();
        let draft = parse_draft(&content).unwrap();
        assert_eq!(draft.summary.as_deref(), Some("ok"));
    }

    #[test]
    fn test_parse_completion_object_content() {
        let body = r#"{"choices":[{"message":{"content":{"projectName":"P"}}}]}"#;
        let draft = parse_draft(&parse_completion(body).unwrap()).unwrap();
        assert_eq!(draft.project_name.as_deref(), Some("P"));
    }

    #[test]
    fn test_parse_completion_without_choices_is_malformed() {
        let err = parse_completion(r#"{"choices":[]}"#).unwrap_err();
        assert!(matches!(err, UpstreamError::MalformedResponse(_)));

        let err = parse_completion("not json").unwrap_err();
        assert_eq!(err.kind(), "malformed-response");
    }

    #[test]
    fn test_parse_draft_strips_code_fence() {
        let content = "```json\n{\"grantName\": \"G\"}\n```";
        let draft = parse_draft(content).unwrap();
        assert_eq!(draft.grant_name.as_deref(), Some("G"));
    }

    #[test]
    fn test_parse_draft_rejects_prose() {
        let err = parse_draft("Here is my evaluation!").unwrap_err();
        assert!(matches!(err, UpstreamError::MalformedResponse(_)));
    }

    #[test]
    fn test_missing_api_key_fails_before_sending() {
        let client = EvaluatorClient::new(EvaluatorConfig::default()).unwrap();
        let err = tokio_test::block_on(client.evaluate("prompt")).unwrap_err();
        assert!(matches!(err, UpstreamError::MissingApiKey(_)));
    }

    #[test]
    fn test_unreachable_endpoint_is_connectivity_error() {
        let config = EvaluatorConfig {
            api_url: "http://127.0.0.1:1/v1/chat/completions".to_string(),
            api_key: Some("test-key".to_string()),
            timeout_seconds: 5,
            ..EvaluatorConfig::default()
        };
        let client = EvaluatorClient::new(config).unwrap();
        let err = tokio_test::block_on(client.check_connection()).unwrap_err();
        assert_eq!(err.kind(), "connectivity");
    }
}
