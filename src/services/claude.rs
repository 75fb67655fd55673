//! Anthropic Claude API client
//!
//! Wraps the Messages API for the assistant features. Responses carry token
//! usage counts which feed the per-user cost log.

use crate::services::dataforseo::ProviderError;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// API version header required by the Messages API
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Request timeout for assistant calls
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Cost per million input tokens in USD
const INPUT_COST_PER_MTOK: f64 = 3.0;

/// Cost per million output tokens in USD
const OUTPUT_COST_PER_MTOK: f64 = 15.0;

/// A single message in a conversation turn
#[derive(Debug, Clone, Serialize)]
pub struct ClaudeMessage {
    pub role: String,
    pub content: String,
}

impl ClaudeMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Completion result with token usage
#[derive(Debug, Clone)]
pub struct ClaudeResponse {
    pub text: String,
    pub input_tokens: i64,
    pub output_tokens: i64,
}

impl ClaudeResponse {
    /// Estimated cost of this completion in USD
    pub fn estimated_cost(&self) -> f64 {
        estimate_cost(self.input_tokens, self.output_tokens)
    }
}

/// Estimate the cost of a completion from its token counts
pub fn estimate_cost(input_tokens: i64, output_tokens: i64) -> f64 {
    (input_tokens as f64 * INPUT_COST_PER_MTOK + output_tokens as f64 * OUTPUT_COST_PER_MTOK)
        / 1_000_000.0
}

/// Anthropic HTTP client bound to one user's API key
pub struct ClaudeClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl ClaudeClient {
    /// Create a client for the given API key and model
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }

    /// Verify the API key with a minimal completion
    pub async fn verify(&self) -> Result<(), ProviderError> {
        self.complete(None, &[ClaudeMessage::user("ping")], 1).await?;
        Ok(())
    }

    /// Run a completion over the given messages
    pub async fn complete(
        &self,
        system: Option<&str>,
        messages: &[ClaudeMessage],
        max_tokens: u32,
    ) -> Result<ClaudeResponse, ProviderError> {
        let url = format!("{}/messages", self.base_url);

        let mut body = serde_json::json!({
            "model": self.model,
            "max_tokens": max_tokens,
            "temperature": 0.7,
            "messages": messages,
        });
        if let Some(system) = system {
            body["system"] = Value::String(system.to_string());
        }

        let response = self
            .http
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let body: Value = response.json().await?;

        if !status.is_success() {
            let message = body
                .get("error")
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            return Err(ProviderError::Api(format!(
                "Anthropic API returned {}: {}",
                status, message
            )));
        }

        parse_completion(&body)
    }
}

/// Extract the text and usage counts from a Messages API response
fn parse_completion(body: &Value) -> Result<ClaudeResponse, ProviderError> {
    let text = body
        .get("content")
        .and_then(Value::as_array)
        .map(|blocks| {
            blocks
                .iter()
                .filter(|b| b.get("type").and_then(Value::as_str) == Some("text"))
                .filter_map(|b| b.get("text").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join("")
        })
        .ok_or_else(|| ProviderError::Malformed("Response has no content blocks".to_string()))?;

    let usage = body.get("usage");
    let input_tokens = usage
        .and_then(|u| u.get("input_tokens"))
        .and_then(Value::as_i64)
        .unwrap_or(0);
    let output_tokens = usage
        .and_then(|u| u.get("output_tokens"))
        .and_then(Value::as_i64)
        .unwrap_or(0);

    Ok(ClaudeResponse {
        text,
        input_tokens,
        output_tokens,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_completion() {
        let body = json!({
            "content": [
                { "type": "text", "text": "Hello " },
                { "type": "text", "text": "world" }
            ],
            "usage": { "input_tokens": 120, "output_tokens": 45 }
        });

        let response = parse_completion(&body).expect("should parse");
        assert_eq!(response.text, "Hello world");
        assert_eq!(response.input_tokens, 120);
        assert_eq!(response.output_tokens, 45);
    }

    #[test]
    fn test_parse_completion_missing_content() {
        let err = parse_completion(&json!({})).unwrap_err();
        assert!(matches!(err, ProviderError::Malformed(_)));
    }

    #[test]
    fn test_estimate_cost() {
        // 1M input at $3 + 1M output at $15
        let cost = estimate_cost(1_000_000, 1_000_000);
        assert!((cost - 18.0).abs() < f64::EPSILON);

        let small = estimate_cost(1000, 500);
        assert!((small - (0.003 + 0.0075)).abs() < 1e-9);
    }

    #[test]
    fn test_response_cost_helper() {
        let response = ClaudeResponse {
            text: String::new(),
            input_tokens: 2000,
            output_tokens: 1000,
        };
        assert!((response.estimated_cost() - 0.021).abs() < 1e-9);
    }
}
