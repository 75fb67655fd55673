//! DataForSEO API client
//!
//! Thin client over the DataForSEO v3 REST API. Requests are posted as
//! single-task arrays; responses come back wrapped in a task envelope that
//! this module unwraps before handing results to the domain services.
//!
//! Covered endpoints: keyword metrics (DataForSEO Labs), live organic SERPs,
//! and the three live backlinks endpoints used by the pass-through handlers.

use data_encoding::BASE64;
use serde_json::{json, Value};
use std::time::Duration;

/// Task status code DataForSEO uses for success
const TASK_OK: i64 = 20000;

/// Request timeout for provider calls
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Errors from external provider APIs
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Transport-level failure (connect, timeout, TLS)
    #[error("Provider request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider rejected the call
    #[error("Provider error: {0}")]
    Api(String),

    /// The response did not match the documented shape
    #[error("Unexpected provider response: {0}")]
    Malformed(String),
}

/// A single organic SERP result
#[derive(Debug, Clone)]
pub struct SerpItem {
    pub position: i64,
    pub url: String,
    pub title: Option<String>,
    pub domain: Option<String>,
}

/// Metrics for one keyword from the bulk difficulty endpoint
#[derive(Debug, Clone)]
pub struct KeywordMetricsItem {
    pub keyword: String,
    pub search_volume: Option<i64>,
    pub keyword_difficulty: Option<f64>,
    pub cpc: Option<f64>,
    pub competition: Option<f64>,
}

/// DataForSEO HTTP client bound to one user's credentials
pub struct DataForSeoClient {
    http: reqwest::Client,
    base_url: String,
    auth_header: String,
}

impl DataForSeoClient {
    /// Create a client for the given account
    pub fn new(base_url: &str, login: &str, password: &str) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        let credentials = format!("{}:{}", login, password);
        let auth_header = format!("Basic {}", BASE64.encode(credentials.as_bytes()));

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_header,
        })
    }

    /// Verify credentials with a free endpoint
    pub async fn verify(&self) -> Result<(), ProviderError> {
        let url = format!("{}/dataforseo_labs/google/available_filters", self.base_url);
        let response = self
            .http
            .get(&url)
            .header("Authorization", &self.auth_header)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ProviderError::Api("Invalid DataForSEO credentials".to_string()));
        }

        let body: Value = response.json().await?;
        match body.get("status_code").and_then(Value::as_i64) {
            Some(TASK_OK) => Ok(()),
            Some(code) => Err(ProviderError::Api(format!(
                "DataForSEO rejected credentials (status {})",
                code
            ))),
            None => Err(ProviderError::Malformed(
                "Missing status_code in response".to_string(),
            )),
        }
    }

    /// Fetch metrics for up to 1000 keywords in one call
    pub async fn keyword_metrics(
        &self,
        keywords: &[String],
        location_code: i64,
        language_code: &str,
    ) -> Result<Vec<KeywordMetricsItem>, ProviderError> {
        let task = json!({
            "keywords": keywords,
            "location_code": location_code,
            "language_code": language_code,
        });

        let result = self
            .post_task("dataforseo_labs/google/bulk_keyword_difficulty/live", task)
            .await?;

        parse_metric_items(&result)
    }

    /// Fetch live organic SERP results for one keyword
    pub async fn serp_organic(
        &self,
        keyword: &str,
        location_code: i64,
        language_code: &str,
        depth: u32,
    ) -> Result<Vec<SerpItem>, ProviderError> {
        let task = json!({
            "keyword": keyword,
            "location_code": location_code,
            "language_code": language_code,
            "depth": depth,
        });

        let result = self.post_task("serp/google/organic/live/advanced", task).await?;

        parse_serp_items(&result)
    }

    /// Backlinks profile summary for a target domain
    pub async fn backlinks_summary(&self, target: &str) -> Result<Value, ProviderError> {
        self.post_task("backlinks/summary/live", json!({ "target": target })).await
    }

    /// Paged list of individual backlinks for a target domain
    pub async fn backlinks_list(
        &self,
        target: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Value, ProviderError> {
        self.post_task(
            "backlinks/backlinks/live",
            json!({ "target": target, "limit": limit, "offset": offset, "mode": "as_is" }),
        )
        .await
    }

    /// Paged list of referring domains for a target domain
    pub async fn referring_domains(
        &self,
        target: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Value, ProviderError> {
        self.post_task(
            "backlinks/referring_domains/live",
            json!({ "target": target, "limit": limit, "offset": offset }),
        )
        .await
    }

    /// POST a single task and unwrap its first result object
    async fn post_task(&self, endpoint: &str, task: Value) -> Result<Value, ProviderError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let response = self
            .http
            .post(&url)
            .header("Authorization", &self.auth_header)
            .json(&json!([task]))
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ProviderError::Api("Invalid DataForSEO credentials".to_string()));
        }

        let body: Value = response.json().await?;
        unwrap_task_result(&body)
    }
}

/// Unwrap `tasks[0].result[0]` from the DataForSEO response envelope
fn unwrap_task_result(body: &Value) -> Result<Value, ProviderError> {
    let task = body
        .get("tasks")
        .and_then(Value::as_array)
        .and_then(|tasks| tasks.first())
        .ok_or_else(|| ProviderError::Malformed("Response has no tasks".to_string()))?;

    let status_code = task
        .get("status_code")
        .and_then(Value::as_i64)
        .ok_or_else(|| ProviderError::Malformed("Task has no status_code".to_string()))?;

    if status_code != TASK_OK {
        let message = task
            .get("status_message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        return Err(ProviderError::Api(format!(
            "Task failed with status {}: {}",
            status_code, message
        )));
    }

    let result = task
        .get("result")
        .and_then(Value::as_array)
        .and_then(|results| results.first())
        .cloned()
        .ok_or_else(|| ProviderError::Malformed("Task has no result".to_string()))?;

    Ok(result)
}

/// Extract organic entries from a SERP result object
fn parse_serp_items(result: &Value) -> Result<Vec<SerpItem>, ProviderError> {
    let items = match result.get("items").and_then(Value::as_array) {
        Some(items) => items,
        None => return Ok(Vec::new()),
    };

    let mut parsed = Vec::new();
    for item in items {
        if item.get("type").and_then(Value::as_str) != Some("organic") {
            continue;
        }

        let url = match item.get("url").and_then(Value::as_str) {
            Some(url) => url.to_string(),
            None => continue,
        };

        let position = item
            .get("rank_absolute")
            .or_else(|| item.get("rank_group"))
            .and_then(Value::as_i64)
            .unwrap_or((parsed.len() + 1) as i64);

        parsed.push(SerpItem {
            position,
            url,
            title: item.get("title").and_then(Value::as_str).map(String::from),
            domain: item.get("domain").and_then(Value::as_str).map(String::from),
        });
    }

    Ok(parsed)
}

/// Extract keyword metric rows from a bulk difficulty result object
fn parse_metric_items(result: &Value) -> Result<Vec<KeywordMetricsItem>, ProviderError> {
    let items = match result.get("items").and_then(Value::as_array) {
        Some(items) => items,
        None => return Ok(Vec::new()),
    };

    let mut parsed = Vec::new();
    for item in items {
        let keyword = match item.get("keyword").and_then(Value::as_str) {
            Some(keyword) => keyword.to_string(),
            None => continue,
        };

        let info = item.get("keyword_info");
        parsed.push(KeywordMetricsItem {
            keyword,
            search_volume: info
                .and_then(|i| i.get("search_volume"))
                .and_then(Value::as_i64),
            keyword_difficulty: item
                .get("keyword_difficulty")
                .and_then(Value::as_f64),
            cpc: info.and_then(|i| i.get("cpc")).and_then(Value::as_f64),
            competition: info
                .and_then(|i| i.get("competition"))
                .and_then(Value::as_f64),
        });
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unwrap_task_result_success() {
        let body = json!({
            "tasks": [{
                "status_code": 20000,
                "result": [{ "items": [] }]
            }]
        });

        let result = unwrap_task_result(&body).expect("should unwrap");
        assert!(result.get("items").is_some());
    }

    #[test]
    fn test_unwrap_task_result_error_status() {
        let body = json!({
            "tasks": [{
                "status_code": 40101,
                "status_message": "Auth error"
            }]
        });

        let err = unwrap_task_result(&body).unwrap_err();
        assert!(matches!(err, ProviderError::Api(_)));
        assert!(err.to_string().contains("40101"));
    }

    #[test]
    fn test_unwrap_task_result_missing_tasks() {
        let err = unwrap_task_result(&json!({})).unwrap_err();
        assert!(matches!(err, ProviderError::Malformed(_)));
    }

    #[test]
    fn test_parse_serp_items_skips_non_organic() {
        let result = json!({
            "items": [
                { "type": "paid", "rank_absolute": 1, "url": "https://ads.example.com" },
                {
                    "type": "organic",
                    "rank_absolute": 3,
                    "url": "https://example.com/page",
                    "title": "Example",
                    "domain": "example.com"
                },
                { "type": "organic", "rank_absolute": 4 }
            ]
        });

        let items = parse_serp_items(&result).expect("should parse");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].position, 3);
        assert_eq!(items[0].url, "https://example.com/page");
        assert_eq!(items[0].domain.as_deref(), Some("example.com"));
    }

    #[test]
    fn test_parse_serp_items_empty_result() {
        let items = parse_serp_items(&json!({})).expect("should parse");
        assert!(items.is_empty());
    }

    #[test]
    fn test_parse_metric_items() {
        let result = json!({
            "items": [
                {
                    "keyword": "seo tools",
                    "keyword_difficulty": 62.0,
                    "keyword_info": {
                        "search_volume": 8100,
                        "cpc": 4.5,
                        "competition": 0.78
                    }
                },
                { "keyword": "thin keyword" }
            ]
        });

        let items = parse_metric_items(&result).expect("should parse");
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].keyword, "seo tools");
        assert_eq!(items[0].search_volume, Some(8100));
        assert_eq!(items[0].keyword_difficulty, Some(62.0));
        assert_eq!(items[1].search_volume, None);
    }

    #[test]
    fn test_client_normalizes_base_url() {
        let client =
            DataForSeoClient::new("https://api.dataforseo.com/v3/", "login", "password")
                .expect("client should build");
        assert_eq!(client.base_url, "https://api.dataforseo.com/v3");
        assert!(client.auth_header.starts_with("Basic "));
    }
}
