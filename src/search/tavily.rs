//! Tavily web search adapter

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    SearchOptions, SearchProvider, SearchResult, http_error, option_str, option_strings,
    option_usize, request_error,
};
use crate::constants::search::DEFAULT_RESULTS_PER_QUERY;
use crate::types::{ReportError, Result};

const API_URL: &str = "https://api.tavily.com/search";

pub struct TavilyProvider {
    api_key: SecretString,
    client: reqwest::Client,
}

impl std::fmt::Debug for TavilyProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TavilyProvider")
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl TavilyProvider {
    pub fn new(timeout_secs: u64) -> Result<Self> {
        let api_key = std::env::var("TAVILY_API_KEY").map_err(|_| {
            ReportError::Config("Tavily API key not found. Set TAVILY_API_KEY env var".to_string())
        })?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ReportError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key: SecretString::from(api_key),
            client,
        })
    }

    fn build_request<'a>(&self, query: &'a str, options: &'a SearchOptions) -> TavilyRequest<'a> {
        TavilyRequest {
            query,
            max_results: option_usize(options, "max_results").unwrap_or(DEFAULT_RESULTS_PER_QUERY),
            search_depth: option_str(options, "search_depth").unwrap_or("basic"),
            topic: option_str(options, "topic").unwrap_or("general"),
            days: option_usize(options, "days"),
            include_domains: option_strings(options, "include_domains"),
            exclude_domains: option_strings(options, "exclude_domains"),
            include_raw_content: true,
        }
    }
}

#[async_trait]
impl SearchProvider for TavilyProvider {
    async fn search(&self, query: &str, options: &SearchOptions) -> Result<Vec<SearchResult>> {
        debug!("Tavily search: {}", query);

        let response = self
            .client
            .post(API_URL)
            .bearer_auth(self.api_key.expose_secret())
            .json(&self.build_request(query, options))
            .send()
            .await
            .map_err(|e| request_error(e, "tavily"))?;

        if !response.status().is_success() {
            return Err(http_error(response, "tavily").await);
        }

        let body: TavilyResponse = response
            .json()
            .await
            .map_err(|e| request_error(e, "tavily"))?;

        Ok(body.results.into_iter().map(SearchResult::from).collect())
    }

    fn name(&self) -> &str {
        "tavily"
    }
}

#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    query: &'a str,
    max_results: usize,
    search_depth: &'a str,
    topic: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    days: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    include_domains: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    exclude_domains: Option<Vec<String>>,
    include_raw_content: bool,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: String,
    url: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    raw_content: Option<String>,
    #[serde(default)]
    score: f64,
}

impl From<TavilyResult> for SearchResult {
    fn from(r: TavilyResult) -> Self {
        SearchResult {
            source_id: r.url,
            title: r.title,
            content: r.content,
            raw_content: r.raw_content.filter(|s| !s.is_empty()),
            score: r.score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_tavily_response() {
        let raw = json!({
            "query": "rust async",
            "results": [
                {"title": "Tokio", "url": "https://tokio.rs", "content": "runtime", "score": 0.9},
                {"title": "Docs", "url": "https://docs.rs", "content": "docs", "raw_content": "", "score": 0.5}
            ]
        });
        let body: TavilyResponse = serde_json::from_value(raw).unwrap();
        let results: Vec<SearchResult> = body.results.into_iter().map(SearchResult::from).collect();
        assert_eq!(results[0].source_id, "https://tokio.rs");
        assert!(results[1].raw_content.is_none());
    }

    #[test]
    fn test_request_uses_options() {
        let provider = TavilyProvider {
            api_key: SecretString::from("k".to_string()),
            client: reqwest::Client::new(),
        };
        let options = json!({"max_results": 3, "topic": "news", "include_domains": ["a.com"]});
        let options = options.as_object().unwrap().clone();
        let request = serde_json::to_value(provider.build_request("q", &options)).unwrap();
        assert_eq!(request["max_results"], 3);
        assert_eq!(request["topic"], "news");
        assert_eq!(request["search_depth"], "basic");
        assert_eq!(request["include_domains"][0], "a.com");
        assert!(request.get("days").is_none());
    }
}
