//! Exa neural search adapter

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

const API_URL: &str = "https://api.exa.ai/search";
const DEFAULT_MAX_CHARACTERS: usize = 8000;
/// Snippet length cut from full text when Exa returns no highlights
const SNIPPET_CHARS: usize = 500;

pub struct ExaProvider {
    api_key: SecretString,
    client: reqwest::Client,
}

impl std::fmt::Debug for ExaProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExaProvider")
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl ExaProvider {
    pub fn new(timeout_secs: u64) -> Result<Self> {
        let api_key = std::env::var("EXA_API_KEY").map_err(|_| {
            ReportError::Config("Exa API key not found. Set EXA_API_KEY env var".to_string())
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

    fn build_request<'a>(&self, query: &'a str, options: &'a SearchOptions) -> ExaRequest<'a> {
        ExaRequest {
            query,
            num_results: option_usize(options, "num_results").unwrap_or(DEFAULT_RESULTS_PER_QUERY),
            search_type: option_str(options, "search_type").unwrap_or("auto"),
            include_domains: option_strings(options, "include_domains"),
            exclude_domains: option_strings(options, "exclude_domains"),
            contents: ExaContents {
                text: ExaText {
                    max_characters: option_usize(options, "max_characters")
                        .unwrap_or(DEFAULT_MAX_CHARACTERS),
                },
                highlights: true,
            },
        }
    }
}

#[async_trait]
impl SearchProvider for ExaProvider {
    async fn search(&self, query: &str, options: &SearchOptions) -> Result<Vec<SearchResult>> {
        debug!("Exa search: {}", query);

        let response = self
            .client
            .post(API_URL)
            .header("x-api-key", self.api_key.expose_secret())
            .json(&self.build_request(query, options))
            .send()
            .await
            .map_err(|e| request_error(e, "exa"))?;

        if !response.status().is_success() {
            return Err(http_error(response, "exa").await);
        }

        let body: ExaResponse = response
            .json()
            .await
            .map_err(|e| request_error(e, "exa"))?;

        Ok(body.results.into_iter().map(SearchResult::from).collect())
    }

    fn name(&self) -> &str {
        "exa"
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExaRequest<'a> {
    query: &'a str,
    num_results: usize,
    #[serde(rename = "type")]
    search_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    include_domains: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    exclude_domains: Option<Vec<String>>,
    contents: ExaContents,
}

#[derive(Debug, Serialize)]
struct ExaContents {
    text: ExaText,
    highlights: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExaText {
    max_characters: usize,
}

#[derive(Debug, Deserialize)]
struct ExaResponse {
    #[serde(default)]
    results: Vec<ExaResult>,
}

#[derive(Debug, Deserialize)]
struct ExaResult {
    #[serde(default)]
    id: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    highlights: Vec<String>,
    #[serde(default)]
    score: Option<f64>,
}

impl From<ExaResult> for SearchResult {
    fn from(r: ExaResult) -> Self {
        let content = if r.highlights.is_empty() {
            r.text
                .as_deref()
                .map(|t| t.chars().take(SNIPPET_CHARS).collect())
                .unwrap_or_default()
        } else {
            r.highlights.join(" ")
        };
        let source_id = if r.url.is_empty() { r.id } else { r.url };

        SearchResult {
            title: r.title.unwrap_or_else(|| source_id.clone()),
            source_id,
            content,
            raw_content: r.text.filter(|t| !t.is_empty()),
            score: r.score.unwrap_or(0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_exa_result_prefers_highlights() {
        let raw = json!({
            "results": [
                {"id": "abc", "url": "https://arxiv.org/abs/1", "title": "Paper",
                 "text": "full body", "highlights": ["key finding"], "score": 0.8},
                {"id": "def", "url": "", "text": "only text"}
            ]
        });
        let body: ExaResponse = serde_json::from_value(raw).unwrap();
        let results: Vec<SearchResult> = body.results.into_iter().map(SearchResult::from).collect();

        assert_eq!(results[0].content, "key finding");
        assert_eq!(results[0].raw_content.as_deref(), Some("full body"));
        assert_eq!(results[1].source_id, "def");
        assert_eq!(results[1].title, "def");
        assert_eq!(results[1].content, "only text");
    }

    #[test]
    fn test_request_shape() {
        let provider = ExaProvider {
            api_key: SecretString::from("k".to_string()),
            client: reqwest::Client::new(),
        };
        let options = SearchOptions::new();
        let request = serde_json::to_value(provider.build_request("q", &options)).unwrap();
        assert_eq!(request["numResults"], DEFAULT_RESULTS_PER_QUERY);
        assert_eq!(request["type"], "auto");
        assert_eq!(request["contents"]["text"]["maxCharacters"], DEFAULT_MAX_CHARACTERS);
    }
}
