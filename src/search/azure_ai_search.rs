//! Azure AI Search adapter
//!
//! Hybrid keyword + vector query against an enterprise index, with optional
//! semantic ranking. Captions are preferred as the snippet; otherwise the
//! first three text items are joined.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use super::{
    SearchOptions, SearchProvider, SearchResult, http_error, option_str, option_usize,
    request_error,
};
use crate::types::{ErrorCategory, ReportError, Result};

const API_VERSION: &str = "2023-10-01-Preview";
const DEFAULT_INDEX: &str = "default";
const DEFAULT_TOP_K: usize = 5;
const DEFAULT_VECTOR_FIELDS: &str = "embedding";
const SELECT_FIELDS: &str = "metadata_spo_item_name,metadata_spo_item_path,textItems";
const SNIPPET_ITEMS: usize = 3;

pub struct AzureAiSearchProvider {
    api_key: SecretString,
    service: Option<String>,
    index: Option<String>,
    client: reqwest::Client,
}

impl std::fmt::Debug for AzureAiSearchProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureAiSearchProvider")
            .field("api_key", &"[REDACTED]")
            .field("service", &self.service)
            .field("index", &self.index)
            .finish()
    }
}

impl AzureAiSearchProvider {
    /// Reads `AZURE_SEARCH_KEY`, and `AZURE_SEARCH_SERVICE` / `AZURE_SEARCH_INDEX`
    /// as fallbacks for the per-request option bag.
    pub fn new(timeout_secs: u64) -> Result<Self> {
        let api_key = std::env::var("AZURE_SEARCH_KEY").map_err(|_| {
            ReportError::Config(
                "Azure AI Search key not found. Set AZURE_SEARCH_KEY env var".to_string(),
            )
        })?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ReportError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key: SecretString::from(api_key),
            service: std::env::var("AZURE_SEARCH_SERVICE").ok().filter(|s| !s.is_empty()),
            index: std::env::var("AZURE_SEARCH_INDEX").ok().filter(|s| !s.is_empty()),
            client,
        })
    }

    fn search_url(&self, options: &SearchOptions) -> Result<String> {
        let service = option_str(options, "service_name")
            .or(self.service.as_deref())
            .ok_or_else(|| {
                ReportError::search(
                    ErrorCategory::BadRequest,
                    "no search service configured (service_name or AZURE_SEARCH_SERVICE)",
                    "azure_ai_search",
                )
            })?;
        let index = option_str(options, "index_name")
            .or(self.index.as_deref())
            .unwrap_or(DEFAULT_INDEX);

        Ok(format!(
            "https://{}.search.windows.net/indexes/{}/docs/search?api-version={}",
            service, index, API_VERSION
        ))
    }

    fn build_request<'a>(&self, query: &'a str, options: &'a SearchOptions) -> AzureSearchRequest<'a> {
        let top = option_usize(options, "top_k").unwrap_or(DEFAULT_TOP_K);
        let vector_fields = option_str(options, "vector_fields").unwrap_or(DEFAULT_VECTOR_FIELDS);
        let semantic = option_str(options, "semantic_configuration");

        AzureSearchRequest {
            search: query,
            top,
            select: SELECT_FIELDS,
            vector_queries: vec![VectorQuery {
                kind: "text",
                text: query,
                k: top,
                fields: vector_fields,
            }],
            query_type: semantic.map(|_| "semantic"),
            semantic_configuration: semantic,
            answers: semantic.map(|_| "extractive"),
            captions: semantic.map(|_| "extractive"),
        }
    }
}

#[async_trait]
impl SearchProvider for AzureAiSearchProvider {
    async fn search(&self, query: &str, options: &SearchOptions) -> Result<Vec<SearchResult>> {
        let url = self.search_url(options)?;
        debug!("Azure AI Search: {}", query);

        let response = self
            .client
            .post(&url)
            .header("api-key", self.api_key.expose_secret())
            .json(&self.build_request(query, options))
            .send()
            .await
            .map_err(|e| request_error(e, "azure_ai_search"))?;

        if !response.status().is_success() {
            return Err(http_error(response, "azure_ai_search").await);
        }

        let body: AzureSearchResponse = response
            .json()
            .await
            .map_err(|e| request_error(e, "azure_ai_search"))?;

        let results: Vec<SearchResult> = body
            .value
            .into_iter()
            .enumerate()
            .map(|(position, doc)| doc.into_result(query, position))
            .collect();
        info!("Azure AI Search returned {} documents", results.len());
        Ok(results)
    }

    fn name(&self) -> &str {
        "azure_ai_search"
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AzureSearchRequest<'a> {
    search: &'a str,
    top: usize,
    select: &'a str,
    vector_queries: Vec<VectorQuery<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    query_type: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    semantic_configuration: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    answers: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    captions: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct VectorQuery<'a> {
    kind: &'a str,
    text: &'a str,
    k: usize,
    fields: &'a str,
}

#[derive(Debug, Deserialize)]
struct AzureSearchResponse {
    #[serde(default)]
    value: Vec<AzureDocument>,
}

#[derive(Debug, Deserialize)]
struct AzureDocument {
    #[serde(rename = "@search.score", default)]
    score: f64,
    #[serde(rename = "@search.captions", default)]
    captions: Option<Vec<Caption>>,
    #[serde(default)]
    metadata_spo_item_name: Option<String>,
    #[serde(default)]
    metadata_spo_item_path: Option<String>,
    #[serde(rename = "textItems", default)]
    text_items: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct Caption {
    #[serde(default)]
    text: Option<String>,
}

impl AzureDocument {
    /// Documents without a path or name are keyed by query and rank
    fn into_result(self, query: &str, position: usize) -> SearchResult {
        let items: Vec<&str> = self.text_items.iter().filter_map(Value::as_str).collect();
        let caption = self
            .captions
            .as_ref()
            .and_then(|c| c.first())
            .and_then(|c| c.text.clone())
            .filter(|t| !t.is_empty());
        let content =
            caption.unwrap_or_else(|| items.iter().take(SNIPPET_ITEMS).copied().collect::<Vec<_>>().join(" "));
        let raw = items.join(" ");
        let title = self.metadata_spo_item_name.unwrap_or_default();
        let source_id = self
            .metadata_spo_item_path
            .filter(|p| !p.is_empty())
            .or_else(|| (!title.is_empty()).then(|| title.clone()))
            .unwrap_or_else(|| format!("azure:{}#{}", query, position));

        SearchResult {
            source_id,
            title,
            content,
            raw_content: (!raw.is_empty()).then_some(raw),
            score: self.score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::SourceSet;
    use crate::types::ErrorKind;
    use serde_json::json;

    fn provider(service: Option<&str>) -> AzureAiSearchProvider {
        AzureAiSearchProvider {
            api_key: SecretString::from("k".to_string()),
            service: service.map(String::from),
            index: None,
            client: reqwest::Client::new(),
        }
    }

    #[test]
    fn test_caption_preferred_over_text_items() {
        let raw = json!({
            "value": [
                {"@search.score": 2.5,
                 "@search.captions": [{"text": "caption text"}],
                 "metadata_spo_item_name": "Policy.docx",
                 "metadata_spo_item_path": "https://sp/Policy.docx",
                 "textItems": ["one", "two", "three", "four"]},
                {"metadata_spo_item_name": "Memo", "textItems": ["a", "b", "c", "d"]}
            ]
        });
        let body: AzureSearchResponse = serde_json::from_value(raw).unwrap();
        let results: Vec<SearchResult> = body
            .value
            .into_iter()
            .enumerate()
            .map(|(i, doc)| doc.into_result("policy", i))
            .collect();

        assert_eq!(results[0].content, "caption text");
        assert_eq!(results[0].raw_content.as_deref(), Some("one two three four"));
        assert_eq!(results[0].source_id, "https://sp/Policy.docx");
        assert_eq!(results[1].content, "a b c");
        assert_eq!(results[1].source_id, "Memo");
        assert_eq!(results[1].score, 0.0);
    }

    #[test]
    fn test_unnamed_documents_stay_distinct() {
        let raw = json!({
            "value": [
                {"textItems": ["first"]},
                {"metadata_spo_item_name": "", "textItems": ["second"]}
            ]
        });
        let body: AzureSearchResponse = serde_json::from_value(raw).unwrap();
        let results: Vec<SearchResult> = body
            .value
            .into_iter()
            .enumerate()
            .map(|(i, doc)| doc.into_result("leave policy", i))
            .collect();

        assert_eq!(results[0].source_id, "azure:leave policy#0");
        assert_eq!(results[1].source_id, "azure:leave policy#1");

        let mut sources = SourceSet::new();
        assert_eq!(sources.extend(results), 2);
    }

    #[test]
    fn test_semantic_fields_only_when_configured() {
        let p = provider(Some("svc"));
        let plain = serde_json::to_value(p.build_request("q", &SearchOptions::new())).unwrap();
        assert!(plain.get("queryType").is_none());
        assert_eq!(plain["vectorQueries"][0]["fields"], "embedding");
        assert_eq!(plain["top"], 5);

        let options = json!({"semantic_configuration": "sem", "top_k": 2});
        let options = options.as_object().unwrap().clone();
        let semantic = serde_json::to_value(p.build_request("q", &options)).unwrap();
        assert_eq!(semantic["queryType"], "semantic");
        assert_eq!(semantic["semanticConfiguration"], "sem");
        assert_eq!(semantic["captions"], "extractive");
        assert_eq!(semantic["vectorQueries"][0]["k"], 2);
    }

    #[test]
    fn test_missing_service_is_rejected() {
        let err = provider(None).search_url(&SearchOptions::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProviderRejected);

        let url = provider(Some("svc")).search_url(&SearchOptions::new()).unwrap();
        assert!(url.starts_with("https://svc.search.windows.net/indexes/default/docs/search"));
    }
}
