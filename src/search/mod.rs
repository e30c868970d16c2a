//! Search Provider Abstraction
//!
//! Defines the SearchProvider trait and the closed set of backends selected
//! by string: `tavily` (web), `exa` (web/academic), `azure_ai_search`
//! (enterprise index). Each backend declares the option keys it accepts;
//! everything else in a request's option bag is dropped before dispatch.

mod azure_ai_search;
mod client;
mod exa;
mod sources;
mod tavily;

pub use azure_ai_search::AzureAiSearchProvider;
pub use client::SearchClient;
pub use exa::ExaProvider;
pub use sources::SourceSet;
pub use tavily::TavilyProvider;

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::types::{ReportError, Result};

/// Provider-specific option bag, already filtered to accepted keys
pub type SearchOptions = Map<String, Value>;

/// One retrieved source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Stable identity used for deduplication (URL or document path)
    pub source_id: String,
    pub title: String,
    /// Most relevant snippet
    pub content: String,
    /// Full text when the backend returns it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_content: Option<String>,
    pub score: f64,
}

/// Search backend adapter
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Run one query; results are ordered by backend relevance
    async fn search(&self, query: &str, options: &SearchOptions) -> Result<Vec<SearchResult>>;

    /// Provider name for logging
    fn name(&self) -> &str;
}

/// Shared search provider for concurrent workers
pub type SharedSearchProvider = Arc<dyn SearchProvider + Send + Sync>;

// =============================================================================
// Backend Selection
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchApi {
    Tavily,
    Exa,
    AzureAiSearch,
}

impl SearchApi {
    pub const ALL: [SearchApi; 3] = [SearchApi::Tavily, SearchApi::Exa, SearchApi::AzureAiSearch];

    pub fn as_str(&self) -> &'static str {
        match self {
            SearchApi::Tavily => "tavily",
            SearchApi::Exa => "exa",
            SearchApi::AzureAiSearch => "azure_ai_search",
        }
    }

    /// Option keys this backend understands
    pub fn accepted_params(&self) -> &'static [&'static str] {
        match self {
            SearchApi::Tavily => &[
                "max_results",
                "topic",
                "search_depth",
                "include_domains",
                "exclude_domains",
                "days",
            ],
            SearchApi::Exa => &[
                "num_results",
                "max_characters",
                "include_domains",
                "exclude_domains",
                "search_type",
            ],
            SearchApi::AzureAiSearch => &[
                "service_name",
                "index_name",
                "top_k",
                "vector_fields",
                "semantic_configuration",
            ],
        }
    }

    /// Keep only accepted keys; unknown keys are dropped with a debug log
    pub fn filter_options(&self, options: &Map<String, Value>) -> SearchOptions {
        let accepted = self.accepted_params();
        options
            .iter()
            .filter(|(key, _)| {
                let keep = accepted.contains(&key.as_str());
                if !keep {
                    debug!("Dropping search option '{}' not accepted by {}", key, self);
                }
                keep
            })
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

impl std::fmt::Display for SearchApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchApi {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "tavily" => Ok(SearchApi::Tavily),
            "exa" => Ok(SearchApi::Exa),
            "azure_ai_search" | "azure" => Ok(SearchApi::AzureAiSearch),
            _ => Err(ReportError::Config(format!(
                "Unknown search api: {}. Supported: tavily, exa, azure_ai_search",
                s
            ))),
        }
    }
}

/// Create a shared search provider for a backend
pub fn create_search_provider(api: SearchApi, timeout_secs: u64) -> Result<SharedSearchProvider> {
    match api {
        SearchApi::Tavily => Ok(Arc::new(TavilyProvider::new(timeout_secs)?)),
        SearchApi::Exa => Ok(Arc::new(ExaProvider::new(timeout_secs)?)),
        SearchApi::AzureAiSearch => Ok(Arc::new(AzureAiSearchProvider::new(timeout_secs)?)),
    }
}

// =============================================================================
// Option Access Helpers
// =============================================================================

pub(crate) fn option_str<'a>(options: &'a SearchOptions, key: &str) -> Option<&'a str> {
    options.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

pub(crate) fn option_usize(options: &SearchOptions, key: &str) -> Option<usize> {
    options.get(key).and_then(Value::as_u64).map(|n| n as usize)
}

pub(crate) fn option_strings(options: &SearchOptions, key: &str) -> Option<Vec<String>> {
    let values: Vec<String> = options
        .get(key)?
        .as_array()?
        .iter()
        .filter_map(|v| v.as_str().map(String::from))
        .collect();
    (!values.is_empty()).then_some(values)
}

/// Map a non-success HTTP response onto a search error
pub(crate) async fn http_error(response: reqwest::Response, provider: &str) -> ReportError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    ReportError::Search(crate::types::ErrorClassifier::classify_http_status(
        status.as_u16(),
        &format!("{} search error ({}): {}", provider, status, body),
        provider,
    ))
}

/// Map a transport failure onto a search error
pub(crate) fn request_error(err: reqwest::Error, provider: &str) -> ReportError {
    ReportError::Search(crate::types::ErrorClassifier::classify_request(&err, provider))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ErrorKind;
    use serde_json::json;

    #[test]
    fn test_search_api_parse() {
        assert_eq!("tavily".parse::<SearchApi>().unwrap(), SearchApi::Tavily);
        assert_eq!(
            "Azure-AI-Search".parse::<SearchApi>().unwrap(),
            SearchApi::AzureAiSearch
        );
        for api in SearchApi::ALL {
            assert_eq!(api.as_str().parse::<SearchApi>().unwrap(), api);
        }
        let err = "bing".parse::<SearchApi>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigurationError);
    }

    #[test]
    fn test_filter_options_per_backend() {
        let bag = json!({
            "index_name": "docs",
            "top_k": 3,
            "max_results": 7,
            "unknown": true
        });
        let bag = bag.as_object().unwrap();

        let azure = SearchApi::AzureAiSearch.filter_options(bag);
        assert_eq!(azure.len(), 2);
        assert_eq!(azure["index_name"], "docs");

        let tavily = SearchApi::Tavily.filter_options(bag);
        assert_eq!(tavily.len(), 1);
        assert_eq!(tavily["max_results"], 7);

        assert!(SearchApi::Exa.filter_options(bag).is_empty());
    }

    #[test]
    fn test_option_helpers() {
        let bag = json!({"a": "x", "b": 4, "c": ["d1", "d2"], "e": ""});
        let bag = bag.as_object().unwrap().clone();
        assert_eq!(option_str(&bag, "a"), Some("x"));
        assert_eq!(option_str(&bag, "e"), None);
        assert_eq!(option_usize(&bag, "b"), Some(4));
        assert_eq!(option_strings(&bag, "c").unwrap().len(), 2);
        assert!(option_strings(&bag, "a").is_none());
    }
}
