//! Run request payload and the resolved per-run configuration.
//!
//! A `RunRequest` carries the boundary payload (same keys as the report
//! service's HTTP body). It overlays the merged `Config`, and the result is
//! resolved once into an immutable `ReportConfiguration` for the engine.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::types::Config;
use crate::ai::{ProviderConfig, RetryPolicy};
use crate::constants::report::DEFAULT_REPORT_STRUCTURE;
use crate::search::{SearchApi, SearchOptions};
use crate::types::{ReportError, Result};

/// Boundary request payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunRequest {
    pub topic: String,
    pub search_api: Option<String>,
    pub planner_provider: Option<String>,
    pub planner_model: Option<String>,
    pub writer_provider: Option<String>,
    pub writer_model: Option<String>,
    pub max_search_depth: Option<usize>,
    pub number_of_queries: Option<usize>,
    /// Text template, or any JSON value rendered as text
    pub report_structure: Option<Value>,
    /// Opaque provider option bag; must be a JSON object
    pub search_api_config: Option<Value>,
}

impl RunRequest {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            ..Self::default()
        }
    }

    /// Read a request file; `.yaml`/`.yml` are parsed as YAML, anything else as JSON
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));

        if is_yaml {
            serde_yaml::from_str(&content).map_err(|e| {
                ReportError::Config(format!("Invalid request file {}: {}", path.display(), e))
            })
        } else {
            serde_json::from_str(&content).map_err(|e| {
                ReportError::Config(format!("Invalid request file {}: {}", path.display(), e))
            })
        }
    }

    /// Overlay request fields onto the merged configuration
    pub fn apply_to(&self, config: &mut Config) -> Result<()> {
        if let Some(api) = &self.search_api {
            config.search.api = api.clone();
        }
        if let Some(provider) = &self.planner_provider {
            config.planner.provider = provider.clone();
        }
        if let Some(model) = &self.planner_model {
            config.planner.model = model.clone();
        }
        if let Some(provider) = &self.writer_provider {
            config.writer.provider = provider.clone();
        }
        if let Some(model) = &self.writer_model {
            config.writer.model = model.clone();
        }
        if let Some(depth) = self.max_search_depth {
            config.report.max_search_depth = depth;
        }
        if let Some(queries) = self.number_of_queries {
            config.report.number_of_queries = queries;
        }
        match &self.report_structure {
            None | Some(Value::Null) => {}
            Some(Value::String(text)) => config.report.report_structure = Some(text.clone()),
            Some(other) => {
                config.report.report_structure = Some(serde_json::to_string_pretty(other)?)
            }
        }
        match &self.search_api_config {
            None | Some(Value::Null) => {}
            Some(Value::Object(options)) => {
                for (key, value) in options {
                    config.search.options.insert(key.clone(), value.clone());
                }
            }
            Some(other) => {
                return Err(ReportError::Config(format!(
                    "search_api_config must be a JSON object, got {}",
                    json_type_name(other)
                )));
            }
        }
        Ok(())
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Immutable, validated configuration for one run
#[derive(Debug, Clone)]
pub struct ReportConfiguration {
    pub number_of_queries: usize,
    pub max_search_depth: usize,
    pub report_structure: String,
    pub research_all_sections: bool,
    pub plan_review: bool,
    pub max_concurrency: usize,
    pub planner: ProviderConfig,
    pub writer: ProviderConfig,
    pub search_api: SearchApi,
    /// Option bag already filtered to the keys `search_api` accepts
    pub search_options: SearchOptions,
    pub max_results_per_round: usize,
    pub search_timeout_secs: u64,
    pub include_raw_content: bool,
    pub max_tokens_per_source: usize,
    pub retry: RetryPolicy,
    pub run_timeout: Option<Duration>,
}

impl ReportConfiguration {
    /// Validate and freeze a merged configuration.
    ///
    /// Unknown provider or search selectors fail here, before any network call.
    pub fn resolve(config: &Config) -> Result<Self> {
        config.validate()?;

        let planner = ProviderConfig::from_model_config(&config.planner)?;
        let writer = ProviderConfig::from_model_config(&config.writer)?;
        let search_api: SearchApi = config.search.api.parse()?;
        let search_options = search_api.filter_options(&config.search.options);

        let report_structure = config
            .report
            .report_structure
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_REPORT_STRUCTURE)
            .to_string();

        let resolved = Self {
            number_of_queries: config.report.number_of_queries,
            max_search_depth: config.report.max_search_depth,
            report_structure,
            research_all_sections: config.report.research_all_sections,
            plan_review: config.report.plan_review,
            max_concurrency: config.report.max_concurrency,
            planner,
            writer,
            search_api,
            search_options,
            max_results_per_round: config.search.max_results_per_round,
            search_timeout_secs: config.search.timeout_secs,
            include_raw_content: config.search.include_raw_content,
            max_tokens_per_source: config.search.max_tokens_per_source,
            retry: RetryPolicy::from(&config.retry),
            run_timeout: (config.run.timeout_secs > 0)
                .then(|| Duration::from_secs(config.run.timeout_secs)),
        };

        debug!(
            search_api = %resolved.search_api,
            planner = %resolved.planner.provider,
            writer = %resolved.writer.provider,
            depth = resolved.max_search_depth,
            queries = resolved.number_of_queries,
            "Resolved report configuration"
        );
        Ok(resolved)
    }

    /// Overlay a request on a merged config and resolve
    pub fn from_request(config: &Config, request: &RunRequest) -> Result<Self> {
        let mut merged = config.clone();
        request.apply_to(&mut merged)?;
        Self::resolve(&merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::ProviderKind;
    use crate::types::ErrorKind;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_request_overlays_config() {
        let request: RunRequest = serde_json::from_value(json!({
            "topic": "Vector databases",
            "search_api": "exa",
            "planner_provider": "openai",
            "planner_model": "gpt-4o",
            "max_search_depth": 0,
            "number_of_queries": 1,
            "search_api_config": {"include_domains": ["arxiv.org"], "bogus": 1}
        }))
        .unwrap();

        let resolved = ReportConfiguration::from_request(&Config::default(), &request).unwrap();
        assert_eq!(resolved.search_api, SearchApi::Exa);
        assert_eq!(resolved.planner.provider, ProviderKind::OpenAi);
        assert_eq!(resolved.planner.model, "gpt-4o");
        assert_eq!(resolved.writer.provider, ProviderKind::Anthropic);
        assert_eq!(resolved.max_search_depth, 0);
        assert_eq!(resolved.number_of_queries, 1);
        assert!(resolved.search_options.contains_key("include_domains"));
        assert!(!resolved.search_options.contains_key("bogus"));
    }

    #[test]
    fn test_unknown_selectors_are_configuration_errors() {
        for request in [
            RunRequest {
                search_api: Some("bing".into()),
                ..RunRequest::new("t")
            },
            RunRequest {
                writer_provider: Some("mystery".into()),
                ..RunRequest::new("t")
            },
            RunRequest {
                number_of_queries: Some(0),
                ..RunRequest::new("t")
            },
            RunRequest {
                search_api_config: Some(json!(["not", "an", "object"])),
                ..RunRequest::new("t")
            },
        ] {
            let err = ReportConfiguration::from_request(&Config::default(), &request).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ConfigurationError, "{:?}", request);
        }
    }

    #[test]
    fn test_report_structure_defaults_and_objects() {
        let resolved = ReportConfiguration::resolve(&Config::default()).unwrap();
        assert_eq!(resolved.report_structure, DEFAULT_REPORT_STRUCTURE);

        let request = RunRequest {
            report_structure: Some(json!({"sections": ["Intro", "Body"]})),
            ..RunRequest::new("t")
        };
        let resolved = ReportConfiguration::from_request(&Config::default(), &request).unwrap();
        assert!(resolved.report_structure.contains("\"sections\""));
    }

    #[test]
    fn test_run_timeout_zero_disables() {
        let mut config = Config::default();
        config.run.timeout_secs = 0;
        assert!(ReportConfiguration::resolve(&config).unwrap().run_timeout.is_none());
    }

    #[test]
    fn test_request_from_yaml_and_json_files() {
        let dir = TempDir::new().unwrap();
        let yaml = dir.path().join("req.yaml");
        std::fs::write(&yaml, "topic: Edge AI\nnumber_of_queries: 3\n").unwrap();
        let json_path = dir.path().join("req.json");
        std::fs::write(&json_path, r#"{"topic": "Edge AI", "search_api": "tavily"}"#).unwrap();

        let from_yaml = RunRequest::from_file(&yaml).unwrap();
        assert_eq!(from_yaml.topic, "Edge AI");
        assert_eq!(from_yaml.number_of_queries, Some(3));

        let from_json = RunRequest::from_file(&json_path).unwrap();
        assert_eq!(from_json.search_api.as_deref(), Some("tavily"));
    }
}
