//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Supports global (~/.config/deepreport/) and project (.deepreport/) level configuration.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::constants::{model, report, retry, search};
use crate::types::{ReportError, Result};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configuration version
    pub version: String,

    /// Model used for planning and reflection
    pub planner: ModelConfig,

    /// Model used for queries and drafting
    pub writer: ModelConfig,

    /// Search backend settings
    pub search: SearchConfig,

    /// Report shape settings
    pub report: ReportSettings,

    /// Call-site retry policy
    pub retry: RetryConfig,

    /// Whole-run limits
    pub run: RunConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            planner: ModelConfig::planner(),
            writer: ModelConfig::writer(),
            search: SearchConfig::default(),
            report: ReportSettings::default(),
            retry: RetryConfig::default(),
            run: RunConfig::default(),
        }
    }
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `ReportError::Config` on validation failure.
    pub fn validate(&self) -> Result<()> {
        for (role, model) in [("planner", &self.planner), ("writer", &self.writer)] {
            if !(0.0..=2.0).contains(&model.temperature) {
                return Err(ReportError::Config(format!(
                    "{} temperature must be between 0.0 and 2.0, got {}",
                    role, model.temperature
                )));
            }
            if model.timeout_secs == 0 {
                return Err(ReportError::Config(format!(
                    "{} timeout_secs must be greater than 0",
                    role
                )));
            }
            if model.model.trim().is_empty() {
                return Err(ReportError::Config(format!("{} model must not be empty", role)));
            }
        }

        if self.report.number_of_queries == 0 {
            return Err(ReportError::Config(
                "report number_of_queries must be at least 1".to_string(),
            ));
        }

        if self.report.max_concurrency == 0 {
            return Err(ReportError::Config(
                "report max_concurrency must be at least 1".to_string(),
            ));
        }

        if self.search.max_results_per_round == 0 {
            return Err(ReportError::Config(
                "search max_results_per_round must be at least 1".to_string(),
            ));
        }

        if self.search.max_tokens_per_source == 0 {
            return Err(ReportError::Config(
                "search max_tokens_per_source must be at least 1".to_string(),
            ));
        }

        if self.search.timeout_secs == 0 {
            return Err(ReportError::Config(
                "search timeout_secs must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

// =============================================================================
// Model Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Provider selector: "anthropic", "openai", "azure-openai", "ollama"
    pub provider: String,

    /// Model name (deployment name for azure-openai)
    pub model: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Maximum generated tokens per call
    pub max_tokens: usize,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Custom API base URL
    pub api_base: Option<String>,
}

impl ModelConfig {
    pub fn planner() -> Self {
        Self {
            provider: model::DEFAULT_PLANNER_PROVIDER.to_string(),
            model: model::DEFAULT_PLANNER_MODEL.to_string(),
            ..Self::default()
        }
    }

    pub fn writer() -> Self {
        Self {
            provider: model::DEFAULT_WRITER_PROVIDER.to_string(),
            model: model::DEFAULT_WRITER_MODEL.to_string(),
            ..Self::default()
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: model::DEFAULT_WRITER_PROVIDER.to_string(),
            model: model::DEFAULT_WRITER_MODEL.to_string(),
            temperature: model::DEFAULT_TEMPERATURE,
            max_tokens: model::DEFAULT_MAX_TOKENS,
            timeout_secs: model::DEFAULT_TIMEOUT_SECS,
            api_base: None,
        }
    }
}

// =============================================================================
// Search Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Search backend selector: "tavily", "exa", "azure_ai_search"
    pub api: String,

    /// Result budget per retrieval round after deduplication
    pub max_results_per_round: usize,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Feed full page content (not just snippets) to drafting
    pub include_raw_content: bool,

    /// Per-source cap on raw content fed to prompts
    pub max_tokens_per_source: usize,

    /// Provider-specific option bag, filtered per backend
    pub options: Map<String, Value>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api: search::DEFAULT_SEARCH_API.to_string(),
            max_results_per_round: search::DEFAULT_MAX_RESULTS_PER_ROUND,
            timeout_secs: search::DEFAULT_TIMEOUT_SECS,
            include_raw_content: true,
            max_tokens_per_source: search::MAX_TOKENS_PER_SOURCE,
            options: Map::new(),
        }
    }
}

// =============================================================================
// Report Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    /// Queries per retrieval round
    pub number_of_queries: usize,

    /// Refinement rounds after the first
    pub max_search_depth: usize,

    /// Layout template guiding the planner
    pub report_structure: Option<String>,

    /// Force every planned section through research
    pub research_all_sections: bool,

    /// Pause after planning for external review
    pub plan_review: bool,

    /// Section workers running at once
    pub max_concurrency: usize,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            number_of_queries: report::DEFAULT_NUMBER_OF_QUERIES,
            max_search_depth: report::DEFAULT_MAX_SEARCH_DEPTH,
            report_structure: None,
            research_all_sections: false,
            plan_review: false,
            max_concurrency: report::DEFAULT_MAX_CONCURRENCY,
        }
    }
}

// =============================================================================
// Retry Configuration
// =============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: usize,

    /// First backoff delay in milliseconds
    pub min_delay_ms: u64,

    /// Backoff ceiling in seconds
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: retry::MAX_RETRIES,
            min_delay_ms: retry::MIN_DELAY_MS,
            max_delay_secs: retry::MAX_DELAY_SECS,
        }
    }
}

// =============================================================================
// Run Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Whole-run timeout in seconds; 0 disables it
    pub timeout_secs: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self { timeout_secs: 1800 }
    }
}

// =============================================================================
// Tests
// =============================================================================
