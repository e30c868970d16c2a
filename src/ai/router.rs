//! Language model port used by the report engine.
//!
//! Routes each call to the planner or writer provider, applies call-site
//! retry for transient failures and decodes structured output. A schema
//! violation gets one corrective re-prompt before it is surfaced.

use std::sync::LazyLock;

use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::metrics::SharedMetrics;
use super::provider::{ProviderConfig, SharedProvider, create_provider};
use super::retry::{RetryPolicy, with_retry};
use super::validation::decode_structured;
use crate::types::{ErrorCategory, ReportError, Result, estimate_tokens};

static THINK_BLOCK: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?s)<think>.*?</think>").ok());

/// Which configured model serves a call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelRole {
    /// Planning and reflection
    Planner,
    /// Query generation and drafting
    Writer,
}

impl std::fmt::Display for ModelRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelRole::Planner => write!(f, "planner"),
            ModelRole::Writer => write!(f, "writer"),
        }
    }
}

/// Named JSON schema for structured generation
#[derive(Debug, Clone)]
pub struct OutputSchema {
    pub name: &'static str,
    pub schema: Value,
}

impl OutputSchema {
    pub fn new(name: &'static str, schema: Value) -> Self {
        Self { name, schema }
    }
}

/// Append a correction block describing why the previous answer was rejected
pub fn corrective_prompt(prompt: &str, problem: &str) -> String {
    format!(
        "{}\n\n<CORRECTION>\nYour previous response was rejected: {}\nReturn ONLY a JSON object that matches the required schema exactly.\n</CORRECTION>",
        prompt, problem
    )
}

/// Planner/writer model pair with retry and decoding
#[derive(Clone)]
pub struct ModelRouter {
    planner: SharedProvider,
    writer: SharedProvider,
    retry: RetryPolicy,
    metrics: SharedMetrics,
}

impl ModelRouter {
    pub fn new(
        planner: SharedProvider,
        writer: SharedProvider,
        retry: RetryPolicy,
        metrics: SharedMetrics,
    ) -> Self {
        Self {
            planner,
            writer,
            retry,
            metrics,
        }
    }

    /// Build both providers from resolved configuration
    pub fn from_config(
        planner: &ProviderConfig,
        writer: &ProviderConfig,
        retry: RetryPolicy,
        metrics: SharedMetrics,
    ) -> Result<Self> {
        Ok(Self::new(
            create_provider(planner)?,
            create_provider(writer)?,
            retry,
            metrics,
        ))
    }

    pub fn provider(&self, role: ModelRole) -> &SharedProvider {
        match role {
            ModelRole::Planner => &self.planner,
            ModelRole::Writer => &self.writer,
        }
    }

    /// Probe both providers before a run; returns the roles that look unavailable
    pub async fn preflight(&self) -> Vec<ModelRole> {
        let mut unhealthy = Vec::new();
        for role in [ModelRole::Planner, ModelRole::Writer] {
            let provider = self.provider(role);
            match provider.health_check().await {
                Ok(true) => debug!(%role, provider = provider.name(), "Provider healthy"),
                Ok(false) => unhealthy.push(role),
                Err(e) => {
                    warn!(%role, "Health check failed: {}", e);
                    unhealthy.push(role);
                }
            }
        }
        unhealthy
    }

    /// Free-text generation; reasoning blocks are stripped from the result
    pub async fn generate_text(&self, prompt: &str, role: ModelRole) -> Result<String> {
        let raw = self.complete(prompt, &Value::Null, role).await?;
        let text = match THINK_BLOCK.as_ref() {
            Some(re) => re.replace_all(&raw, "").trim().to_string(),
            None => raw.trim().to_string(),
        };

        if text.is_empty() {
            return Err(ReportError::model(
                ErrorCategory::Transient,
                format!("{} model returned empty text", role),
            ));
        }
        Ok(text)
    }

    /// Structured generation with one corrective retry on schema violation
    pub async fn generate_structured<T: DeserializeOwned>(
        &self,
        prompt: &str,
        schema: &OutputSchema,
        role: ModelRole,
    ) -> Result<T> {
        match self.generate_structured_once(prompt, schema, role).await {
            Err(ReportError::StructuredOutputRejected { message, .. }) => {
                warn!(
                    schema = schema.name,
                    %role,
                    "Structured output rejected, retrying with correction: {}",
                    message
                );
                let corrected = corrective_prompt(prompt, &message);
                self.generate_structured_once(&corrected, schema, role).await
            }
            other => other,
        }
    }

    /// Structured generation without the corrective retry
    pub async fn generate_structured_once<T: DeserializeOwned>(
        &self,
        prompt: &str,
        schema: &OutputSchema,
        role: ModelRole,
    ) -> Result<T> {
        let raw = self.complete(prompt, &schema.schema, role).await?;
        decode_structured(&raw, schema.name)
    }

    async fn complete(&self, prompt: &str, schema: &Value, role: ModelRole) -> Result<String> {
        let provider = self.provider(role);
        let metrics = &self.metrics;
        let operation = format!("{} model call ({})", role, provider.name());

        debug!(%role, model = provider.model(), prompt_tokens = estimate_tokens(prompt), "Model call");

        let response = with_retry(self.retry, &operation, move || async move {
            match provider.generate(prompt, schema).await {
                Ok(response) => {
                    metrics.record_response(&response);
                    Ok(response)
                }
                Err(e) => {
                    metrics.record_model_failure();
                    Err(e)
                }
            }
        })
        .await?;

        Ok(response.content)
    }
}
