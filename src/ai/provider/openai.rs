//! OpenAI API Provider
//!
//! LLM provider using the Chat Completions API, either on api.openai.com or
//! through an Azure OpenAI deployment. Returns LlmResponse with token usage.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::{
    LlmProvider, LlmResponse, ProviderConfig, ResponseMetadata, ResponseTiming, TokenUsage,
    build_system_prompt, http_error, request_error,
};
use crate::types::{ErrorCategory, ReportError, Result};

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_AZURE_API_VERSION: &str = "2024-10-21";

/// Where requests go and how they authenticate
#[derive(Debug, Clone)]
enum Endpoint {
    OpenAi { api_base: String },
    Azure {
        endpoint: String,
        deployment: String,
        api_version: String,
    },
}

/// Chat Completions provider with secure API key handling
pub struct OpenAiProvider {
    /// Never exposed in logs or debug output
    api_key: SecretString,
    endpoint: Endpoint,
    model: String,
    temperature: f32,
    max_tokens: usize,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("api_key", &"[REDACTED]")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl OpenAiProvider {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .ok_or_else(|| {
                ReportError::Config(
                    "OpenAI API key not found. Set OPENAI_API_KEY env var".to_string(),
                )
            })?;

        let api_base = config
            .api_base
            .clone()
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        Self::build(config, api_key, Endpoint::OpenAi { api_base })
    }

    /// Azure OpenAI deployment.
    ///
    /// Reads `AZURE_OPENAI_API_KEY`, `AZURE_OPENAI_ENDPOINT`, `AZURE_OPENAI_API_VERSION`
    /// and `AZURE_OPENAI_DEPLOYMENT`; the configured model name is used as the
    /// deployment when the latter is unset.
    pub fn azure(config: ProviderConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("AZURE_OPENAI_API_KEY").ok())
            .ok_or_else(|| {
                ReportError::Config(
                    "Azure OpenAI API key not found. Set AZURE_OPENAI_API_KEY env var".to_string(),
                )
            })?;

        let endpoint = config
            .api_base
            .clone()
            .or_else(|| std::env::var("AZURE_OPENAI_ENDPOINT").ok())
            .ok_or_else(|| {
                ReportError::Config(
                    "Azure OpenAI endpoint not found. Set AZURE_OPENAI_ENDPOINT env var"
                        .to_string(),
                )
            })?;
        let endpoint = url::Url::parse(&endpoint)
            .map_err(|e| {
                ReportError::Config(format!("Invalid Azure OpenAI endpoint '{}': {}", endpoint, e))
            })?
            .to_string()
            .trim_end_matches('/')
            .to_string();

        let deployment = std::env::var("AZURE_OPENAI_DEPLOYMENT")
            .ok()
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| config.model.clone());
        let api_version = std::env::var("AZURE_OPENAI_API_VERSION")
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_AZURE_API_VERSION.to_string());

        Self::build(
            config,
            api_key,
            Endpoint::Azure {
                endpoint,
                deployment,
                api_version,
            },
        )
    }

    fn build(config: ProviderConfig, api_key: String, endpoint: Endpoint) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ReportError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key: SecretString::from(api_key),
            endpoint,
            model: config.model,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            client,
        })
    }

    fn provider_name(&self) -> &'static str {
        match self.endpoint {
            Endpoint::OpenAi { .. } => "openai",
            Endpoint::Azure { .. } => "azure-openai",
        }
    }

    fn completions_url(&self) -> String {
        match &self.endpoint {
            Endpoint::OpenAi { api_base } => format!("{}/chat/completions", api_base),
            Endpoint::Azure {
                endpoint,
                deployment,
                api_version,
            } => format!(
                "{}/openai/deployments/{}/chat/completions?api-version={}",
                endpoint, deployment, api_version
            ),
        }
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.endpoint {
            Endpoint::OpenAi { .. } => request.header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            ),
            Endpoint::Azure { .. } => request.header("api-key", self.api_key.expose_secret()),
        }
    }

    fn build_request(&self, prompt: &str, schema: &Value) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: build_system_prompt(schema),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            temperature: self.temperature,
            max_tokens: Some(self.max_tokens),
            response_format: (!schema.is_null()).then(|| ResponseFormat {
                format_type: "json_object".to_string(),
            }),
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn generate(&self, prompt: &str, schema: &Value) -> Result<LlmResponse> {
        let provider = self.provider_name();
        info!(
            "Generating with {} (model: {}, structured: {})",
            provider,
            self.model,
            !schema.is_null()
        );

        let start_time = Instant::now();
        let request = self.build_request(prompt, schema);

        debug!("Sending request to {} API", provider);

        let response = self
            .authorize(self.client.post(self.completions_url()))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| request_error(e, provider))?;

        let elapsed = start_time.elapsed();

        if !response.status().is_success() {
            return Err(http_error(response, provider).await);
        }

        let response_body: ChatCompletionResponse =
            response.json().await.map_err(|e| request_error(e, provider))?;

        let usage = response_body
            .usage
            .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        let content = response_body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| {
                ReportError::model(
                    ErrorCategory::Transient,
                    format!("No content in {} response", provider),
                )
            })?;

        Ok(LlmResponse::with_metrics(
            content,
            usage,
            ResponseTiming::from_duration(elapsed),
            ResponseMetadata {
                model: self.model.clone(),
                provider: provider.to_string(),
            },
        ))
    }

    fn name(&self) -> &str {
        self.provider_name()
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn health_check(&self) -> Result<bool> {
        let url = match &self.endpoint {
            Endpoint::OpenAi { api_base } => format!("{}/models", api_base),
            Endpoint::Azure {
                endpoint,
                api_version,
                ..
            } => format!("{}/openai/models?api-version={}", endpoint, api_version),
        };

        match self.authorize(self.client.get(&url)).send().await {
            Ok(resp) if resp.status().is_success() => {
                info!("{} API is available", self.provider_name());
                Ok(true)
            }
            Ok(resp) => {
                warn!("{} API check failed: {}", self.provider_name(), resp.status());
                Ok(false)
            }
            Err(e) => {
                warn!("{} API check failed: {}", self.provider_name(), e);
                Ok(false)
            }
        }
    }
}

// Request/Response types

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    usage: Option<UsageInfo>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsageInfo {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::provider::ProviderKind;
    use serde_json::json;

    fn config(kind: ProviderKind) -> ProviderConfig {
        ProviderConfig {
            provider: kind,
            model: "gpt-4o".to_string(),
            timeout_secs: 30,
            temperature: 0.7,
            api_key: Some("test-key".to_string()),
            api_base: Some("https://example.openai.azure.com/".to_string()),
            max_tokens: 8000,
        }
    }

    #[test]
    fn test_free_text_request_has_no_response_format() {
        let provider = OpenAiProvider::new(config(ProviderKind::OpenAi)).unwrap();
        let request = provider.build_request("Write it", &Value::Null);
        assert!(request.response_format.is_none());

        let structured = provider.build_request("Write it", &json!({"type": "object"}));
        assert!(structured.response_format.is_some());
        assert!(structured.messages[0].content.contains("valid JSON"));
    }

    #[test]
    fn test_azure_url_and_debug() {
        let provider = OpenAiProvider::azure(config(ProviderKind::AzureOpenAi)).unwrap();
        let url = provider.completions_url();
        assert!(url.starts_with("https://example.openai.azure.com/openai/deployments/"));
        assert!(url.contains("chat/completions?api-version="));
        assert_eq!(provider.name(), "azure-openai");
        assert!(!format!("{:?}", provider).contains("test-key"));
    }
}
