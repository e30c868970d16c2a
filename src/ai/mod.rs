//! AI Integration Layer
//!
//! Language model port for the report engine: provider adapters, role
//! routing, call-site retry, structured output decoding and run metrics.

pub mod metrics;
pub mod prompt;
pub mod provider;
pub mod retry;
pub mod router;
pub mod validation;

pub use metrics::{MetricsSummary, RunMetrics, SharedMetrics, create_shared_metrics};
pub use prompt::{PromptBuilder, PromptSection};
pub use provider::{
    LlmProvider, LlmResponse, ProviderConfig, ProviderKind, ResponseMetadata, ResponseTiming,
    SharedProvider, TokenUsage, create_provider,
};
pub use retry::{RetryPolicy, with_retry};
pub use router::{ModelRole, ModelRouter, OutputSchema, corrective_prompt};
pub use validation::{JsonRepairer, decode_structured, extract_json_from_response};
