//! DeepReport - Plan-and-Execute Research Reports
//!
//! Turns a topic into a structured markdown report. A planner model lays out
//! the sections, each research section runs its own search → draft → reflect
//! loop in parallel, and framing sections are written from the finished body.
//!
//! ## Core Features
//!
//! - **Parallel Section Research**: bounded refinement per section
//! - **Plan Review**: optional pause with a serializable resume token
//! - **Graceful Degradation**: a failed section never sinks the report
//! - **Pluggable Backends**: Anthropic, OpenAI, Azure OpenAI, Ollama models;
//!   Tavily, Exa, Azure AI Search retrieval
//!
//! ## Quick Start
//!
//! ```ignore
//! use deepreport::{ConfigLoader, ReportConfiguration, ReportPipeline, Topic};
//! use tokio_util::sync::CancellationToken;
//!
//! let config = ReportConfiguration::resolve(&ConfigLoader::load()?)?;
//! let pipeline = ReportPipeline::from_configuration(config)?;
//! let report = pipeline
//!     .run(Topic::new("Rust async runtimes")?, CancellationToken::new())
//!     .await?;
//! println!("{}", report.content);
//! ```
//!
//! ## Modules
//!
//! - [`ai`]: language model providers, routing, retry, structured decoding
//! - [`search`]: search backends and retrieval rounds
//! - [`config`]: layered configuration and run requests
//! - [`report`]: planner, section workers and the report pipeline

pub mod ai;
pub mod cli;
pub mod config;
pub mod constants;
pub mod report;
pub mod search;
pub mod types;

// =============================================================================
// Core Re-exports
// =============================================================================

// Configuration
pub use config::{Config, ConfigLoader, ReportConfiguration, RunRequest};

// Error Types
pub use types::error::{ErrorCategory, ErrorKind, ReportError, Result};
pub use types::RunId;

// =============================================================================
// Pipeline Re-exports
// =============================================================================

pub use report::{
    PipelineState, Report, ReportPipeline, ResumeToken, ReviewDecision, RunOutcome, RunProgress,
    RunStatus, Section, SectionOutcome, SectionPlan, SectionStatus, Topic,
};

// =============================================================================
// Port Re-exports
// =============================================================================

pub use ai::{LlmProvider, LlmResponse, ModelRole, ModelRouter, SharedMetrics};
pub use search::{SearchApi, SearchClient, SearchProvider, SearchResult};
