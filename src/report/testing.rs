//! Scripted model and search doubles for driving the engine in tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::context::EngineContext;
use super::schemas::{FEEDBACK, QUERIES, SECTIONS};
use super::types::Topic;
use crate::ai::{LlmProvider, LlmResponse, ModelRouter, RetryPolicy, create_shared_metrics};
use crate::config::{Config, ReportConfiguration};
use crate::search::{SearchClient, SearchOptions, SearchProvider, SearchResult};
use crate::types::{ErrorCategory, ReportError, Result};

/// Millisecond backoff so retry paths stay fast
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_retries: 2,
        min_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(2),
    }
}

/// Resolved configuration with the given query count and depth
pub fn configuration(number_of_queries: usize, max_search_depth: usize) -> ReportConfiguration {
    let mut config = Config::default();
    config.report.number_of_queries = number_of_queries;
    config.report.max_search_depth = max_search_depth;
    config.run.timeout_secs = 0;
    let mut resolved = ReportConfiguration::resolve(&config).unwrap();
    resolved.retry = fast_retry();
    resolved
}

/// Engine context where one scripted model serves both roles
pub fn context(
    model: ScriptedModel,
    search: ScriptedSearch,
    number_of_queries: usize,
    max_search_depth: usize,
) -> EngineContext {
    context_with(model, search, configuration(number_of_queries, max_search_depth))
}

pub fn context_with(
    model: ScriptedModel,
    search: ScriptedSearch,
    config: ReportConfiguration,
) -> EngineContext {
    let metrics = create_shared_metrics("test-run");
    let provider = Arc::new(model);
    EngineContext {
        topic: Topic::new("Rust async runtimes").unwrap(),
        models: ModelRouter::new(provider.clone(), provider, config.retry, metrics.clone()),
        search: SearchClient::new(
            Arc::new(search),
            config.search_options.clone(),
            config.max_results_per_round,
            config.retry,
            metrics,
        ),
        config: Arc::new(config),
        cancel: CancellationToken::new(),
    }
}

// =============================================================================
// Scripted Model
// =============================================================================

/// Which engine stage issued a model call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    PlanQueries,
    Plan,
    SectionQueries,
    Draft,
    Reflect,
    FinalSection,
}

impl Stage {
    fn detect(prompt: &str, schema: &Value) -> Self {
        match schema.get("title").and_then(Value::as_str) {
            Some(QUERIES) if prompt.contains("**Section**:") => Stage::SectionQueries,
            Some(QUERIES) => Stage::PlanQueries,
            Some(SECTIONS) => Stage::Plan,
            Some(FEEDBACK) => Stage::Reflect,
            _ if prompt.contains("<REPORT_BODY>") => Stage::FinalSection,
            _ => Stage::Draft,
        }
    }
}

/// One recorded model call
#[derive(Debug, Clone)]
pub struct ModelCall {
    pub stage: Stage,
    pub section: Option<String>,
    pub prompt: String,
}

type Handler = dyn Fn(&ModelCall) -> Result<String> + Send + Sync;

enum Scripted {
    Reply(String),
    Fail(ErrorCategory),
}

#[derive(Default)]
struct ModelState {
    queue: Mutex<VecDeque<Scripted>>,
    handler: Option<Box<Handler>>,
    calls: Mutex<Vec<ModelCall>>,
    unhealthy: AtomicBool,
}

/// Model double: queued replies first, then the handler
#[derive(Clone, Default)]
pub struct ScriptedModel {
    state: Arc<ModelState>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every unqueued call with `handler`
    pub fn with_handler(
        handler: impl Fn(&ModelCall) -> Result<String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            state: Arc::new(ModelState {
                handler: Some(Box::new(handler)),
                ..ModelState::default()
            }),
        }
    }

    pub fn reply(self, text: impl Into<String>) -> Self {
        self.state
            .queue
            .lock()
            .unwrap()
            .push_back(Scripted::Reply(text.into()));
        self
    }

    pub fn fail(self, category: ErrorCategory) -> Self {
        self.state
            .queue
            .lock()
            .unwrap()
            .push_back(Scripted::Fail(category));
        self
    }

    /// Fail the provider health check
    pub fn unhealthy(self) -> Self {
        self.state.unhealthy.store(true, Ordering::SeqCst);
        self
    }

    pub fn calls(&self) -> Vec<ModelCall> {
        self.state.calls.lock().unwrap().clone()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.prompt).collect()
    }

    pub fn calls_for(&self, stage: Stage) -> usize {
        self.calls().iter().filter(|c| c.stage == stage).count()
    }
}

/// Section named in a prompt's context block
pub fn section_of(prompt: &str) -> Option<String> {
    prompt
        .lines()
        .find_map(|line| line.strip_prefix("**Section**: "))
        .map(|s| s.trim().to_string())
}

#[async_trait]
impl LlmProvider for ScriptedModel {
    async fn generate(&self, prompt: &str, schema: &Value) -> Result<LlmResponse> {
        let call = ModelCall {
            stage: Stage::detect(prompt, schema),
            section: section_of(prompt),
            prompt: prompt.to_string(),
        };
        self.state.calls.lock().unwrap().push(call.clone());

        let next = self.state.queue.lock().unwrap().pop_front();
        let text = match next {
            Some(Scripted::Reply(text)) => text,
            Some(Scripted::Fail(category)) => {
                return Err(ReportError::model(category, "scripted failure"));
            }
            None => match &self.state.handler {
                Some(handler) => handler(&call)?,
                None => {
                    return Err(ReportError::model(
                        ErrorCategory::BadRequest,
                        "no scripted reply left",
                    ));
                }
            },
        };
        Ok(LlmResponse::content_only(text))
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-model"
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(!self.state.unhealthy.load(Ordering::SeqCst))
    }
}

// =============================================================================
// Scripted Search
// =============================================================================

#[derive(Default)]
struct SearchState {
    results: Mutex<HashMap<String, Vec<String>>>,
    failing: Mutex<Vec<(String, ErrorCategory)>>,
    delays: Mutex<Vec<(String, Duration)>>,
    calls: Mutex<Vec<String>>,
}

/// Search double.
///
/// Rules match a query exactly or by prefix. Unmatched queries return one
/// source whose id is derived from the query.
#[derive(Clone, Default)]
pub struct ScriptedSearch {
    state: Arc<SearchState>,
}

impl ScriptedSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_results(self, query: &str, ids: &[&str]) -> Self {
        self.state.results.lock().unwrap().insert(
            query.to_string(),
            ids.iter().map(|id| id.to_string()).collect(),
        );
        self
    }

    pub fn failing_query(self, prefix: &str, category: ErrorCategory) -> Self {
        self.state
            .failing
            .lock()
            .unwrap()
            .push((prefix.to_string(), category));
        self
    }

    pub fn delay_query(self, prefix: &str, delay: Duration) -> Self {
        self.state
            .delays
            .lock()
            .unwrap()
            .push((prefix.to_string(), delay));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|q| q.starts_with(prefix)).count()
    }

    fn result(id: &str) -> SearchResult {
        SearchResult {
            source_id: id.to_string(),
            title: format!("Source {}", id),
            content: format!("Snippet about {}", id),
            raw_content: Some(format!("Full text about {}", id)),
            score: 0.9,
        }
    }
}

#[async_trait]
impl SearchProvider for ScriptedSearch {
    async fn search(&self, query: &str, _options: &SearchOptions) -> Result<Vec<SearchResult>> {
        self.state.calls.lock().unwrap().push(query.to_string());

        let delay = self
            .state
            .delays
            .lock()
            .unwrap()
            .iter()
            .find(|(prefix, _)| query.starts_with(prefix.as_str()))
            .map(|(_, d)| *d);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let failure = self
            .state
            .failing
            .lock()
            .unwrap()
            .iter()
            .find(|(prefix, _)| query.starts_with(prefix.as_str()))
            .map(|(_, c)| *c);
        if let Some(category) = failure {
            return Err(ReportError::search(category, "scripted outage", "scripted"));
        }

        let ids = self.state.results.lock().unwrap().get(query).cloned();
        Ok(match ids {
            Some(ids) => ids.iter().map(|id| Self::result(id)).collect(),
            None => vec![Self::result(&format!("src:{}", query))],
        })
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
