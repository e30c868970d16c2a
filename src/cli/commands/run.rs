//! Run Command
//!
//! Generate a report for a topic.
//!
//! Usage:
//!   deepreport run "<topic>" [--search-api exa] [--depth 1] [--queries 3]
//!   deepreport run --request request.json
//!   deepreport run "<topic>" --review        # stop for plan review

use std::path::PathBuf;

use tokio::runtime::Runtime;
use tracing::info;

use crate::cli::ui::Output;
use crate::cli::util::{
    ReviewFile, cancel_on_ctrl_c, default_review_path, emit_outcome, resolve_configuration,
};
use crate::config::RunRequest;
use crate::report::{ReportPipeline, RunOutcome, RunProgress, RunStatus, Topic};
use crate::types::{ReportError, Result};

/// Run options (consolidated parameters)
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub topic: Option<String>,
    /// JSON or YAML request payload; flags override its fields
    pub request: Option<PathBuf>,
    pub search_api: Option<String>,
    pub planner_provider: Option<String>,
    pub planner_model: Option<String>,
    pub writer_provider: Option<String>,
    pub writer_model: Option<String>,
    pub max_search_depth: Option<usize>,
    pub number_of_queries: Option<usize>,
    /// File holding the report structure template
    pub structure: Option<PathBuf>,
    pub research_all: bool,
    /// Stop after planning and write a review file
    pub review: bool,
    pub review_file: Option<PathBuf>,
    /// Write the JSON result here instead of stdout
    pub output: Option<PathBuf>,
}

impl RunOptions {
    /// Build the request payload: file first, then flags
    fn into_request(self) -> Result<RunRequest> {
        let mut request = match &self.request {
            Some(path) => RunRequest::from_file(path)?,
            None => RunRequest::default(),
        };

        if let Some(topic) = self.topic {
            request.topic = topic;
        }
        if self.search_api.is_some() {
            request.search_api = self.search_api;
        }
        if self.planner_provider.is_some() {
            request.planner_provider = self.planner_provider;
        }
        if self.planner_model.is_some() {
            request.planner_model = self.planner_model;
        }
        if self.writer_provider.is_some() {
            request.writer_provider = self.writer_provider;
        }
        if self.writer_model.is_some() {
            request.writer_model = self.writer_model;
        }
        if self.max_search_depth.is_some() {
            request.max_search_depth = self.max_search_depth;
        }
        if self.number_of_queries.is_some() {
            request.number_of_queries = self.number_of_queries;
        }
        if let Some(path) = &self.structure {
            let text = std::fs::read_to_string(path).map_err(|e| {
                ReportError::Config(format!("Cannot read structure {}: {}", path.display(), e))
            })?;
            request.report_structure = Some(serde_json::Value::String(text));
        }
        Ok(request)
    }
}

/// Returns the run status; `None` when the run stopped for review
pub fn run(options: RunOptions) -> Result<Option<RunStatus>> {
    let output = Output::new();
    let review = options.review;
    let research_all = options.research_all;
    let review_path = options.review_file.clone().unwrap_or_else(default_review_path);
    let result_path = options.output.clone();

    let request = options.into_request()?;
    let topic = Topic::new(request.topic.as_str())?;

    let mut configuration = resolve_configuration(&request)?;
    configuration.plan_review |= review;
    configuration.research_all_sections |= research_all;

    let pipeline = ReportPipeline::from_configuration(configuration)?;
    info!(run_id = %pipeline.run_id(), "Starting report run");

    let rt = Runtime::new()?;
    let progress = rt.block_on(async {
        for role in pipeline.models().preflight().await {
            output.warning(&format!("{} model did not pass its health check", role));
        }
        let cancel = cancel_on_ctrl_c();
        pipeline.start(topic, cancel).await
    });

    let outcome = match progress {
        Ok(RunProgress::AwaitingReview(token)) => {
            output.plan(&token.plan);
            ReviewFile::new(request, &token)?.save(&review_path)?;
            output.info(&format!("Plan saved for review: {}", review_path.display()));
            output.info("Continue with 'deepreport resume --approve' or 'deepreport resume --feedback \"...\"'");
            return Ok(None);
        }
        Ok(RunProgress::Completed(report)) => RunOutcome::from_report(pipeline.run_id().clone(), report),
        Err(e) => RunOutcome::from_error(pipeline.run_id().clone(), &e),
    };

    let outcome = outcome.with_metrics(pipeline.metrics().summary());
    output.outcome(&outcome);
    emit_outcome(&outcome, result_path.as_deref())?;
    Ok(Some(outcome.status))
}
