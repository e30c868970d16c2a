//! Report Engine
//!
//! Plan-and-execute report generation over a language model and a search
//! backend.
//!
//! ## Pipeline
//!
//! ```text
//! Planning ─→ [AwaitingReview] ─→ SectionsDispatched ─→ Joined ─→ FinalSections ─→ Compiled
//!    ↑               │ revise            (parallel)
//!    └───────────────┘
//! ```
//!
//! 1. **Planning**: exploratory search, then a validated section plan
//! 2. **AwaitingReview**: optional; hands out a `ResumeToken` and stops
//! 3. **SectionsDispatched**: one `SectionWorker` per research section
//! 4. **Joined**: every worker finished, results placed by plan position
//! 5. **FinalSections**: framing sections written from the joined body
//! 6. **Compiled**: sections concatenated in plan order
//!
//! Section failures degrade that section only. Configuration and planning
//! failures abort before research; cancellation aborts everything.

mod compiler;
mod context;
mod executor;
mod final_writer;
mod planner;
mod prompts;
mod queries;
mod reflection;
mod review;
mod schemas;
pub mod types;
mod worker;

#[cfg(test)]
pub mod testing;

pub use compiler::ReportCompiler;
pub use context::EngineContext;
pub use executor::ParallelExecutor;
pub use final_writer::{FinalSection, FinalSectionWriter};
pub use planner::Planner;
pub use queries::{QueryFormatter, normalize_queries};
pub use reflection::SectionReflector;
pub use review::{ResumeToken, ReviewDecision};
pub use types::{
    DegradeReason, ReflectionVerdict, Report, RunOutcome, RunStatus, Section, SectionOutcome,
    SectionPlan, SectionStatus, Topic,
};
pub use worker::{SectionResult, SectionWorker};

use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::ai::{ModelRouter, SharedMetrics, create_shared_metrics};
use crate::config::ReportConfiguration;
use crate::constants::report::RESEARCH_UNAVAILABLE;
use crate::search::{SearchClient, create_search_provider};
use crate::types::{ErrorKind, ReportError, Result, RunId};

// =============================================================================
// Pipeline State
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Planning,
    AwaitingReview,
    SectionsDispatched,
    Joined,
    FinalSections,
    Compiled,
}

impl PipelineState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Planning => "Planning",
            Self::AwaitingReview => "Awaiting Review",
            Self::SectionsDispatched => "Sections Dispatched",
            Self::Joined => "Joined",
            Self::FinalSections => "Final Sections",
            Self::Compiled => "Compiled",
        }
    }
}

/// Where a run stopped
#[derive(Debug, Clone)]
pub enum RunProgress {
    /// Plan is waiting for a reviewer; resume with the token
    AwaitingReview(ResumeToken),
    Completed(Report),
}

// =============================================================================
// Report Pipeline
// =============================================================================

/// Orchestrator for one report run
pub struct ReportPipeline {
    config: Arc<ReportConfiguration>,
    models: ModelRouter,
    search: SearchClient,
    metrics: SharedMetrics,
    run_id: RunId,
}

impl ReportPipeline {
    pub fn new(
        config: ReportConfiguration,
        models: ModelRouter,
        search: SearchClient,
        metrics: SharedMetrics,
        run_id: RunId,
    ) -> Self {
        Self {
            config: Arc::new(config),
            models,
            search,
            metrics,
            run_id,
        }
    }

    /// Build providers for a resolved configuration under a fresh run id
    pub fn from_configuration(config: ReportConfiguration) -> Result<Self> {
        Self::with_run_id(config, RunId::generate())
    }

    /// Build providers for a resolved configuration, continuing `run_id`
    pub fn with_run_id(config: ReportConfiguration, run_id: RunId) -> Result<Self> {
        let metrics = create_shared_metrics(run_id.as_str());
        let models =
            ModelRouter::from_config(&config.planner, &config.writer, config.retry, metrics.clone())?;
        let provider = create_search_provider(config.search_api, config.search_timeout_secs)?;
        let search = SearchClient::new(
            provider,
            config.search_options.clone(),
            config.max_results_per_round,
            config.retry,
            metrics.clone(),
        );
        Ok(Self::new(config, models, search, metrics, run_id))
    }

    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    pub fn metrics(&self) -> &SharedMetrics {
        &self.metrics
    }

    pub fn models(&self) -> &ModelRouter {
        &self.models
    }

    /// Fully automated run: the first plan is always accepted
    #[instrument(skip(self, cancel), fields(run_id = %self.run_id, topic = %topic))]
    pub async fn run(&self, topic: Topic, cancel: CancellationToken) -> Result<Report> {
        let ctx = self.context(topic, &cancel);
        self.within_deadline(&ctx, async {
            let plan = self.plan(&ctx, &[]).await?;
            self.complete(&ctx, plan).await
        })
        .await
    }

    /// Start a run, stopping for review when `plan_review` is enabled
    #[instrument(skip(self, cancel), fields(run_id = %self.run_id, topic = %topic))]
    pub async fn start(&self, topic: Topic, cancel: CancellationToken) -> Result<RunProgress> {
        if !self.config.plan_review {
            return self.run(topic, cancel).await.map(RunProgress::Completed);
        }

        let ctx = self.context(topic, &cancel);
        self.within_deadline(&ctx, async {
            let plan = self.plan(&ctx, &[]).await?;
            self.await_review(&ctx, &self.run_id, plan, Vec::new())
        })
        .await
    }

    /// Continue a run from a reviewed plan.
    ///
    /// `Approve` dispatches the plan in the token. `Revise` re-plans with every
    /// note so far and hands back a new token.
    #[instrument(skip(self, token, cancel), fields(run_id = %token.run_id, topic = %token.topic))]
    pub async fn resume(
        &self,
        token: ResumeToken,
        decision: ReviewDecision,
        cancel: CancellationToken,
    ) -> Result<RunProgress> {
        let ResumeToken {
            run_id,
            topic,
            plan,
            mut feedback,
            ..
        } = token;
        let ctx = self.context(topic, &cancel);

        self.within_deadline(&ctx, async {
            match decision {
                ReviewDecision::Approve => {
                    info!(sections = plan.len(), "Plan approved");
                    self.complete(&ctx, plan).await.map(RunProgress::Completed)
                }
                ReviewDecision::Revise(note) => {
                    info!(notes = feedback.len() + 1, "Plan revision requested");
                    feedback.push(note);
                    let revised = self.plan(&ctx, &feedback).await?;
                    self.await_review(&ctx, &run_id, revised, feedback)
                }
            }
        })
        .await
    }

    /// Automated run mapped onto the boundary result surface
    pub async fn execute(&self, topic: &str, cancel: CancellationToken) -> RunOutcome {
        let outcome = match Topic::new(topic) {
            Ok(topic) => match self.run(topic, cancel).await {
                Ok(report) => RunOutcome::from_report(self.run_id.clone(), report),
                Err(e) => RunOutcome::from_error(self.run_id.clone(), &e),
            },
            Err(e) => RunOutcome::from_error(self.run_id.clone(), &e),
        };

        let summary = self.metrics.summary();
        info!(status = %outcome.status, "Run finished\n{}", summary.display());
        outcome.with_metrics(summary)
    }

    // =========================================================================
    // Stages
    // =========================================================================

    fn context(&self, topic: Topic, cancel: &CancellationToken) -> EngineContext {
        EngineContext {
            topic,
            config: self.config.clone(),
            models: self.models.clone(),
            search: self.search.clone(),
            cancel: cancel.child_token(),
        }
    }

    fn transition(&self, state: PipelineState) {
        info!(run_id = %self.run_id, state = state.name(), "Pipeline state");
    }

    /// Apply the run timeout; expiry cancels in-flight work
    async fn within_deadline<T>(
        &self,
        ctx: &EngineContext,
        work: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        let Some(limit) = self.config.run_timeout else {
            return work.await;
        };

        match tokio::time::timeout(limit, work).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(timeout_secs = limit.as_secs(), "Run timed out, cancelling");
                ctx.cancel.cancel();
                Err(ReportError::Cancelled)
            }
        }
    }

    async fn plan(&self, ctx: &EngineContext, feedback: &[String]) -> Result<SectionPlan> {
        self.transition(PipelineState::Planning);
        Planner::new(ctx).plan(feedback).await
    }

    fn await_review(
        &self,
        ctx: &EngineContext,
        run_id: &RunId,
        plan: SectionPlan,
        feedback: Vec<String>,
    ) -> Result<RunProgress> {
        self.transition(PipelineState::AwaitingReview);
        let token = ResumeToken::new(run_id.clone(), ctx.topic.clone(), plan, feedback)?;
        Ok(RunProgress::AwaitingReview(token))
    }

    /// Dispatch, join, write framing sections and compile
    async fn complete(&self, ctx: &EngineContext, plan: SectionPlan) -> Result<Report> {
        self.transition(PipelineState::SectionsDispatched);
        let results = ParallelExecutor::new(ctx).execute(&plan).await?;

        self.transition(PipelineState::Joined);
        let research = plan.research_indices();
        let finals = plan.final_indices();
        let mut sections = plan.into_sections();
        let mut outcomes: Vec<Option<SectionOutcome>> = vec![None; sections.len()];

        for result in results {
            outcomes[result.index] = Some(result.outcome());
            sections[result.index] = result.section;
        }

        // A research section with no result still needs a slot in the document
        for &index in &research {
            if outcomes[index].is_none() {
                let section = &mut sections[index];
                section.content = RESEARCH_UNAVAILABLE.to_string();
                outcomes[index] = Some(SectionOutcome {
                    name: section.name.clone(),
                    requires_research: true,
                    status: SectionStatus::degraded(DegradeReason::GenerationFailed {
                        category: ErrorKind::Internal,
                        message: "section worker did not report a result".to_string(),
                    }),
                    rounds: 0,
                });
            }
        }

        self.transition(PipelineState::FinalSections);
        let body = prompts::format_body(research.iter().map(|&i| &sections[i]));
        let pending: Vec<(usize, Section)> =
            finals.iter().map(|&i| (i, sections[i].clone())).collect();
        let written = FinalSectionWriter::new(ctx).write_all(pending, &body).await?;

        for framed in written {
            outcomes[framed.index] = Some(SectionOutcome {
                name: framed.section.name.clone(),
                requires_research: false,
                status: framed.status,
                rounds: 0,
            });
            sections[framed.index] = framed.section;
        }

        self.transition(PipelineState::Compiled);
        let report = Report {
            content: ReportCompiler::compile(&sections),
            sections: outcomes.into_iter().flatten().collect(),
        };
        info!(
            sections = report.sections.len(),
            status = %report.status(),
            "Report compiled"
        );
        Ok(report)
    }
}
