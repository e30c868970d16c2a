//! Section Worker: one research section's query → retrieve → draft → reflect loop.
//!
//! ```text
//! QueryGeneration → Retrieval → Drafting → Reflection ─┬→ Done
//!        ↑                                              │
//!        └──────────── follow-up queries ───────────────┘
//! ```
//!
//! Round 1 plus at most `max_search_depth` refinement rounds. Retrieval and
//! generation failures freeze the best draft so far (or a placeholder) instead
//! of failing the run; only cancellation escapes as an error.

use tracing::{debug, info, instrument, warn};

use super::context::EngineContext;
use super::prompts;
use super::queries::QueryFormatter;
use super::reflection::SectionReflector;
use super::types::{DegradeReason, ReflectionVerdict, Section, SectionOutcome, SectionStatus};
use crate::ai::ModelRole;
use crate::constants::report::RESEARCH_UNAVAILABLE;
use crate::search::SourceSet;
use crate::types::{ReportError, Result};

#[derive(Debug)]
enum WorkerState {
    /// `None` on the first round, reflector follow-ups afterwards
    QueryGeneration(Option<Vec<String>>),
    Retrieval(Vec<String>),
    Drafting,
    Reflection,
    Done(SectionStatus),
}

impl WorkerState {
    fn label(&self) -> &'static str {
        match self {
            Self::QueryGeneration(_) => "query_generation",
            Self::Retrieval(_) => "retrieval",
            Self::Drafting => "drafting",
            Self::Reflection => "reflection",
            Self::Done(_) => "done",
        }
    }
}

/// Finished research section with its plan position
#[derive(Debug, Clone)]
pub struct SectionResult {
    pub index: usize,
    pub section: Section,
    pub status: SectionStatus,
    pub rounds: usize,
}

impl SectionResult {
    pub fn outcome(&self) -> SectionOutcome {
        SectionOutcome {
            name: self.section.name.clone(),
            requires_research: self.section.requires_research,
            status: self.status.clone(),
            rounds: self.rounds,
        }
    }
}

pub struct SectionWorker {
    ctx: EngineContext,
    index: usize,
    section: Section,
    sources: SourceSet,
    draft: Option<String>,
    rounds: usize,
}

impl SectionWorker {
    pub fn new(ctx: EngineContext, index: usize, section: Section) -> Self {
        Self {
            ctx,
            index,
            section,
            sources: SourceSet::new(),
            draft: None,
            rounds: 0,
        }
    }

    /// Drive the section to `Done`. Errors only on cancellation.
    #[instrument(name = "section", skip(self), fields(section = %self.section.name, index = self.index))]
    pub async fn run(mut self) -> Result<SectionResult> {
        let max_rounds = self.ctx.config.max_search_depth.saturating_add(1);
        let mut state = WorkerState::QueryGeneration(None);

        let status = loop {
            debug!(state = state.label(), round = self.rounds, "Worker step");
            state = match state {
                WorkerState::QueryGeneration(follow_ups) => {
                    match self.generate_queries(follow_ups).await {
                        Ok(queries) => WorkerState::Retrieval(queries),
                        Err(e) => WorkerState::Done(self.degrade(e, DegradeReason::generation)?),
                    }
                }
                WorkerState::Retrieval(queries) => {
                    self.rounds += 1;
                    match self.ctx.guard(self.ctx.search.search_round(&queries)).await {
                        Ok(found) => {
                            let added = self.sources.extend(found);
                            debug!(round = self.rounds, added, total = self.sources.len(), "Sources merged");
                            WorkerState::Drafting
                        }
                        Err(e) => WorkerState::Done(self.degrade(e, DegradeReason::retrieval)?),
                    }
                }
                WorkerState::Drafting => match self.write_draft().await {
                    Ok(text) => {
                        self.draft = Some(text);
                        WorkerState::Reflection
                    }
                    Err(e) => WorkerState::Done(self.degrade(e, DegradeReason::generation)?),
                },
                WorkerState::Reflection => {
                    let draft = self.draft.as_deref().unwrap_or_default();
                    match SectionReflector::new(&self.ctx).reflect(&self.section, draft).await {
                        Ok(ReflectionVerdict::Satisfied) => WorkerState::Done(SectionStatus::Completed),
                        Ok(ReflectionVerdict::NeedsMoreResearch(_)) if self.rounds >= max_rounds => {
                            info!(rounds = self.rounds, "Search depth exhausted without a passing grade");
                            WorkerState::Done(SectionStatus::degraded(DegradeReason::DepthExhausted))
                        }
                        Ok(ReflectionVerdict::NeedsMoreResearch(follow_ups)) => {
                            WorkerState::QueryGeneration(Some(follow_ups))
                        }
                        Err(e) => WorkerState::Done(self.degrade(e, DegradeReason::generation)?),
                    }
                }
                WorkerState::Done(status) => break status,
            };
        };

        self.section.content = self
            .draft
            .take()
            .unwrap_or_else(|| RESEARCH_UNAVAILABLE.to_string());

        info!(rounds = self.rounds, degraded = status.is_degraded(), "Section done");
        Ok(SectionResult {
            index: self.index,
            section: self.section,
            status,
            rounds: self.rounds,
        })
    }

    async fn generate_queries(&self, follow_ups: Option<Vec<String>>) -> Result<Vec<String>> {
        let formatter = QueryFormatter::new(&self.ctx);
        match follow_ups {
            None => formatter.initial(&self.section).await,
            Some(follow_ups) => {
                formatter
                    .refine(&self.section, follow_ups, self.draft.as_deref())
                    .await
            }
        }
    }

    async fn write_draft(&self) -> Result<String> {
        let sources = self.ctx.format_sources(&self.sources);
        let prompt = prompts::draft_section(
            &self.ctx.topic,
            &self.section,
            &sources,
            self.draft.as_deref(),
        );
        self.ctx
            .guard(self.ctx.models.generate_text(&prompt, ModelRole::Writer))
            .await
    }

    /// Contain a section-local failure; cancellation still propagates
    fn degrade(
        &self,
        err: ReportError,
        reason: fn(&ReportError) -> DegradeReason,
    ) -> Result<SectionStatus> {
        if err.is_cancelled() {
            return Err(err);
        }

        let reason = reason(&err);
        warn!(
            "{}",
            ReportError::SectionDegraded {
                section: self.section.name.clone(),
                reason: reason.to_string(),
            }
        );
        Ok(SectionStatus::degraded(reason))
    }
}
