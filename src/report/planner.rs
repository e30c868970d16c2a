//! Planner: grounds the topic with a search pass, then asks for a section plan.

use tracing::{debug, info, instrument, warn};

use super::context::EngineContext;
use super::prompts;
use super::queries::QueryFormatter;
use super::schemas::{PlannedSections, sections_schema};
use super::types::{Section, SectionPlan};
use crate::ai::{ModelRole, corrective_prompt};
use crate::search::SourceSet;
use crate::types::{ReportError, Result};

pub struct Planner<'a> {
    ctx: &'a EngineContext,
}

impl<'a> Planner<'a> {
    pub fn new(ctx: &'a EngineContext) -> Self {
        Self { ctx }
    }

    /// Produce a validated plan.
    ///
    /// `feedback` holds every review note so far, oldest first. A rejected
    /// plan (bad shape, empty, duplicate names) gets one corrective attempt;
    /// a second rejection is `PlanningFailed`. Outages keep their own kind.
    #[instrument(name = "planner", skip_all, fields(topic = %self.ctx.topic, feedback = feedback.len()))]
    pub async fn plan(&self, feedback: &[String]) -> Result<SectionPlan> {
        let sources = self.ground().await?;
        let prompt = prompts::plan_sections(
            &self.ctx.topic,
            &self.ctx.config.report_structure,
            &self.ctx.format_sources(&sources),
            feedback,
        );

        let mut plan = match self.attempt(&prompt).await {
            Err(ReportError::StructuredOutputRejected { message, .. }) => {
                warn!("Plan rejected, retrying with correction: {}", message);
                let corrected = corrective_prompt(&prompt, &message);
                match self.attempt(&corrected).await {
                    Err(ReportError::StructuredOutputRejected { message, .. }) => {
                        return Err(ReportError::PlanningFailed(message));
                    }
                    other => other?,
                }
            }
            other => other?,
        };

        if self.ctx.config.research_all_sections {
            plan.force_research();
        }

        info!(
            sections = plan.len(),
            research = plan.research_indices().len(),
            "Plan ready"
        );
        Ok(plan)
    }

    /// Exploratory search pass; an outage leaves the plan ungrounded rather than failing
    async fn ground(&self) -> Result<SourceSet> {
        let queries = match QueryFormatter::new(self.ctx).planning().await {
            Ok(queries) => queries,
            Err(e) if e.is_cancelled() => return Err(e),
            Err(e) => {
                warn!("Planning queries failed, searching the topic instead: {}", e);
                vec![self.ctx.topic.as_str().to_string()]
            }
        };
        debug!(?queries, "Planning queries");

        match self.ctx.guard(self.ctx.search.search_round(&queries)).await {
            Ok(sources) => Ok(sources),
            Err(e) if e.is_cancelled() => Err(e),
            Err(e) => {
                warn!("Planning search failed, planning without sources: {}", e);
                Ok(SourceSet::new())
            }
        }
    }

    async fn attempt(&self, prompt: &str) -> Result<SectionPlan> {
        let planned: PlannedSections = self
            .ctx
            .guard(self.ctx.models.generate_structured_once(
                prompt,
                &sections_schema(),
                ModelRole::Planner,
            ))
            .await?;

        SectionPlan::new(planned.sections.into_iter().map(Section::from).collect())
    }
}
