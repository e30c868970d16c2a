//! Query Formatter: section goals and reflector follow-ups into search queries.

use std::collections::HashSet;

use tracing::{debug, warn};

use super::context::EngineContext;
use super::prompts;
use super::schemas::{QueryBatch, queries_schema};
use super::types::Section;
use crate::ai::ModelRole;
use crate::types::Result;

/// Trim, drop blanks and case-insensitive duplicates, then keep the first `limit`
pub fn normalize_queries(queries: Vec<String>, limit: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    queries
        .into_iter()
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty() && seen.insert(q.to_lowercase()))
        .take(limit)
        .collect()
}

pub struct QueryFormatter<'a> {
    ctx: &'a EngineContext,
}

impl<'a> QueryFormatter<'a> {
    pub fn new(ctx: &'a EngineContext) -> Self {
        Self { ctx }
    }

    fn limit(&self) -> usize {
        self.ctx.config.number_of_queries
    }

    /// Queries for the planner's exploratory search; falls back to the topic itself
    pub async fn planning(&self) -> Result<Vec<String>> {
        let prompt = prompts::planning_queries(
            &self.ctx.topic,
            &self.ctx.config.report_structure,
            self.limit(),
        );
        let generated = self.generate(&prompt).await?;
        Ok(self.or_fallback(generated, self.ctx.topic.as_str().to_string()))
    }

    /// First-round queries for a section
    pub async fn initial(&self, section: &Section) -> Result<Vec<String>> {
        let prompt = prompts::section_queries(&self.ctx.topic, section, self.limit(), None);
        let generated = self.generate(&prompt).await?;
        Ok(self.or_fallback(generated, self.section_fallback(section)))
    }

    /// Refinement queries: the reflector's follow-ups, truncated to the limit.
    ///
    /// When no usable follow-up remains, queries are regenerated from the
    /// previous draft.
    pub async fn refine(
        &self,
        section: &Section,
        follow_ups: Vec<String>,
        previous_draft: Option<&str>,
    ) -> Result<Vec<String>> {
        let follow_ups = normalize_queries(follow_ups, self.limit());
        if !follow_ups.is_empty() {
            return Ok(follow_ups);
        }

        debug!(section = %section.name, "No usable follow-up queries, regenerating from draft");
        let prompt =
            prompts::section_queries(&self.ctx.topic, section, self.limit(), previous_draft);
        let generated = self.generate(&prompt).await?;
        Ok(self.or_fallback(generated, self.section_fallback(section)))
    }

    async fn generate(&self, prompt: &str) -> Result<Vec<String>> {
        let batch: QueryBatch = self
            .ctx
            .guard(
                self.ctx
                    .models
                    .generate_structured(prompt, &queries_schema(), ModelRole::Writer),
            )
            .await?;
        Ok(normalize_queries(batch.queries, self.limit()))
    }

    fn or_fallback(&self, queries: Vec<String>, fallback: String) -> Vec<String> {
        if queries.is_empty() {
            warn!("Model returned no usable queries, searching for '{}'", fallback);
            vec![fallback]
        } else {
            queries
        }
    }

    fn section_fallback(&self, section: &Section) -> String {
        format!("{} {}", self.ctx.topic, section.name)
    }
}
