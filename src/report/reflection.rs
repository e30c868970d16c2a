//! Section Reflector: grades a draft against its goal.

use tracing::debug;

use super::context::EngineContext;
use super::prompts;
use super::queries::normalize_queries;
use super::schemas::{Feedback, Grade, feedback_schema};
use super::types::{ReflectionVerdict, Section};
use crate::ai::ModelRole;
use crate::types::Result;

pub struct SectionReflector<'a> {
    ctx: &'a EngineContext,
}

impl<'a> SectionReflector<'a> {
    pub fn new(ctx: &'a EngineContext) -> Self {
        Self { ctx }
    }

    /// Grade with the planner model; follow-ups are capped at `number_of_queries`
    pub async fn reflect(&self, section: &Section, draft: &str) -> Result<ReflectionVerdict> {
        let limit = self.ctx.config.number_of_queries;
        let prompt = prompts::reflect_section(&self.ctx.topic, section, draft, limit);

        let feedback: Feedback = self
            .ctx
            .guard(
                self.ctx
                    .models
                    .generate_structured(&prompt, &feedback_schema(), ModelRole::Planner),
            )
            .await?;

        let verdict = match feedback.grade {
            Grade::Pass => ReflectionVerdict::Satisfied,
            Grade::Fail => {
                ReflectionVerdict::NeedsMoreResearch(normalize_queries(feedback.follow_up_queries, limit))
            }
        };
        debug!(section = %section.name, ?verdict, "Reflection verdict");
        Ok(verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::testing::{ScriptedModel, ScriptedSearch, context};

    #[tokio::test]
    async fn test_pass_is_satisfied() {
        let model = ScriptedModel::new().reply(r#"{"grade": "pass", "follow_up_queries": []}"#);
        let ctx = context(model, ScriptedSearch::new(), 2, 1);
        let verdict = SectionReflector::new(&ctx)
            .reflect(&Section::new("A", "goal", true), "draft")
            .await
            .unwrap();
        assert_eq!(verdict, ReflectionVerdict::Satisfied);
    }

    #[tokio::test]
    async fn test_fail_truncates_follow_ups() {
        let model = ScriptedModel::new().reply(
            r#"{"grade": "fail", "follow_up_queries": ["q1", "", "q2", "q3"]}"#,
        );
        let ctx = context(model, ScriptedSearch::new(), 2, 1);
        let verdict = SectionReflector::new(&ctx)
            .reflect(&Section::new("A", "goal", true), "draft")
            .await
            .unwrap();
        assert_eq!(
            verdict,
            ReflectionVerdict::NeedsMoreResearch(vec!["q1".to_string(), "q2".to_string()])
        );
    }
}
