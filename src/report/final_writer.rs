//! Final-Section Writer: framing sections drafted from the joined body.

use tracing::{info, warn};

use super::context::EngineContext;
use super::prompts;
use super::types::{DegradeReason, Section, SectionStatus};
use crate::ai::ModelRole;
use crate::constants::report::SECTION_UNAVAILABLE;
use crate::types::{ReportError, Result};

/// Framing section after drafting
#[derive(Debug, Clone)]
pub struct FinalSection {
    pub index: usize,
    pub section: Section,
    pub status: SectionStatus,
}

pub struct FinalSectionWriter<'a> {
    ctx: &'a EngineContext,
}

impl<'a> FinalSectionWriter<'a> {
    pub fn new(ctx: &'a EngineContext) -> Self {
        Self { ctx }
    }

    /// Write each `(index, section)` in the order given, sequentially.
    ///
    /// `body` is the formatted research body; it must be complete before this
    /// runs. A failed section gets placeholder content and a degraded status.
    pub async fn write_all(
        &self,
        sections: Vec<(usize, Section)>,
        body: &str,
    ) -> Result<Vec<FinalSection>> {
        let mut written = Vec::with_capacity(sections.len());

        for (index, mut section) in sections {
            self.ctx.check_cancelled()?;

            let prompt = prompts::final_section(&self.ctx.topic, &section, body);
            let outcome = self
                .ctx
                .guard(self.ctx.models.generate_text(&prompt, ModelRole::Writer))
                .await;

            let status = match outcome {
                Ok(text) => {
                    section.content = text;
                    SectionStatus::Completed
                }
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => {
                    let reason = DegradeReason::generation(&e);
                    warn!(
                        "{}",
                        ReportError::SectionDegraded {
                            section: section.name.clone(),
                            reason: reason.to_string(),
                        }
                    );
                    section.content = SECTION_UNAVAILABLE.to_string();
                    SectionStatus::degraded(reason)
                }
            };

            info!(section = %section.name, degraded = status.is_degraded(), "Final section written");
            written.push(FinalSection {
                index,
                section,
                status,
            });
        }

        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::testing::{ScriptedModel, ScriptedSearch, Stage, context};
    use crate::types::ErrorCategory;

    #[tokio::test]
    async fn test_writes_in_given_order_with_body_context() {
        let model = ScriptedModel::new().reply("# Intro\n\nhello").reply("## Conclusion\n\nbye");
        let ctx = context(model.clone(), ScriptedSearch::new(), 1, 0);

        let written = FinalSectionWriter::new(&ctx)
            .write_all(
                vec![
                    (0, Section::new("Intro", "framing", false)),
                    (3, Section::new("Conclusion", "wrap up", false)),
                ],
                "RESEARCHED BODY",
            )
            .await
            .unwrap();

        assert_eq!(written[0].index, 0);
        assert_eq!(written[0].section.content, "# Intro\n\nhello");
        assert_eq!(written[1].index, 3);
        assert_eq!(model.calls_for(Stage::FinalSection), 2);
        assert!(model.prompts().iter().all(|p| p.contains("RESEARCHED BODY")));
    }

    #[tokio::test]
    async fn test_failure_degrades_only_that_section() {
        let model = ScriptedModel::new()
            .fail(ErrorCategory::Auth)
            .reply("## Conclusion\n\nbye");
        let ctx = context(model, ScriptedSearch::new(), 1, 0);

        let written = FinalSectionWriter::new(&ctx)
            .write_all(
                vec![
                    (0, Section::new("Intro", "framing", false)),
                    (1, Section::new("Conclusion", "wrap up", false)),
                ],
                "body",
            )
            .await
            .unwrap();

        assert!(written[0].status.is_degraded());
        assert_eq!(written[0].section.content, SECTION_UNAVAILABLE);
        assert_eq!(written[1].status, SectionStatus::Completed);
    }
}
