//! Parallel Executor: runs research sections concurrently behind a join barrier.

use futures::StreamExt;
use tracing::{info, warn};

use super::context::EngineContext;
use super::types::SectionPlan;
use super::worker::{SectionResult, SectionWorker};
use crate::types::{ReportError, Result};

pub struct ParallelExecutor<'a> {
    ctx: &'a EngineContext,
}

impl<'a> ParallelExecutor<'a> {
    pub fn new(ctx: &'a EngineContext) -> Self {
        Self { ctx }
    }

    /// Dispatch one worker per research section and wait for all of them.
    ///
    /// Results come back in plan order whatever order workers finish in.
    /// A degraded worker never cancels its siblings; cancellation of the run
    /// is reported once every worker has stopped.
    pub async fn execute(&self, plan: &SectionPlan) -> Result<Vec<SectionResult>> {
        let indices = plan.research_indices();
        if indices.is_empty() {
            return Ok(Vec::new());
        }

        let concurrency = self.ctx.config.max_concurrency.max(1);
        info!(sections = indices.len(), concurrency, "Dispatching section workers");

        let mut stream = futures::stream::iter(indices.iter().copied())
            .map(|index| {
                let worker = SectionWorker::new(
                    self.ctx.clone(),
                    index,
                    plan.sections()[index].clone(),
                );
                worker.run()
            })
            .buffer_unordered(concurrency);

        let mut slots: Vec<Option<SectionResult>> = vec![None; plan.len()];
        let mut cancelled = false;

        while let Some(outcome) = stream.next().await {
            match outcome {
                Ok(result) => {
                    let index = result.index;
                    slots[index] = Some(result);
                }
                Err(e) if e.is_cancelled() => cancelled = true,
                Err(e) => warn!("Section worker failed unexpectedly: {}", e),
            }
        }

        if cancelled {
            return Err(ReportError::Cancelled);
        }

        let results: Vec<SectionResult> = slots.into_iter().flatten().collect();
        info!(completed = results.len(), "All section workers joined");
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::testing::{ModelCall, ScriptedModel, ScriptedSearch, Stage, context};
    use crate::report::types::Section;
    use std::time::Duration;

    fn model() -> ScriptedModel {
        ScriptedModel::with_handler(|call: &ModelCall| {
            let section = call.section.clone().unwrap_or_default();
            Ok(match call.stage {
                Stage::SectionQueries => format!(r#"{{"queries": ["{} query"]}}"#, section),
                Stage::Draft => format!("## {}\n\nbody", section),
                _ => r#"{"grade": "pass", "follow_up_queries": []}"#.to_string(),
            })
        })
    }

    #[tokio::test]
    async fn test_results_follow_plan_order_not_completion_order() {
        // Earlier sections take longer, so workers finish in reverse order
        let search = ScriptedSearch::new()
            .delay_query("A query", Duration::from_millis(60))
            .delay_query("B query", Duration::from_millis(30));
        let ctx = context(model(), search, 1, 0);
        let plan = SectionPlan::new(vec![
            Section::new("Intro", "framing", false),
            Section::new("A", "first", true),
            Section::new("B", "second", true),
            Section::new("C", "third", true),
        ])
        .unwrap();

        let results = ParallelExecutor::new(&ctx).execute(&plan).await.unwrap();
        let order: Vec<(usize, &str)> = results
            .iter()
            .map(|r| (r.index, r.section.name.as_str()))
            .collect();
        assert_eq!(order, vec![(1, "A"), (2, "B"), (3, "C")]);
    }

    #[tokio::test]
    async fn test_cancellation_reported_after_join() {
        let search = ScriptedSearch::new().delay_query("A query", Duration::from_secs(30));
        let ctx = context(model(), search, 1, 0);
        let plan = SectionPlan::new(vec![Section::new("A", "first", true)]).unwrap();

        let cancel = ctx.cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            cancel.cancel();
        });

        let err = ParallelExecutor::new(&ctx).execute(&plan).await.unwrap_err();
        assert!(err.is_cancelled());
    }
}
