//! Resume Command
//!
//! Continue a run paused for plan review.
//!
//! Usage:
//!   deepreport resume --approve
//!   deepreport resume --feedback "Merge the two benchmark sections"
//!   deepreport resume --token path/to/review.json --approve

use std::fs;
use std::path::PathBuf;

use tokio::runtime::Runtime;
use tracing::info;

use crate::cli::ui::Output;
use crate::cli::util::{
    ReviewFile, cancel_on_ctrl_c, default_review_path, emit_outcome, resolve_configuration,
};
use crate::report::{ReportPipeline, ReviewDecision, RunOutcome, RunProgress, RunStatus};
use crate::types::{ReportError, Result};

#[derive(Debug, Clone, Default)]
pub struct ResumeOptions {
    /// Review file written by `run --review`
    pub token: Option<PathBuf>,
    pub approve: bool,
    pub feedback: Option<String>,
    pub output: Option<PathBuf>,
}

impl ResumeOptions {
    fn decision(&self) -> Result<ReviewDecision> {
        match (&self.feedback, self.approve) {
            (Some(_), true) => Err(ReportError::Config(
                "Use either --approve or --feedback, not both".to_string(),
            )),
            (Some(note), false) if note.trim().is_empty() => {
                Err(ReportError::Config("Feedback must not be empty".to_string()))
            }
            (Some(note), false) => Ok(ReviewDecision::Revise(note.trim().to_string())),
            (None, true) => Ok(ReviewDecision::Approve),
            (None, false) => Err(ReportError::Config(
                "Pass --approve to run the plan or --feedback to revise it".to_string(),
            )),
        }
    }
}

/// Returns the run status; `None` when a revised plan awaits review again
pub fn run(options: ResumeOptions) -> Result<Option<RunStatus>> {
    let output = Output::new();
    let decision = options.decision()?;
    let review_path = options.token.clone().unwrap_or_else(default_review_path);

    let review = ReviewFile::load(&review_path)?;
    let token = review.token()?;

    let mut configuration = resolve_configuration(&review.request)?;
    configuration.plan_review = true;

    let pipeline = ReportPipeline::with_run_id(configuration, token.run_id.clone())?;
    info!(run_id = %pipeline.run_id(), ?decision, "Resuming report run");

    let rt = Runtime::new()?;
    let progress = rt.block_on(async {
        let cancel = cancel_on_ctrl_c();
        pipeline.resume(token, decision, cancel).await
    });

    let outcome = match progress {
        Ok(RunProgress::AwaitingReview(token)) => {
            output.plan(&token.plan);
            ReviewFile::new(review.request, &token)?.save(&review_path)?;
            output.info(&format!("Revised plan saved for review: {}", review_path.display()));
            return Ok(None);
        }
        Ok(RunProgress::Completed(report)) => {
            if let Err(e) = fs::remove_file(&review_path) {
                output.warning(&format!("Could not remove {}: {}", review_path.display(), e));
            }
            RunOutcome::from_report(pipeline.run_id().clone(), report)
        }
        Err(e) => RunOutcome::from_error(pipeline.run_id().clone(), &e),
    };

    let outcome = outcome.with_metrics(pipeline.metrics().summary());
    output.outcome(&outcome);
    emit_outcome(&outcome, options.output.as_deref())?;
    Ok(Some(outcome.status))
}
