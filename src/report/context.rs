//! Shared, read-only state for one run.

use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::types::Topic;
use crate::ai::ModelRouter;
use crate::config::ReportConfiguration;
use crate::search::{SearchClient, SourceSet};
use crate::types::{ReportError, Result};

/// Everything a stage needs; cloned into each section worker
#[derive(Clone)]
pub struct EngineContext {
    pub topic: Topic,
    pub config: Arc<ReportConfiguration>,
    pub models: ModelRouter,
    pub search: SearchClient,
    pub cancel: CancellationToken,
}

impl EngineContext {
    /// Run an external call, aborting it when the run is cancelled
    pub async fn guard<T>(&self, call: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ReportError::Cancelled),
            outcome = call => outcome,
        }
    }

    pub fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(ReportError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Render sources for a prompt with the configured raw-content budget
    pub fn format_sources(&self, sources: &SourceSet) -> String {
        sources.format(
            self.config.max_tokens_per_source,
            self.config.include_raw_content,
        )
    }
}
