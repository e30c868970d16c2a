//! Retrieval rounds over a search provider.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info, warn};

use super::{SearchOptions, SharedSearchProvider, SourceSet};
use crate::ai::{RetryPolicy, SharedMetrics, with_retry};
use crate::types::{ReportError, Result};

/// Search port used by the report engine: one call per retrieval round
#[derive(Clone)]
pub struct SearchClient {
    provider: SharedSearchProvider,
    options: Arc<SearchOptions>,
    max_results_per_round: usize,
    retry: RetryPolicy,
    metrics: SharedMetrics,
}

impl SearchClient {
    pub fn new(
        provider: SharedSearchProvider,
        options: SearchOptions,
        max_results_per_round: usize,
        retry: RetryPolicy,
        metrics: SharedMetrics,
    ) -> Self {
        Self {
            provider,
            options: Arc::new(options),
            max_results_per_round,
            retry,
            metrics,
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Issue every query concurrently, then merge in query order, deduplicate
    /// by source id and truncate to the round budget.
    ///
    /// Failed queries are skipped; the round fails only when every query does.
    pub async fn search_round(&self, queries: &[String]) -> Result<SourceSet> {
        if queries.is_empty() {
            return Ok(SourceSet::new());
        }

        debug!(provider = self.provider.name(), ?queries, "Starting retrieval round");

        let outcomes = join_all(queries.iter().map(|query| self.search_one(query))).await;

        let mut sources = SourceSet::new();
        let mut first_error: Option<ReportError> = None;
        let mut failed = 0usize;

        for (query, outcome) in queries.iter().zip(outcomes) {
            match outcome {
                Ok(results) => {
                    sources.extend(results);
                }
                Err(e) => {
                    warn!("Search query '{}' failed after retries: {}", query, e);
                    failed += 1;
                    first_error.get_or_insert(e);
                }
            }
        }

        if failed == queries.len()
            && let Some(err) = first_error
        {
            return Err(err);
        }

        sources.truncate(self.max_results_per_round);
        info!(
            provider = self.provider.name(),
            queries = queries.len(),
            failed,
            sources = sources.len(),
            "Retrieval round complete"
        );
        Ok(sources)
    }

    async fn search_one(&self, query: &str) -> Result<Vec<super::SearchResult>> {
        let provider = &self.provider;
        let options = self.options.as_ref();
        let metrics = &self.metrics;
        let operation = format!("{} search", provider.name());

        with_retry(self.retry, &operation, move || async move {
            let outcome = provider.search(query, options).await;
            metrics.record_search(outcome.is_ok());
            outcome
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::create_shared_metrics;
    use crate::report::testing::ScriptedSearch;
    use crate::types::{ErrorCategory, ErrorKind};
    use std::time::Duration;

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_retries: 2,
            min_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        }
    }

    fn client(search: ScriptedSearch, budget: usize) -> SearchClient {
        SearchClient::new(
            Arc::new(search),
            SearchOptions::new(),
            budget,
            fast_retry(),
            create_shared_metrics("test"),
        )
    }

    #[tokio::test]
    async fn test_round_merges_and_dedups_overlapping_queries() {
        let search = ScriptedSearch::new()
            .with_results("q1", &["a", "b", "c"])
            .with_results("q2", &["b", "c", "d"]);
        let client = client(search, 10);

        let sources = client
            .search_round(&["q1".to_string(), "q2".to_string()])
            .await
            .unwrap();

        let ids: Vec<&str> = sources.iter().map(|s| s.source_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c", "d"]);
    }

    #[tokio::test]
    async fn test_round_truncates_to_budget() {
        let search = ScriptedSearch::new().with_results("q", &["a", "b", "c", "d"]);
        let sources = client(search, 2)
            .search_round(&["q".to_string()])
            .await
            .unwrap();
        assert_eq!(sources.len(), 2);
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_successful_queries() {
        let search = ScriptedSearch::new()
            .with_results("good", &["a"])
            .failing_query("bad", ErrorCategory::Unavailable);
        let sources = client(search, 10)
            .search_round(&["good".to_string(), "bad".to_string()])
            .await
            .unwrap();
        assert_eq!(sources.len(), 1);
    }

    #[tokio::test]
    async fn test_all_queries_failing_fails_round() {
        let search = ScriptedSearch::new().failing_query("bad", ErrorCategory::Unavailable);
        let search_handle = search.clone();
        let err = client(search, 10)
            .search_round(&["bad".to_string()])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProviderUnavailable);
        // First attempt plus two retries
        assert_eq!(search_handle.calls_for("bad"), 3);
    }
}
