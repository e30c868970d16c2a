//! Run Metrics Collection
//!
//! Per-run counters for model and search usage. Thread-safe for concurrent
//! section workers; one collector belongs to exactly one run.
//!
//! ## Usage
//!
//! ```ignore
//! let metrics = create_shared_metrics(run_id.as_str());
//! metrics.record_response(&response);
//! info!("{}", metrics.summary().display());
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Instant;

use serde::Serialize;

use crate::ai::provider::LlmResponse;

/// Lock-free counters for one run
pub struct RunMetrics {
    run_id: String,
    start_time: Instant,
    model_calls: AtomicU32,
    model_failures: AtomicU32,
    search_calls: AtomicU32,
    search_failures: AtomicU32,
    input_tokens: AtomicU64,
    output_tokens: AtomicU64,
    total_latency_ms: AtomicU64,
}

/// Snapshot of run counters
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSummary {
    pub run_id: String,
    pub total_duration_ms: u64,
    pub model_calls: u32,
    pub model_failures: u32,
    pub search_calls: u32,
    pub search_failures: u32,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    pub avg_model_latency_ms: f64,
}

impl RunMetrics {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            start_time: Instant::now(),
            model_calls: AtomicU32::new(0),
            model_failures: AtomicU32::new(0),
            search_calls: AtomicU32::new(0),
            search_failures: AtomicU32::new(0),
            input_tokens: AtomicU64::new(0),
            output_tokens: AtomicU64::new(0),
            total_latency_ms: AtomicU64::new(0),
        }
    }

    /// Record a successful model response
    pub fn record_response(&self, response: &LlmResponse) {
        self.model_calls.fetch_add(1, Ordering::Relaxed);
        self.input_tokens
            .fetch_add(response.usage.input_tokens as u64, Ordering::Relaxed);
        self.output_tokens
            .fetch_add(response.usage.output_tokens as u64, Ordering::Relaxed);
        self.total_latency_ms
            .fetch_add(response.timing.total_ms, Ordering::Relaxed);
    }

    /// Record a model attempt that returned an error
    pub fn record_model_failure(&self) {
        self.model_calls.fetch_add(1, Ordering::Relaxed);
        self.model_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one search query attempt
    pub fn record_search(&self, succeeded: bool) {
        self.search_calls.fetch_add(1, Ordering::Relaxed);
        if !succeeded {
            self.search_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        let model_calls = self.model_calls.load(Ordering::Relaxed);
        let model_failures = self.model_failures.load(Ordering::Relaxed);
        let input_tokens = self.input_tokens.load(Ordering::Relaxed);
        let output_tokens = self.output_tokens.load(Ordering::Relaxed);
        let total_latency = self.total_latency_ms.load(Ordering::Relaxed);
        let successes = model_calls.saturating_sub(model_failures);

        MetricsSummary {
            run_id: self.run_id.clone(),
            total_duration_ms: self.start_time.elapsed().as_millis() as u64,
            model_calls,
            model_failures,
            search_calls: self.search_calls.load(Ordering::Relaxed),
            search_failures: self.search_failures.load(Ordering::Relaxed),
            input_tokens,
            output_tokens,
            total_tokens: input_tokens + output_tokens,
            avg_model_latency_ms: if successes > 0 {
                total_latency as f64 / successes as f64
            } else {
                0.0
            },
        }
    }
}

impl MetricsSummary {
    /// Format summary for display
    pub fn display(&self) -> String {
        format!(
            "Run: {}\n\
             Duration: {:.1}s\n\
             Model calls: {} ({} failed)\n\
             Search calls: {} ({} failed)\n\
             Tokens: {} (input: {}, output: {})\n\
             Avg model latency: {:.0}ms",
            self.run_id,
            self.total_duration_ms as f64 / 1000.0,
            self.model_calls,
            self.model_failures,
            self.search_calls,
            self.search_failures,
            self.total_tokens,
            self.input_tokens,
            self.output_tokens,
            self.avg_model_latency_ms
        )
    }
}

/// Shared metrics collector for one run
pub type SharedMetrics = Arc<RunMetrics>;

pub fn create_shared_metrics(run_id: impl Into<String>) -> SharedMetrics {
    Arc::new(RunMetrics::new(run_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::provider::{ResponseMetadata, ResponseTiming, TokenUsage};

    #[test]
    fn test_record_response() {
        let metrics = RunMetrics::new("test-run");
        let response = LlmResponse::with_metrics(
            "text".to_string(),
            TokenUsage::new(100, 50),
            ResponseTiming { total_ms: 500 },
            ResponseMetadata {
                model: "claude-3-5-sonnet-latest".to_string(),
                provider: "anthropic".to_string(),
            },
        );

        metrics.record_response(&response);
        metrics.record_model_failure();
        metrics.record_search(true);
        metrics.record_search(false);

        let summary = metrics.summary();
        assert_eq!(summary.model_calls, 2);
        assert_eq!(summary.model_failures, 1);
        assert_eq!(summary.search_calls, 2);
        assert_eq!(summary.search_failures, 1);
        assert_eq!(summary.total_tokens, 150);
        assert!((summary.avg_model_latency_ms - 500.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_concurrent_recording() {
        use std::thread;

        let metrics = create_shared_metrics("concurrent-test");
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let m = Arc::clone(&metrics);
                thread::spawn(move || {
                    for _ in 0..100 {
                        m.record_search(true);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(metrics.summary().search_calls, 800);
    }

    #[test]
    fn test_summary_display() {
        let metrics = RunMetrics::new("display-test");
        let display = metrics.summary().display();
        assert!(display.contains("display-test"));
        assert!(display.contains("Model calls: 0"));
    }
}
