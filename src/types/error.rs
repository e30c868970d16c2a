//! Unified Error Type System
//!
//! Centralized error types for the report engine.
//! Provides provider error classification for retry decisions and a stable
//! error kind for the boundary caller.
//!
//! ## Error Categories
//!
//! - **Transient**: Temporary server issues (retry)
//! - **RateLimit**: API rate limiting (wait and retry)
//! - **Network**: Connectivity issues (retry with backoff)
//! - **Unavailable**: Provider unavailable (retry with backoff)
//! - **Auth / BadRequest**: Rejected configuration (fail fast)
//!
//! ## Error Kinds
//!
//! Every `ReportError` maps onto one `ErrorKind`, which is what the boundary
//! reports alongside a failed or degraded run.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// Error Categories
// =============================================================================

/// Provider failure categories used for local retry decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Rate limited - wait then retry
    RateLimit,
    /// Authentication failed - fail fast, don't retry
    Auth,
    /// Network/connectivity issues - retry with backoff
    Network,
    /// Provider unavailable (5xx, not found) - retry with backoff
    Unavailable,
    /// Invalid request - don't retry, fix request
    BadRequest,
    /// Response body could not be decoded
    ParseError,
    /// Temporary server issues - retry
    Transient,
    /// Unknown error - no retry
    Unknown,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RateLimit => write!(f, "RATE_LIMIT"),
            Self::Auth => write!(f, "AUTH"),
            Self::Network => write!(f, "NETWORK"),
            Self::Unavailable => write!(f, "UNAVAILABLE"),
            Self::BadRequest => write!(f, "BAD_REQUEST"),
            Self::ParseError => write!(f, "PARSE_ERROR"),
            Self::Transient => write!(f, "TRANSIENT"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl ErrorCategory {
    /// Check if this category is retryable at the call site
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimit | Self::Network | Self::Transient | Self::Unavailable
        )
    }

    /// Check if the provider rejected its configuration (auth, index, request shape)
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Auth | Self::BadRequest)
    }
}

// =============================================================================
// Provider Error
// =============================================================================

/// Failure reported by a model or search provider, with category and retry hints
#[derive(Debug, Clone)]
pub struct ProviderError {
    /// Error category for retry decisions
    pub category: ErrorCategory,
    /// Detailed error message
    pub message: String,
    /// Provider that produced the error
    pub provider: Option<String>,
    /// Wait time the provider asked for, when it sent one
    pub retry_after: Option<Duration>,
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(provider) = &self.provider {
            write!(f, "[{}:{}] {}", provider, self.category, self.message)
        } else {
            write!(f, "[{}] {}", self.category, self.message)
        }
    }
}

impl std::error::Error for ProviderError {}

impl ProviderError {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            provider: None,
            retry_after: None,
        }
    }

    pub fn with_provider(
        category: ErrorCategory,
        message: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            category,
            message: message.into(),
            provider: Some(provider.into()),
            retry_after: None,
        }
    }

    /// Add suggested retry delay
    pub fn retry_after(mut self, duration: Duration) -> Self {
        self.retry_after = Some(duration);
        self
    }

    pub fn is_retryable(&self) -> bool {
        self.category.is_retryable()
    }
}

// =============================================================================
// Error Classifier
// =============================================================================

/// Maps transport and HTTP failures onto error categories
pub struct ErrorClassifier;

impl ErrorClassifier {
    /// Classify an error message from any provider
    pub fn classify(message: &str, provider: &str) -> ProviderError {
        let lower = message.to_lowercase();

        if lower.contains("rate limit")
            || lower.contains("429")
            || lower.contains("too many requests")
            || lower.contains("quota exceeded")
        {
            return ProviderError::with_provider(ErrorCategory::RateLimit, message, provider)
                .retry_after(Duration::from_secs(30));
        }

        if lower.contains("401")
            || lower.contains("403")
            || lower.contains("api key")
            || lower.contains("unauthorized")
            || lower.contains("permission denied")
        {
            return ProviderError::with_provider(ErrorCategory::Auth, message, provider);
        }

        if lower.contains("connection")
            || lower.contains("dns")
            || lower.contains("timeout")
            || lower.contains("timed out")
            || lower.contains("unreachable")
        {
            return ProviderError::with_provider(ErrorCategory::Network, message, provider)
                .retry_after(Duration::from_secs(5));
        }

        if lower.contains("503")
            || lower.contains("502")
            || lower.contains("service unavailable")
            || lower.contains("overloaded")
            || lower.contains("internal error")
        {
            return ProviderError::with_provider(ErrorCategory::Unavailable, message, provider);
        }

        if lower.contains("400") || lower.contains("bad request") || lower.contains("malformed") {
            return ProviderError::with_provider(ErrorCategory::BadRequest, message, provider);
        }

        ProviderError::with_provider(ErrorCategory::Unknown, message, provider)
    }

    /// Classify HTTP status code directly (more accurate than string matching)
    pub fn classify_http_status(status: u16, message: &str, provider: &str) -> ProviderError {
        match status {
            429 => ProviderError::with_provider(ErrorCategory::RateLimit, message, provider)
                .retry_after(Duration::from_secs(30)),
            401 | 403 => ProviderError::with_provider(ErrorCategory::Auth, message, provider),
            400 | 404 | 422 => {
                ProviderError::with_provider(ErrorCategory::BadRequest, message, provider)
            }
            408 => ProviderError::with_provider(ErrorCategory::Network, message, provider),
            500 | 502 | 503 | 504 | 529 => {
                ProviderError::with_provider(ErrorCategory::Unavailable, message, provider)
                    .retry_after(Duration::from_secs(5))
            }
            _ => ProviderError::with_provider(ErrorCategory::Unknown, message, provider),
        }
    }

    /// Classify a reqwest transport failure
    pub fn classify_request(err: &reqwest::Error, provider: &str) -> ProviderError {
        if err.is_timeout() || err.is_connect() {
            return ProviderError::with_provider(
                ErrorCategory::Network,
                format!("{} request failed: {}", provider, err),
                provider,
            );
        }
        if err.is_decode() {
            return ProviderError::with_provider(
                ErrorCategory::ParseError,
                format!("{} response could not be decoded: {}", provider, err),
                provider,
            );
        }
        if let Some(status) = err.status() {
            return Self::classify_http_status(status.as_u16(), &err.to_string(), provider);
        }
        Self::classify(&err.to_string(), provider)
    }
}

// =============================================================================
// Boundary Error Kind
// =============================================================================

/// Stable error category reported to the boundary caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    ConfigurationError,
    PlanningFailed,
    ProviderUnavailable,
    ProviderRejected,
    ModelUnavailable,
    StructuredOutputRejected,
    SectionDegraded,
    Cancelled,
    Internal,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::ConfigurationError => "ConfigurationError",
            Self::PlanningFailed => "PlanningFailed",
            Self::ProviderUnavailable => "ProviderUnavailable",
            Self::ProviderRejected => "ProviderRejected",
            Self::ModelUnavailable => "ModelUnavailable",
            Self::StructuredOutputRejected => "StructuredOutputRejected",
            Self::SectionDegraded => "SectionDegraded",
            Self::Cancelled => "Cancelled",
            Self::Internal => "Internal",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Application Error
// =============================================================================

#[derive(Debug, Error)]
pub enum ReportError {
    // -------------------------------------------------------------------------
    // System Errors (auto From impl)
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // -------------------------------------------------------------------------
    // Port Errors
    // -------------------------------------------------------------------------
    /// Language model call failed
    #[error("Model error: {0}")]
    Model(ProviderError),

    /// Search provider call failed
    #[error("Search error: {0}")]
    Search(ProviderError),

    /// Model output did not match the requested schema
    #[error("Structured output rejected for {schema}: {message}")]
    StructuredOutputRejected { schema: String, message: String },

    // -------------------------------------------------------------------------
    // Run Errors
    // -------------------------------------------------------------------------
    #[error("Config error: {0}")]
    Config(String),

    #[error("Planning failed: {0}")]
    PlanningFailed(String),

    #[error("Section '{section}' degraded: {reason}")]
    SectionDegraded { section: String, reason: String },

    #[error("Run cancelled")]
    Cancelled,

    #[error("Invalid resume token: {0}")]
    ResumeToken(String),
}

impl From<ProviderError> for ReportError {
    fn from(err: ProviderError) -> Self {
        ReportError::Model(err)
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;

impl ReportError {
    /// Create a model error with category
    pub fn model(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self::Model(ProviderError::new(category, message))
    }

    /// Create a search error attributed to a provider
    pub fn search(
        category: ErrorCategory,
        message: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self::Search(ProviderError::with_provider(category, message, provider))
    }

    pub fn structured(schema: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StructuredOutputRejected {
            schema: schema.into(),
            message: message.into(),
        }
    }

    /// Check if this error may succeed on a local retry
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Model(e) | Self::Search(e) => e.is_retryable(),
            _ => false,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Map to the stable boundary category
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) | Self::ResumeToken(_) => ErrorKind::ConfigurationError,
            Self::PlanningFailed(_) => ErrorKind::PlanningFailed,
            Self::Model(_) => ErrorKind::ModelUnavailable,
            Self::Search(e) if e.category.is_rejection() => ErrorKind::ProviderRejected,
            Self::Search(_) => ErrorKind::ProviderUnavailable,
            Self::StructuredOutputRejected { .. } => ErrorKind::StructuredOutputRejected,
            Self::SectionDegraded { .. } => ErrorKind::SectionDegraded,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Io(_) | Self::Json(_) => ErrorKind::Internal,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category_display() {
        assert_eq!(ErrorCategory::RateLimit.to_string(), "RATE_LIMIT");
        assert_eq!(ErrorCategory::Unavailable.to_string(), "UNAVAILABLE");
        assert_eq!(ErrorCategory::Auth.to_string(), "AUTH");
    }

    #[test]
    fn test_error_category_retryable() {
        assert!(ErrorCategory::RateLimit.is_retryable());
        assert!(ErrorCategory::Network.is_retryable());
        assert!(ErrorCategory::Transient.is_retryable());
        assert!(ErrorCategory::Unavailable.is_retryable());
        assert!(!ErrorCategory::Auth.is_retryable());
        assert!(!ErrorCategory::BadRequest.is_retryable());
        assert!(!ErrorCategory::ParseError.is_retryable());
    }

    #[test]
    fn test_classify_rate_limit() {
        let err = ErrorClassifier::classify("Rate limit exceeded, please retry", "openai");
        assert_eq!(err.category, ErrorCategory::RateLimit);
        assert!(err.is_retryable());
    }

    #[test]
    fn test_classify_auth() {
        let err = ErrorClassifier::classify("Invalid API key provided", "tavily");
        assert_eq!(err.category, ErrorCategory::Auth);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_classify_network() {
        let err = ErrorClassifier::classify("Connection timed out after 30s", "ollama");
        assert_eq!(err.category, ErrorCategory::Network);
        assert!(err.is_retryable());
    }

    #[test]
    fn test_classify_unknown() {
        let err = ErrorClassifier::classify("Something weird happened", "test");
        assert_eq!(err.category, ErrorCategory::Unknown);
    }

    #[test]
    fn test_classify_http_status() {
        let rate_limit = ErrorClassifier::classify_http_status(429, "Rate limited", "test");
        assert_eq!(rate_limit.category, ErrorCategory::RateLimit);

        let auth = ErrorClassifier::classify_http_status(401, "Unauthorized", "test");
        assert_eq!(auth.category, ErrorCategory::Auth);

        let missing_index = ErrorClassifier::classify_http_status(404, "No index", "test");
        assert_eq!(missing_index.category, ErrorCategory::BadRequest);

        let server_error = ErrorClassifier::classify_http_status(503, "Server error", "test");
        assert_eq!(server_error.category, ErrorCategory::Unavailable);
    }

    #[test]
    fn test_provider_error_display() {
        let err =
            ProviderError::with_provider(ErrorCategory::RateLimit, "Too many requests", "openai");
        assert_eq!(err.to_string(), "[openai:RATE_LIMIT] Too many requests");

        let err_no_provider = ProviderError::new(ErrorCategory::Network, "Connection failed");
        assert_eq!(err_no_provider.to_string(), "[NETWORK] Connection failed");
    }

    #[test]
    fn test_search_error_kind_split() {
        let rejected = ReportError::search(ErrorCategory::Auth, "bad key", "azure_ai_search");
        assert_eq!(rejected.kind(), ErrorKind::ProviderRejected);
        assert!(!rejected.is_recoverable());

        let unavailable = ReportError::search(ErrorCategory::Unavailable, "503", "tavily");
        assert_eq!(unavailable.kind(), ErrorKind::ProviderUnavailable);
        assert!(unavailable.is_recoverable());
    }

    #[test]
    fn test_run_error_kinds() {
        assert_eq!(
            ReportError::Config("unknown provider".into()).kind(),
            ErrorKind::ConfigurationError
        );
        assert_eq!(
            ReportError::PlanningFailed("empty plan".into()).kind(),
            ErrorKind::PlanningFailed
        );
        assert_eq!(ReportError::Cancelled.kind(), ErrorKind::Cancelled);
        assert_eq!(
            ReportError::model(ErrorCategory::Network, "down").kind(),
            ErrorKind::ModelUnavailable
        );
        assert_eq!(ErrorKind::StructuredOutputRejected.to_string(), "StructuredOutputRejected");
    }
}
