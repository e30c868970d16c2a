//! Global Constants
//!
//! Centralized constants for configuration and tuning.
//! All magic numbers should be defined here with documentation.

/// Call-site retry constants for model and search calls
pub mod retry {
    /// Maximum retries after the first attempt
    pub const MAX_RETRIES: usize = 3;

    /// Minimum delay for exponential backoff (milliseconds)
    pub const MIN_DELAY_MS: u64 = 500;

    /// Maximum delay between retries (seconds)
    pub const MAX_DELAY_SECS: u64 = 30;
}

/// Language model defaults
pub mod model {
    /// Sampling temperature applied to both roles
    pub const DEFAULT_TEMPERATURE: f32 = 0.7;

    /// Maximum generated tokens per call
    pub const DEFAULT_MAX_TOKENS: usize = 8000;

    /// HTTP timeout for a single generation call (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

    /// Default planner provider and model
    pub const DEFAULT_PLANNER_PROVIDER: &str = "anthropic";
    pub const DEFAULT_PLANNER_MODEL: &str = "claude-3-7-sonnet-latest";

    /// Default writer provider and model
    pub const DEFAULT_WRITER_PROVIDER: &str = "anthropic";
    pub const DEFAULT_WRITER_MODEL: &str = "claude-3-5-sonnet-latest";
}

/// Search and source formatting constants
pub mod search {
    /// Default search backend selector
    pub const DEFAULT_SEARCH_API: &str = "tavily";

    /// Maximum deduplicated results kept per retrieval round
    pub const DEFAULT_MAX_RESULTS_PER_ROUND: usize = 10;

    /// Results requested per query when the option bag does not say otherwise
    pub const DEFAULT_RESULTS_PER_QUERY: usize = 5;

    /// Token budget for one source's raw content in a prompt
    pub const MAX_TOKENS_PER_SOURCE: usize = 4000;

    /// Characters per token used for prompt size estimates
    pub const CHARS_PER_TOKEN: usize = 4;

    /// HTTP timeout for a single search call (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
}

/// Report construction constants
pub mod report {
    /// Queries generated per round
    pub const DEFAULT_NUMBER_OF_QUERIES: usize = 2;

    /// Refinement rounds allowed after the first retrieval round
    pub const DEFAULT_MAX_SEARCH_DEPTH: usize = 2;

    /// Section workers allowed to run concurrently
    pub const DEFAULT_MAX_CONCURRENCY: usize = 8;

    /// Separator between compiled sections
    pub const SECTION_SEPARATOR: &str = "\n\n";

    /// Content frozen into a research section that never produced a draft
    pub const RESEARCH_UNAVAILABLE: &str =
        "_Research for this section was unavailable. No sources could be retrieved or drafted._";

    /// Content frozen into a framing section whose generation failed
    pub const SECTION_UNAVAILABLE: &str = "_This section could not be generated._";

    /// Layout used when the request carries no report structure
    pub const DEFAULT_REPORT_STRUCTURE: &str = r#"Use this structure to create a report on the user-provided topic:

1. Introduction (no research needed)
   - Brief overview of the topic area

2. Main Body Sections:
   - Each section should focus on a sub-topic of the user-provided topic

3. Conclusion (no research needed)
   - Aim for 1 structural element (either a list or table) that distills the main body sections
   - Provide a concise summary of the report"#;
}

/// Plan review resume token constants
pub mod resume {
    /// Current token format version
    pub const TOKEN_VERSION: u32 = 1;
}
