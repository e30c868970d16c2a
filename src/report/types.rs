//! Report engine data model.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ai::MetricsSummary;
use crate::types::{ErrorKind, ReportError, Result, RunId};

// =============================================================================
// Topic
// =============================================================================

/// Free-form description of the desired report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Topic(String);

impl Topic {
    pub fn new(text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(ReportError::Config("topic must not be empty".to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Sections and Plan
// =============================================================================

/// One titled unit of the report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub name: String,
    /// Goal statement guiding research and drafting
    pub description: String,
    /// False for framing sections written from the finished body
    pub requires_research: bool,
    #[serde(default)]
    pub content: String,
}

impl Section {
    pub fn new(name: impl Into<String>, description: impl Into<String>, requires_research: bool) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            requires_research,
            content: String::new(),
        }
    }
}

/// Ordered sections; position is the section's identity and document order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectionPlan {
    sections: Vec<Section>,
}

impl SectionPlan {
    /// Validate a planned section list.
    ///
    /// Rejects empty plans, blank names and duplicate names (case-insensitive)
    /// as a structured output rejection so the planner can correct it.
    pub fn new(sections: Vec<Section>) -> Result<Self> {
        if sections.is_empty() {
            return Err(ReportError::structured("sections", "the plan contains no sections"));
        }

        let mut seen = HashSet::new();
        for section in &sections {
            let key = section.name.trim().to_lowercase();
            if key.is_empty() {
                return Err(ReportError::structured(
                    "sections",
                    "every section needs a non-empty name",
                ));
            }
            if !seen.insert(key) {
                return Err(ReportError::structured(
                    "sections",
                    format!("duplicate section name '{}'", section.name.trim()),
                ));
            }
        }

        Ok(Self { sections })
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn into_sections(self) -> Vec<Section> {
        self.sections
    }

    /// Positions of sections that need their own research loop
    pub fn research_indices(&self) -> Vec<usize> {
        self.indices(true)
    }

    /// Positions of framing sections written after the join
    pub fn final_indices(&self) -> Vec<usize> {
        self.indices(false)
    }

    fn indices(&self, research: bool) -> Vec<usize> {
        self.sections
            .iter()
            .enumerate()
            .filter(|(_, s)| s.requires_research == research)
            .map(|(i, _)| i)
            .collect()
    }

    /// Route every section through research
    pub fn force_research(&mut self) {
        for section in &mut self.sections {
            section.requires_research = true;
        }
    }
}

// =============================================================================
// Reflection and Section Status
// =============================================================================

/// Reflector grade for one draft
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReflectionVerdict {
    Satisfied,
    NeedsMoreResearch(Vec<String>),
}

/// Why a section finished without a satisfactory draft
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DegradeReason {
    /// Refinement budget spent while the reflector still wanted more research
    DepthExhausted,
    RetrievalFailed { category: ErrorKind, message: String },
    GenerationFailed { category: ErrorKind, message: String },
}

impl DegradeReason {
    pub fn retrieval(err: &ReportError) -> Self {
        Self::RetrievalFailed {
            category: err.kind(),
            message: err.to_string(),
        }
    }

    pub fn generation(err: &ReportError) -> Self {
        Self::GenerationFailed {
            category: err.kind(),
            message: err.to_string(),
        }
    }
}

impl fmt::Display for DegradeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DepthExhausted => write!(f, "search depth exhausted"),
            Self::RetrievalFailed { message, .. } => write!(f, "retrieval failed: {}", message),
            Self::GenerationFailed { message, .. } => write!(f, "generation failed: {}", message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SectionStatus {
    Completed,
    Degraded { reason: DegradeReason },
}

impl SectionStatus {
    pub fn degraded(reason: DegradeReason) -> Self {
        Self::Degraded { reason }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }
}

/// Per-section record in the result surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionOutcome {
    pub name: String,
    pub requires_research: bool,
    pub status: SectionStatus,
    /// Retrieval rounds performed; zero for framing sections
    pub rounds: usize,
}

// =============================================================================
// Report and Run Outcome
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Partial,
    Failed,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Partial => write!(f, "partial"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Compiled document plus per-section status
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    /// Markdown document, sections in plan order
    pub content: String,
    pub sections: Vec<SectionOutcome>,
}

impl Report {
    /// `partial` when any section degraded
    pub fn status(&self) -> RunStatus {
        if self.sections.iter().any(|s| s.status.is_degraded()) {
            RunStatus::Partial
        } else {
            RunStatus::Success
        }
    }
}

/// Boundary result surface
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub run_id: RunId,
    pub status: RunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_category: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub sections: Vec<SectionOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<MetricsSummary>,
    pub finished_at: DateTime<Utc>,
}

impl RunOutcome {
    pub fn from_report(run_id: RunId, report: Report) -> Self {
        Self {
            run_id,
            status: report.status(),
            report: Some(report.content),
            error_category: None,
            error: None,
            sections: report.sections,
            metrics: None,
            finished_at: Utc::now(),
        }
    }

    pub fn from_error(run_id: RunId, err: &ReportError) -> Self {
        Self {
            run_id,
            status: RunStatus::Failed,
            report: None,
            error_category: Some(err.kind()),
            error: Some(err.to_string()),
            sections: Vec::new(),
            metrics: None,
            finished_at: Utc::now(),
        }
    }

    pub fn with_metrics(mut self, metrics: MetricsSummary) -> Self {
        self.metrics = Some(metrics);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn section(name: &str, research: bool) -> Section {
        Section::new(name, format!("About {name}"), research)
    }

    #[test]
    fn test_topic_rejects_blank() {
        assert!(Topic::new("  ").is_err());
        assert_eq!(Topic::new(" LLM agents ").unwrap().as_str(), "LLM agents");
    }

    #[test]
    fn test_plan_rejects_empty_and_duplicates() {
        let err = SectionPlan::new(vec![]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StructuredOutputRejected);

        let err = SectionPlan::new(vec![section("Intro", false), section(" intro ", true)])
            .unwrap_err();
        assert!(err.to_string().contains("duplicate"));

        assert!(SectionPlan::new(vec![section("", true)]).is_err());
    }

    #[test]
    fn test_plan_partitions_by_research_flag() {
        let plan = SectionPlan::new(vec![
            section("Intro", false),
            section("Body A", true),
            section("Body B", true),
            section("Conclusion", false),
        ])
        .unwrap();
        assert_eq!(plan.research_indices(), vec![1, 2]);
        assert_eq!(plan.final_indices(), vec![0, 3]);

        let mut forced = plan.clone();
        forced.force_research();
        assert_eq!(forced.research_indices(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_report_status() {
        let mut report = Report {
            content: String::new(),
            sections: vec![SectionOutcome {
                name: "A".into(),
                requires_research: true,
                status: SectionStatus::Completed,
                rounds: 1,
            }],
        };
        assert_eq!(report.status(), RunStatus::Success);

        report.sections[0].status = SectionStatus::degraded(DegradeReason::DepthExhausted);
        assert_eq!(report.status(), RunStatus::Partial);
    }

    #[test]
    fn test_section_status_serialization() {
        let status = SectionStatus::degraded(DegradeReason::RetrievalFailed {
            category: ErrorKind::ProviderUnavailable,
            message: "down".into(),
        });
        assert_eq!(
            serde_json::to_value(&status).unwrap(),
            json!({
                "state": "degraded",
                "reason": {"kind": "retrieval_failed", "category": "ProviderUnavailable", "message": "down"}
            })
        );
    }

    #[test]
    fn test_failed_outcome_carries_category() {
        let outcome = RunOutcome::from_error(RunId::new("r1"), &ReportError::Cancelled);
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["status"], "failed");
        assert_eq!(value["error_category"], "Cancelled");
        assert!(value.get("report").is_none());
    }
}
