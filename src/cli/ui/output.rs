use console::style;

use crate::report::{RunOutcome, RunStatus, SectionPlan, SectionStatus};

pub struct Output;

impl Output {
    pub fn new() -> Self {
        Self
    }

    pub fn success(&self, message: &str) {
        eprintln!("{} {}", style("✓").green(), message);
    }

    pub fn error(&self, message: &str) {
        eprintln!("{} {}", style("✗").red(), message);
    }

    pub fn warning(&self, message: &str) {
        eprintln!("{} {}", style("⚠").yellow(), message);
    }

    pub fn info(&self, message: &str) {
        eprintln!("{} {}", style("ℹ").blue(), message);
    }

    pub fn section(&self, message: &str) {
        eprintln!("\n{}", style(message).bold());
        eprintln!("{}", "─".repeat(40));
    }

    /// Plan awaiting review, one line per section
    pub fn plan(&self, plan: &SectionPlan) {
        self.section("Proposed plan");
        for (i, section) in plan.sections().iter().enumerate() {
            let marker = if section.requires_research {
                style("research").cyan()
            } else {
                style("framing").dim()
            };
            eprintln!("{:>2}. {} [{}]", i + 1, style(&section.name).bold(), marker);
            if !section.description.is_empty() {
                eprintln!("    {}", style(&section.description).dim());
            }
        }
    }

    /// Status line plus degraded sections; the report itself goes to stdout
    pub fn outcome(&self, outcome: &RunOutcome) {
        match outcome.status {
            RunStatus::Success => self.success(&format!("Report complete ({})", outcome.run_id)),
            RunStatus::Partial => {
                self.warning(&format!("Report complete with degraded sections ({})", outcome.run_id));
                for section in &outcome.sections {
                    if let SectionStatus::Degraded { reason } = &section.status {
                        eprintln!("  - {}: {}", section.name, reason);
                    }
                }
            }
            RunStatus::Failed => {
                let category = outcome
                    .error_category
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "Internal".to_string());
                self.error(&format!(
                    "Run failed [{}]: {}",
                    category,
                    outcome.error.as_deref().unwrap_or("unknown error")
                ));
            }
        }
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}
