//! CLI Common Utilities
//!
//! Shared pieces for the `run` and `resume` commands: the review file that
//! carries a paused run between invocations, result output and Ctrl-C
//! handling.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::config::{ConfigLoader, ReportConfiguration, RunRequest};
use crate::report::{ResumeToken, RunOutcome};
use crate::types::{ReportError, Result};

/// Review file name inside the project config directory
pub const REVIEW_FILE: &str = "review.json";

/// Default location of the review file (.deepreport/review.json)
pub fn default_review_path() -> PathBuf {
    ConfigLoader::project_dir().join(REVIEW_FILE)
}

/// Paused run on disk.
///
/// The request is kept next to the token so `resume` resolves the same
/// configuration the plan was made with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewFile {
    pub request: RunRequest,
    /// Encoded `ResumeToken`
    pub token: String,
}

impl ReviewFile {
    pub fn new(request: RunRequest, token: &ResumeToken) -> Result<Self> {
        Ok(Self {
            request,
            token: token.encode()?,
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ReportError::ResumeToken(format!("Cannot read review file {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            ReportError::ResumeToken(format!("Invalid review file {}: {}", path.display(), e))
        })
    }

    pub fn token(&self) -> Result<ResumeToken> {
        ResumeToken::decode(&self.token)
    }
}

/// Merge config files, env and the request into a run configuration
pub fn resolve_configuration(request: &RunRequest) -> Result<ReportConfiguration> {
    let config = ConfigLoader::load()?;
    ReportConfiguration::from_request(&config, request)
}

/// Print the result surface as JSON, or write it to `output`
pub fn emit_outcome(outcome: &RunOutcome, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(outcome)?;
    match output {
        Some(path) => fs::write(path, json)?,
        None => println!("{}", json),
    }
    Ok(())
}

/// Cancellation token raised on Ctrl-C
pub fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling run");
            trigger.cancel();
        }
    });
    cancel
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{Section, SectionPlan, Topic};
    use crate::types::RunId;
    use tempfile::TempDir;

    fn token() -> ResumeToken {
        let plan = SectionPlan::new(vec![Section::new("Body", "details", true)]).unwrap();
        ResumeToken::new(
            RunId::new("run-1"),
            Topic::new("Vector databases").unwrap(),
            plan,
            Vec::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_review_file_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join(REVIEW_FILE);

        let mut request = RunRequest::new("Vector databases");
        request.number_of_queries = Some(1);
        ReviewFile::new(request, &token()).unwrap().save(&path).unwrap();

        let loaded = ReviewFile::load(&path).unwrap();
        assert_eq!(loaded.request.number_of_queries, Some(1));
        assert_eq!(loaded.token().unwrap(), token());
    }

    #[test]
    fn test_missing_review_file() {
        let dir = TempDir::new().unwrap();
        let err = ReviewFile::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ReportError::ResumeToken(_)));
    }
}
