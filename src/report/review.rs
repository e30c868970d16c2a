//! Plan review: the resume token handed out between planning and dispatch.
//!
//! The token carries everything the pipeline needs to pick the run back up
//! in another process: run id, topic, the plan under review and the feedback
//! collected so far. It is plain JSON guarded by a version and a CRC32 over
//! the payload, so hand edits and tokens from other versions are refused.

use serde::{Deserialize, Serialize};

use super::types::{SectionPlan, Topic};
use crate::constants::resume::TOKEN_VERSION;
use crate::types::{ReportError, Result, RunId};

/// Reviewer's answer to a plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewDecision {
    /// Dispatch the plan as-is
    Approve,
    /// Re-plan with this note appended to the planning prompt
    Revise(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumeToken {
    pub version: u32,
    pub run_id: RunId,
    pub topic: Topic,
    pub plan: SectionPlan,
    #[serde(default)]
    pub feedback: Vec<String>,
    checksum: u32,
}

/// Checksummed fields, in serialization order
#[derive(Serialize)]
struct Payload<'a> {
    version: u32,
    run_id: &'a RunId,
    topic: &'a Topic,
    plan: &'a SectionPlan,
    feedback: &'a [String],
}

impl ResumeToken {
    pub fn new(run_id: RunId, topic: Topic, plan: SectionPlan, feedback: Vec<String>) -> Result<Self> {
        let mut token = Self {
            version: TOKEN_VERSION,
            run_id,
            topic,
            plan,
            feedback,
            checksum: 0,
        };
        token.checksum = token.compute_checksum()?;
        Ok(token)
    }

    fn compute_checksum(&self) -> Result<u32> {
        let payload = Payload {
            version: self.version,
            run_id: &self.run_id,
            topic: &self.topic,
            plan: &self.plan,
            feedback: &self.feedback,
        };
        Ok(crc32fast::hash(&serde_json::to_vec(&payload)?))
    }

    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse and verify a token
    pub fn decode(text: &str) -> Result<Self> {
        let token: ResumeToken = serde_json::from_str(text)
            .map_err(|e| ReportError::ResumeToken(format!("malformed token: {}", e)))?;

        if token.version != TOKEN_VERSION {
            return Err(ReportError::ResumeToken(format!(
                "unsupported token version {} (expected {})",
                token.version, TOKEN_VERSION
            )));
        }

        let expected = token.compute_checksum()?;
        if token.checksum != expected {
            return Err(ReportError::ResumeToken(
                "checksum mismatch, token was modified".to_string(),
            ));
        }
        Ok(token)
    }
}
