//! JSON Repair Mechanism
//!
//! Extracts a JSON value from raw model output. Handles:
//! - Reasoning blocks (`<think>...</think>`) emitted before the answer
//! - Markdown code fence wrapping (```json ... ```)
//! - Trailing commas
//! - Missing closing braces/brackets from truncated output
//! - JSON embedded in explanatory text

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::types::{ReportError, Result};

static THINK_BLOCK: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?s)<think>.*?</think>").ok());

static TRAILING_COMMA: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r",(\s*[}\]])").ok());

/// Extract and parse JSON from a model response
pub fn extract_json_from_response(content: &str) -> Result<Value> {
    JsonRepairer::new().parse_or_repair(content).map(|(value, _)| value)
}

/// Stateless JSON cleanup and repair
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonRepairer;

impl JsonRepairer {
    pub fn new() -> Self {
        Self
    }

    /// Parse JSON, attempting repair if the direct parse fails.
    ///
    /// Returns (Value, was_repaired)
    pub fn parse_or_repair(&self, raw: &str) -> Result<(Value, bool)> {
        let cleaned = self.preprocess(raw);

        if let Ok(value) = serde_json::from_str::<Value>(&cleaned) {
            return Ok((value, false));
        }

        debug!("Initial JSON parse failed, attempting repair");

        let candidate = self.extract_json_span(&cleaned).unwrap_or(&cleaned);
        let repaired = self.balance_brackets(&self.fix_trailing_commas(candidate));

        match serde_json::from_str::<Value>(&repaired) {
            Ok(value) => {
                warn!("Model output needed JSON repair");
                Ok((value, true))
            }
            Err(e) => Err(ReportError::structured(
                "json",
                format!(
                    "unparseable output ({}). Preview: {}",
                    e,
                    cleaned.chars().take(200).collect::<String>()
                ),
            )),
        }
    }

    fn preprocess(&self, raw: &str) -> String {
        let without_think = match THINK_BLOCK.as_ref() {
            Some(re) => re.replace_all(raw, "").into_owned(),
            None => raw.to_string(),
        };
        let trimmed = without_think.trim().trim_start_matches('\u{feff}');
        self.strip_code_fences(trimmed).trim().to_string()
    }

    fn strip_code_fences<'a>(&self, s: &'a str) -> &'a str {
        let mut result = s;
        if result.starts_with("```") {
            result = match result.find('\n') {
                Some(idx) => &result[idx + 1..],
                None => result.trim_start_matches('`'),
            };
        }
        result.trim_end().trim_end_matches("```")
    }

    fn fix_trailing_commas(&self, s: &str) -> String {
        match TRAILING_COMMA.as_ref() {
            Some(re) => re.replace_all(s, "$1").into_owned(),
            None => s.to_string(),
        }
    }

    /// Close any strings, arrays and objects left open at end of input
    fn balance_brackets(&self, s: &str) -> String {
        let mut stack = Vec::new();
        let mut in_string = false;
        let mut escaped = false;

        for ch in s.chars() {
            if in_string {
                match ch {
                    _ if escaped => escaped = false,
                    '\\' => escaped = true,
                    '"' => in_string = false,
                    _ => {}
                }
                continue;
            }
            match ch {
                '"' => in_string = true,
                '{' => stack.push('}'),
                '[' => stack.push(']'),
                '}' | ']' => {
                    stack.pop();
                }
                _ => {}
            }
        }

        let mut result = s.trim_end().to_string();
        if in_string {
            result.push('"');
        }
        if result.ends_with(',') {
            result.pop();
        }
        while let Some(closer) = stack.pop() {
            result.push(closer);
        }
        result
    }

    /// Slice from the first `{` or `[` to its matching closer (or to end of input)
    fn extract_json_span<'a>(&self, s: &'a str) -> Option<&'a str> {
        let start = s.find(['{', '['])?;
        let mut depth = 0usize;
        let mut in_string = false;
        let mut escaped = false;

        for (offset, ch) in s[start..].char_indices() {
            if in_string {
                match ch {
                    _ if escaped => escaped = false,
                    '\\' => escaped = true,
                    '"' => in_string = false,
                    _ => {}
                }
                continue;
            }
            match ch {
                '"' => in_string = true,
                '{' | '[' => depth += 1,
                '}' | ']' => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return Some(&s[start..start + offset + ch.len_utf8()]);
                    }
                }
                _ => {}
            }
        }

        Some(&s[start..])
    }
}
