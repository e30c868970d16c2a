//! Prompt building utilities for LLM providers.
//!
//! Shared helpers for embedding JSON schema instructions in prompts.

use serde_json::Value;

const SYSTEM_ROLE: &str = "You are a meticulous research analyst and technical writer.";

/// Pretty schema text, falling back to compact form.
fn schema_text(schema: &Value) -> String {
    serde_json::to_string_pretty(schema).unwrap_or_else(|_| schema.to_string())
}

/// Build the system message for chat-style providers.
///
/// Free-text requests (null schema) get the bare role line.
pub fn build_system_prompt(schema: &Value) -> String {
    if schema.is_null() {
        return SYSTEM_ROLE.to_string();
    }

    format!(
        "{} Always respond with valid JSON matching this schema:\n\n```json\n{}\n```\n\nRespond ONLY with valid JSON, no explanation.",
        SYSTEM_ROLE,
        schema_text(schema)
    )
}

/// Build a prompt with JSON schema instructions appended.
///
/// Used by completion-style providers (Ollama) that take a single prompt.
/// Returns the original prompt if schema is null.
pub fn build_schema_prompt(user_prompt: &str, schema: &Value) -> String {
    if schema.is_null() {
        return user_prompt.to_string();
    }

    format!(
        "{}\n\n---\n\nRespond with valid JSON matching this schema:\n```json\n{}\n```\n\nRespond ONLY with valid JSON, no explanation.",
        user_prompt,
        schema_text(schema)
    )
}
