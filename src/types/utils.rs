//! Text budgeting helpers shared by prompts and source formatting.

use crate::constants::search::CHARS_PER_TOKEN;

/// Rough token estimate at a fixed characters-per-token ratio
#[inline]
pub fn estimate_tokens(content: &str) -> usize {
    content.chars().count().div_ceil(CHARS_PER_TOKEN)
}

/// Truncate content to a token budget, cutting on a char boundary.
///
/// Appends a `[truncated]` marker when anything was removed.
pub fn truncate_to_token_limit(content: &str, max_tokens: usize) -> String {
    let max_chars = max_tokens.saturating_mul(CHARS_PER_TOKEN);
    match content.char_indices().nth(max_chars) {
        None => content.to_string(),
        Some((byte_idx, _)) => format!("{}... [truncated]", &content[..byte_idx]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
    }

    #[test]
    fn test_truncate_no_truncation() {
        let content = "Short content.";
        assert_eq!(truncate_to_token_limit(content, 1000), content);
    }

    #[test]
    fn test_truncate_marks_cut() {
        let content = "x".repeat(100);
        let result = truncate_to_token_limit(&content, 5);
        assert!(result.starts_with(&"x".repeat(20)));
        assert!(result.ends_with("[truncated]"));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let content = "안녕하세요".repeat(10);
        let result = truncate_to_token_limit(&content, 2);
        assert!(result.starts_with("안녕하세요안녕하"));
    }
}
