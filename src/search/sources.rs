//! Ordered, deduplicated source collection and its prompt rendering.

use std::collections::HashSet;
use std::fmt::Write as _;

use super::SearchResult;
use crate::types::truncate_to_token_limit;

/// Sources keyed by `source_id`, first occurrence wins, insertion order kept
#[derive(Debug, Clone, Default)]
pub struct SourceSet {
    results: Vec<SearchResult>,
    seen: HashSet<String>,
}

impl SourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert unless the source id is already present; returns whether it was added
    pub fn insert(&mut self, result: SearchResult) -> bool {
        if self.seen.contains(&result.source_id) {
            return false;
        }
        self.seen.insert(result.source_id.clone());
        self.results.push(result);
        true
    }

    /// Insert every result, returning how many were new
    pub fn extend<I: IntoIterator<Item = SearchResult>>(&mut self, results: I) -> usize {
        let mut added = 0;
        for result in results {
            if self.insert(result) {
                added += 1;
            }
        }
        added
    }

    /// Keep at most `max` sources
    pub fn truncate(&mut self, max: usize) {
        for dropped in self.results.drain(max.min(self.results.len())..) {
            self.seen.remove(&dropped.source_id);
        }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SearchResult> {
        self.results.iter()
    }

    pub fn contains(&self, source_id: &str) -> bool {
        self.seen.contains(source_id)
    }

    /// Render sources for a drafting or planning prompt.
    ///
    /// Raw content, when included, is cut to `max_tokens_per_source`.
    pub fn format(&self, max_tokens_per_source: usize, include_raw_content: bool) -> String {
        if self.results.is_empty() {
            return "No sources were retrieved.".to_string();
        }

        let mut out = String::from("Sources:\n");
        for (idx, source) in self.results.iter().enumerate() {
            let _ = write!(
                out,
                "\n[{}] {}\nURL: {}\nRelevance: {:.2}\nSnippet: {}\n",
                idx + 1,
                source.title,
                source.source_id,
                source.score,
                source.content.trim()
            );
            if include_raw_content && let Some(raw) = &source.raw_content {
                let _ = writeln!(
                    out,
                    "Full content (up to {} tokens): {}",
                    max_tokens_per_source,
                    truncate_to_token_limit(raw.trim(), max_tokens_per_source)
                );
            }
        }
        out
    }
}

impl FromIterator<SearchResult> for SourceSet {
    fn from_iter<I: IntoIterator<Item = SearchResult>>(iter: I) -> Self {
        let mut set = SourceSet::new();
        set.extend(iter);
        set
    }
}

impl IntoIterator for SourceSet {
    type Item = SearchResult;
    type IntoIter = std::vec::IntoIter<SearchResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn result(id: &str) -> SearchResult {
        SearchResult {
            source_id: id.to_string(),
            title: format!("Title {id}"),
            content: format!("snippet {id}"),
            raw_content: Some(format!("raw body for {id}")),
            score: 0.5,
        }
    }

    #[test]
    fn test_first_occurrence_wins() {
        let mut first = result("a");
        first.title = "first".into();
        let mut second = result("a");
        second.title = "second".into();

        let set: SourceSet = vec![first, result("b"), second].into_iter().collect();
        assert_eq!(set.len(), 2);
        assert_eq!(set.iter().next().unwrap().title, "first");
    }

    #[test]
    fn test_truncate_forgets_dropped_ids() {
        let mut set: SourceSet = ["a", "b", "c"].into_iter().map(result).collect();
        set.truncate(2);
        assert_eq!(set.len(), 2);
        assert!(!set.contains("c"));
        assert!(set.insert(result("c")));
    }

    #[test]
    fn test_format_with_and_without_raw() {
        let set: SourceSet = ["a"].into_iter().map(result).collect();
        let without = set.format(4000, false);
        assert!(without.contains("[1] Title a"));
        assert!(!without.contains("raw body"));

        let with = set.format(4000, true);
        assert!(with.contains("raw body for a"));
        assert_eq!(SourceSet::new().format(10, true), "No sources were retrieved.");
    }

    proptest! {
        #[test]
        fn prop_each_source_id_appears_once(
            ids in proptest::collection::vec(proptest::collection::vec(0u8..12, 0..8), 1..5)
        ) {
            // Each inner vec is one query's results
            let mut set = SourceSet::new();
            for query in &ids {
                set.extend(query.iter().map(|id| result(&id.to_string())));
            }

            let collected: Vec<&str> = set.iter().map(|r| r.source_id.as_str()).collect();
            let unique: HashSet<&str> = collected.iter().copied().collect();
            prop_assert_eq!(collected.len(), unique.len());

            let expected: HashSet<String> = ids.iter().flatten().map(|id| id.to_string()).collect();
            prop_assert_eq!(unique.len(), expected.len());
        }
    }
}
