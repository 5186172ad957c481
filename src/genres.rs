//! Genre tokenization, vocabulary extraction and per-label counts.
//!
//! The `Genres` field is a comma-delimited list of labels. It is tokenized once
//! at load time so filtering is label membership instead of pattern matching.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use crate::table::RecordTable;

/// Split a raw `Genres` value into trimmed, non-empty labels (duplicates kept).
pub fn tokenize(raw: &str) -> Vec<String> {
    if raw.trim().is_empty() {
        return Vec::new();
    }
    raw.split(',')
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .map(str::to_string)
        .collect()
}

/// Sorted, deduplicated set of genre labels across every row of the table.
pub fn extract_vocabulary(table: &RecordTable) -> Vec<String> {
    let vocabulary: BTreeSet<&str> = table
        .genre_tokens()
        .iter()
        .flatten()
        .map(String::as_str)
        .collect();
    vocabulary.into_iter().map(str::to_string).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenreCount {
    pub genre: String,
    pub count: usize,
}

/// Occurrences of every label, most frequent first (ties by label).
pub fn genre_counts(table: &RecordTable) -> Vec<GenreCount> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for label in table.genre_tokens().iter().flatten() {
        *counts.entry(label.as_str()).or_insert(0) += 1;
    }
    let mut out: Vec<GenreCount> = counts
        .into_iter()
        .map(|(genre, count)| GenreCount {
            genre: genre.to_string(),
            count,
        })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.genre.cmp(&b.genre)));
    out
}

/// The `n` most frequent labels.
pub fn top_genres(table: &RecordTable, n: usize) -> Vec<GenreCount> {
    let mut counts = genre_counts(table);
    counts.truncate(n);
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_trims_and_drops_empty_labels() {
        assert_eq!(tokenize("Action, Comedy"), vec!["Action", "Comedy"]);
        assert_eq!(tokenize(" Comedy,Drama "), vec!["Comedy", "Drama"]);
        assert_eq!(tokenize("Action,, ,Drama,"), vec!["Action", "Drama"]);
        assert!(tokenize("").is_empty());
        assert!(tokenize("   ").is_empty());
    }

    #[test]
    fn tokenize_keeps_repeated_labels() {
        assert_eq!(tokenize("Action, Action"), vec!["Action", "Action"]);
    }
}
