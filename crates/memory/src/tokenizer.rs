//! Query and insight term extraction.
//!
//! The term set is what both tags and relevance scoring are built from, so
//! the rules here are small and fixed:
//!
//! 1. lower-case the text
//! 2. drop every character that is neither alphanumeric nor whitespace
//!    (dropping joins, it does not split: `don't` becomes `dont`)
//! 3. split on whitespace runs
//! 4. keep tokens longer than two characters that are not stop words

use std::collections::BTreeSet;

/// Function words excluded from the term set.
pub const STOP_WORDS: &[&str] = &[
    "the", "is", "at", "which", "on", "a", "an", "and", "or", "but", "how", "what", "why", "do",
    "does", "did", "to", "for", "in",
];

const MIN_TERM_CHARS: usize = 3;

pub fn tokenize(text: &str) -> BTreeSet<String> {
    let normalized: String = text
        .to_lowercase()
        .chars()
        .filter(|ch| ch.is_alphanumeric() || ch.is_whitespace())
        .collect();

    normalized
        .split_whitespace()
        .filter(|term| term.chars().count() >= MIN_TERM_CHARS)
        .filter(|term| !STOP_WORDS.contains(term))
        .map(ToString::to_string)
        .collect()
}
