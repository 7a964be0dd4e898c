//! Stop name normalization and fuzzy matching.
//!
//! Stop names in the dataset are French display strings ("Hôtel de
//! Ville — Louis Pradel"). Queries are matched against a normalized
//! form: lowercase, accents stripped, punctuation removed, whitespace
//! collapsed. The normalized form is computed once per stop at index
//! build time, never per query.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Normalize a name or query for matching: case-fold, strip accents
/// (NFKD then drop combining marks), replace punctuation with spaces,
/// collapse whitespace runs.
pub fn normalize(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last_was_space = true;

    for c in input.nfkd() {
        if is_combining_mark(c) {
            continue;
        }
        if c.is_alphanumeric() {
            for lower in c.to_lowercase() {
                out.push(lower);
            }
            last_was_space = false;
        } else if !last_was_space {
            out.push(' ');
            last_was_space = true;
        }
    }

    while out.ends_with(' ') {
        out.pop();
    }
    out
}

/// First whitespace-delimited token of an already-normalized query.
pub(crate) fn first_token(normalized: &str) -> &str {
    normalized.split_whitespace().next().unwrap_or("")
}

/// Token-based fuzzy containment over already-normalized strings.
///
/// Every token of the query must occur somewhere in the candidate,
/// independent of word order, and partial tokens count ("par dieu"
/// matches "gare part dieu"). Both arguments must come out of
/// [`normalize`].
pub fn fuzzy_contains(candidate: &str, query: &str) -> bool {
    query.split_whitespace().all(|token| candidate.contains(token))
}
