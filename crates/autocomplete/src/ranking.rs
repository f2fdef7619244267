//! Orders completions against the identifier typed so far.
//! （依已輸入的識別字排序補全項目。）

use std::cmp::Ordering;

use crate::completion::Completion;

/// Filters out non-matching entries and sorts the rest best first.
/// Entries of equal quality keep their original order.
pub fn rank_completions(prefix: &str, completions: Vec<Completion>) -> Vec<Completion> {
    if prefix.is_empty() {
        return completions;
    }
    let mut scored: Vec<(f32, Completion)> = completions
        .into_iter()
        .map(|completion| (match_quality(prefix, completion.name(), false), completion))
        .filter(|(score, _)| *score > 0.0)
        .collect();
    scored.sort_by(|(left, _), (right, _)| right.partial_cmp(left).unwrap_or(Ordering::Equal));
    scored.into_iter().map(|(_, completion)| completion).collect()
}

pub fn match_quality(prefix: &str, label: &str, case_sensitive: bool) -> f32 {
    if prefix.is_empty() {
        return 0.6;
    }

    if case_sensitive {
        if label.starts_with(prefix) {
            return if label == prefix { 1.0 } else { 0.9 };
        }
    } else {
        let lower_label = label.to_lowercase();
        let lower_prefix = prefix.to_lowercase();
        if lower_label.starts_with(&lower_prefix) {
            return if lower_label == lower_prefix { 1.0 } else { 0.9 };
        }
    }

    if fuzzy_match(prefix, label, case_sensitive) {
        0.4
    } else {
        0.0
    }
}

/// Every prefix character appears in `label`, in order.
fn fuzzy_match(prefix: &str, label: &str, case_sensitive: bool) -> bool {
    let mut label_chars = label.chars();
    prefix.chars().all(|expected| {
        label_chars.any(|candidate| {
            if case_sensitive {
                candidate == expected
            } else {
                candidate.to_lowercase().eq(expected.to_lowercase())
            }
        })
    })
}
