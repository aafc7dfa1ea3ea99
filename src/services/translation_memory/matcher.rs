//! Reconciles a provider response with the batch that was requested.
//!
//! Providers tend to echo keys back slightly altered (a trailing space, a
//! swapped punctuation mark). Exact keys win; otherwise the closest key by
//! edit distance is adopted when it is within tolerance.

use serde_json::{Map, Value};
use tracing::debug;

use crate::model::entry::{PendingEntry, ResolvedEntry};

/// Levenshtein distance over Unicode scalar values.
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    let mut table = vec![vec![0usize; b.len() + 1]; a.len() + 1];
    for (i, row) in table.iter_mut().enumerate() {
        row[0] = i;
    }
    for j in 0..=b.len() {
        table[0][j] = j;
    }

    for i in 1..=a.len() {
        for j in 1..=b.len() {
            let substitution = usize::from(a[i - 1] != b[j - 1]);
            table[i][j] = (table[i - 1][j] + 1)
                .min(table[i][j - 1] + 1)
                .min(table[i - 1][j - 1] + substitution);
        }
    }

    table[a.len()][b.len()]
}

/// Largest distance accepted for a requested string of `len` characters.
pub fn tolerance(len: usize, ratio: f64) -> usize {
    let scaled = (len as f64 * ratio).floor();
    let scaled = if scaled.is_finite() && scaled > 0.0 {
        scaled as usize
    } else {
        0
    };
    scaled.max(1)
}

/// Closest key to `requested` among usable response entries, in response
/// order; the first key wins a tie.
pub fn closest_key<'a>(
    requested: &str,
    response: &'a Map<String, Value>,
) -> Option<(&'a str, usize)> {
    let mut best: Option<(&'a str, usize)> = None;

    for (key, value) in response {
        if !is_usable(value) {
            continue;
        }
        let distance = edit_distance(key, requested);
        match best {
            Some((_, d)) if d <= distance => {}
            _ => best = Some((key.as_str(), distance)),
        }
    }

    best
}

fn is_usable(value: &Value) -> bool {
    value.as_str().is_some_and(|s| !s.trim().is_empty())
}

/// Splits `batch` into entries the response answers and entries it does not.
pub fn reconcile_batch(
    batch: Vec<PendingEntry>,
    response: &Map<String, Value>,
    ratio: f64,
) -> (Vec<ResolvedEntry>, Vec<PendingEntry>) {
    let mut resolved = Vec::new();
    let mut unresolved = Vec::new();

    for entry in batch {
        if let Some(text) = response.get(&entry.source_text).and_then(Value::as_str) {
            if !text.trim().is_empty() {
                resolved.push(ResolvedEntry::new(entry, text));
                continue;
            }
        }

        let limit = tolerance(entry.source_text.chars().count(), ratio);
        match closest_key(&entry.source_text, response) {
            Some((key, distance)) if distance <= limit => {
                debug!(
                    entry_id = %entry.entry_id,
                    key,
                    distance,
                    "adopted fuzzy response key"
                );
                let text = response.get(key).and_then(Value::as_str).unwrap_or_default();
                let mut adopted = ResolvedEntry::new(entry, text);
                adopted.matched_key = Some(key.to_string());
                resolved.push(adopted);
            }
            _ => unresolved.push(entry),
        }
    }

    (resolved, unresolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::entry::Origin;
    use serde_json::json;

    fn pending(text: &str) -> PendingEntry {
        PendingEntry::new(text, "", Origin::MemoryRow { index: 0 })
    }

    fn object(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn distance_counts_characters_not_bytes() {
        assert_eq!(edit_distance("こんにちは", "こんにちは"), 0);
        assert_eq!(edit_distance("こんにちは ", "こんにちは"), 1);
        assert_eq!(edit_distance("kitten", "sitting"), 3);
        assert_eq!(edit_distance("", "abc"), 3);
    }

    #[test]
    fn short_strings_still_allow_one_edit() {
        assert_eq!(tolerance(3, 0.1), 1);
        assert_eq!(tolerance(20, 0.1), 2);
        assert_eq!(tolerance(35, 0.1), 3);
    }

    #[test]
    fn trailing_space_is_reconciled() {
        let response = object(json!({ "こんにちは": "Hello" }));

        let (resolved, unresolved) = reconcile_batch(vec![pending("こんにちは ")], &response, 0.1);

        assert!(unresolved.is_empty());
        assert_eq!(resolved[0].translation, "Hello");
        assert_eq!(resolved[0].matched_key.as_deref(), Some("こんにちは"));
    }

    #[test]
    fn distant_keys_stay_unresolved() {
        let requested = "abcdefghijklmnopqrst";
        let returned = "abcdefghijklmnopqXYZ";
        assert_eq!(edit_distance(requested, returned), 3);

        let response = object(json!({ returned: "translated" }));
        let (resolved, unresolved) = reconcile_batch(vec![pending(requested)], &response, 0.1);

        assert!(resolved.is_empty());
        assert_eq!(unresolved.len(), 1);
    }

    #[test]
    fn ties_go_to_the_first_key() {
        let response = object(json!({ "abcX": "first", "abcY": "second", "abcZ": 7 }));

        let (resolved, _) = reconcile_batch(vec![pending("abcd")], &response, 0.1);

        assert_eq!(resolved[0].translation, "first");
    }

    #[test]
    fn empty_values_are_not_translations() {
        let response = object(json!({ "はい": "", "いいえ": "No" }));

        let (resolved, unresolved) =
            reconcile_batch(vec![pending("はい"), pending("いいえ")], &response, 0.1);

        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].source_text(), "いいえ");
        assert_eq!(unresolved[0].source_text, "はい");
    }
}
