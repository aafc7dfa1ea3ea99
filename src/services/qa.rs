use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::parsers::script::{has_japanese, japanese_segments};
use crate::services::translation_memory::hash::entry_id;
use crate::services::translation_memory::TranslationMemory;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct QaIssue {
    pub entry_id: String,
    pub row: usize,
    pub code: String,
    pub message: String,
}

fn issue(row: usize, source: &str, code: &str, message: &str) -> QaIssue {
    QaIssue {
        entry_id: entry_id(source),
        row,
        code: code.to_string(),
        message: message.to_string(),
    }
}

/// Flags translated rows that still look untranslated.
pub fn review(memory: &TranslationMemory) -> Vec<QaIssue> {
    let mut issues = Vec::new();

    for (row, r) in memory.rows().iter().enumerate() {
        if !r.is_translated() || r.is_locator_header() {
            continue;
        }

        let source = r.source_text();
        let target = r.target.trim();

        if target == source {
            issues.push(issue(
                row,
                source,
                "SAME_AS_ORIGINAL",
                "Translation is identical to the source text",
            ));
        } else if has_japanese(source) && has_japanese(target) {
            issues.push(issue(
                row,
                source,
                "JAPANESE_IN_TRANSLATION",
                "Translation still contains kana or kanji",
            ));
        }
    }

    issues
}

/// Japanese chunks of a plugin script that no sheet row covers.
pub fn missing_plugin_strings(content: &str, memory: &TranslationMemory) -> Vec<String> {
    japanese_segments(content)
        .into_iter()
        .filter(|chunk| !memory.contains_source(chunk))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
