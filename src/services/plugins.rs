//! Japanese strings inside the plugin configuration script (`js/plugins.js`),
//! kept in a two-column `original,translated` sheet.

use std::collections::BTreeSet;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::error::CoreResult;
use crate::model::entry::{Origin, PatchOutcome, PendingEntry, ResolvedEntry};
use crate::parsers::script::{has_japanese, quoted_literals};
use crate::services::encoding;
use crate::services::patch::{patch_back, LiteralTarget};
use crate::services::translation_memory::store::{self, write_atomic};
use crate::services::translation_memory::{MemoryRow, StoreFlavor, TranslationMemory};

/// Distinct Japanese string literals of a plugin script, sorted.
pub fn japanese_literals(content: &str) -> Vec<String> {
    quoted_literals(content)
        .into_iter()
        .filter(|s| has_japanese(s))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// A fresh plugin sheet listing `strings`, carrying over translations
/// `existing` already has.
pub fn merge_sheet(strings: &[String], existing: &TranslationMemory) -> TranslationMemory {
    let rows = strings
        .iter()
        .map(|s| MemoryRow::new(s, existing.lookup_exact(s).unwrap_or(""), ""))
        .collect();
    TranslationMemory::from_rows(StoreFlavor::PluginString, rows)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PluginApplyReport {
    pub replacements: usize,
    pub applied: usize,
    pub already_translated: usize,
    pub missing: Vec<String>,
}

/// Writes every translated row of `memory` into `content`.
pub fn apply_sheet(
    content: &str,
    memory: &TranslationMemory,
    file: &str,
) -> (String, PluginApplyReport) {
    let resolved: Vec<ResolvedEntry> = memory
        .rows()
        .iter()
        .filter(|r| !r.source_text().is_empty() && r.is_translated())
        .map(|r| {
            let origin = Origin::Script {
                file: file.to_string(),
            };
            ResolvedEntry::new(PendingEntry::new(r.source_text(), "", origin), r.target.as_str())
        })
        .collect();

    let mut target = LiteralTarget::new(content);
    let mut report = PluginApplyReport::default();

    for result in patch_back(&resolved, &mut target) {
        match result.outcome {
            PatchOutcome::Applied { occurrences } => {
                report.applied += 1;
                report.replacements += occurrences;
            }
            PatchOutcome::SkippedAlreadyTranslated => report.already_translated += 1,
            PatchOutcome::SkippedNotFound => report.missing.push(result.source_text),
        }
    }

    (target.into_content(), report)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginExtractSummary {
    pub strings: usize,
    pub translated: usize,
}

pub fn extract_file(plugins_path: &Path, sheet_path: &Path) -> CoreResult<PluginExtractSummary> {
    let content = encoding::read_text(plugins_path)?;
    let strings = japanese_literals(&content);

    let existing = store::load_or(sheet_path, StoreFlavor::PluginString)?;
    let sheet = merge_sheet(&strings, &existing);
    store::save(sheet_path, &sheet)?;

    let summary = PluginExtractSummary {
        strings: sheet.len(),
        translated: sheet.rows().iter().filter(|r| r.is_translated()).count(),
    };
    info!(
        plugins = %plugins_path.display(),
        strings = summary.strings,
        translated = summary.translated,
        "extracted plugin strings"
    );
    Ok(summary)
}

/// Patches the plugin script in place. The file is only rewritten when at
/// least one literal was replaced.
pub fn apply_file(plugins_path: &Path, sheet_path: &Path) -> CoreResult<PluginApplyReport> {
    let content = encoding::read_text(plugins_path)?;
    let sheet = store::load(sheet_path)?;
    let file = plugins_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("plugins.js");

    let (patched, report) = apply_sheet(&content, &sheet, file);
    if report.replacements > 0 {
        write_atomic(plugins_path, patched.as_bytes())?;
    }

    info!(
        plugins = %plugins_path.display(),
        replacements = report.replacements,
        missing = report.missing.len(),
        "applied plugin translations"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT: &str = r#"var $plugins =
[
{"name":"TitleCommand","status":true,"parameters":{"New":"はじめから","Cont":"つづきから","Font":"GameFont"}},
{"name":"Help","status":true,"parameters":{"Text":"はじめから始める"}}
];"#;

    #[test]
    fn literals_are_unique_and_sorted() {
        assert_eq!(
            japanese_literals(SCRIPT),
            vec!["つづきから", "はじめから", "はじめから始める"]
        );
    }

    #[test]
    fn merge_keeps_known_translations() {
        let existing = TranslationMemory::from_rows(
            StoreFlavor::PluginString,
            vec![
                MemoryRow::new("はじめから", "New Game", ""),
                MemoryRow::new("古い文字列", "Old", ""),
            ],
        );

        let sheet = merge_sheet(&japanese_literals(SCRIPT), &existing);

        assert_eq!(sheet.len(), 3);
        assert_eq!(sheet.lookup_exact("はじめから"), Some("New Game"));
        assert!(!sheet.contains_source("古い文字列"));
    }

    #[test]
    fn apply_replaces_whole_literals_only() {
        let sheet = TranslationMemory::from_rows(
            StoreFlavor::PluginString,
            vec![
                MemoryRow::new("はじめから", "New Game", ""),
                MemoryRow::new("はじめから始める", "Start from the beginning", ""),
                MemoryRow::new("ない", "Nothing", ""),
                MemoryRow::new("つづきから", "", ""),
            ],
        );

        let (patched, report) = apply_sheet(SCRIPT, &sheet, "plugins.js");

        assert!(patched.contains(r#""New":"New Game""#));
        assert!(patched.contains(r#""Text":"Start from the beginning""#));
        assert!(patched.contains(r#""Cont":"つづきから""#));
        assert_eq!(report.replacements, 2);
        assert_eq!(report.missing, vec!["ない".to_string()]);
    }

    #[test]
    fn extract_then_apply_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let plugins = dir.path().join("plugins.js");
        let sheet_path = dir.path().join("plugins_text.csv");
        std::fs::write(&plugins, SCRIPT).unwrap();

        let summary = extract_file(&plugins, &sheet_path).unwrap();
        assert_eq!(summary.strings, 3);
        assert_eq!(summary.translated, 0);

        let mut sheet = store::load(&sheet_path).unwrap();
        sheet.set_target("つづきから", "Continue");
        store::save(&sheet_path, &sheet).unwrap();

        let report = apply_file(&plugins, &sheet_path).unwrap();
        assert_eq!(report.replacements, 1);
        assert!(std::fs::read_to_string(&plugins).unwrap().contains("\"Continue\""));

        let again = extract_file(&plugins, &sheet_path).unwrap();
        assert_eq!(again.strings, 2);
    }
}
