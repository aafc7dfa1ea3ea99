use serde_json::Value;
use tracing::{debug, info, warn};

use crate::model::entry::{Origin, PatchOutcome, PatchResult, PendingEntry, ResolvedEntry};
use crate::parsers::script::{encode_literal, quoted_literals, rewrite_literals};
use crate::services::corpus::Corpus;
use crate::services::extract::file_sites;
use crate::services::translation_memory::TranslationMemory;

/// Something translations can be written into.
pub trait PatchTarget {
    fn apply(&mut self, resolved: &ResolvedEntry) -> PatchOutcome;
}

/// Replaces `"source"` with `"translation"` everywhere in `content`, both
/// encoded as double-quoted literals.
pub fn substitute_literal(content: &mut String, source: &str, translation: &str) -> PatchOutcome {
    let needle = format!("\"{}\"", encode_literal(source));
    let replacement = format!("\"{}\"", encode_literal(translation));

    let occurrences = content.matches(needle.as_str()).count();
    if occurrences == 0 {
        return if content.contains(replacement.as_str()) {
            PatchOutcome::SkippedAlreadyTranslated
        } else {
            PatchOutcome::SkippedNotFound
        };
    }

    *content = content.replace(needle.as_str(), &replacement);
    PatchOutcome::Applied { occurrences }
}

/// Like [`substitute_literal`], but a literal matches when its trimmed body
/// equals `source`, and the padding around it survives the replacement.
pub fn substitute_padded_literal(content: &mut String, source: &str, translation: &str) -> PatchOutcome {
    let occurrences = rewrite_literals(content, |body| {
        (body.trim() == source).then(|| keep_padding(body, translation))
    });
    if occurrences > 0 {
        return PatchOutcome::Applied { occurrences };
    }

    let translation = translation.trim();
    if quoted_literals(content).iter().any(|l| l.trim() == translation) {
        PatchOutcome::SkippedAlreadyTranslated
    } else {
        PatchOutcome::SkippedNotFound
    }
}

/// Free text holding quoted literals, e.g. a plugin configuration script.
#[derive(Debug, Clone, Default)]
pub struct LiteralTarget {
    content: String,
}

impl LiteralTarget {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }

    pub fn into_content(self) -> String {
        self.content
    }
}

impl PatchTarget for LiteralTarget {
    fn apply(&mut self, resolved: &ResolvedEntry) -> PatchOutcome {
        substitute_literal(&mut self.content, resolved.source_text(), &resolved.translation)
    }
}

/// A parsed data file, addressed through the pointers in each entry's origin.
pub struct DocumentTarget<'a> {
    file: &'a str,
    doc: &'a mut Value,
    changed: bool,
}

impl<'a> DocumentTarget<'a> {
    pub fn new(file: &'a str, doc: &'a mut Value) -> Self {
        Self {
            file,
            doc,
            changed: false,
        }
    }

    /// True once any value actually differs from what was loaded.
    pub fn changed(&self) -> bool {
        self.changed
    }

    fn string_at(&mut self, pointer: &str) -> Option<&mut String> {
        match self.doc.pointer_mut(pointer) {
            Some(Value::String(s)) => Some(s),
            _ => None,
        }
    }
}

/// `translation` wrapped in the leading and trailing whitespace of `value`.
fn keep_padding(value: &str, translation: &str) -> String {
    let start = value.len() - value.trim_start().len();
    let end = start + value.trim().len();
    format!("{}{}{}", &value[..start], translation, &value[end..])
}

impl PatchTarget for DocumentTarget<'_> {
    fn apply(&mut self, resolved: &ResolvedEntry) -> PatchOutcome {
        let source = resolved.source_text();
        let translation = resolved.translation.as_str();

        let origin = &resolved.entry.origin;
        if origin.file() != Some(self.file) {
            return PatchOutcome::SkippedNotFound;
        }

        match origin {
            Origin::Field { pointer, .. } => match self.string_at(pointer) {
                Some(value) if value.trim() == source => {
                    let patched = keep_padding(value, translation);
                    let differs = *value != patched;
                    *value = patched;
                    self.changed |= differs;
                    PatchOutcome::Applied { occurrences: 1 }
                }
                Some(value) if value.trim() == translation.trim() => {
                    PatchOutcome::SkippedAlreadyTranslated
                }
                _ => PatchOutcome::SkippedNotFound,
            },
            Origin::Inline { pointer, .. } => match self.string_at(pointer) {
                Some(value) => {
                    let before = value.clone();
                    let outcome = substitute_padded_literal(value, source, translation);
                    let differs = *value != before;
                    self.changed |= differs;
                    outcome
                }
                None => PatchOutcome::SkippedNotFound,
            },
            Origin::Script { .. } | Origin::MemoryRow { .. } => PatchOutcome::SkippedNotFound,
        }
    }
}

/// Applies `resolved` to `target`, longest source first so a short string
/// never clobbers part of a longer one that contains it.
pub fn patch_back(resolved: &[ResolvedEntry], target: &mut dyn PatchTarget) -> Vec<PatchResult> {
    let mut order: Vec<&ResolvedEntry> = resolved.iter().collect();
    order.sort_by_key(|r| std::cmp::Reverse(r.source_text().chars().count()));

    order
        .into_iter()
        .map(|r| {
            let outcome = target.apply(r);
            if !outcome.is_applied() {
                debug!(entry_id = %r.entry.entry_id, ?outcome, "entry not applied");
            }
            PatchResult::new(r, outcome)
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct CorpusPatchReport {
    pub files_changed: Vec<String>,
    pub applied: usize,
    pub already_translated: usize,
    pub not_found: usize,
    /// Sites whose text has no translation in memory.
    pub untranslated: usize,
}

/// Writes every translation the memory holds into every site that carries
/// its source text. Changed files are marked dirty and re-parsed.
pub fn patch_corpus(corpus: &mut Corpus, memory: &TranslationMemory) -> CorpusPatchReport {
    let mut report = CorpusPatchReport::default();

    for file in corpus.files_mut() {
        let mut resolved = Vec::new();
        for site in file_sites(file) {
            match memory.lookup_exact(&site.text) {
                Some(translation) => resolved.push(ResolvedEntry::new(
                    PendingEntry::new(&site.text, &site.tag, site.origin),
                    translation.trim(),
                )),
                None => report.untranslated += 1,
            }
        }
        if resolved.is_empty() {
            continue;
        }

        let mut target = DocumentTarget::new(&file.name, &mut file.raw);
        let results = patch_back(&resolved, &mut target);
        let changed = target.changed();

        for result in &results {
            match result.outcome {
                PatchOutcome::Applied { .. } => report.applied += 1,
                PatchOutcome::SkippedAlreadyTranslated => report.already_translated += 1,
                PatchOutcome::SkippedNotFound => report.not_found += 1,
            }
        }

        if changed {
            file.mark_dirty();
            if let Err(e) = file.refresh() {
                warn!(file = %file.name, "patched file no longer parses: {e}");
            }
            report.files_changed.push(file.name.clone());
        }
    }

    info!(
        files = report.files_changed.len(),
        applied = report.applied,
        untranslated = report.untranslated,
        "patched corpus"
    );
    report
}
