use serde::{Deserialize, Serialize};

use crate::services::translation_memory::hash;

/// Where a source string lives, so a translation can be written back.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Origin {
    /// A whole string value at `pointer` (RFC 6901) inside `file`.
    Field { file: String, pointer: String },

    /// A quoted literal embedded in the string value at `pointer`.
    Inline { file: String, pointer: String },

    /// A quoted literal somewhere in a standalone script file.
    Script { file: String },

    /// A row of the translation memory sheet.
    MemoryRow { index: usize },
}

impl Origin {
    pub fn field(file: &str, pointer: impl Into<String>) -> Self {
        Origin::Field {
            file: file.to_string(),
            pointer: pointer.into(),
        }
    }

    pub fn inline(file: &str, pointer: impl Into<String>) -> Self {
        Origin::Inline {
            file: file.to_string(),
            pointer: pointer.into(),
        }
    }

    pub fn file(&self) -> Option<&str> {
        match self {
            Origin::Field { file, .. } | Origin::Inline { file, .. } | Origin::Script { file } => {
                Some(file)
            }
            Origin::MemoryRow { .. } => None,
        }
    }
}

/// A string awaiting translation.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PendingEntry {
    pub entry_id: String,

    pub source_text: String,

    /// Breadcrumb for translators (`12:Guard:0`, `ACTOR1:Harold`, ...).
    #[serde(default)]
    pub locator_tag: String,

    pub origin: Origin,
}

impl PendingEntry {
    pub fn new(source_text: &str, locator_tag: &str, origin: Origin) -> Self {
        Self {
            entry_id: hash::entry_id(source_text),
            source_text: source_text.to_string(),
            locator_tag: locator_tag.to_string(),
            origin,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ResolvedEntry {
    pub entry: PendingEntry,

    pub translation: String,

    /// Response key adopted through fuzzy matching, if the exact key was
    /// missing.
    #[serde(default)]
    pub matched_key: Option<String>,
}

impl ResolvedEntry {
    pub fn new(entry: PendingEntry, translation: impl Into<String>) -> Self {
        Self {
            entry,
            translation: translation.into(),
            matched_key: None,
        }
    }

    pub fn source_text(&self) -> &str {
        &self.entry.source_text
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PatchOutcome {
    Applied { occurrences: usize },
    SkippedNotFound,
    SkippedAlreadyTranslated,
}

impl PatchOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, PatchOutcome::Applied { .. })
    }
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct PatchResult {
    pub entry_id: String,
    pub source_text: String,
    pub locator_tag: String,
    pub origin: Origin,
    pub outcome: PatchOutcome,
}

impl PatchResult {
    pub fn new(resolved: &ResolvedEntry, outcome: PatchOutcome) -> Self {
        Self {
            entry_id: resolved.entry.entry_id.clone(),
            source_text: resolved.entry.source_text.clone(),
            locator_tag: resolved.entry.locator_tag.clone(),
            origin: resolved.entry.origin.clone(),
            outcome,
        }
    }
}
