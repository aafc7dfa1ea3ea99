use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Group header rows written by older extract runs (`12:Guard:0`).
static LOCATOR_ROW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+:[^:]+:\d+$").expect("locator row pattern"));

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreFlavor {
    /// `key, 日本語, English, 中文, 한국어, タグ説明`
    #[default]
    Extern,
    /// `original, translated`
    PluginString,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct MemoryRow {
    pub key: String,
    pub source: String,
    pub target: String,
    pub locale2: String,
    pub locale3: String,
    pub notes: String,
}

impl MemoryRow {
    pub fn new(source_text: &str, target: &str, notes: &str) -> Self {
        Self {
            key: source_text.to_string(),
            target: target.to_string(),
            notes: notes.to_string(),
            ..Self::default()
        }
    }

    /// The text to translate: the key column, or the source column when the
    /// key is blank.
    pub fn source_text(&self) -> &str {
        let key = self.key.trim();
        if key.is_empty() {
            self.source.trim()
        } else {
            key
        }
    }

    pub fn is_translated(&self) -> bool {
        !self.target.trim().is_empty()
    }

    pub fn is_locator_header(&self) -> bool {
        LOCATOR_ROW.is_match(self.source_text())
    }
}

/// Exact-match store of source → target strings, backed by sheet rows kept
/// in their original order.
#[derive(Debug, Clone, Default)]
pub struct TranslationMemory {
    flavor: StoreFlavor,
    rows: Vec<MemoryRow>,
    by_source: HashMap<String, Vec<usize>>,
    targets: HashSet<String>,
}

impl TranslationMemory {
    pub fn new(flavor: StoreFlavor) -> Self {
        Self {
            flavor,
            ..Self::default()
        }
    }

    pub fn from_rows(flavor: StoreFlavor, rows: Vec<MemoryRow>) -> Self {
        let mut memory = Self::new(flavor);
        for row in rows {
            memory.push_row(row);
        }
        memory
    }

    fn push_row(&mut self, row: MemoryRow) {
        let index = self.rows.len();
        let source = row.source_text().to_string();
        if !source.is_empty() {
            self.by_source.entry(source).or_default().push(index);
        }
        if row.is_translated() {
            self.targets.insert(row.target.trim().to_string());
        }
        self.rows.push(row);
    }

    pub fn flavor(&self) -> StoreFlavor {
        self.flavor
    }

    pub fn rows(&self) -> &[MemoryRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Translation of `text`, if one has been recorded.
    pub fn lookup_exact(&self, text: &str) -> Option<&str> {
        self.by_source
            .get(text)?
            .iter()
            .map(|&i| &self.rows[i])
            .find(|row| row.is_translated())
            .map(|row| row.target.as_str())
    }

    pub fn contains_source(&self, text: &str) -> bool {
        self.by_source.contains_key(text)
    }

    /// True when `text` is either a recorded source or a translation already
    /// produced for some source, i.e. it needs no new row.
    pub fn is_known(&self, text: &str) -> bool {
        self.contains_source(text) || self.targets.contains(text)
    }

    /// Records a translation for every row whose source is `source`.
    /// Returns false when no such row exists.
    #[cfg(test)]
    pub fn set_target(&mut self, source: &str, target: &str) -> bool {
        let Some(indices) = self.by_source.get(source) else {
            return false;
        };
        for &i in indices {
            self.rows[i].target = target.to_string();
        }
        if !target.trim().is_empty() {
            self.targets.insert(target.trim().to_string());
        }
        true
    }

    /// Writes `target` into the rows for `source` that have no translation
    /// yet, leaving translated rows alone. Returns how many rows were filled.
    pub fn fill_missing(&mut self, source: &str, target: &str) -> usize {
        if target.trim().is_empty() {
            return 0;
        }
        let Some(indices) = self.by_source.get(source) else {
            return 0;
        };

        let mut filled = 0usize;
        for &i in indices {
            let row = &mut self.rows[i];
            if !row.is_translated() {
                row.target = target.to_string();
                filled += 1;
            }
        }
        if filled > 0 {
            self.targets.insert(target.trim().to_string());
        }
        filled
    }

    /// Inserts or updates the row for `source`.
    ///
    /// Notes follow last-writer-wins. The target is only replaced by a
    /// non-empty value, so re-registering a string never drops its
    /// translation.
    pub fn upsert(&mut self, source: &str, target: &str, notes: &str) {
        match self.by_source.get(source).cloned() {
            Some(indices) => {
                for i in indices {
                    let row = &mut self.rows[i];
                    row.notes = notes.to_string();
                    if !target.trim().is_empty() {
                        row.target = target.to_string();
                    }
                }
                if !target.trim().is_empty() {
                    self.targets.insert(target.trim().to_string());
                }
            }
            None => self.push_row(MemoryRow::new(source, target, notes)),
        }
    }

    /// Rewrites every translated target through `f(source, target)`;
    /// returns how many rows changed.
    pub fn map_targets(&mut self, f: impl Fn(&str, &str) -> String) -> usize {
        let mut changed = 0usize;
        for row in self.rows.iter_mut().filter(|r| r.is_translated()) {
            let next = f(row.source_text(), &row.target);
            if next != row.target {
                row.target = next;
                changed += 1;
            }
        }
        if changed > 0 {
            self.targets = self
                .rows
                .iter()
                .filter(|r| r.is_translated())
                .map(|r| r.target.trim().to_string())
                .collect();
        }
        changed
    }
}
