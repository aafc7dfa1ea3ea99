use std::collections::HashSet;

use crate::model::entry::{Origin, PendingEntry};
use crate::services::translation_memory::TranslationMemory;

/// Texts already seen during one extraction pass, across every file and
/// entity kind. A string shared by a map and an item is proposed once.
#[derive(Debug, Default)]
pub struct GlobalTextRegistry {
    seen: HashSet<String>,
}

impl GlobalTextRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a pending entry the first time `text` shows up and the memory
    /// does not know it yet. Empty text never yields an entry.
    pub fn register_new(
        &mut self,
        memory: &TranslationMemory,
        text: &str,
        locator_tag: &str,
        origin: Origin,
    ) -> Option<PendingEntry> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let known = memory.is_known(text) || self.seen.contains(text);
        self.seen.insert(text.to_string());

        if known {
            None
        } else {
            Some(PendingEntry::new(text, locator_tag, origin))
        }
    }

    /// Distinct texts seen so far.
    pub fn len(&self) -> usize {
        self.seen.len()
    }
}
