//! Note fields round-tripped through a flat `notes_map.json` keyed
//! `<Type>_<id>`, so plugin metadata tags can be edited outside the editor.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::{CoreError, CoreResult};
use crate::parsers::rpgmaker::{self, map_id_from_file_name};
use crate::services::encoding;
use crate::services::translation_memory::store::write_atomic;

/// Key → note text, in the order the notes were collected.
pub type NotesMap = Map<String, Value>;

/// Database files whose records carry a `note`, with their key prefix.
const DATABASE_NOTES: [(&str, &str); 11] = [
    ("Actors.json", "Actor"),
    ("Classes.json", "Class"),
    ("Enemies.json", "Enemy"),
    ("Items.json", "Item"),
    ("Skills.json", "Skill"),
    ("Weapons.json", "Weapon"),
    ("Armors.json", "Armor"),
    ("States.json", "State"),
    ("Tilesets.json", "Tileset"),
    ("Animations.json", "Animation"),
    ("MapInfos.json", "MapInfo"),
];

const EVENT_NOTES: [(&str, &str); 2] = [("CommonEvents.json", "CommonEvent"), ("Troops.json", "Troop")];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteScope {
    /// Database records (actors, classes, items, ...).
    Data,
    /// Common events, troops, maps and map events.
    Events,
    #[default]
    All,
}

impl NoteScope {
    fn data(self) -> bool {
        matches!(self, NoteScope::Data | NoteScope::All)
    }

    fn events(self) -> bool {
        matches!(self, NoteScope::Events | NoteScope::All)
    }

    /// Whether `key` names a note this scope reads and writes.
    fn covers(self, key: &str) -> bool {
        let is_event = EVENT_NOTES
            .iter()
            .any(|(_, prefix)| key.strip_prefix(prefix).is_some_and(|r| r.starts_with('_')))
            || key.starts_with("Map_")
            || key
                .strip_prefix("Map")
                .is_some_and(|r| r.starts_with(|c: char| c.is_ascii_digit()));
        if is_event {
            self.events()
        } else {
            self.data()
        }
    }
}

/// `Map_<digits>` for the map itself; events are `Map<digits>_Event_<id>`
/// since event ids repeat across maps.
fn map_key(stem: &str) -> String {
    format!("Map_{stem}")
}

fn map_event_key(stem: &str, id: u64) -> String {
    format!("Map{stem}_Event_{id}")
}

fn record_id(record: &Value) -> Option<u64> {
    record.get("id").and_then(Value::as_u64)
}

fn non_empty_note(record: &Value) -> Option<&str> {
    record
        .get("note")
        .and_then(Value::as_str)
        .filter(|n| !n.is_empty())
}

fn collect_records(raw: &Value, prefix: &str, out: &mut NotesMap) {
    let Some(records) = raw.as_array() else {
        return;
    };
    for record in records {
        if let (Some(id), Some(note)) = (record_id(record), non_empty_note(record)) {
            out.insert(format!("{prefix}_{id}"), Value::String(note.to_string()));
        }
    }
}

fn collect_map(raw: &Value, stem: &str, out: &mut NotesMap) {
    if let Some(note) = non_empty_note(raw) {
        out.insert(map_key(stem), Value::String(note.to_string()));
    }
    let Some(events) = raw.get("events").and_then(Value::as_array) else {
        return;
    };
    for event in events {
        if let (Some(id), Some(note)) = (record_id(event), non_empty_note(event)) {
            out.insert(map_event_key(stem, id), Value::String(note.to_string()));
        }
    }
}

/// Writes `notes[key]` into `record.note` when it differs. Non-string values
/// are ignored.
fn apply_note(record: &mut Value, key: &str, notes: &NotesMap, used: &mut HashSet<String>) -> bool {
    let Some(value) = notes.get(key) else {
        return false;
    };
    used.insert(key.to_string());

    let Some(note) = value.as_str() else {
        warn!(key, "note value is not a string");
        return false;
    };
    let Some(fields) = record.as_object_mut() else {
        return false;
    };
    if fields.get("note").and_then(Value::as_str) == Some(note) {
        return false;
    }
    fields.insert("note".to_string(), Value::String(note.to_string()));
    true
}

fn apply_records(raw: &mut Value, prefix: &str, notes: &NotesMap, used: &mut HashSet<String>) -> usize {
    let Some(records) = raw.as_array_mut() else {
        return 0;
    };
    let mut updated = 0;
    for record in records {
        let Some(id) = record_id(record) else { continue };
        if apply_note(record, &format!("{prefix}_{id}"), notes, used) {
            updated += 1;
        }
    }
    updated
}

fn apply_map(raw: &mut Value, stem: &str, notes: &NotesMap, used: &mut HashSet<String>) -> usize {
    let mut updated = usize::from(apply_note(raw, &map_key(stem), notes, used));
    let Some(events) = raw.get_mut("events").and_then(Value::as_array_mut) else {
        return updated;
    };
    for event in events {
        let Some(id) = record_id(event) else { continue };
        if apply_note(event, &map_event_key(stem, id), notes, used) {
            updated += 1;
        }
    }
    updated
}

/// Reads a data file, or `None` when it is absent or unusable. Only the
/// latter is worth a warning.
fn read_data_file(path: &Path) -> Option<Value> {
    if !path.exists() {
        debug!(path = %path.display(), "no such data file");
        return None;
    }
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    let parsed = encoding::read_text(path).and_then(|text| rpgmaker::parse_json(&text, name));
    match parsed {
        Ok(raw) => Some(raw),
        Err(e) => {
            warn!("skipping data file: {e}");
            None
        }
    }
}

/// Map file names of `dir` with their digit stems, sorted by name.
fn map_files(dir: &Path) -> CoreResult<Vec<(String, String)>> {
    let mut maps = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| CoreError::io(dir, e))? {
        let entry = entry.map_err(|e| CoreError::io(dir, e))?;
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        if map_id_from_file_name(&name).is_none() {
            continue;
        }
        let stem = name["Map".len()..name.len() - ".json".len()].to_string();
        maps.push((name, stem));
    }
    maps.sort();
    Ok(maps)
}

/// Every non-empty note of the data files in `dir` that `scope` covers.
pub fn collect_notes(dir: &Path, scope: NoteScope) -> CoreResult<NotesMap> {
    let mut notes = NotesMap::new();

    if scope.data() {
        for (file, prefix) in DATABASE_NOTES {
            if let Some(raw) = read_data_file(&dir.join(file)) {
                collect_records(&raw, prefix, &mut notes);
            }
        }
    }
    if scope.events() {
        for (file, prefix) in EVENT_NOTES {
            if let Some(raw) = read_data_file(&dir.join(file)) {
                collect_records(&raw, prefix, &mut notes);
            }
        }
        for (file, stem) in map_files(dir)? {
            if let Some(raw) = read_data_file(&dir.join(&file)) {
                collect_map(&raw, &stem, &mut notes);
            }
        }
    }

    Ok(notes)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NotesApplyReport {
    pub files_changed: Vec<String>,
    pub updated: usize,
    /// In-scope keys that matched no record.
    pub unmatched: Vec<String>,
}

/// Writes `notes` back into the data files of `dir`. A file is rewritten only
/// when one of its notes actually changed.
pub fn apply_notes(dir: &Path, notes: &NotesMap, scope: NoteScope) -> CoreResult<NotesApplyReport> {
    let mut report = NotesApplyReport::default();
    let mut used = HashSet::new();

    let mut targets: Vec<(String, Option<&str>, Option<String>)> = Vec::new();
    if scope.data() {
        targets.extend(DATABASE_NOTES.iter().map(|(f, p)| (f.to_string(), Some(*p), None)));
    }
    if scope.events() {
        targets.extend(EVENT_NOTES.iter().map(|(f, p)| (f.to_string(), Some(*p), None)));
        targets.extend(map_files(dir)?.into_iter().map(|(f, stem)| (f, None, Some(stem))));
    }

    for (file, prefix, stem) in targets {
        let path = dir.join(&file);
        let Some(mut raw) = read_data_file(&path) else {
            continue;
        };

        let updated = match (prefix, stem) {
            (Some(prefix), _) => apply_records(&mut raw, prefix, notes, &mut used),
            (None, Some(stem)) => apply_map(&mut raw, &stem, notes, &mut used),
            (None, None) => 0,
        };
        if updated == 0 {
            continue;
        }

        let json = serde_json::to_string(&raw).map_err(|e| CoreError::json(&file, e))?;
        write_atomic(&path, json.as_bytes())?;
        debug!(file = %file, updated, "rewrote notes");
        report.updated += updated;
        report.files_changed.push(file);
    }

    report.unmatched = notes
        .keys()
        .filter(|k| scope.covers(k) && !used.contains(k.as_str()))
        .cloned()
        .collect();

    info!(
        dir = %dir.display(),
        files = report.files_changed.len(),
        updated = report.updated,
        unmatched = report.unmatched.len(),
        "applied notes"
    );
    Ok(report)
}

pub fn load_map(path: &Path) -> CoreResult<NotesMap> {
    let text = encoding::read_text(path)?;
    serde_json::from_str(&text).map_err(|e| CoreError::json(path.display().to_string(), e))
}

pub fn save_map(path: &Path, notes: &NotesMap) -> CoreResult<()> {
    let json = serde_json::to_string_pretty(notes)
        .map_err(|e| CoreError::json(path.display().to_string(), e))?;
    write_atomic(path, json.as_bytes())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotesExtractSummary {
    pub notes: usize,
}

pub fn extract_file(data_dir: &Path, notes_path: &Path, scope: NoteScope) -> CoreResult<NotesExtractSummary> {
    let notes = collect_notes(data_dir, scope)?;
    save_map(notes_path, &notes)?;

    info!(path = %notes_path.display(), notes = notes.len(), "extracted notes");
    Ok(NotesExtractSummary { notes: notes.len() })
}

pub fn apply_file(data_dir: &Path, notes_path: &Path, scope: NoteScope) -> CoreResult<NotesApplyReport> {
    let notes = load_map(notes_path)?;
    apply_notes(data_dir, &notes, scope)
}
