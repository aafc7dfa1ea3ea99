use std::path::{Path, PathBuf};

use serde_json::{json, Value};

use crate::error::{CoreError, CoreResult};
use crate::services::config::{load_settings, SETTINGS_FILE};
use crate::services::corpus::Corpus;
use crate::services::extract::extract;
use crate::services::patch::patch_corpus;
use crate::services::pipeline::Orchestrator;
use crate::services::provider::ChatCompletionsProvider;
use crate::services::registry::GlobalTextRegistry;
use crate::services::translation_memory::normalize::clean_stored;
use crate::services::translation_memory::{store, StoreFlavor};
use crate::services::notes::{self, NoteScope};
use crate::services::{encoding, plugins, qa};

fn path_arg(payload: &Value, key: &str) -> CoreResult<PathBuf> {
    payload
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .ok_or_else(|| CoreError::Config(format!("payload.{key} is required")))
}

/// `payload.scope`, defaulting to every note-bearing file.
fn scope_arg(payload: &Value) -> CoreResult<NoteScope> {
    match payload.get("scope") {
        None | Some(Value::Null) => Ok(NoteScope::default()),
        Some(v) => serde_json::from_value(v.clone())
            .map_err(|_| CoreError::Config(format!("unknown note scope: {v}"))),
    }
}

fn to_value<T: serde::Serialize>(value: &T) -> CoreResult<Value> {
    serde_json::to_value(value).map_err(|e| CoreError::json("response", e))
}

/// Appends strings the memory has not seen yet, tagged with where they were
/// first found.
pub fn corpus_extract(payload: &Value) -> CoreResult<Value> {
    let data_dir = path_arg(payload, "data_dir")?;
    let memory_path = path_arg(payload, "memory_path")?;

    let corpus = Corpus::load_dir(&data_dir)?;
    let mut memory = store::load_or(&memory_path, StoreFlavor::Extern)?;
    let mut registry = GlobalTextRegistry::new();

    let pending = extract(&corpus, &memory, &mut registry);
    for entry in &pending {
        memory.upsert(&entry.source_text, "", &entry.locator_tag);
    }
    if !pending.is_empty() {
        store::save(&memory_path, &memory)?;
    }

    Ok(json!({
        "added": pending.len(),
        "rows": memory.len(),
        "entries": pending,
    }))
}

pub fn corpus_patch(payload: &Value) -> CoreResult<Value> {
    let data_dir = path_arg(payload, "data_dir")?;
    let memory_path = path_arg(payload, "memory_path")?;

    let mut corpus = Corpus::load_dir(&data_dir)?;
    let memory = store::load(&memory_path)?;

    let report = patch_corpus(&mut corpus, &memory);
    let written = corpus.write_dirty(&data_dir)?;

    Ok(json!({ "report": to_value(&report)?, "written": written }))
}

/// Runs the orchestrator, rewriting the memory file after every batch.
pub fn memory_translate(payload: &Value) -> CoreResult<Value> {
    let memory_path = path_arg(payload, "memory_path")?;
    let settings = load_settings(Path::new(SETTINGS_FILE), payload.get("settings"))?;

    let mut memory = store::load(&memory_path)?;
    let provider = ChatCompletionsProvider::new(&settings)?;
    let orchestrator = Orchestrator::new(&provider, &settings);

    let report = orchestrator.run(&mut memory, |m| store::save(&memory_path, m))?;
    Ok(json!({ "report": to_value(&report)? }))
}

pub fn memory_clean(payload: &Value) -> CoreResult<Value> {
    let memory_path = path_arg(payload, "memory_path")?;

    let mut memory = store::load(&memory_path)?;
    let changed = memory.map_targets(clean_stored);
    if changed > 0 {
        store::save(&memory_path, &memory)?;
    }

    Ok(json!({ "changed": changed }))
}

pub fn memory_check(payload: &Value) -> CoreResult<Value> {
    let memory_path = path_arg(payload, "memory_path")?;
    let memory = store::load(&memory_path)?;
    Ok(json!({ "issues": qa::review(&memory) }))
}

pub fn notes_extract(payload: &Value) -> CoreResult<Value> {
    let summary = notes::extract_file(
        &path_arg(payload, "data_dir")?,
        &path_arg(payload, "notes_path")?,
        scope_arg(payload)?,
    )?;
    to_value(&summary)
}

pub fn notes_apply(payload: &Value) -> CoreResult<Value> {
    let report = notes::apply_file(
        &path_arg(payload, "data_dir")?,
        &path_arg(payload, "notes_path")?,
        scope_arg(payload)?,
    )?;
    to_value(&report)
}

pub fn plugins_extract(payload: &Value) -> CoreResult<Value> {
    let summary = plugins::extract_file(
        &path_arg(payload, "plugins_path")?,
        &path_arg(payload, "sheet_path")?,
    )?;
    to_value(&summary)
}

pub fn plugins_apply(payload: &Value) -> CoreResult<Value> {
    let report = plugins::apply_file(
        &path_arg(payload, "plugins_path")?,
        &path_arg(payload, "sheet_path")?,
    )?;
    to_value(&report)
}

pub fn plugins_check(payload: &Value) -> CoreResult<Value> {
    let plugins_path = path_arg(payload, "plugins_path")?;
    let sheet_path = path_arg(payload, "sheet_path")?;

    let content = encoding::read_text(&plugins_path)?;
    let sheet = store::load_or(&sheet_path, StoreFlavor::PluginString)?;
    let missing = qa::missing_plugin_strings(&content, &sheet);

    Ok(json!({ "complete": missing.is_empty(), "missing": missing }))
}
