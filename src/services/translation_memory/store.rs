use std::{
    fs,
    path::{Path, PathBuf},
};

use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use tracing::{debug, info};

use super::model::{MemoryRow, StoreFlavor, TranslationMemory};
use crate::error::{CoreError, CoreResult};
use crate::services::encoding;

const EXTERN_HEADER: [&str; 6] = ["key", "日本語", "English", "中文", "한국어", "タグ説明"];
const PLUGIN_HEADER: [&str; 2] = ["original", "translated"];

/// Reads a memory sheet, picking the flavor from its header row.
pub fn load(path: &Path) -> CoreResult<TranslationMemory> {
    load_as(path, StoreFlavor::Extern)
}

/// Like [`load`], but a missing file yields an empty memory of `flavor`.
pub fn load_or(path: &Path, flavor: StoreFlavor) -> CoreResult<TranslationMemory> {
    if !path.exists() {
        debug!(path = %path.display(), "no memory file yet");
        return Ok(TranslationMemory::new(flavor));
    }
    load_as(path, flavor)
}

/// `empty_flavor` applies when the sheet has no header row at all.
fn load_as(path: &Path, empty_flavor: StoreFlavor) -> CoreResult<TranslationMemory> {
    let text = encoding::read_text(path)?;
    let memory = parse(&text, empty_flavor)?;

    info!(
        path = %path.display(),
        rows = memory.len(),
        flavor = ?memory.flavor(),
        "loaded translation memory"
    );

    Ok(memory)
}

pub fn parse(text: &str, empty_flavor: StoreFlavor) -> CoreResult<TranslationMemory> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut records = reader.records();
    let header = match records.next() {
        Some(record) => record?,
        None => return Ok(TranslationMemory::new(empty_flavor)),
    };

    let flavor = detect_flavor(&header);
    let mut rows = Vec::new();
    for record in records {
        let record = record?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        rows.push(row_from_record(flavor, &record));
    }

    Ok(TranslationMemory::from_rows(flavor, rows))
}

fn detect_flavor(header: &StringRecord) -> StoreFlavor {
    let first = header.get(0).unwrap_or("").trim().trim_start_matches('\u{feff}');
    if header.len() == 2 && first.eq_ignore_ascii_case("original") {
        StoreFlavor::PluginString
    } else {
        StoreFlavor::Extern
    }
}

fn row_from_record(flavor: StoreFlavor, record: &StringRecord) -> MemoryRow {
    let cell = |i: usize| record.get(i).unwrap_or("").to_string();

    match flavor {
        StoreFlavor::PluginString => MemoryRow {
            key: cell(0),
            target: cell(1),
            ..MemoryRow::default()
        },
        StoreFlavor::Extern => MemoryRow {
            key: cell(0),
            source: cell(1),
            target: cell(2),
            locale2: cell(3),
            locale3: cell(4),
            notes: cell(5),
        },
    }
}

pub fn to_csv(memory: &TranslationMemory) -> CoreResult<Vec<u8>> {
    let mut writer = WriterBuilder::new().flexible(false).from_writer(Vec::new());

    match memory.flavor() {
        StoreFlavor::PluginString => {
            writer.write_record(PLUGIN_HEADER)?;
            for row in memory.rows() {
                writer.write_record([row.key.as_str(), row.target.as_str()])?;
            }
        }
        StoreFlavor::Extern => {
            writer.write_record(EXTERN_HEADER)?;
            for row in memory.rows() {
                writer.write_record([
                    row.key.as_str(),
                    row.source.as_str(),
                    row.target.as_str(),
                    row.locale2.as_str(),
                    row.locale3.as_str(),
                    row.notes.as_str(),
                ])?;
            }
        }
    }

    writer
        .into_inner()
        .map_err(|e| CoreError::Config(format!("failed to flush memory sheet: {e}")))
}

/// Rewrites the sheet in its own flavor. Readers never see a half-written
/// file.
pub fn save(path: &Path, memory: &TranslationMemory) -> CoreResult<()> {
    let bytes = to_csv(memory)?;
    write_atomic(path, &bytes)?;

    debug!(path = %path.display(), rows = memory.len(), "saved translation memory");
    Ok(())
}

pub fn write_atomic(path: &Path, bytes: &[u8]) -> CoreResult<()> {
    let tmp = tmp_path(path);

    if let Some(parent) = tmp.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| CoreError::io(parent, e))?;
    }

    fs::write(&tmp, bytes).map_err(|e| CoreError::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| CoreError::io(path, e))?;

    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut p = path.to_path_buf();
    let file_name = match path.file_name().and_then(|s| s.to_str()) {
        Some(n) => n.to_string(),
        None => "memory".to_string(),
    };
    p.set_file_name(format!("{file_name}.tmp"));
    p
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extern_sheet_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("translations.csv");
        fs::write(
            &path,
            "key,日本語,English,中文,한국어,タグ説明\n\
             こんにちは,,Hello,,,CE1:Greeter\n\
             \"改行\n付き\",,,,,ACTOR1:Harold\n",
        )
        .unwrap();

        let mut memory = load(&path).unwrap();
        assert_eq!(memory.flavor(), StoreFlavor::Extern);
        assert_eq!(memory.len(), 2);
        assert_eq!(memory.lookup_exact("こんにちは"), Some("Hello"));
        assert!(memory.contains_source("改行\n付き"));

        memory.set_target("改行\n付き", "Line\nbreak");
        save(&path, &memory).unwrap();

        let reloaded = load(&path).unwrap();
        assert_eq!(reloaded.rows(), memory.rows());
        assert!(!dir.path().join("translations.csv.tmp").exists());
    }

    #[test]
    fn plugin_sheet_keeps_its_flavor() {
        let memory = parse(
            "Original,Translated\nはじめから,New Game\nつづきから\n",
            StoreFlavor::Extern,
        )
        .unwrap();

        assert_eq!(memory.flavor(), StoreFlavor::PluginString);
        assert_eq!(memory.lookup_exact("はじめから"), Some("New Game"));
        assert_eq!(memory.rows()[1].target, "");

        let written = String::from_utf8(to_csv(&memory).unwrap()).unwrap();
        assert!(written.starts_with("original,translated\n"));
    }

    #[test]
    fn missing_file_gives_empty_memory() {
        let dir = tempfile::tempdir().unwrap();
        let memory = load_or(&dir.path().join("none.csv"), StoreFlavor::PluginString).unwrap();

        assert_eq!(memory.len(), 0);
        assert_eq!(memory.flavor(), StoreFlavor::PluginString);
    }

    #[test]
    fn empty_plugin_sheet_is_saved_with_plugin_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plugins_text.csv");
        fs::write(&path, "").unwrap();

        let mut sheet = load_or(&path, StoreFlavor::PluginString).unwrap();
        assert_eq!(sheet.flavor(), StoreFlavor::PluginString);

        sheet.upsert("はじめから", "New Game", "");
        save(&path, &sheet).unwrap();

        let saved = fs::read_to_string(&path).unwrap();
        assert_eq!(saved, "original,translated\nはじめから,New Game\n");
    }
}
