use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{CoreError, CoreResult};
use crate::model::database::{Actor, Collection, CommonEvent, Enemy, Item, Skill, Troop};
use crate::model::map::MapData;
use crate::model::system::SystemData;
use crate::parsers::rpgmaker::{self, map_id_from_file_name};
use crate::services::encoding;
use crate::services::translation_memory::store::write_atomic;

/// Data files that carry player-visible text, in extraction order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DocumentKind {
    CommonEvents,
    Troops,
    Actors,
    Items,
    Skills,
    Enemies,
    System,
    Map(u32),
}

impl DocumentKind {
    pub fn from_file_name(name: &str) -> Option<Self> {
        let kind = match name {
            "CommonEvents.json" => DocumentKind::CommonEvents,
            "Troops.json" => DocumentKind::Troops,
            "Actors.json" => DocumentKind::Actors,
            "Items.json" => DocumentKind::Items,
            "Skills.json" => DocumentKind::Skills,
            "Enemies.json" => DocumentKind::Enemies,
            "System.json" => DocumentKind::System,
            other => DocumentKind::Map(map_id_from_file_name(other)?),
        };
        Some(kind)
    }

    /// Extraction rank. Maps share one rank and are ordered by file name.
    pub fn rank(&self) -> u8 {
        match self {
            DocumentKind::CommonEvents => 0,
            DocumentKind::Troops => 1,
            DocumentKind::Actors => 2,
            DocumentKind::Items => 3,
            DocumentKind::Skills => 4,
            DocumentKind::Enemies => 5,
            DocumentKind::System => 6,
            DocumentKind::Map(_) => 7,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Document {
    CommonEvents(Collection<CommonEvent>),
    Troops(Collection<Troop>),
    Actors(Collection<Actor>),
    Items(Collection<Item>),
    Skills(Collection<Skill>),
    Enemies(Collection<Enemy>),
    System(SystemData),
    Map { id: u32, data: MapData },
}

impl Document {
    pub fn parse(kind: DocumentKind, raw: &Value, file: &str) -> CoreResult<Self> {
        let doc = match kind {
            DocumentKind::CommonEvents => Document::CommonEvents(rpgmaker::parse_collection(
                raw,
                file,
                "common event",
                rpgmaker::parse_common_event,
            )?),
            DocumentKind::Troops => Document::Troops(rpgmaker::parse_collection(
                raw,
                file,
                "troop",
                rpgmaker::parse_troop,
            )?),
            DocumentKind::Actors => Document::Actors(rpgmaker::parse_collection(
                raw,
                file,
                "actor",
                rpgmaker::parse_actor,
            )?),
            DocumentKind::Items => Document::Items(rpgmaker::parse_collection(
                raw,
                file,
                "item",
                rpgmaker::parse_item,
            )?),
            DocumentKind::Skills => Document::Skills(rpgmaker::parse_collection(
                raw,
                file,
                "skill",
                rpgmaker::parse_skill,
            )?),
            DocumentKind::Enemies => Document::Enemies(rpgmaker::parse_collection(
                raw,
                file,
                "enemy",
                rpgmaker::parse_enemy,
            )?),
            DocumentKind::System => Document::System(rpgmaker::parse_system(raw, file)?),
            DocumentKind::Map(id) => Document::Map {
                id,
                data: rpgmaker::parse_map(raw, file)?,
            },
        };
        Ok(doc)
    }
}

/// One data file: the raw JSON that gets patched and the typed view that
/// extraction walks.
#[derive(Debug, Clone)]
pub struct CorpusFile {
    pub name: String,
    pub kind: DocumentKind,
    pub raw: Value,
    pub document: Document,
    dirty: bool,
}

impl CorpusFile {
    pub fn new(name: &str, raw: Value) -> CoreResult<Option<Self>> {
        let Some(kind) = DocumentKind::from_file_name(name) else {
            return Ok(None);
        };
        let document = Document::parse(kind, &raw, name)?;
        Ok(Some(Self {
            name: name.to_string(),
            kind,
            raw,
            document,
            dirty: false,
        }))
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Rebuilds the typed view after `raw` was patched.
    pub fn refresh(&mut self) -> CoreResult<()> {
        self.document = Document::parse(self.kind, &self.raw, &self.name)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct Corpus {
    files: Vec<CorpusFile>,
}

impl Corpus {
    /// Builds a corpus from already-decoded files. Unknown file names are
    /// ignored; a file whose root has the wrong shape is logged and skipped.
    pub fn from_raw(files: Vec<(String, Value)>) -> Self {
        let mut out = Vec::new();

        for (name, raw) in files {
            match CorpusFile::new(&name, raw) {
                Ok(Some(file)) => out.push(file),
                Ok(None) => debug!(file = %name, "not a text-bearing data file"),
                Err(e) => warn!(file = %name, "skipping data file: {e}"),
            }
        }

        out.sort_by(|a, b| (a.kind.rank(), &a.name).cmp(&(b.kind.rank(), &b.name)));
        Self { files: out }
    }

    pub fn load_dir(dir: &Path) -> CoreResult<Self> {
        let entries = fs::read_dir(dir).map_err(|e| CoreError::io(dir, e))?;

        let mut raw_files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| CoreError::io(dir, e))?;
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
                continue;
            };
            if DocumentKind::from_file_name(&name).is_none() {
                continue;
            }

            let text = match encoding::read_text(&path) {
                Ok(text) => text,
                Err(e) => {
                    warn!("skipping unreadable data file: {e}");
                    continue;
                }
            };
            match rpgmaker::parse_json(&text, &name) {
                Ok(raw) => raw_files.push((name, raw)),
                Err(e) => warn!("skipping data file: {e}"),
            }
        }

        let corpus = Self::from_raw(raw_files);
        info!(dir = %dir.display(), files = corpus.files.len(), "loaded corpus");
        Ok(corpus)
    }

    pub fn files(&self) -> &[CorpusFile] {
        &self.files
    }

    pub fn files_mut(&mut self) -> &mut [CorpusFile] {
        &mut self.files
    }

    #[cfg(test)]
    pub fn file(&self, name: &str) -> Option<&CorpusFile> {
        self.files.iter().find(|f| f.name == name)
    }

    /// Writes every patched file back to `dir` in compact form, the way the
    /// editor stores them. Returns the written file names.
    pub fn write_dirty(&mut self, dir: &Path) -> CoreResult<Vec<String>> {
        let mut written = Vec::new();

        for file in self.files.iter_mut().filter(|f| f.is_dirty()) {
            let json = serde_json::to_string(&file.raw).map_err(|e| CoreError::json(&file.name, e))?;
            write_atomic(&dir.join(&file.name), json.as_bytes())?;
            file.dirty = false;
            written.push(file.name.clone());
        }

        if !written.is_empty() {
            info!(dir = %dir.display(), files = written.len(), "wrote patched data files");
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn files_are_ordered_by_kind_then_name() {
        let corpus = Corpus::from_raw(vec![
            ("Map010.json".into(), json!({ "events": [] })),
            ("System.json".into(), json!({})),
            ("Map002.json".into(), json!({ "events": [] })),
            ("MapInfos.json".into(), json!([])),
            ("CommonEvents.json".into(), json!([null])),
        ]);

        let names: Vec<&str> = corpus.files().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["CommonEvents.json", "System.json", "Map002.json", "Map010.json"]
        );
    }

    #[test]
    fn wrong_shape_only_drops_that_file() {
        let corpus = Corpus::from_raw(vec![
            ("Actors.json".into(), json!({ "not": "an array" })),
            ("Items.json".into(), json!([null, { "id": 1, "name": "薬草" }])),
        ]);

        assert_eq!(corpus.files().len(), 1);
        assert_eq!(corpus.files()[0].kind, DocumentKind::Items);
    }

    #[test]
    fn unreadable_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("Map002.json")).unwrap();
        fs::write(dir.path().join("Items.json"), r#"[null,{"id":1,"name":"薬草"}]"#).unwrap();

        let corpus = Corpus::load_dir(dir.path()).unwrap();

        assert_eq!(corpus.files().len(), 1);
        assert_eq!(corpus.files()[0].name, "Items.json");
    }

    #[test]
    fn load_and_write_back_dirty_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Items.json"), r#"[null,{"id":1,"name":"薬草"}]"#).unwrap();
        fs::write(dir.path().join("Map001.json"), "{ not json").unwrap();
        fs::write(dir.path().join("readme.txt"), "ignored").unwrap();

        let mut corpus = Corpus::load_dir(dir.path()).unwrap();
        assert_eq!(corpus.files().len(), 1);

        let file = &mut corpus.files_mut()[0];
        file.raw[1]["name"] = json!("Herb");
        file.mark_dirty();
        assert!(file.is_dirty());

        let written = corpus.write_dirty(dir.path()).unwrap();
        assert_eq!(written, vec!["Items.json".to_string()]);

        let saved = fs::read_to_string(dir.path().join("Items.json")).unwrap();
        assert_eq!(saved, r#"[null,{"id":1,"name":"Herb"}]"#);
        assert!(corpus.write_dirty(dir.path()).unwrap().is_empty());
    }
}
