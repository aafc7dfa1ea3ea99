//! Walks a loaded corpus and lists every player-visible string together with
//! the JSON pointer it came from.

use serde_json::Value;
use tracing::info;

use crate::model::command::{Command, CODE_SHOW_CHOICES, CODE_SHOW_TEXT, CODE_TEXT_LINE};
use crate::model::database::Collection;
use crate::model::entry::{Origin, PendingEntry};
use crate::model::map::MapData;
use crate::model::system::{SystemData, TermSlot};
use crate::parsers::coerce::text_of;
use crate::parsers::script;
use crate::services::corpus::{Corpus, CorpusFile, Document};
use crate::services::registry::GlobalTextRegistry;
use crate::services::translation_memory::TranslationMemory;

/// A string found in a command list. `pointer` is relative to the list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListText {
    pub text: String,
    pub pointer: String,
    /// Found inside a script string rather than being the whole value.
    pub inline: bool,
}

/// A string found anywhere in the corpus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSite {
    pub text: String,
    pub tag: String,
    pub origin: Origin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DialogueState {
    Scanning,
    InMessage,
}

/// RFC 6901 escaping of a single reference token.
pub fn escape_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

fn push_text(out: &mut Vec<ListText>, value: Option<&Value>, pointer: String) {
    let text = text_of(value);
    let text = text.trim();
    if !text.is_empty() {
        out.push(ListText {
            text: text.to_string(),
            pointer,
            inline: false,
        });
    }
}

fn scan_inline(value: &Value, pointer: String, out: &mut Vec<ListText>) {
    match value {
        Value::String(s) => {
            for text in script::comment_pushes(s) {
                out.push(ListText {
                    text,
                    pointer: pointer.clone(),
                    inline: true,
                });
            }
        }
        Value::Array(items) => {
            for (k, item) in items.iter().enumerate() {
                scan_inline(item, format!("{pointer}/{k}"), out);
            }
        }
        Value::Object(map) => {
            for (key, item) in map {
                scan_inline(item, format!("{pointer}/{}", escape_token(key)), out);
            }
        }
        _ => {}
    }
}

/// Message lines, choice captions and scripted comment text of a command
/// list, in command order.
pub fn list_texts(list: &[Command]) -> Vec<ListText> {
    let mut out = Vec::new();
    let mut state = DialogueState::Scanning;
    let mut i = 0;

    while i < list.len() {
        let command = &list[i];

        match (state, command.code) {
            (DialogueState::InMessage, CODE_TEXT_LINE) => {
                push_text(&mut out, command.parameters.first(), format!("/{i}/parameters/0"));
            }
            (DialogueState::InMessage, _) => {
                // The message ended; look at this command again while scanning.
                state = DialogueState::Scanning;
                continue;
            }
            (DialogueState::Scanning, CODE_SHOW_TEXT) => state = DialogueState::InMessage,
            (DialogueState::Scanning, CODE_SHOW_CHOICES) => {
                let captions = command
                    .parameters
                    .first()
                    .and_then(Value::as_array)
                    .map(Vec::as_slice)
                    .unwrap_or(&[]);
                for (k, caption) in captions.iter().enumerate() {
                    push_text(&mut out, Some(caption), format!("/{i}/parameters/0/{k}"));
                }
            }
            _ => {}
        }

        for (p, param) in command.parameters.iter().enumerate() {
            scan_inline(param, format!("/{i}/parameters/{p}"), &mut out);
        }
        i += 1;
    }

    out
}

struct SiteCollector<'a> {
    file: &'a str,
    out: Vec<TextSite>,
}

impl<'a> SiteCollector<'a> {
    fn new(file: &'a str) -> Self {
        Self {
            file,
            out: Vec::new(),
        }
    }

    fn field(&mut self, text: &str, tag: &str, pointer: String) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        self.out.push(TextSite {
            text: text.to_string(),
            tag: tag.to_string(),
            origin: Origin::field(self.file, pointer),
        });
    }

    fn slot(&mut self, slot: &TermSlot, tag: &str, pointer: String) {
        if let Some(text) = slot {
            self.field(text, tag, pointer);
        }
    }

    fn list(&mut self, list: &[Command], tag: &str, base: &str) {
        for found in list_texts(list) {
            let pointer = format!("{base}{}", found.pointer);
            let origin = if found.inline {
                Origin::inline(self.file, pointer)
            } else {
                Origin::field(self.file, pointer)
            };
            self.out.push(TextSite {
                text: found.text,
                tag: tag.to_string(),
                origin,
            });
        }
    }

    fn records<T>(
        &mut self,
        records: &Collection<T>,
        prefix: &str,
        describe: impl Fn(&T) -> (i64, &str, Vec<(&'static str, &str)>),
    ) {
        for (index, record) in records.iter().enumerate() {
            let Some(record) = record else { continue };
            let (id, name, fields) = describe(record);
            let tag = format!("{prefix}{id}:{name}");
            for (key, text) in fields {
                self.field(text, &tag, format!("/{index}/{key}"));
            }
        }
    }

    fn system(&mut self, system: &SystemData) {
        self.slot(&system.game_title, "SYS:gameTitle", "/gameTitle".into());
        self.slot(&system.currency_unit, "SYS:currencyUnit", "/currencyUnit".into());

        for (key, names) in system.name_lists() {
            let tag = format!("SYS:{key}");
            for (i, slot) in names.iter().enumerate().skip(1) {
                self.slot(slot, &tag, format!("/{key}/{i}"));
            }
        }

        let terms = &system.terms;
        for (key, slots) in [
            ("basic", &terms.basic),
            ("commands", &terms.commands),
            ("params", &terms.params),
        ] {
            let tag = format!("SYS:terms.{key}");
            for (i, slot) in slots.iter().enumerate() {
                self.slot(slot, &tag, format!("/terms/{key}/{i}"));
            }
        }

        for (key, slot) in &terms.messages {
            self.slot(
                slot,
                &format!("SYS:terms.messages.{key}"),
                format!("/terms/messages/{}", escape_token(key)),
            );
        }
    }

    fn map(&mut self, id: u32, map: &MapData) {
        for (e, event) in map.events.iter().enumerate() {
            let Some(event) = event else { continue };
            for (p, page) in event.pages.iter().enumerate() {
                let Some(page) = page else { continue };
                let tag = format!("{id}:{}:{p}", event.name);
                self.list(&page.list, &tag, &format!("/events/{e}/pages/{p}/list"));
            }
        }
    }
}

/// Every text site of one data file, in document order.
pub fn file_sites(file: &CorpusFile) -> Vec<TextSite> {
    let mut sites = SiteCollector::new(&file.name);

    match &file.document {
        Document::CommonEvents(events) => {
            for (index, event) in events.iter().enumerate() {
                let Some(event) = event else { continue };
                let tag = format!("CE{}:{}", event.id, event.name);
                sites.list(&event.list, &tag, &format!("/{index}/list"));
            }
        }
        Document::Troops(troops) => {
            for (index, troop) in troops.iter().enumerate() {
                let Some(troop) = troop else { continue };
                for (p, page) in troop.pages.iter().enumerate() {
                    let tag = format!("TR{}:{}:P{p}", troop.id, troop.name);
                    sites.list(&page.list, &tag, &format!("/{index}/pages/{p}/list"));
                }
            }
        }
        Document::Actors(actors) => sites.records(actors, "ACTOR", |a| {
            (
                a.id,
                a.name.as_str(),
                vec![
                    ("name", a.name.as_str()),
                    ("nickname", a.nickname.as_str()),
                    ("profile", a.profile.as_str()),
                    ("note", a.note.as_str()),
                ],
            )
        }),
        Document::Items(items) => sites.records(items, "ITEM", |i| {
            (
                i.id,
                i.name.as_str(),
                vec![
                    ("name", i.name.as_str()),
                    ("description", i.description.as_str()),
                    ("note", i.note.as_str()),
                ],
            )
        }),
        Document::Skills(skills) => sites.records(skills, "SKILL", |s| {
            (
                s.id,
                s.name.as_str(),
                vec![
                    ("name", s.name.as_str()),
                    ("message1", s.message1.as_str()),
                    ("message2", s.message2.as_str()),
                    ("note", s.note.as_str()),
                ],
            )
        }),
        Document::Enemies(enemies) => sites.records(enemies, "ENEMY", |e| {
            (
                e.id,
                e.name.as_str(),
                vec![("name", e.name.as_str()), ("note", e.note.as_str())],
            )
        }),
        Document::System(system) => sites.system(system),
        Document::Map { id, data } => sites.map(*id, data),
    }

    sites.out
}

pub fn collect_sites(corpus: &Corpus) -> Vec<TextSite> {
    corpus.files().iter().flat_map(file_sites).collect()
}

/// Strings of `corpus` that the memory does not know yet, each proposed once
/// at its first site.
pub fn extract(
    corpus: &Corpus,
    memory: &TranslationMemory,
    registry: &mut GlobalTextRegistry,
) -> Vec<PendingEntry> {
    let sites = collect_sites(corpus);
    let total = sites.len();

    let pending: Vec<PendingEntry> = sites
        .into_iter()
        .filter_map(|site| registry.register_new(memory, &site.text, &site.tag, site.origin))
        .collect();

    info!(
        sites = total,
        distinct = registry.len(),
        new = pending.len(),
        "extracted corpus text"
    );
    pending
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::translation_memory::{MemoryRow, StoreFlavor};
    use serde_json::json;

    fn command(code: i64, parameters: Vec<Value>) -> Command {
        Command::new(code, 0, parameters)
    }

    fn texts(list: &[Command]) -> Vec<String> {
        list_texts(list).into_iter().map(|t| t.text).collect()
    }

    fn sample_corpus() -> Corpus {
        Corpus::from_raw(vec![
            (
                "Map001.json".into(),
                json!({
                    "events": [null, {
                        "id": 1, "name": "Guard",
                        "pages": [{
                            "list": [
                                { "code": 101, "indent": 0, "parameters": ["", 0, 0, 2] },
                                { "code": 401, "indent": 0, "parameters": ["止まれ！"] },
                                { "code": 401, "indent": 0, "parameters": ["薬草"] },
                                { "code": 0, "indent": 0, "parameters": [] }
                            ]
                        }]
                    }]
                }),
            ),
            (
                "Items.json".into(),
                json!([null, { "id": 1, "name": "薬草", "description": " HPを回復する ", "note": "" }]),
            ),
            (
                "System.json".into(),
                json!({
                    "gameTitle": "勇者の旅",
                    "armorTypes": ["", "盾"],
                    "terms": {
                        "basic": ["レベル"],
                        "commands": ["戦う", null],
                        "params": [],
                        "messages": { "a/b": "勝利！" }
                    }
                }),
            ),
        ])
    }

    #[test]
    fn message_lines_then_choices() {
        let list = vec![
            command(101, vec![json!(""), json!(0)]),
            command(401, vec![json!("A")]),
            command(401, vec![json!("B")]),
            command(102, vec![json!(["X", "Y"])]),
        ];

        assert_eq!(texts(&list), vec!["A", "B", "X", "Y"]);
    }

    #[test]
    fn lines_outside_a_message_are_ignored() {
        let list = vec![
            command(401, vec![json!("stray")]),
            command(101, vec![]),
            command(401, vec![json!("  ")]),
            command(401, vec![json!(7)]),
            command(101, vec![]),
            command(401, vec![json!("second")]),
        ];

        assert_eq!(texts(&list), vec!["7", "second"]);
    }

    #[test]
    fn scripted_comments_are_found_at_any_depth() {
        let list = vec![command(
            355,
            vec![json!({ "script": ["this._comments[0].push(\"やあ\\\"君\\\"\")"] })],
        )];

        let found = list_texts(&list);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].text, "やあ\"君\"");
        assert_eq!(found[0].pointer, "/0/parameters/0/script/0");
        assert!(found[0].inline);
    }

    #[test]
    fn extraction_is_deterministic() {
        let corpus = sample_corpus();
        let memory = TranslationMemory::new(StoreFlavor::Extern);

        let first = extract(&corpus, &memory, &mut GlobalTextRegistry::new());
        let second = extract(&corpus, &memory, &mut GlobalTextRegistry::new());

        assert_eq!(first, second);
    }

    #[test]
    fn shared_text_is_proposed_once_in_order() {
        let corpus = sample_corpus();
        let memory = TranslationMemory::from_rows(
            StoreFlavor::Extern,
            vec![MemoryRow::new("レベル", "Level", "")],
        );

        let pending = extract(&corpus, &memory, &mut GlobalTextRegistry::new());
        let sources: Vec<&str> = pending.iter().map(|e| e.source_text.as_str()).collect();

        assert_eq!(
            sources,
            vec!["薬草", "HPを回復する", "勇者の旅", "盾", "戦う", "勝利！", "止まれ！"]
        );
        assert_eq!(pending[0].locator_tag, "ITEM1:薬草");
        assert_eq!(pending[0].origin, Origin::field("Items.json", "/1/name"));
        assert_eq!(pending[5].origin, Origin::field("System.json", "/terms/messages/a~1b"));
        assert_eq!(pending[6].locator_tag, "1:Guard:0");
    }
}
