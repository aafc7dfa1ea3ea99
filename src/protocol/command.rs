#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Ping,
    CorpusExtract,
    CorpusPatch,
    MemoryTranslate,
    MemoryClean,
    MemoryCheck,
    NotesExtract,
    NotesApply,
    PluginsExtract,
    PluginsApply,
    PluginsCheck,
    Unknown,
}

impl From<&str> for Command {
    fn from(s: &str) -> Self {
        match s {
            "ping" => Command::Ping,
            "corpus.extract" => Command::CorpusExtract,
            "corpus.patch" => Command::CorpusPatch,
            "memory.translate" => Command::MemoryTranslate,
            "memory.clean" => Command::MemoryClean,
            "memory.check" => Command::MemoryCheck,
            "notes.extract" => Command::NotesExtract,
            "notes.apply" => Command::NotesApply,
            "plugins.extract" => Command::PluginsExtract,
            "plugins.apply" => Command::PluginsApply,
            "plugins.check" => Command::PluginsCheck,
            _ => Command::Unknown,
        }
    }
}
