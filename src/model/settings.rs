use serde::{Deserialize, Serialize};

fn default_endpoint() -> String {
    "http://127.0.0.1:1234/v1/chat/completions".to_string()
}

fn default_model() -> String {
    "local-model".to_string()
}

fn default_batch_size() -> usize {
    20
}

fn default_max_retries() -> usize {
    3
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_temperature() -> f32 {
    0.4
}

fn default_max_tokens() -> u32 {
    2000
}

fn default_tolerance_ratio() -> f64 {
    0.1
}

fn default_true() -> bool {
    true
}

fn default_source_language() -> String {
    "Japanese".to_string()
}

fn default_target_language() -> String {
    "English".to_string()
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TranslatorSettings {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Attempts per batch, first try included.
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// Attempt `n` that fails waits `n * base_delay_ms` before the next one.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_tolerance_ratio")]
    pub fuzzy_tolerance_ratio: f64,

    /// Only send rows whose source contains kana or kanji.
    #[serde(default = "default_true")]
    pub require_japanese: bool,

    #[serde(default = "default_source_language", alias = "source_lang")]
    pub source_language: String,

    #[serde(default = "default_target_language", alias = "target_lang")]
    pub target_language: String,

    /// Replaces the built-in system instruction when non-empty.
    #[serde(default)]
    pub instruction: String,
}

impl Default for TranslatorSettings {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            api_key: String::new(),
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            timeout_secs: default_timeout_secs(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            fuzzy_tolerance_ratio: default_tolerance_ratio(),
            require_japanese: default_true(),
            source_language: default_source_language(),
            target_language: default_target_language(),
            instruction: String::new(),
        }
    }
}

impl TranslatorSettings {
    pub fn system_instruction(&self) -> String {
        if !self.instruction.trim().is_empty() {
            return self.instruction.clone();
        }

        format!(
            "Translate every key of the JSON object from {} into {}. \
             Respond with a single JSON object that maps each original text, \
             copied unchanged, to its translation. Do not alter the original keys. \
             Keep sentences short and simple. Leave text that is already in {} as is. \
             Never reply with anything outside of that object.",
            self.source_language, self.target_language, self.target_language
        )
    }
}
