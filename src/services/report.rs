use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BatchItemResult {
    pub entry_id: String,
    pub source_text: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translation: Option<String>,
    /// Response key adopted by fuzzy matching.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BatchReport {
    pub index: usize,
    pub size: usize,
    pub attempts: usize,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct RunReport {
    pub batches_total: usize,
    pub batches_failed: usize,
    pub resolved: usize,
    pub unresolved: usize,
    /// Empty rows filled from a translated row with the same source.
    pub propagated: usize,
    pub batches: Vec<BatchReport>,
    pub items: Vec<BatchItemResult>,
}
