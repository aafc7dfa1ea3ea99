use sha2::{Digest, Sha256};

pub fn hash_text(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let result = hasher.finalize();
    hex::encode(result)
}

/// Short stable id for a source string, used to correlate report items.
pub fn entry_id(text: &str) -> String {
    let mut h = hash_text(text);
    h.truncate(12);
    h
}
