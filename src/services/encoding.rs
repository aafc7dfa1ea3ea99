use std::fs;
use std::path::Path;

use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};
use tracing::{debug, warn};

use crate::error::{CoreError, CoreResult};

#[derive(Debug)]
pub struct DecodedText {
    pub text: String,
    /// Lower-case encoding label, `utf-8-sig` for a BOM-prefixed file.
    pub encoding: String,
    pub had_errors: bool,
}

/// Decodes a sheet or script file whatever the tool that saved it chose.
/// A BOM wins; otherwise valid UTF-8 is taken as such and anything else goes
/// through `chardetng` (Shift-JIS sheets saved by spreadsheet apps).
pub fn decode_bytes(bytes: &[u8]) -> DecodedText {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        let (text, had_errors) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
        let label = if encoding == UTF_8 {
            "utf-8-sig".to_string()
        } else {
            encoding.name().to_lowercase()
        };
        return DecodedText {
            text: text.into_owned(),
            encoding: label,
            had_errors,
        };
    }

    if let Ok(text) = std::str::from_utf8(bytes) {
        return DecodedText {
            text: text.to_string(),
            encoding: "utf-8".into(),
            had_errors: false,
        };
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let encoding = detector.guess(None, true);
    let (text, _, had_errors) = encoding.decode(bytes);

    DecodedText {
        text: text.into_owned(),
        encoding: encoding.name().to_lowercase(),
        had_errors,
    }
}

pub fn read_text(path: &Path) -> CoreResult<String> {
    let bytes = fs::read(path).map_err(|e| CoreError::io(path, e))?;
    let decoded = decode_bytes(&bytes);

    if decoded.had_errors {
        warn!(
            path = %path.display(),
            encoding = %decoded.encoding,
            "file decoded with replacement characters"
        );
    } else {
        debug!(path = %path.display(), encoding = %decoded.encoding, "decoded file");
    }

    Ok(decoded.text)
}
