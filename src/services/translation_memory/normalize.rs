use std::sync::LazyLock;

use regex::Regex;

static REPEATED_QUOTES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""{3,}"#).expect("repeated quotes pattern"));

static FACE_EMOJI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\x{1F600}-\x{1F64F}\x{1F910}-\x{1F92F}\x{1F970}-\x{1F976}\x{1F9D0}-\x{1F9DF}]")
        .expect("face emoji pattern")
});

const HEART_VARIANTS: [&str; 18] = [
    "❤️", "💘", "💝", "💖", "💗", "💓", "💞", "💕", "💟", "💔", "❣️", "💌", "🖤", "💙", "💚",
    "💛", "💜", "🧡",
];

const HEART: &str = "❤";

/// Tidies a provider translation before it is stored: collapses runs of
/// quotes, folds heart emoji into one glyph the game font can render and
/// drops face emoji.
pub fn clean_translation(text: &str) -> String {
    let mut s = REPEATED_QUOTES.replace_all(text, "\"").into_owned();

    for heart in HEART_VARIANTS {
        s = s.replace(heart, HEART);
    }

    FACE_EMOJI.replace_all(&s, "").trim().to_string()
}

/// [`clean_translation`] plus removal of quotes wrapped around the whole
/// translation when the source itself was not quoted.
pub fn clean_stored(source: &str, target: &str) -> String {
    let cleaned = clean_translation(target);
    let source_quoted = source.starts_with('"') || source.ends_with('"');
    if !source_quoted && cleaned.len() >= 2 && cleaned.starts_with('"') && cleaned.ends_with('"') {
        return cleaned[1..cleaned.len() - 1].trim().to_string();
    }
    cleaned
}
