//! Quoted-literal scanning for script text: the plugin configuration script
//! and inline script snippets stored in event command parameters.

use std::sync::LazyLock;

use regex::Regex;

/// `"..."` with backslash escapes allowed inside.
static QUOTED_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""((?:\\.|[^"\\])*)""#).expect("quoted literal pattern"));

/// `this._comments[N].push("...")`, the overlay text pushed by comment scripts.
static COMMENT_PUSH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"this\._comments\[\d+\]\.push\("((?:[^"\\]|\\.)*?)"\)"#)
        .expect("comment push pattern")
});

static JAPANESE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\p{Hiragana}\p{Katakana}\p{Han}]").expect("japanese pattern")
});

/// Runs of Japanese text plus the punctuation, digits and spacing that
/// usually travel with it.
static JAPANESE_SEGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"[\\/\-+\s0-9％%！？!?、。，．｡…～〜ー（）()「」『』【】［］〔〕〈〉《》｛｝＜＞≪≫・：；＝=_’'\p{Hiragana}\p{Katakana}\p{Han}]+",
    )
    .expect("japanese segment pattern")
});

pub fn has_japanese(text: &str) -> bool {
    JAPANESE.is_match(text)
}

/// Decodes the body of a double-quoted literal (without its quotes).
pub fn decode_literal(body: &str) -> Option<String> {
    serde_json::from_str::<String>(&format!("\"{body}\"")).ok()
}

/// Encodes `text` as the body of a double-quoted literal.
pub fn encode_literal(text: &str) -> String {
    match serde_json::to_string(text) {
        Ok(quoted) => quoted[1..quoted.len() - 1].to_string(),
        Err(_) => text.replace('\\', "\\\\").replace('"', "\\\""),
    }
}

/// Every decodable quoted literal in `content`, in document order.
pub fn quoted_literals(content: &str) -> Vec<String> {
    QUOTED_LITERAL
        .captures_iter(content)
        .filter_map(|caps| caps.get(1))
        .filter_map(|m| decode_literal(m.as_str()))
        .collect()
}

/// Re-encodes every quoted literal in `content` for which `rewrite` returns
/// a new value. Returns how many literals were rewritten.
pub fn rewrite_literals(content: &mut String, mut rewrite: impl FnMut(&str) -> Option<String>) -> usize {
    let mut rewritten = 0;
    let replaced = QUOTED_LITERAL
        .replace_all(content.as_str(), |caps: &regex::Captures| {
            match decode_literal(&caps[1]).and_then(|text| rewrite(&text)) {
                Some(text) => {
                    rewritten += 1;
                    format!("\"{}\"", encode_literal(&text))
                }
                None => caps[0].to_string(),
            }
        })
        .into_owned();

    if rewritten > 0 {
        *content = replaced;
    }
    rewritten
}

/// Texts pushed through `this._comments[N].push(...)`, decoded and trimmed.
pub fn comment_pushes(script: &str) -> Vec<String> {
    COMMENT_PUSH
        .captures_iter(script)
        .filter_map(|caps| caps.get(1))
        .map(|m| decode_literal(m.as_str()).unwrap_or_else(|| m.as_str().to_string()))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

pub fn japanese_segments(content: &str) -> Vec<String> {
    JAPANESE_SEGMENT
        .find_iter(content)
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty() && has_japanese(s))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comment_push_tolerates_escaped_quotes() {
        let script = r#"this._comments[0].push("彼は\"はい\"と言った");this._comments[1].push("二行目")"#;

        assert_eq!(
            comment_pushes(script),
            vec!["彼は\"はい\"と言った".to_string(), "二行目".to_string()]
        );
    }

    #[test]
    fn comment_push_ignores_other_calls() {
        let script = r#"this._notes.push("メモ"); this._comments[0].push("  ")"#;
        assert!(comment_pushes(script).is_empty());
    }

    #[test]
    fn literals_round_trip_through_encoding() {
        let text = "改行\nと\"引用\"";
        let encoded = encode_literal(text);
        assert_eq!(encoded, r#"改行\nと\"引用\""#);
        assert_eq!(decode_literal(&encoded).as_deref(), Some(text));
    }

    #[test]
    fn rewrite_touches_only_chosen_literals() {
        let mut script = r#"f(" はい ", "いいえ", "x\"y")"#.to_string();

        let count = rewrite_literals(&mut script, |text| {
            (text.trim() == "はい").then(|| text.replace("はい", "Yes"))
        });

        assert_eq!(count, 1);
        assert_eq!(script, r#"f(" Yes ", "いいえ", "x\"y")"#);
        assert_eq!(rewrite_literals(&mut script, |_| None), 0);
    }

    #[test]
    fn quoted_literals_in_plugin_script() {
        let content = r#"var $plugins = [{"name":"Msg","parameters":{"Title":"はじめから","Esc":"a\"b"}}];"#;
        let literals = quoted_literals(content);
        assert!(literals.contains(&"はじめから".to_string()));
        assert!(literals.contains(&"a\"b".to_string()));
    }

    #[test]
    fn segments_keep_only_japanese_runs() {
        let segments = japanese_segments("var x = 'Hello'; 体力を回復する。 done");
        assert_eq!(segments, vec!["体力を回復する。".to_string()]);
    }
}
