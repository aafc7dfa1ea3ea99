use std::path::Path;

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{CoreError, CoreResult};
use crate::model::settings::TranslatorSettings;
use crate::services::encoding;

/// Read from the working directory when present.
pub const SETTINGS_FILE: &str = "translator.json";

/// Used when neither the file nor the request sets `api_key`.
pub const API_KEY_ENV: &str = "TRANSLATOR_API_KEY";

/// Settings from `path` (if it exists), with `overrides` merged on top key by
/// key and the api key falling back to the environment.
pub fn load_settings(path: &Path, overrides: Option<&Value>) -> CoreResult<TranslatorSettings> {
    let base = if path.exists() {
        let text = encoding::read_text(path)?;
        let value: Value = serde_json::from_str(&text)
            .map_err(|e| CoreError::json(path.display().to_string(), e))?;
        debug!(path = %path.display(), "read translator settings");
        Some(value)
    } else {
        None
    };

    resolve(base, overrides, std::env::var(API_KEY_ENV).ok())
}

pub fn resolve(
    base: Option<Value>,
    overrides: Option<&Value>,
    env_api_key: Option<String>,
) -> CoreResult<TranslatorSettings> {
    let mut merged = match base {
        Some(Value::Object(map)) => map,
        Some(_) => return Err(CoreError::Config(format!("{SETTINGS_FILE} must hold an object"))),
        None => Map::new(),
    };

    match overrides {
        Some(Value::Object(extra)) => {
            for (key, value) in extra {
                merged.insert(key.clone(), value.clone());
            }
        }
        Some(Value::Null) | None => {}
        Some(_) => return Err(CoreError::Config("settings must be an object".into())),
    }

    let mut settings: TranslatorSettings = serde_json::from_value(Value::Object(merged))
        .map_err(|e| CoreError::Config(e.to_string()))?;

    if settings.api_key.trim().is_empty() {
        if let Some(key) = env_api_key.filter(|k| !k.trim().is_empty()) {
            settings.api_key = key;
        }
    }

    validate(&settings)?;
    Ok(settings)
}

pub fn validate(settings: &TranslatorSettings) -> CoreResult<()> {
    if settings.endpoint.trim().is_empty() {
        return Err(CoreError::Config("endpoint is required".into()));
    }
    if settings.batch_size == 0 {
        return Err(CoreError::Config("batch_size must be at least 1".into()));
    }
    if settings.max_retries == 0 {
        return Err(CoreError::Config("max_retries must be at least 1".into()));
    }
    if !(0.0..=1.0).contains(&settings.fuzzy_tolerance_ratio) {
        return Err(CoreError::Config(
            "fuzzy_tolerance_ratio must be between 0 and 1".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_without_any_source() {
        let settings = resolve(None, None, None).unwrap();
        assert_eq!(settings, TranslatorSettings::default());
        assert_eq!(settings.batch_size, 20);
        assert_eq!(settings.max_retries, 3);
    }

    #[test]
    fn request_overrides_file() {
        let file = json!({ "model": "qwen", "batch_size": 10, "source_lang": "Japanese" });
        let overrides = json!({ "batch_size": 5 });

        let settings = resolve(Some(file), Some(&overrides), None).unwrap();

        assert_eq!(settings.model, "qwen");
        assert_eq!(settings.batch_size, 5);
    }

    #[test]
    fn api_key_falls_back_to_environment() {
        let settings = resolve(None, None, Some("sk-env".into())).unwrap();
        assert_eq!(settings.api_key, "sk-env");

        let file = json!({ "api_key": "sk-file" });
        let settings = resolve(Some(file), None, Some("sk-env".into())).unwrap();
        assert_eq!(settings.api_key, "sk-file");
    }

    #[test]
    fn invalid_values_are_rejected() {
        let overrides = json!({ "batch_size": 0 });
        assert!(matches!(
            resolve(None, Some(&overrides), None),
            Err(CoreError::Config(_))
        ));

        let overrides = json!({ "max_retries": "three" });
        assert!(resolve(None, Some(&overrides), None).is_err());
    }

    #[test]
    fn settings_file_is_read_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        std::fs::write(&path, r#"{ "endpoint": "http://localhost:8080/v1/chat/completions" }"#)
            .unwrap();

        let settings = load_settings(&path, None).unwrap();
        assert_eq!(settings.endpoint, "http://localhost:8080/v1/chat/completions");
    }
}
