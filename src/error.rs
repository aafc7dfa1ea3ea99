use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::services::provider::ProviderError;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid json in {file}: {source}")]
    Json {
        file: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// Root of a data file is not the array/object its kind requires.
    #[error("{file}: {message}")]
    Shape { file: String, message: String },

    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("invalid settings: {0}")]
    Config(String),
}

impl CoreError {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        CoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn json(file: impl Into<String>, source: serde_json::Error) -> Self {
        CoreError::Json {
            file: file.into(),
            source,
        }
    }

    pub fn shape(file: impl Into<String>, message: impl Into<String>) -> Self {
        CoreError::Shape {
            file: file.into(),
            message: message.into(),
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
