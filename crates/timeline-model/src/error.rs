//! Errors raised while loading and validating model documents.

use std::path::PathBuf;

use reelsmith_common::ReelError;

/// Errors that can occur when parsing descriptors and job documents.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Unsupported media type: {tag}")]
    UnsupportedMediaType { tag: String },

    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error: {source}")]
    ParseError {
        #[from]
        source: serde_json::Error,
    },

    #[error("Invalid request: {message}")]
    ValidationError { message: String },
}

impl From<ModelError> for ReelError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::UnsupportedMediaType { tag } => ReelError::UnsupportedMediaType { tag },
            ModelError::IoError { source, .. } => ReelError::Io(source),
            ModelError::ParseError { source } => ReelError::Json(source),
            ModelError::ValidationError { message } => ReelError::InvalidRequest { message },
        }
    }
}
