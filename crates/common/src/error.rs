//! Error types shared across Reelsmith crates.

use std::path::PathBuf;

/// Top-level error type for Reelsmith operations.
#[derive(Debug, thiserror::Error)]
pub enum ReelError {
    #[error("Missing asset: {path}")]
    MissingAsset { path: PathBuf },

    #[error("Unsupported media type: {tag}")]
    UnsupportedMediaType { tag: String },

    #[error("Transcription error: {message}")]
    Transcription { message: String },

    #[error("Analysis error: {message}")]
    Analysis { message: String },

    #[error("Generation error: {message}")]
    Generation { message: String },

    #[error("Scheduling error: {message}")]
    Scheduling { message: String },

    #[error("Render error: {message}")]
    Render { message: String },

    #[error("Transfer error: {message}")]
    Transfer { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using ReelError.
pub type ReelResult<T> = Result<T, ReelError>;

impl ReelError {
    pub fn missing_asset(path: impl Into<PathBuf>) -> Self {
        Self::MissingAsset { path: path.into() }
    }

    pub fn unsupported_media_type(tag: impl Into<String>) -> Self {
        Self::UnsupportedMediaType { tag: tag.into() }
    }

    pub fn transcription(msg: impl Into<String>) -> Self {
        Self::Transcription {
            message: msg.into(),
        }
    }

    pub fn analysis(msg: impl Into<String>) -> Self {
        Self::Analysis {
            message: msg.into(),
        }
    }

    pub fn generation(msg: impl Into<String>) -> Self {
        Self::Generation {
            message: msg.into(),
        }
    }

    pub fn scheduling(msg: impl Into<String>) -> Self {
        Self::Scheduling {
            message: msg.into(),
        }
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render {
            message: msg.into(),
        }
    }

    pub fn transfer(msg: impl Into<String>) -> Self {
        Self::Transfer {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }

    /// Whether the failure aborts a render before any output is written.
    pub fn is_fatal_input(&self) -> bool {
        matches!(
            self,
            Self::MissingAsset { .. } | Self::UnsupportedMediaType { .. }
        )
    }
}
