//! Speech-to-text with word timings.
//!
//! Delegates to a whisper-compatible command line tool which writes a JSON
//! transcript into a scratch directory. The directory is removed when the
//! call returns, whether or not recognition succeeded.

use std::path::Path;
use std::process::Command;

use reelsmith_common::{ReelError, ReelResult, ServiceConfig};
use reelsmith_timeline_model::Transcript;
use serde::{Deserialize, Serialize};

/// Anything that can turn a media file into a word-timed transcript.
pub trait Transcriber {
    fn transcribe(&self, media: &Path, language: &str) -> ReelResult<Transcript>;
}

/// Configuration for command-line transcription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    /// Executable to run.
    pub command: String,

    /// Model name (e.g. "tiny", "base").
    pub model: String,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            command: "whisper".to_string(),
            model: "tiny".to_string(),
        }
    }
}

impl From<&ServiceConfig> for TranscriptionConfig {
    fn from(services: &ServiceConfig) -> Self {
        Self {
            command: services.asr_command.clone(),
            model: services.asr_model.clone(),
        }
    }
}

/// Runs a whisper-compatible CLI.
pub struct CommandTranscriber {
    config: TranscriptionConfig,
}

impl CommandTranscriber {
    pub fn new(config: TranscriptionConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(TranscriptionConfig::default())
    }
}

impl Transcriber for CommandTranscriber {
    fn transcribe(&self, media: &Path, language: &str) -> ReelResult<Transcript> {
        if !media.is_file() {
            return Err(ReelError::missing_asset(media));
        }

        tracing::info!(
            path = %media.display(),
            model = %self.config.model,
            language,
            "Starting transcription"
        );

        let scratch = tempfile::tempdir()?;
        let output = Command::new(&self.config.command)
            .arg(media)
            .args(["--model", &self.config.model])
            .args(["--language", language])
            .args(["--word_timestamps", "True"])
            .args(["--output_format", "json"])
            .arg("--output_dir")
            .arg(scratch.path())
            .output()
            .map_err(|e| {
                ReelError::transcription(format!(
                    "failed to run {}: {e}",
                    self.config.command
                ))
            })?;

        if !output.status.success() {
            return Err(ReelError::transcription(format!(
                "{} failed for '{}': {}",
                self.config.command,
                media.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let stem = media
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "transcript".to_string());
        let json_path = scratch.path().join(format!("{stem}.json"));
        let transcript = load_transcript(&json_path)?;

        tracing::info!(
            segments = transcript.segments.len(),
            words = transcript.word_count(),
            "Transcription complete"
        );
        Ok(transcript)
    }
}

/// Parse a whisper-style JSON transcript.
pub fn parse_transcript(json: &str) -> ReelResult<Transcript> {
    serde_json::from_str(json)
        .map_err(|e| ReelError::transcription(format!("malformed transcript: {e}")))
}

pub fn load_transcript(path: &Path) -> ReelResult<Transcript> {
    let json = std::fs::read_to_string(path).map_err(|e| {
        ReelError::transcription(format!("cannot read transcript {}: {e}", path.display()))
    })?;
    parse_transcript(&json)
}

/// Write a transcript as pretty JSON.
pub fn save_transcript(transcript: &Transcript, path: &Path) -> ReelResult<()> {
    let json = serde_json::to_string_pretty(transcript)?;
    std::fs::write(path, json)?;
    Ok(())
}
