//! Word-timed transcript segments produced by speech recognition.

use serde::{Deserialize, Serialize};

/// A single recognised word.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordTiming {
    /// Word text as emitted by the recogniser (may carry leading space).
    #[serde(alias = "word")]
    pub text: String,

    /// Start time relative to the start of the source audio.
    #[serde(alias = "start")]
    pub start_secs: f64,

    /// End time relative to the start of the source audio.
    #[serde(alias = "end")]
    pub end_secs: f64,
}

/// One transcript segment with optional word-level timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleSegment {
    #[serde(alias = "start")]
    pub start_secs: f64,

    #[serde(alias = "end")]
    pub end_secs: f64,

    pub text: String,

    #[serde(default)]
    pub words: Vec<WordTiming>,
}

impl SubtitleSegment {
    pub fn duration_secs(&self) -> f64 {
        (self.end_secs - self.start_secs).max(0.0)
    }
}

/// A whole transcript document, as written by whisper-style tools.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    #[serde(default)]
    pub text: String,

    #[serde(default)]
    pub language: Option<String>,

    pub segments: Vec<SubtitleSegment>,
}

impl Transcript {
    pub fn word_count(&self) -> usize {
        self.segments.iter().map(|s| s.words.len()).sum()
    }
}
