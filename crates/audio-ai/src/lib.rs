//! Reelsmith Audio Intelligence
//!
//! Boundaries to the external audio services:
//! - **Transcription:** Whisper-style speech-to-text with word timings
//! - **Subtitles:** SRT/VTT output from transcripts or caption cues
//! - **Analysis:** Notable moments picked from a transcript by a language model
//! - **Peaks:** Audio-energy peak detection
//! - **Music:** Sliding-window music generation and score block rendering

pub mod analysis;
pub mod music;
pub mod peaks;
pub mod subtitles;
pub mod transcription;

pub use analysis::{AnalysisModel, HttpAnalysisModel, TranscriptAnalyzer};
pub use music::{MusicGenerator, SlidingWindowGenerator};
pub use subtitles::*;
pub use transcription::*;
