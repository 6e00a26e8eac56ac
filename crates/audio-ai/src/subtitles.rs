//! Subtitle generation in SRT and VTT formats.

use std::path::Path;

use reelsmith_common::ReelResult;
use reelsmith_timeline_model::{SubtitleSegment, TextOverlay};

/// One timed subtitle line.
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleCue {
    pub start_secs: f64,
    pub end_secs: f64,
    pub text: String,
}

impl From<&SubtitleSegment> for SubtitleCue {
    fn from(segment: &SubtitleSegment) -> Self {
        Self {
            start_secs: segment.start_secs,
            end_secs: segment.end_secs,
            text: segment.text.trim().to_string(),
        }
    }
}

impl From<&TextOverlay> for SubtitleCue {
    fn from(overlay: &TextOverlay) -> Self {
        Self {
            start_secs: overlay.start_secs,
            end_secs: overlay.end_secs,
            text: overlay.text.clone(),
        }
    }
}

/// One cue per segment.
pub fn segment_cues(segments: &[SubtitleSegment]) -> Vec<SubtitleCue> {
    segments.iter().map(SubtitleCue::from).collect()
}

/// One cue per recognised word, empty words skipped.
pub fn word_cues(segments: &[SubtitleSegment]) -> Vec<SubtitleCue> {
    segments
        .iter()
        .flat_map(|s| s.words.iter())
        .filter(|w| !w.text.trim().is_empty())
        .map(|w| SubtitleCue {
            start_secs: w.start_secs,
            end_secs: w.end_secs,
            text: w.text.trim().to_string(),
        })
        .collect()
}

/// Generate SRT subtitle content.
pub fn generate_srt(cues: &[SubtitleCue]) -> String {
    let mut output = String::new();

    for (i, cue) in cues.iter().enumerate() {
        output.push_str(&format!("{}\n", i + 1));
        output.push_str(&format!(
            "{} --> {}\n",
            format_srt_time(cue.start_secs),
            format_srt_time(cue.end_secs),
        ));
        output.push_str(&cue.text);
        output.push_str("\n\n");
    }

    output
}

/// Generate WebVTT subtitle content.
pub fn generate_vtt(cues: &[SubtitleCue]) -> String {
    let mut output = String::from("WEBVTT\n\n");

    for cue in cues {
        output.push_str(&format!(
            "{} --> {}\n",
            format_vtt_time(cue.start_secs),
            format_vtt_time(cue.end_secs),
        ));
        output.push_str(&cue.text);
        output.push_str("\n\n");
    }

    output
}

fn split_millis(secs: f64) -> (u64, u64, u64, u64) {
    let total_ms = (secs.max(0.0) * 1000.0).round() as u64;
    (
        total_ms / 3_600_000,
        (total_ms % 3_600_000) / 60_000,
        (total_ms % 60_000) / 1000,
        total_ms % 1000,
    )
}

/// HH:MM:SS,mmm
fn format_srt_time(secs: f64) -> String {
    let (h, m, s, ms) = split_millis(secs);
    format!("{h:02}:{m:02}:{s:02},{ms:03}")
}

/// HH:MM:SS.mmm
fn format_vtt_time(secs: f64) -> String {
    let (h, m, s, ms) = split_millis(secs);
    format!("{h:02}:{m:02}:{s:02}.{ms:03}")
}

/// Save subtitles; `.vtt` selects WebVTT, anything else SRT.
pub fn save_subtitles(cues: &[SubtitleCue], path: &Path) -> ReelResult<()> {
    let content = match path.extension().and_then(|e| e.to_str()) {
        Some("vtt") => generate_vtt(cues),
        _ => generate_srt(cues),
    };
    std::fs::write(path, content)?;
    tracing::debug!(path = %path.display(), cues = cues.len(), "Saved subtitles");
    Ok(())
}
