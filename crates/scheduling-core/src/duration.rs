//! Program duration and output profile.

use reelsmith_timeline_model::{AspectRatio, ClipHandle, FrameSize, PositionLayer};
use serde::{Deserialize, Serialize};

/// Constants governing program length.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DurationConfig {
    /// Trailing silence added after narration.
    pub narration_pad_secs: f64,

    /// Hard ceiling for short-form programs.
    pub short_form_cap_secs: f64,
}

impl Default for DurationConfig {
    fn default() -> Self {
        Self {
            narration_pad_secs: 3.0,
            short_form_cap_secs: 60.0,
        }
    }
}

/// Summed narration length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Narration {
    /// Sum of Narrator clip durations.
    pub spoken_secs: f64,
    /// `spoken_secs` plus the trailing pad.
    pub padded_secs: f64,
}

impl Narration {
    /// Sum the Narrator-tagged clips of an audio layer.
    pub fn measure(audio: &[ClipHandle], config: &DurationConfig) -> Self {
        let spoken_secs: f64 = audio
            .iter()
            .filter(|c| *c.position_layer() == PositionLayer::Narrator)
            .map(|c| c.duration_secs)
            .sum();
        Self {
            spoken_secs,
            padded_secs: spoken_secs + config.narration_pad_secs,
        }
    }

    pub fn is_present(&self) -> bool {
        self.spoken_secs > 0.0
    }
}

/// Final program length.
///
/// `content_end_secs` is used only when nothing else constrains the
/// program (a long-form music video, or a long-form program with no
/// narration).
pub fn resolve_duration(
    short_form: bool,
    music_video: bool,
    narration: Narration,
    content_end_secs: f64,
    config: &DurationConfig,
) -> f64 {
    if short_form {
        if narration.is_present() {
            return config.short_form_cap_secs.min(narration.padded_secs);
        }
        return config.short_form_cap_secs;
    }
    if !music_video && narration.is_present() {
        return narration.padded_secs;
    }
    content_end_secs
}

/// Output frame, orientation and rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputProfile {
    pub aspect: AspectRatio,
    pub frame: FrameSize,
    pub fps: u32,
}

impl OutputProfile {
    pub fn for_program(short_form: bool, landscape_fps: u32, short_form_fps: u32) -> Self {
        let aspect = AspectRatio::for_short_form(short_form);
        Self {
            aspect,
            frame: aspect.frame(),
            fps: if short_form {
                short_form_fps
            } else {
                landscape_fps
            },
        }
    }
}
