//! Word-level caption cues.
//!
//! Each recognised word becomes one overlay. A track's cues are shifted by
//! an offset that starts at the thumbnail duration and grows by every
//! audio-layer clip's duration, in audio-layer order.

use rand::Rng;
use reelsmith_timeline_model::{ClipHandle, OverlayAnchor, OverlayRole, TextOverlay};
use serde::{Deserialize, Serialize};

use crate::layers::pick_accent_color;

/// Caption appearance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptionStyle {
    pub font_size: u32,
    pub stroke_width: u32,
}

impl Default for CaptionStyle {
    fn default() -> Self {
        Self {
            font_size: 125,
            stroke_width: 5,
        }
    }
}

/// Anchor for caption cues: bottom for landscape, centre for short-form.
pub fn caption_anchor(short_form: bool) -> OverlayAnchor {
    if short_form {
        OverlayAnchor::Center
    } else {
        OverlayAnchor::Bottom
    }
}

/// Offset applied to each clip's cues, in iteration order.
pub fn track_offsets(audio: &[ClipHandle], initial_offset_secs: f64) -> Vec<f64> {
    let mut offset = initial_offset_secs;
    audio
        .iter()
        .map(|clip| {
            let current = offset;
            offset += clip.duration_secs;
            current
        })
        .collect()
}

/// Caption overlays for every word of every transcribed clip.
pub fn caption_cues<R: Rng + ?Sized>(
    audio: &[ClipHandle],
    initial_offset_secs: f64,
    anchor: OverlayAnchor,
    style: &CaptionStyle,
    rng: &mut R,
) -> Vec<TextOverlay> {
    let offsets = track_offsets(audio, initial_offset_secs);
    let mut cues = vec![];

    for (clip, offset) in audio.iter().zip(offsets) {
        if clip.subtitle_segments.is_empty() {
            continue;
        }
        let color = pick_accent_color(rng);
        for segment in &clip.subtitle_segments {
            for word in &segment.words {
                let text = word.text.trim();
                if text.is_empty() {
                    continue;
                }
                cues.push(TextOverlay {
                    role: OverlayRole::Caption,
                    text: text.to_string(),
                    start_secs: word.start_secs + offset,
                    end_secs: word.end_secs + offset,
                    anchor,
                    font_size: style.font_size,
                    color: color.to_string(),
                    stroke_width: style.stroke_width,
                });
            }
        }
    }

    tracing::debug!(cues = cues.len(), "generated caption cues");
    cues
}
