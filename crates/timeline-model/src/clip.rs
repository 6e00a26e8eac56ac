//! Resolved clip handles.
//!
//! A [`ClipHandle`] is created by the clip resolver from an
//! [`AssetDescriptor`](crate::AssetDescriptor). Scheduling and layer
//! composition fill in its timing, volume and effects in place; the render
//! plan is then read out of the finished handles.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::asset::{AssetDescriptor, MediaType, PositionLayer};
use crate::geometry::FrameSize;
use crate::transcript::SubtitleSegment;

/// The media behind a clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaSource {
    /// Absolute path of the resolved file.
    pub path: PathBuf,

    /// Probed pixel size, for visual media.
    #[serde(default)]
    pub frame: Option<FrameSize>,

    /// Whether the file carries an audio stream.
    #[serde(default)]
    pub has_audio: bool,

    /// Card text, for `Text` assets.
    #[serde(default)]
    pub text: Option<String>,
}

/// Per-clip visual treatment, applied in list order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VisualEffect {
    /// Playback speed multiplier.
    Speed { factor: f64 },
    /// Colour multiply plus luminance/contrast lift.
    ColorBoost {
        color: f64,
        luminance: f64,
        contrast: f64,
    },
    /// Horizontal mirror.
    MirrorX,
}

impl VisualEffect {
    /// The boost used for short-form output.
    pub const SHORT_FORM_BOOST: VisualEffect = VisualEffect::ColorBoost {
        color: 1.1,
        luminance: 0.1,
        contrast: 0.4,
    };
}

/// An asset resolved to media, plus its mutable timeline placement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipHandle {
    /// The descriptor this clip came from.
    pub descriptor: AssetDescriptor,

    /// Resolved media.
    pub source: MediaSource,

    /// Duration of the media itself. `None` for stills and text cards.
    pub natural_duration_secs: Option<f64>,

    /// Absolute start on the program timeline.
    pub start_secs: f64,

    /// Effective on-screen/on-air duration after dwell and speed changes.
    pub duration_secs: f64,

    /// Linear gain applied to the clip's audio.
    pub volume_scale: f64,

    /// Visual treatment, in application order.
    #[serde(default)]
    pub effects: Vec<VisualEffect>,

    /// ASR output, for `Vocal` clips.
    #[serde(default)]
    pub subtitle_segments: Vec<SubtitleSegment>,
}

impl ClipHandle {
    pub fn new(
        descriptor: AssetDescriptor,
        source: MediaSource,
        natural_duration_secs: Option<f64>,
    ) -> Self {
        Self {
            descriptor,
            source,
            natural_duration_secs,
            start_secs: 0.0,
            duration_secs: natural_duration_secs.unwrap_or(0.0),
            volume_scale: 1.0,
            effects: Vec::new(),
            subtitle_segments: Vec::new(),
        }
    }

    pub fn media_type(&self) -> MediaType {
        self.descriptor.media_type
    }

    pub fn position_layer(&self) -> &PositionLayer {
        &self.descriptor.position_layer
    }

    pub fn render_sequence(&self) -> u32 {
        self.descriptor.render_sequence
    }

    pub fn end_secs(&self) -> f64 {
        self.start_secs + self.duration_secs
    }

    /// Combined speed multiplier of all speed effects.
    pub fn speed_factor(&self) -> f64 {
        self.effects
            .iter()
            .map(|e| match e {
                VisualEffect::Speed { factor } => *factor,
                _ => 1.0,
            })
            .product()
    }

    /// Seconds of source media consumed to fill `duration_secs`.
    pub fn source_span_secs(&self) -> f64 {
        self.duration_secs * self.speed_factor()
    }

    /// Append an effect. A speed effect also shortens the effective duration.
    pub fn apply_effect(&mut self, effect: VisualEffect) {
        if let VisualEffect::Speed { factor } = effect {
            if factor > 0.0 {
                self.duration_secs /= factor;
            }
        }
        self.effects.push(effect);
    }
}
