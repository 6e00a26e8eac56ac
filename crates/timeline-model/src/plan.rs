//! The render plan handed to the compositor.
//!
//! A plan is self-contained: every clip carries its absolute start/end,
//! effects and geometry, so the compositor needs no knowledge of sequence
//! groups or mixing rules.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::asset::{MediaType, PositionLayer};
use crate::clip::VisualEffect;
use crate::error::ModelError;
use crate::geometry::{AspectRatio, CropWindow, FrameSize};

/// Where a text overlay sits on the frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OverlayAnchor {
    Center,
    /// Horizontally centred, bottom edge.
    Bottom,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    /// Top-left corner at a fraction of the frame size.
    Relative { x: f64, y: f64 },
}

/// What an overlay is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayRole {
    Title,
    Caption,
    Watermark,
}

/// A timed text overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextOverlay {
    pub role: OverlayRole,
    pub text: String,
    pub start_secs: f64,
    pub end_secs: f64,
    pub anchor: OverlayAnchor,
    pub font_size: u32,
    /// Colour name or `#RRGGBB`.
    pub color: String,
    pub stroke_width: u32,
}

impl TextOverlay {
    pub fn duration_secs(&self) -> f64 {
        self.end_secs - self.start_secs
    }
}

/// Scale-then-crop-then-scale geometry for one visual clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisualFit {
    /// Size after scaling to the target height.
    pub scaled: FrameSize,
    /// Window cut out of the scaled image.
    pub crop: CropWindow,
    /// Final size after scaling the window to the target width.
    pub output: FrameSize,
}

/// A visual clip placed on the program timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedVisual {
    pub media_type: MediaType,
    pub position_layer: PositionLayer,
    pub render_sequence: u32,
    pub source: PathBuf,
    /// Card text, for text clips.
    #[serde(default)]
    pub text: Option<String>,
    pub has_audio: bool,
    pub start_secs: f64,
    pub end_secs: f64,
    /// Seconds of source media read to fill the slot.
    pub source_span_secs: f64,
    #[serde(default)]
    pub effects: Vec<VisualEffect>,
    /// Missing for text cards, which are drawn at frame size.
    #[serde(default)]
    pub fit: Option<VisualFit>,
}

/// An audio clip placed on the program timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedAudio {
    pub media_type: MediaType,
    pub position_layer: PositionLayer,
    pub render_sequence: u32,
    pub source: PathBuf,
    pub start_secs: f64,
    pub end_secs: f64,
    pub volume_scale: f64,
    #[serde(default)]
    pub fade_in_secs: f64,
    #[serde(default)]
    pub fade_out_secs: f64,
}

/// Fully timed, volume-balanced, geometry-resolved program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderPlan {
    pub aspect: AspectRatio,
    pub frame: FrameSize,
    pub fps: u32,

    /// Program length; anything scheduled past it is cut.
    pub duration_secs: f64,

    /// No narration and at least one music track.
    pub music_video: bool,

    /// Gain applied to audio carried inside visual clips.
    pub ambience_volume: f64,

    /// Bottom-most first.
    pub visuals: Vec<PlannedVisual>,

    pub audio: Vec<PlannedAudio>,

    /// Drawn above all visuals, in list order.
    pub overlays: Vec<TextOverlay>,
}

impl RenderPlan {
    /// Latest end of any visual or audio clip.
    pub fn content_end_secs(&self) -> f64 {
        let visual = self.visuals.iter().map(|v| v.end_secs);
        let audio = self.audio.iter().map(|a| a.end_secs);
        visual.chain(audio).fold(0.0, f64::max)
    }

    pub fn overlays_with(&self, role: OverlayRole) -> impl Iterator<Item = &TextOverlay> {
        self.overlays.iter().filter(move |o| o.role == role)
    }

    /// Write the plan as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<(), ModelError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|e| ModelError::IoError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let json = std::fs::read_to_string(path).map_err(|e| ModelError::IoError {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(serde_json::from_str(&json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_plan() -> RenderPlan {
        RenderPlan {
            aspect: AspectRatio::Landscape,
            frame: FrameSize::LANDSCAPE_HD,
            fps: 30,
            duration_secs: 10.0,
            music_video: false,
            ambience_volume: 0.4,
            visuals: vec![],
            audio: vec![],
            overlays: vec![],
        }
    }

    #[test]
    fn test_content_end_spans_both_layers() {
        let mut plan = empty_plan();
        plan.audio.push(PlannedAudio {
            media_type: MediaType::Vocal,
            position_layer: PositionLayer::Narrator,
            render_sequence: 0,
            source: PathBuf::from("n.mp3"),
            start_secs: 0.85,
            end_secs: 20.85,
            volume_scale: 1.7,
            fade_in_secs: 0.0,
            fade_out_secs: 0.0,
        });
        assert!((plan.content_end_secs() - 20.85).abs() < 1e-9);
    }

    #[test]
    fn test_save_and_load_plan() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.json");
        let mut plan = empty_plan();
        plan.overlays.push(TextOverlay {
            role: OverlayRole::Watermark,
            text: "reelsmith".to_string(),
            start_secs: 2.0,
            end_secs: 4.5,
            anchor: OverlayAnchor::BottomLeft,
            font_size: 35,
            color: "white".to_string(),
            stroke_width: 0,
        });
        plan.save(&path).unwrap();

        let loaded = RenderPlan::load(&path).unwrap();
        assert_eq!(loaded, plan);
        assert_eq!(loaded.overlays_with(OverlayRole::Watermark).count(), 1);
    }
}
