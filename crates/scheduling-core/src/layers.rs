//! Layer composition.
//!
//! Builds the visual stack (thumbnail card with title, stills, videos,
//! text cards) and the audio stack (narration and effects as one track,
//! music as another), then applies the mixing policy.
//!
//! # Mixing policy
//!
//! The program is classified once, from unscaled clip counts:
//!
//! - **Music video**: no Vocal clip and at least one Music clip. Music is
//!   left at full volume and in-clip ambience is muted.
//! - **Narrated**: BackgroundMusic clips are ducked, Narrator clips are
//!   boosted, and ambience is reduced (muted for short-form).

use rand::seq::SliceRandom;
use rand::Rng;
use reelsmith_timeline_model::{
    ClipHandle, MediaType, OverlayAnchor, OverlayRole, PositionLayer, TextOverlay, VisualEffect,
};
use serde::{Deserialize, Serialize};

use crate::sequence::chain_sequences;

/// Accent colours for titles and captions.
pub const ACCENT_PALETTE: [&str; 4] = ["white", "#FFFF00", "#FF0000", "#4BE506"];

/// Uniform pick from [`ACCENT_PALETTE`].
pub fn pick_accent_color<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    ACCENT_PALETTE.choose(rng).copied().unwrap_or("white")
}

/// Layer composition constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComposerConfig {
    /// How long the thumbnail card is shown.
    pub thumbnail_duration_secs: f64,

    /// Dwell for still images and text cards.
    pub still_dwell_secs: f64,

    /// A line break follows every this-many words of the title.
    pub title_words_per_line: usize,

    /// Fraction of title tokens on the top line.
    pub title_split_ratio: f64,

    pub title_top_font_size: u32,
    pub title_bottom_font_size: u32,
    pub title_stroke_width: u32,

    /// Gain for Narrator clips in narrated programs.
    pub narrator_gain: f64,

    /// Gain for BackgroundMusic clips in narrated programs.
    pub background_music_gain: f64,

    /// Gain for in-clip audio when not muted.
    pub ambience_gain: f64,

    /// Watermark span when there is no narration.
    pub watermark_span_secs: f64,

    /// Start of the first watermark placement.
    pub watermark_first_start_secs: f64,

    pub watermark_font_size: u32,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            thumbnail_duration_secs: 0.85,
            still_dwell_secs: 2.0,
            title_words_per_line: 4,
            title_split_ratio: 0.7,
            title_top_font_size: 125,
            title_bottom_font_size: 150,
            title_stroke_width: 10,
            narrator_gain: 1.7,
            background_music_gain: 0.3,
            ambience_gain: 0.4,
            watermark_span_secs: 900.0,
            watermark_first_start_secs: 2.0,
            watermark_font_size: 35,
        }
    }
}

/// Speed multiplier for a short-form clip of the given duration.
pub fn short_form_speed(duration_secs: f64) -> f64 {
    if duration_secs >= 50.0 {
        6.0
    } else if duration_secs >= 20.0 {
        4.0
    } else {
        1.2
    }
}

/// Split a title into a top and bottom line.
///
/// A line break is inserted after the third word and then after every
/// `words_per_line` words. The resulting space-separated tokens (including
/// the empty trailing token) are split at `floor(len * split_ratio)`.
pub fn wrap_title(title: &str, words_per_line: usize, split_ratio: f64) -> (String, String) {
    let mut formatted = String::new();
    let mut count = 1usize;
    for word in title.split(' ') {
        formatted.push_str(word);
        count += 1;
        formatted.push(' ');
        if words_per_line > 0 && count % words_per_line == 0 {
            formatted.push('\n');
        }
    }

    let tokens: Vec<&str> = formatted.split(' ').collect();
    let split = ((tokens.len() as f64 * split_ratio).floor() as usize).min(tokens.len());
    let top = tokens[..split].join(" ");
    let bottom = tokens[split..].join(" ");
    (top.trim().to_string(), bottom.trim().to_string())
}

/// Program classification driving the volume policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MixClassification {
    pub music_video: bool,
    pub short_form: bool,
}

impl MixClassification {
    /// Classify from clip counts. Volumes are never consulted.
    pub fn classify(clips: &[ClipHandle], short_form: bool) -> Self {
        let vocals = clips
            .iter()
            .filter(|c| c.media_type() == MediaType::Vocal)
            .count();
        let music = clips
            .iter()
            .filter(|c| c.media_type() == MediaType::Music)
            .count();
        Self {
            music_video: vocals == 0 && music > 0,
            short_form,
        }
    }

    pub fn mutes_ambience(&self) -> bool {
        self.short_form || self.music_video
    }

    /// Whether BackgroundMusic/Narrator gains are applied.
    pub fn ducks_music(&self) -> bool {
        !self.music_video
    }
}

/// The composed visual stack.
#[derive(Debug, Clone)]
pub struct VisualLayer {
    /// Images, then videos, then text cards; input order within each.
    pub clips: Vec<ClipHandle>,

    /// Index of the thumbnail clip in `clips`.
    pub thumbnail: Option<usize>,

    /// Title lines shown over the thumbnail.
    pub title: Vec<TextOverlay>,
}

impl VisualLayer {
    pub fn thumbnail_clip(&self) -> Option<&ClipHandle> {
        self.thumbnail.map(|i| &self.clips[i])
    }

    /// End of the thumbnail card, or 0 when there is none.
    pub fn thumbnail_end_secs(&self) -> f64 {
        self.thumbnail_clip().map(|c| c.end_secs()).unwrap_or(0.0)
    }
}

/// The composed audio stack: Vocal, then Sfx, then Music clips.
#[derive(Debug, Clone, Default)]
pub struct AudioLayer {
    pub clips: Vec<ClipHandle>,
}

/// Builds visual and audio stacks.
pub struct LayerComposer {
    config: ComposerConfig,
}

impl LayerComposer {
    pub fn new(config: ComposerConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(ComposerConfig::default())
    }

    pub fn config(&self) -> &ComposerConfig {
        &self.config
    }

    /// Compose the visual stack and schedule it.
    pub fn compose_visual<R: Rng + ?Sized>(
        &self,
        clips: Vec<ClipHandle>,
        title: &str,
        short_form: bool,
        rng: &mut R,
    ) -> VisualLayer {
        let mut layer: Vec<ClipHandle> = Vec::with_capacity(clips.len());
        for media_type in [MediaType::Image, MediaType::Video, MediaType::Text] {
            layer.extend(clips.iter().filter(|c| c.media_type() == media_type).cloned());
        }

        let thumbnail = layer.iter().position(|c| {
            *c.position_layer() == PositionLayer::Thumbnail && c.media_type() != MediaType::Text
        });

        for (i, clip) in layer.iter_mut().enumerate() {
            if Some(i) == thumbnail {
                clip.duration_secs = self.config.thumbnail_duration_secs;
            } else if clip.media_type().is_still() {
                clip.duration_secs = self.config.still_dwell_secs;
            }
        }

        if short_form {
            apply_short_form_treatment(&mut layer, thumbnail);
        }

        chain_sequences(&mut layer);

        let title = match thumbnail {
            Some(i) => {
                let card = &layer[i];
                self.title_overlays(title, card.start_secs, card.end_secs(), rng)
            }
            None => vec![],
        };

        tracing::debug!(
            clips = layer.len(),
            thumbnail = thumbnail.is_some(),
            short_form,
            "composed visual layer"
        );

        VisualLayer {
            clips: layer,
            thumbnail,
            title,
        }
    }

    /// Title lines shown for the thumbnail's span.
    pub fn title_overlays<R: Rng + ?Sized>(
        &self,
        title: &str,
        start_secs: f64,
        end_secs: f64,
        rng: &mut R,
    ) -> Vec<TextOverlay> {
        let (top, bottom) = wrap_title(
            title,
            self.config.title_words_per_line,
            self.config.title_split_ratio,
        );
        let mut overlays = vec![];
        if !top.is_empty() {
            overlays.push(TextOverlay {
                role: OverlayRole::Title,
                text: top,
                start_secs,
                end_secs,
                anchor: OverlayAnchor::Relative { x: 0.05, y: 0.2 },
                font_size: self.config.title_top_font_size,
                color: "#FFFFFF".to_string(),
                stroke_width: self.config.title_stroke_width,
            });
        }
        if !bottom.is_empty() {
            overlays.push(TextOverlay {
                role: OverlayRole::Title,
                text: bottom,
                start_secs,
                end_secs,
                anchor: OverlayAnchor::Relative { x: 0.05, y: 0.5 },
                font_size: self.config.title_bottom_font_size,
                color: pick_accent_color(rng).to_string(),
                stroke_width: self.config.title_stroke_width,
            });
        }
        overlays
    }

    /// Compose the audio stack and schedule it.
    ///
    /// The first Vocal clip in sequence 0 starts at `narrator_start_secs`
    /// so narration never overlaps the thumbnail card.
    pub fn compose_audio(&self, clips: Vec<ClipHandle>, narrator_start_secs: f64) -> AudioLayer {
        let of_type = |t: MediaType| -> Vec<ClipHandle> {
            clips.iter().filter(|c| c.media_type() == t).cloned().collect()
        };
        let mut speech = of_type(MediaType::Vocal);
        let sfx = of_type(MediaType::Sfx);
        let mut music = of_type(MediaType::Music);

        if let Some(first) = speech.iter_mut().find(|c| c.render_sequence() == 0) {
            first.start_secs = narrator_start_secs;
        }

        speech.extend(sfx);
        chain_sequences(&mut speech);
        chain_sequences(&mut music);

        speech.extend(music);
        tracing::debug!(clips = speech.len(), narrator_start_secs, "composed audio layer");
        AudioLayer { clips: speech }
    }

    /// Apply gains. Must be given the classification computed before any
    /// volume was touched.
    pub fn apply_volume_policy(&self, audio: &mut [ClipHandle], classification: MixClassification) {
        if !classification.ducks_music() {
            return;
        }
        for clip in audio.iter_mut() {
            match clip.position_layer() {
                PositionLayer::BackgroundMusic => {
                    clip.volume_scale *= self.config.background_music_gain
                }
                PositionLayer::Narrator => clip.volume_scale *= self.config.narrator_gain,
                _ => {}
            }
        }
    }

    /// Gain for audio carried inside visual clips.
    pub fn ambience_volume(&self, classification: MixClassification) -> f64 {
        if classification.mutes_ambience() {
            0.0
        } else {
            self.config.ambience_gain
        }
    }

    /// Span covered by the rotating watermark.
    pub fn watermark_span_secs(&self, padded_narration_secs: Option<f64>) -> f64 {
        padded_narration_secs.unwrap_or(self.config.watermark_span_secs)
    }

    /// Four watermark placements rotating through the corners, each a
    /// quarter of `span_secs` long.
    pub fn watermark_overlays(&self, text: &str, span_secs: f64) -> Vec<TextOverlay> {
        if text.trim().is_empty() || span_secs <= 0.0 {
            return vec![];
        }
        let quarter = span_secs / 4.0;
        let placements = [
            (self.config.watermark_first_start_secs, OverlayAnchor::BottomLeft),
            (quarter, OverlayAnchor::TopRight),
            (quarter * 2.0, OverlayAnchor::BottomRight),
            (quarter * 3.0, OverlayAnchor::TopLeft),
        ];
        placements
            .into_iter()
            .map(|(start_secs, anchor)| TextOverlay {
                role: OverlayRole::Watermark,
                text: text.to_string(),
                start_secs,
                end_secs: start_secs + quarter,
                anchor,
                font_size: self.config.watermark_font_size,
                color: "white".to_string(),
                stroke_width: 0,
            })
            .collect()
    }
}

/// Speed, boost and mirror for every non-thumbnail video/image; boost only
/// for the thumbnail. Text cards are left alone.
fn apply_short_form_treatment(layer: &mut [ClipHandle], thumbnail: Option<usize>) {
    for (i, clip) in layer.iter_mut().enumerate() {
        if Some(i) == thumbnail {
            clip.apply_effect(VisualEffect::SHORT_FORM_BOOST);
            continue;
        }
        if !matches!(clip.media_type(), MediaType::Video | MediaType::Image) {
            continue;
        }
        let factor = short_form_speed(clip.duration_secs);
        clip.apply_effect(VisualEffect::Speed { factor });
        clip.apply_effect(VisualEffect::SHORT_FORM_BOOST);
        clip.apply_effect(VisualEffect::MirrorX);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use reelsmith_timeline_model::{AssetDescriptor, MediaSource};
    use std::path::PathBuf;

    fn clip(media_type: MediaType, layer: &str, seq: u32, natural: Option<f64>) -> ClipHandle {
        ClipHandle::new(
            AssetDescriptor::new(media_type, layer, seq, "key"),
            MediaSource {
                path: PathBuf::from("/tmp/key"),
                frame: None,
                has_audio: media_type == MediaType::Video,
                text: None,
            },
            natural,
        )
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    #[test]
    fn test_wrap_title_breaks_after_third_then_every_fourth() {
        let (top, bottom) = wrap_title(
            "one two three four five six seven eight nine ten",
            4,
            0.7,
        );
        assert_eq!(top, "one two three \nfour five six seven");
        assert_eq!(bottom, "eight nine ten");
    }

    #[test]
    fn test_wrap_short_title() {
        let (top, bottom) = wrap_title("Hello", 4, 0.7);
        assert_eq!(top, "Hello");
        assert_eq!(bottom, "");
        assert_eq!(wrap_title("", 4, 0.7), (String::new(), String::new()));
    }

    #[test]
    fn test_speed_ladder() {
        assert_eq!(short_form_speed(50.0), 6.0);
        assert_eq!(short_form_speed(49.9), 4.0);
        assert_eq!(short_form_speed(20.0), 4.0);
        assert_eq!(short_form_speed(19.99), 1.2);
    }

    #[test]
    fn test_visual_durations_and_chaining() {
        let composer = LayerComposer::with_defaults();
        let clips = vec![
            clip(MediaType::Video, "Scene", 1, Some(12.0)),
            clip(MediaType::Image, "Thumbnail", 0, None),
            clip(MediaType::Image, "Scene", 2, None),
        ];
        let layer = composer.compose_visual(clips, "A Title", false, &mut rng());

        // Images come first, then videos.
        assert_eq!(layer.clips[0].media_type(), MediaType::Image);
        assert_eq!(layer.clips[2].media_type(), MediaType::Video);
        assert_eq!(layer.thumbnail, Some(0));

        let thumb = layer.thumbnail_clip().unwrap();
        assert!((thumb.duration_secs - 0.85).abs() < 1e-9);
        assert!((layer.clips[1].duration_secs - 2.0).abs() < 1e-9);

        let video = &layer.clips[2];
        assert!((video.start_secs - 0.85).abs() < 1e-9);
        assert!((layer.clips[1].start_secs - 12.85).abs() < 1e-9);
        assert!(video.effects.is_empty());
    }

    #[test]
    fn test_title_overlays_follow_thumbnail() {
        let composer = LayerComposer::with_defaults();
        let clips = vec![clip(MediaType::Image, "Thumbnail", 0, None)];
        let layer = composer.compose_visual(
            clips,
            "one two three four five six seven eight nine ten",
            false,
            &mut rng(),
        );
        assert_eq!(layer.title.len(), 2);
        assert_eq!(layer.title[0].color, "#FFFFFF");
        assert_eq!(layer.title[0].font_size, 125);
        assert_eq!(layer.title[1].font_size, 150);
        assert!(ACCENT_PALETTE.contains(&layer.title[1].color.as_str()));
        for overlay in &layer.title {
            assert_eq!(overlay.start_secs, 0.0);
            assert!((overlay.end_secs - 0.85).abs() < 1e-9);
        }
    }

    #[test]
    fn test_no_thumbnail_no_title() {
        let composer = LayerComposer::with_defaults();
        let clips = vec![clip(MediaType::Video, "Scene", 0, Some(3.0))];
        let layer = composer.compose_visual(clips, "Unused", false, &mut rng());
        assert!(layer.thumbnail.is_none());
        assert!(layer.title.is_empty());
        assert_eq!(layer.thumbnail_end_secs(), 0.0);
    }

    #[test]
    fn test_short_form_effects_in_order() {
        let composer = LayerComposer::with_defaults();
        let clips = vec![
            clip(MediaType::Image, "Thumbnail", 0, None),
            clip(MediaType::Video, "Scene", 1, Some(60.0)),
            clip(MediaType::Video, "Scene", 2, Some(25.0)),
            clip(MediaType::Image, "Scene", 3, None),
        ];
        let layer = composer.compose_visual(clips, "Title", true, &mut rng());

        let thumb = layer.thumbnail_clip().unwrap();
        assert_eq!(thumb.effects, vec![VisualEffect::SHORT_FORM_BOOST]);
        assert!((thumb.duration_secs - 0.85).abs() < 1e-9);

        // Order: thumbnail, still, video(60), video(25).
        let still = &layer.clips[1];
        assert_eq!(
            still.effects,
            vec![
                VisualEffect::Speed { factor: 1.2 },
                VisualEffect::SHORT_FORM_BOOST,
                VisualEffect::MirrorX
            ]
        );
        assert!((still.duration_secs - 2.0 / 1.2).abs() < 1e-9);

        let long = &layer.clips[2];
        assert_eq!(long.effects[0], VisualEffect::Speed { factor: 6.0 });
        assert!((long.duration_secs - 10.0).abs() < 1e-9);
        assert!((long.start_secs - 0.85).abs() < 1e-9);

        let medium = &layer.clips[3];
        assert_eq!(medium.effects[0], VisualEffect::Speed { factor: 4.0 });
        assert!((medium.start_secs - 10.85).abs() < 1e-9);
        assert!((still.start_secs - (10.85 + 6.25)).abs() < 1e-9);
    }

    #[test]
    fn test_narrator_anchored_after_thumbnail() {
        let composer = LayerComposer::with_defaults();
        let clips = vec![
            clip(MediaType::Music, "BackgroundMusic", 0, Some(120.0)),
            clip(MediaType::Sfx, "Whoosh", 1, Some(1.0)),
            clip(MediaType::Vocal, "Narrator", 0, Some(10.0)),
            clip(MediaType::Vocal, "Narrator", 1, Some(8.0)),
        ];
        let audio = composer.compose_audio(clips, 0.85);
        let kinds: Vec<MediaType> = audio.clips.iter().map(|c| c.media_type()).collect();
        assert_eq!(
            kinds,
            vec![
                MediaType::Vocal,
                MediaType::Vocal,
                MediaType::Sfx,
                MediaType::Music
            ]
        );
        assert!((audio.clips[0].start_secs - 0.85).abs() < 1e-9);
        assert!((audio.clips[1].start_secs - 10.85).abs() < 1e-9);
        assert!((audio.clips[2].start_secs - 10.85).abs() < 1e-9);
        assert_eq!(audio.clips[3].start_secs, 0.0);
    }

    #[test]
    fn test_music_video_policy() {
        let composer = LayerComposer::with_defaults();
        let clips = vec![clip(MediaType::Music, "BackgroundMusic", 0, Some(200.0))];
        let classification = MixClassification::classify(&clips, false);
        assert!(classification.music_video);
        assert!(!classification.ducks_music());

        let mut audio = composer.compose_audio(clips, 0.85);
        composer.apply_volume_policy(&mut audio.clips, classification);
        assert_eq!(audio.clips[0].volume_scale, 1.0);
        assert_eq!(composer.ambience_volume(classification), 0.0);
    }

    #[test]
    fn test_narrated_policy() {
        let composer = LayerComposer::with_defaults();
        let clips = vec![
            clip(MediaType::Vocal, "Narrator", 0, Some(30.0)),
            clip(MediaType::Music, "BackgroundMusic", 0, Some(200.0)),
            clip(MediaType::Sfx, "Impact", 0, Some(1.0)),
        ];
        let classification = MixClassification::classify(&clips, false);
        let mut audio = composer.compose_audio(clips, 0.85);
        composer.apply_volume_policy(&mut audio.clips, classification);

        assert!((audio.clips[0].volume_scale - 1.7).abs() < 1e-9);
        assert_eq!(audio.clips[1].volume_scale, 1.0);
        assert!((audio.clips[2].volume_scale - 0.3).abs() < 1e-9);
        assert!((composer.ambience_volume(classification) - 0.4).abs() < 1e-9);

        let short = MixClassification {
            short_form: true,
            ..classification
        };
        assert_eq!(composer.ambience_volume(short), 0.0);
    }

    #[test]
    fn test_classification_ignores_volume_changes() {
        let composer = LayerComposer::with_defaults();
        let clips = vec![
            clip(MediaType::Vocal, "Narrator", 0, Some(30.0)),
            clip(MediaType::Music, "BackgroundMusic", 0, Some(200.0)),
        ];
        let before = MixClassification::classify(&clips, true);
        let mut scaled = clips.clone();
        composer.apply_volume_policy(&mut scaled, before);
        composer.apply_volume_policy(&mut scaled, before);
        let after = MixClassification::classify(&scaled, true);
        assert_eq!(before, after);
    }

    #[test]
    fn test_watermark_quarters() {
        let composer = LayerComposer::with_defaults();
        let marks = composer.watermark_overlays("example.com", 100.0);
        assert_eq!(marks.len(), 4);
        let starts: Vec<f64> = marks.iter().map(|m| m.start_secs).collect();
        assert_eq!(starts, vec![2.0, 25.0, 50.0, 75.0]);
        assert!(marks.iter().all(|m| (m.duration_secs() - 25.0).abs() < 1e-9));
        assert_eq!(marks[0].anchor, OverlayAnchor::BottomLeft);
        assert_eq!(marks[1].anchor, OverlayAnchor::TopRight);
        assert_eq!(marks[2].anchor, OverlayAnchor::BottomRight);
        assert_eq!(marks[3].anchor, OverlayAnchor::TopLeft);

        assert_eq!(composer.watermark_span_secs(None), 900.0);
        assert!(composer.watermark_overlays("", 100.0).is_empty());
    }
}
