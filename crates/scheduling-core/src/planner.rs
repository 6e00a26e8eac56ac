//! Program planning.
//!
//! Runs every scheduling pass over a set of resolved clips and produces a
//! [`RenderPlan`]. The order matters:
//!
//! 1. classify the mix from unscaled clip counts
//! 2. compose and schedule the visual layer
//! 3. compose and schedule the audio layer, narration after the thumbnail
//! 4. measure narration
//! 5. caption cues and watermark placements
//! 6. volume policy
//! 7. program duration
//! 8. per-clip frame fit

use rand::Rng;
use reelsmith_common::{ReelError, ReelResult, RenderDefaults};
use reelsmith_timeline_model::{
    ClipHandle, MediaType, PlannedAudio, PlannedVisual, RenderPlan, TextOverlay,
};
use serde::{Deserialize, Serialize};

use crate::captions::{caption_anchor, caption_cues, CaptionStyle};
use crate::duration::{resolve_duration, DurationConfig, Narration, OutputProfile};
use crate::geometry::program_fit;
use crate::layers::{ComposerConfig, LayerComposer, MixClassification};

/// Planner configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerConfig {
    pub composer: ComposerConfig,
    pub duration: DurationConfig,
    pub captions: CaptionStyle,
    pub landscape_fps: u32,
    pub short_form_fps: u32,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            composer: ComposerConfig::default(),
            duration: DurationConfig::default(),
            captions: CaptionStyle::default(),
            landscape_fps: 30,
            short_form_fps: 60,
        }
    }
}

impl PlannerConfig {
    /// Defaults with frame rates taken from the render settings.
    pub fn from_render_defaults(render: &RenderDefaults) -> Self {
        Self {
            landscape_fps: render.landscape_fps,
            short_form_fps: render.short_form_fps,
            ..Self::default()
        }
    }
}

/// Per-job options.
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    pub short_form: bool,
    /// Shown over the thumbnail.
    pub title: String,
    pub watermark: Option<String>,
}

/// Schedules a full program.
pub struct ProgramPlanner {
    config: PlannerConfig,
    composer: LayerComposer,
}

impl ProgramPlanner {
    pub fn new(config: PlannerConfig) -> Self {
        let composer = LayerComposer::new(config.composer.clone());
        Self { config, composer }
    }

    pub fn with_defaults() -> Self {
        Self::new(PlannerConfig::default())
    }

    pub fn composer(&self) -> &LayerComposer {
        &self.composer
    }

    pub fn plan<R: Rng + ?Sized>(
        &self,
        clips: Vec<ClipHandle>,
        options: &RenderOptions,
        rng: &mut R,
    ) -> ReelResult<RenderPlan> {
        if clips.is_empty() {
            return Err(ReelError::scheduling("no clips to schedule"));
        }

        let classification = MixClassification::classify(&clips, options.short_form);

        let (visual_clips, audio_clips): (Vec<ClipHandle>, Vec<ClipHandle>) = clips
            .into_iter()
            .partition(|c| c.media_type().is_visual());

        let visual =
            self.composer
                .compose_visual(visual_clips, &options.title, options.short_form, rng);
        let thumbnail_secs = visual
            .thumbnail_clip()
            .map(|c| c.duration_secs)
            .unwrap_or(0.0);

        let mut audio = self
            .composer
            .compose_audio(audio_clips, visual.thumbnail_end_secs());

        let narration = Narration::measure(&audio.clips, &self.config.duration);

        let captions = caption_cues(
            &audio.clips,
            thumbnail_secs,
            caption_anchor(options.short_form),
            &self.config.captions,
            rng,
        );

        let watermark = match options.watermark.as_deref() {
            Some(text) => {
                let padded = narration.is_present().then_some(narration.padded_secs);
                let span = self.composer.watermark_span_secs(padded);
                self.composer.watermark_overlays(text, span)
            }
            None => vec![],
        };

        self.composer
            .apply_volume_policy(&mut audio.clips, classification);
        let ambience_volume = self.composer.ambience_volume(classification);

        let profile = OutputProfile::for_program(
            options.short_form,
            self.config.landscape_fps,
            self.config.short_form_fps,
        );

        let visuals: Vec<PlannedVisual> = visual
            .clips
            .iter()
            .map(|clip| plan_visual(clip, profile))
            .collect();
        let audio: Vec<PlannedAudio> = audio.clips.iter().map(plan_audio).collect();

        let content_end = visuals
            .iter()
            .map(|v| v.end_secs)
            .chain(audio.iter().map(|a| a.end_secs))
            .fold(0.0, f64::max);
        let duration_secs = resolve_duration(
            options.short_form,
            classification.music_video,
            narration,
            content_end,
            &self.config.duration,
        );

        let mut overlays: Vec<TextOverlay> = visual.title;
        overlays.extend(captions);
        overlays.extend(watermark);

        tracing::info!(
            visuals = visuals.len(),
            audio = audio.len(),
            overlays = overlays.len(),
            duration_secs,
            music_video = classification.music_video,
            short_form = options.short_form,
            "planned program"
        );

        Ok(RenderPlan {
            aspect: profile.aspect,
            frame: profile.frame,
            fps: profile.fps,
            duration_secs,
            music_video: classification.music_video,
            ambience_volume,
            visuals,
            audio,
            overlays,
        })
    }
}

fn plan_visual(clip: &ClipHandle, profile: OutputProfile) -> PlannedVisual {
    let fit = match clip.media_type() {
        MediaType::Text => None,
        _ => clip.source.frame.map(|f| program_fit(f, profile.frame)),
    };
    PlannedVisual {
        media_type: clip.media_type(),
        position_layer: clip.position_layer().clone(),
        render_sequence: clip.render_sequence(),
        source: clip.source.path.clone(),
        text: clip.source.text.clone(),
        has_audio: clip.source.has_audio,
        start_secs: clip.start_secs,
        end_secs: clip.end_secs(),
        source_span_secs: clip.source_span_secs(),
        effects: clip.effects.clone(),
        fit,
    }
}

fn plan_audio(clip: &ClipHandle) -> PlannedAudio {
    PlannedAudio {
        media_type: clip.media_type(),
        position_layer: clip.position_layer().clone(),
        render_sequence: clip.render_sequence(),
        source: clip.source.path.clone(),
        start_secs: clip.start_secs,
        end_secs: clip.end_secs(),
        volume_scale: clip.volume_scale,
        fade_in_secs: 0.0,
        fade_out_secs: 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use reelsmith_timeline_model::{
        AspectRatio, AssetDescriptor, FrameSize, MediaSource, OverlayRole, SubtitleSegment,
        WordTiming,
    };
    use std::path::PathBuf;

    fn clip(media_type: MediaType, layer: &str, seq: u32, natural: Option<f64>) -> ClipHandle {
        let frame = media_type
            .is_visual()
            .then_some(FrameSize::new(1920, 1080))
            .filter(|_| media_type != MediaType::Text);
        ClipHandle::new(
            AssetDescriptor::new(media_type, layer, seq, "k"),
            MediaSource {
                path: PathBuf::from(format!("/media/{seq}-{media_type}")),
                frame,
                has_audio: media_type == MediaType::Video,
                text: (media_type == MediaType::Text).then(|| "Chapter One".to_string()),
            },
            natural,
        )
    }

    fn options(short_form: bool) -> RenderOptions {
        RenderOptions {
            short_form,
            title: "Night Raid".to_string(),
            watermark: Some("example.com".to_string()),
        }
    }

    #[test]
    fn test_music_video_plan() {
        let planner = ProgramPlanner::with_defaults();
        let clips = vec![
            clip(MediaType::Image, "Thumbnail", 0, None),
            clip(MediaType::Video, "Scene", 1, Some(40.0)),
            clip(MediaType::Music, "BackgroundMusic", 0, Some(180.0)),
        ];
        let plan = planner
            .plan(clips, &options(false), &mut StdRng::seed_from_u64(3))
            .unwrap();

        assert!(plan.music_video);
        assert_eq!(plan.ambience_volume, 0.0);
        assert_eq!(plan.audio[0].volume_scale, 1.0);
        assert_eq!(plan.duration_secs, 180.0);
        assert_eq!(plan.fps, 30);
        assert_eq!(plan.aspect, AspectRatio::Landscape);

        // No narration: watermark spans the fallback.
        let marks: Vec<_> = plan.overlays_with(OverlayRole::Watermark).collect();
        assert_eq!(marks.len(), 4);
        assert!((marks[1].start_secs - 225.0).abs() < 1e-9);
    }

    #[test]
    fn test_short_form_narration_capped() {
        let planner = ProgramPlanner::with_defaults();
        let clips = vec![
            clip(MediaType::Image, "Thumbnail", 0, None),
            clip(MediaType::Video, "Scene", 1, Some(30.0)),
            clip(MediaType::Vocal, "Narrator", 0, Some(90.0)),
        ];
        let plan = planner
            .plan(clips, &options(true), &mut StdRng::seed_from_u64(3))
            .unwrap();

        assert_eq!(plan.duration_secs, 60.0);
        assert_eq!(plan.frame, FrameSize::PORTRAIT_HD);
        assert_eq!(plan.fps, 60);
        assert_eq!(plan.ambience_volume, 0.0);

        let narrator = &plan.audio[0];
        assert!((narrator.start_secs - 0.85).abs() < 1e-9);
        assert!((narrator.volume_scale - 1.7).abs() < 1e-9);

        let fit = plan.visuals[1].fit.unwrap();
        assert_eq!(fit.output, FrameSize::PORTRAIT_HD);
    }

    #[test]
    fn test_long_form_narrated_with_captions() {
        let planner = ProgramPlanner::with_defaults();
        let mut vocal = clip(MediaType::Vocal, "Narrator", 0, Some(20.0));
        vocal.subtitle_segments = vec![SubtitleSegment {
            start_secs: 0.0,
            end_secs: 1.0,
            text: "Hold the line".to_string(),
            words: vec![
                WordTiming {
                    text: "Hold".to_string(),
                    start_secs: 0.0,
                    end_secs: 0.3,
                },
                WordTiming {
                    text: "line".to_string(),
                    start_secs: 0.5,
                    end_secs: 1.0,
                },
            ],
        }];
        let clips = vec![
            clip(MediaType::Image, "Thumbnail", 0, None),
            clip(MediaType::Video, "Scene", 1, Some(30.0)),
            clip(MediaType::Text, "Card", 2, None),
            vocal,
            clip(MediaType::Music, "BackgroundMusic", 0, Some(300.0)),
        ];
        let plan = planner
            .plan(clips, &options(false), &mut StdRng::seed_from_u64(9))
            .unwrap();

        assert!(!plan.music_video);
        assert_eq!(plan.duration_secs, 23.0);
        assert!((plan.ambience_volume - 0.4).abs() < 1e-9);

        let captions: Vec<_> = plan.overlays_with(OverlayRole::Caption).collect();
        assert_eq!(captions.len(), 2);
        assert!((captions[0].start_secs - 0.85).abs() < 1e-9);

        let card = plan
            .visuals
            .iter()
            .find(|v| v.media_type == MediaType::Text)
            .unwrap();
        assert!(card.fit.is_none());
        assert_eq!(card.text.as_deref(), Some("Chapter One"));
        assert!((card.start_secs - 30.85).abs() < 1e-9);

        let music = plan
            .audio
            .iter()
            .find(|a| a.media_type == MediaType::Music)
            .unwrap();
        assert!((music.volume_scale - 0.3).abs() < 1e-9);

        let marks: Vec<_> = plan.overlays_with(OverlayRole::Watermark).collect();
        assert!((marks[1].start_secs - 23.0 / 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_input_rejected() {
        let planner = ProgramPlanner::with_defaults();
        let err = planner
            .plan(vec![], &options(false), &mut StdRng::seed_from_u64(0))
            .unwrap_err();
        assert!(matches!(err, ReelError::Scheduling { .. }));
    }
}
