//! Sub-clip extraction.
//!
//! Cuts time ranges out of one source video, fits each to the requested
//! aspect by cropping or padding, and delivers every cut to its own
//! destination. Caption-free cuts fit with a plain filter chain; captioned
//! cuts fit inside a composition graph so word captions share its
//! coordinate space. Each cut succeeds or fails on its own.

use std::path::Path;

use rand::Rng;
use reelsmith_audio_ai::{CommandTranscriber, Transcriber, TranscriptionConfig};
use reelsmith_common::{AppConfig, ReelError, ReelResult};
use reelsmith_scheduling_core::captions::{caption_anchor, caption_cues, CaptionStyle};
use reelsmith_scheduling_core::geometry::{subclip_geometry, SubclipGeometry};
use reelsmith_timeline_model::{
    AspectRatio, AssetDescriptor, ClipHandle, CutSpec, MediaSource, MediaType, SubclipRequest,
    TextOverlay,
};
use serde::Serialize;

use crate::compositor::{captioned_subclip_command, extract_audio_command, subclip_command};
use crate::ffmpeg::{EncodeSettings, FfmpegBackend, RenderBackend};
use crate::probe::{FfprobeProbe, MediaProbe};
use crate::transfer::TransferClient;

/// Result of one cut.
#[derive(Debug, Clone, Serialize)]
pub struct CutOutcome {
    pub index: usize,
    pub start_secs: i64,
    pub end_secs: i64,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct SubclipExtractor<'a> {
    probe: &'a dyn MediaProbe,
    transcriber: Option<&'a dyn Transcriber>,
    settings: EncodeSettings,
    captions: CaptionStyle,
}

impl<'a> SubclipExtractor<'a> {
    pub fn new(probe: &'a dyn MediaProbe, settings: EncodeSettings) -> Self {
        Self {
            probe,
            transcriber: None,
            settings,
            captions: CaptionStyle::default(),
        }
    }

    pub fn with_transcriber(mut self, transcriber: &'a dyn Transcriber) -> Self {
        self.transcriber = Some(transcriber);
        self
    }

    /// Fetch the source, then cut, fit and deliver every requested range.
    ///
    /// Errors are returned only for problems that affect the whole job:
    /// an invalid request or an unreachable source.
    pub fn extract_all<R: Rng + ?Sized>(
        &self,
        request: &SubclipRequest,
        backend: &mut dyn RenderBackend,
        transfer: &TransferClient,
        work_dir: &Path,
        rng: &mut R,
    ) -> ReelResult<Vec<CutOutcome>> {
        let errors = request.validate();
        if !errors.is_empty() {
            return Err(ReelError::invalid_request(errors.join(" ")));
        }
        let aspect = request
            .aspect()
            .ok_or_else(|| ReelError::invalid_request("desiredRatio is not recognised"))?;

        std::fs::create_dir_all(work_dir)?;
        let scratch = tempfile::TempDir::new_in(work_dir)?;
        let source = scratch.path().join("source.mp4");
        transfer.download(&request.source_video_url, &source)?;

        let target = aspect.frame();
        let geometry = match self.probe.probe(&source)?.frame {
            Some(frame) => subclip_geometry(frame, target, request.fit_mode()),
            None => SubclipGeometry::ScaleOnly { target },
        };
        tracing::info!(
            cuts = request.cuts.len(),
            ?geometry,
            captions = request.enable_subtitles,
            "Extracting sub-clips"
        );

        let outcomes = request
            .cuts
            .iter()
            .enumerate()
            .map(|(index, cut)| {
                let result = self.extract_one(
                    index,
                    cut,
                    request,
                    aspect,
                    geometry,
                    &source,
                    scratch.path(),
                    &mut *backend,
                    transfer,
                    &mut *rng,
                );
                if let Err(err) = &result {
                    tracing::error!(index, error = %err, "Sub-clip failed");
                }
                CutOutcome {
                    index,
                    start_secs: cut.start_time_seconds,
                    end_secs: cut.end_time_seconds,
                    success: result.is_ok(),
                    error: result.err().map(|e| e.to_string()),
                }
            })
            .collect::<Vec<_>>();

        let delivered = outcomes.iter().filter(|o| o.success).count();
        tracing::info!(delivered, total = outcomes.len(), "Sub-clip job finished");
        Ok(outcomes)
    }

    #[allow(clippy::too_many_arguments)]
    fn extract_one<R: Rng + ?Sized>(
        &self,
        index: usize,
        cut: &CutSpec,
        request: &SubclipRequest,
        aspect: AspectRatio,
        geometry: SubclipGeometry,
        source: &Path,
        scratch: &Path,
        backend: &mut dyn RenderBackend,
        transfer: &TransferClient,
        rng: &mut R,
    ) -> ReelResult<()> {
        let start = cut.start_time_seconds as f64;
        let duration = cut.duration_secs();
        let output = scratch.join(format!("cut-{index}.mp4"));

        let command = if request.enable_subtitles {
            let captions = self.cut_captions(
                index,
                source,
                start,
                duration,
                aspect,
                &request.language,
                scratch,
                &mut *backend,
                &mut *rng,
            );
            captioned_subclip_command(
                source,
                start,
                duration,
                geometry,
                &captions,
                &self.settings,
                &output,
            )
        } else {
            subclip_command(source, start, duration, geometry, &self.settings, &output)
        };
        backend.run(&command, None)?;

        transfer.upload(&output, &cut.presigned_s3_url)
    }

    /// Caption overlays for one cut. Recognition failures disable captions
    /// for the cut instead of failing it.
    #[allow(clippy::too_many_arguments)]
    fn cut_captions<R: Rng + ?Sized>(
        &self,
        index: usize,
        source: &Path,
        start: f64,
        duration: f64,
        aspect: AspectRatio,
        language: &str,
        scratch: &Path,
        backend: &mut dyn RenderBackend,
        rng: &mut R,
    ) -> Vec<TextOverlay> {
        let Some(transcriber) = self.transcriber else {
            tracing::warn!(index, "Captions requested but no transcriber configured");
            return vec![];
        };

        let wav = scratch.join(format!("cut-{index}.wav"));
        let transcript = backend
            .run(&extract_audio_command(source, start, duration, &wav), None)
            .and_then(|()| transcriber.transcribe(&wav, language));
        let transcript = match transcript {
            Ok(t) => t,
            Err(err) => {
                tracing::warn!(index, error = %err, "Transcription failed, continuing without captions");
                return vec![];
            }
        };

        let mut clip = ClipHandle::new(
            AssetDescriptor::new(MediaType::Vocal, "Narrator", 0, format!("cut-{index}")),
            MediaSource {
                path: wav,
                frame: None,
                has_audio: true,
                text: None,
            },
            Some(duration),
        );
        clip.subtitle_segments = transcript.segments;
        caption_cues(
            &[clip],
            0.0,
            caption_anchor(aspect == AspectRatio::Portrait),
            &self.captions,
            rng,
        )
    }
}

/// Run one sub-clip request with the configured external tools.
pub fn subclip_job(request: &SubclipRequest, config: &AppConfig) -> ReelResult<Vec<CutOutcome>> {
    let mut backend = FfmpegBackend::new(config.render.ffmpeg_bin.clone());
    if !backend.is_available() {
        return Err(ReelError::unsupported(format!(
            "No supported render backend found (expected {} in PATH)",
            config.render.ffmpeg_bin
        )));
    }
    let probe = FfprobeProbe::new(config.render.ffprobe_bin.clone());
    let transcriber = CommandTranscriber::new(TranscriptionConfig::from(&config.services));
    let transfer = TransferClient::from_services(&config.services)?;

    SubclipExtractor::new(&probe, EncodeSettings::from(&config.render))
        .with_transcriber(&transcriber)
        .extract_all(
            request,
            &mut backend,
            &transfer,
            &config.work_dir,
            &mut rand::thread_rng(),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ffmpeg::{FfmpegCommand, ProgressCallback};
    use crate::probe::ProbeInfo;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use reelsmith_timeline_model::{FrameSize, SubtitleSegment, Transcript, WordTiming};
    use std::time::Duration;

    struct WideProbe;

    impl MediaProbe for WideProbe {
        fn probe(&self, _path: &Path) -> ReelResult<ProbeInfo> {
            Ok(ProbeInfo {
                duration_secs: Some(120.0),
                frame: Some(FrameSize::new(1920, 1080)),
                has_audio: true,
            })
        }
    }

    struct Words;

    impl Transcriber for Words {
        fn transcribe(&self, _media: &Path, _language: &str) -> ReelResult<Transcript> {
            let word = |text: &str, s: f64| WordTiming {
                text: text.to_string(),
                start_secs: s,
                end_secs: s + 0.4,
            };
            Ok(Transcript {
                text: "hold the line".to_string(),
                language: Some("en".to_string()),
                segments: vec![SubtitleSegment {
                    start_secs: 0.0,
                    end_secs: 1.2,
                    text: "hold the line".to_string(),
                    words: vec![word("hold", 0.0), word("the", 0.4), word("line", 0.8)],
                }],
            })
        }
    }

    struct Broken;

    impl Transcriber for Broken {
        fn transcribe(&self, _media: &Path, _language: &str) -> ReelResult<Transcript> {
            Err(ReelError::transcription("no speech model"))
        }
    }

    struct Unreachable;

    impl Transcriber for Unreachable {
        fn transcribe(&self, media: &Path, _language: &str) -> ReelResult<Transcript> {
            panic!("transcribed {} for a caption-free cut", media.display())
        }
    }

    /// Writes every output; fails commands whose output name contains
    /// `fail_on`.
    struct RecordingBackend {
        fail_on: Option<&'static str>,
        runs: Vec<FfmpegCommand>,
    }

    impl RenderBackend for RecordingBackend {
        fn run(&mut self, command: &FfmpegCommand, _: Option<&ProgressCallback>) -> ReelResult<()> {
            self.runs.push(command.clone());
            let name = command.output.to_string_lossy();
            if self.fail_on.is_some_and(|f| name.contains(f)) {
                return Err(ReelError::render("encoder crashed"));
            }
            std::fs::write(&command.output, b"cut")?;
            Ok(())
        }

        fn is_available(&self) -> bool {
            true
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    fn request(dir: &Path, subtitles: bool) -> SubclipRequest {
        let source = dir.join("source.mp4");
        std::fs::write(&source, b"source").unwrap();
        let cut = |i: usize, start, end| CutSpec {
            presigned_s3_url: dir.join(format!("out/{i}.mp4")).to_string_lossy().into_owned(),
            start_time_seconds: start,
            end_time_seconds: end,
        };
        SubclipRequest {
            source_video_url: source.to_string_lossy().into_owned(),
            desired_ratio: "Portrait".to_string(),
            allow_cropping: true,
            enable_subtitles: subtitles,
            cuts: vec![cut(0, 0, 10), cut(1, 30, 45)],
            language: "en".to_string(),
        }
    }

    fn transfer() -> TransferClient {
        TransferClient::new(Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_every_cut_is_delivered() {
        let dir = tempfile::tempdir().unwrap();
        let request = request(dir.path(), false);
        let mut backend = RecordingBackend {
            fail_on: None,
            runs: vec![],
        };

        let outcomes = SubclipExtractor::new(&WideProbe, EncodeSettings::default())
            .extract_all(
                &request,
                &mut backend,
                &transfer(),
                &dir.path().join("work"),
                &mut StdRng::seed_from_u64(1),
            )
            .unwrap();

        assert!(outcomes.iter().all(|o| o.success));
        assert!(dir.path().join("out/0.mp4").is_file());
        assert!(dir.path().join("out/1.mp4").is_file());
        let vf = &backend.runs[0].args;
        let i = vf.iter().position(|a| a == "-vf").unwrap();
        assert!(vf[i + 1].starts_with("scale=3414:1920,crop=1080:1920"));
    }

    #[test]
    fn test_one_failed_cut_does_not_stop_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let request = request(dir.path(), false);
        let mut backend = RecordingBackend {
            fail_on: Some("cut-0"),
            runs: vec![],
        };

        let outcomes = SubclipExtractor::new(&WideProbe, EncodeSettings::default())
            .extract_all(
                &request,
                &mut backend,
                &transfer(),
                &dir.path().join("work"),
                &mut StdRng::seed_from_u64(1),
            )
            .unwrap();

        assert!(!outcomes[0].success);
        assert!(outcomes[0].error.is_some());
        assert!(outcomes[1].success);
    }

    #[test]
    fn test_captions_are_burned_when_transcribed() {
        let dir = tempfile::tempdir().unwrap();
        let request = request(dir.path(), true);
        let mut backend = RecordingBackend {
            fail_on: None,
            runs: vec![],
        };

        SubclipExtractor::new(&WideProbe, EncodeSettings::default())
            .with_transcriber(&Words)
            .extract_all(
                &request,
                &mut backend,
                &transfer(),
                &dir.path().join("work"),
                &mut StdRng::seed_from_u64(1),
            )
            .unwrap();

        // audio extraction then render, per cut
        assert_eq!(backend.runs.len(), 4);
        let render = &backend.runs[1].args;
        let i = render.iter().position(|a| a == "-filter_complex").unwrap();
        assert_eq!(render[i + 1].matches("drawtext").count(), 3);
        assert!(render[i + 1].contains("text='line'"));
        assert!(render[i + 1].contains("[canvas][fit]overlay"));
    }

    #[test]
    fn test_transcription_failure_falls_back_to_plain_cut() {
        let dir = tempfile::tempdir().unwrap();
        let request = request(dir.path(), true);
        let mut backend = RecordingBackend {
            fail_on: None,
            runs: vec![],
        };

        let outcomes = SubclipExtractor::new(&WideProbe, EncodeSettings::default())
            .with_transcriber(&Broken)
            .extract_all(
                &request,
                &mut backend,
                &transfer(),
                &dir.path().join("work"),
                &mut StdRng::seed_from_u64(1),
            )
            .unwrap();

        assert!(outcomes.iter().all(|o| o.success));
        let render = &backend.runs[1].args;
        assert!(render.iter().any(|a| a == "-filter_complex"));
        assert!(!render.iter().any(|a| a.contains("drawtext")));
    }

    #[test]
    fn test_caption_free_cuts_never_transcribe() {
        let dir = tempfile::tempdir().unwrap();
        let request = request(dir.path(), false);
        let mut backend = RecordingBackend {
            fail_on: None,
            runs: vec![],
        };

        let outcomes = SubclipExtractor::new(&WideProbe, EncodeSettings::default())
            .with_transcriber(&Unreachable)
            .extract_all(
                &request,
                &mut backend,
                &transfer(),
                &dir.path().join("work"),
                &mut StdRng::seed_from_u64(1),
            )
            .unwrap();

        assert!(outcomes.iter().all(|o| o.success));
        // one plain render per cut, no audio extraction
        assert_eq!(backend.runs.len(), 2);
        for run in &backend.runs {
            assert!(run.args.iter().any(|a| a == "-vf"));
            assert!(!run.args.iter().any(|a| a == "-filter_complex"));
            assert!(!run.output.to_string_lossy().ends_with(".wav"));
        }
    }

    #[test]
    fn test_invalid_request_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut request = request(dir.path(), false);
        request.desired_ratio = "Square".to_string();
        request.cuts[1].end_time_seconds = 20;
        let mut backend = RecordingBackend {
            fail_on: None,
            runs: vec![],
        };

        let err = SubclipExtractor::new(&WideProbe, EncodeSettings::default())
            .extract_all(
                &request,
                &mut backend,
                &transfer(),
                &dir.path().join("work"),
                &mut StdRng::seed_from_u64(1),
            )
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("desiredRatio"));
        assert!(message.contains("Cut at index 1"));
        assert!(backend.runs.is_empty());
    }

    #[test]
    fn test_unreachable_source_fails_job() {
        let dir = tempfile::tempdir().unwrap();
        let mut request = request(dir.path(), false);
        request.source_video_url = dir.path().join("gone.mp4").to_string_lossy().into_owned();
        let mut backend = RecordingBackend {
            fail_on: None,
            runs: vec![],
        };

        let err = SubclipExtractor::new(&WideProbe, EncodeSettings::default())
            .extract_all(
                &request,
                &mut backend,
                &transfer(),
                &dir.path().join("work"),
                &mut StdRng::seed_from_u64(1),
            )
            .unwrap_err();
        assert!(matches!(err, ReelError::Transfer { .. }));
        assert!(err.to_string().contains("gone.mp4"));
        assert!(backend.runs.is_empty());
    }
}
