//! Music-scored render.
//!
//! Scores an existing video: notable moments (given, and optionally
//! energy peaks of the source audio) drive a cue sheet built from
//! Baseline, Rise and Climax blocks, which is mixed under the source audio.

use std::path::{Path, PathBuf};

use reelsmith_audio_ai::music::{
    generate_score_blocks, HttpWindowModel, MusicGenerator, SlidingWindowConfig,
    SlidingWindowGenerator,
};
use reelsmith_audio_ai::peaks::{detect_file_peaks, PeakConfig};
use reelsmith_common::{AppConfig, ReelError, ReelResult};
use reelsmith_scheduling_core::music_cue::ScoreBlocks;
use reelsmith_scheduling_core::notable::{merge_notable, PEAK_WINDOW_SECS};
use reelsmith_scheduling_core::MusicCueScheduler;
use reelsmith_timeline_model::{
    CueSheet, MusicBlock, MusicBlockKind, NotableTimestamp, ScoringRequest,
};

use crate::compositor::score_command;
use crate::export::discard_staging;
use crate::ffmpeg::{EncodeSettings, FfmpegBackend, ProgressCallback, RenderBackend};
use crate::probe::{FfprobeProbe, MediaProbe};
use crate::transfer::{is_remote, TransferClient};

/// Where peak detection decodes audio, and how peaks join the given
/// timestamps.
#[derive(Debug, Clone)]
pub struct PeakSettings {
    pub ffmpeg_bin: String,
    pub config: PeakConfig,
    pub window_secs: f64,
}

impl Default for PeakSettings {
    fn default() -> Self {
        Self {
            ffmpeg_bin: "ffmpeg".to_string(),
            config: PeakConfig::default(),
            window_secs: PEAK_WINDOW_SECS,
        }
    }
}

pub struct ScoreRenderer<'a> {
    probe: &'a dyn MediaProbe,
    generator: Option<&'a dyn MusicGenerator>,
    scheduler: MusicCueScheduler,
    settings: EncodeSettings,
    peaks: PeakSettings,
}

impl<'a> ScoreRenderer<'a> {
    pub fn new(probe: &'a dyn MediaProbe, settings: EncodeSettings) -> Self {
        Self {
            probe,
            generator: None,
            scheduler: MusicCueScheduler::with_defaults(),
            settings,
            peaks: PeakSettings::default(),
        }
    }

    pub fn with_generator(mut self, generator: &'a dyn MusicGenerator) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn with_peaks(mut self, peaks: PeakSettings) -> Self {
        self.peaks = peaks;
        self
    }

    /// Blocks named by the request, or generated from its prompt into
    /// `scratch`.
    pub fn resolve_blocks(&self, request: &ScoringRequest, scratch: &Path) -> ReelResult<ScoreBlocks> {
        if let Some(sources) = &request.blocks {
            let block = |kind, source: &PathBuf| -> ReelResult<MusicBlock> {
                if !source.is_file() {
                    return Err(ReelError::missing_asset(source));
                }
                let duration = self.probe.probe(source)?.duration_secs.ok_or_else(|| {
                    ReelError::render(format!("no duration for {}", source.display()))
                })?;
                Ok(MusicBlock {
                    kind,
                    source: source.clone(),
                    natural_duration_secs: duration,
                })
            };
            return Ok(ScoreBlocks {
                baseline: block(MusicBlockKind::Baseline, &sources.baseline)?,
                rise: block(MusicBlockKind::Rise, &sources.rise)?,
                climax: block(MusicBlockKind::Climax, &sources.climax)?,
            });
        }

        let prompt = request
            .music_prompt
            .as_deref()
            .ok_or_else(|| ReelError::invalid_request("either blocks or musicPrompt is required."))?;
        let generator = self
            .generator
            .ok_or_else(|| ReelError::generation("no music generator configured"))?;

        let mut generated = generate_score_blocks(generator, prompt, scratch)?;
        let mut take = |kind: MusicBlockKind| -> ReelResult<MusicBlock> {
            let i = generated
                .iter()
                .position(|b| b.kind == kind)
                .ok_or_else(|| ReelError::generation(format!("{} block missing", kind.file_stem())))?;
            Ok(generated.swap_remove(i))
        };
        Ok(ScoreBlocks {
            baseline: take(MusicBlockKind::Baseline)?,
            rise: take(MusicBlockKind::Rise)?,
            climax: take(MusicBlockKind::Climax)?,
        })
    }

    /// Given timestamps, joined with energy peaks when requested.
    pub fn notable_seconds(&self, request: &ScoringRequest, source: &Path) -> ReelResult<Vec<f64>> {
        let given: Vec<NotableTimestamp> = request
            .notable_seconds
            .iter()
            .map(|&s| NotableTimestamp::new(s, ""))
            .collect();
        if !request.detect_peaks {
            return Ok(given.into_iter().map(|n| n.seconds).collect());
        }

        let peaks: Vec<f64> = detect_file_peaks(&self.peaks.ffmpeg_bin, source, &self.peaks.config)?
            .into_iter()
            .map(|p| p.seconds)
            .collect();
        Ok(merge_notable(&given, &peaks, self.peaks.window_secs)
            .into_iter()
            .map(|n| n.seconds)
            .collect())
    }

    /// Cue sheet covering a source of `duration_secs`.
    pub fn cue_sheet(
        &self,
        request: &ScoringRequest,
        source: &Path,
        duration_secs: f64,
        scratch: &Path,
    ) -> ReelResult<CueSheet> {
        let blocks = self.resolve_blocks(request, scratch)?;
        let notable = self.notable_seconds(request, source)?;
        let sheet = self.scheduler.schedule(&blocks, &notable, duration_secs)?;
        tracing::info!(
            notable = notable.len(),
            blocks = sheet.entries.len(),
            rises = sheet.count(MusicBlockKind::Rise),
            climaxes = sheet.count(MusicBlockKind::Climax),
            "Built cue sheet"
        );
        Ok(sheet)
    }

    /// Score a local source into a local output.
    pub fn score(
        &self,
        request: &ScoringRequest,
        backend: &mut dyn RenderBackend,
        work_dir: &Path,
        progress: Option<&ProgressCallback>,
    ) -> ReelResult<PathBuf> {
        let errors = request.validate();
        if !errors.is_empty() {
            return Err(ReelError::invalid_request(errors.join(" ")));
        }
        let source = Path::new(&request.source);
        if !source.is_file() {
            return Err(ReelError::missing_asset(source));
        }
        let info = self.probe.probe(source)?;
        let duration = info
            .duration_secs
            .ok_or_else(|| ReelError::render(format!("no duration for {}", source.display())))?;

        std::fs::create_dir_all(work_dir)?;
        let scratch = tempfile::TempDir::new_in(work_dir)?;
        let sheet = self.cue_sheet(request, source, duration, scratch.path())?;

        let output = PathBuf::from(&request.output);
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let staging = PathBuf::from(format!("{}.part.mp4", request.output));
        let command = score_command(
            source,
            info.frame,
            info.has_audio,
            &sheet,
            duration,
            &self.settings,
            &staging,
        )?;

        if let Err(err) = backend.run(&command, progress) {
            discard_staging(&staging);
            return Err(err);
        }
        std::fs::rename(&staging, &output)?;
        tracing::info!(output = %output.display(), duration_secs = duration, "Scored render complete");
        Ok(output)
    }
}

/// Run one scoring request with the configured external tools. Remote
/// sources are fetched and remote outputs delivered through presigned URLs.
pub fn scoring_job(request: &ScoringRequest, config: &AppConfig) -> ReelResult<PathBuf> {
    let mut backend = FfmpegBackend::new(config.render.ffmpeg_bin.clone());
    if !backend.is_available() {
        return Err(ReelError::unsupported(format!(
            "No supported render backend found (expected {} in PATH)",
            config.render.ffmpeg_bin
        )));
    }
    let probe = FfprobeProbe::new(config.render.ffprobe_bin.clone());
    let transfer = TransferClient::from_services(&config.services)?;

    std::fs::create_dir_all(&config.work_dir)?;
    let staging = tempfile::TempDir::new_in(&config.work_dir)?;
    let mut local = request.clone();
    if is_remote(&request.source) {
        let path = staging.path().join("source.mp4");
        transfer.download(&request.source, &path)?;
        local.source = path.to_string_lossy().into_owned();
    }
    if is_remote(&request.output) {
        local.output = staging.path().join("scored.mp4").to_string_lossy().into_owned();
    }

    let generator = HttpWindowModel::from_services(&config.services)?
        .map(|model| SlidingWindowGenerator::new(model, SlidingWindowConfig::default()));
    let mut renderer = ScoreRenderer::new(&probe, EncodeSettings::from(&config.render)).with_peaks(
        PeakSettings {
            ffmpeg_bin: config.render.ffmpeg_bin.clone(),
            ..PeakSettings::default()
        },
    );
    if let Some(generator) = &generator {
        renderer = renderer.with_generator(generator);
    }

    let written = renderer.score(&local, &mut backend, staging.path(), None)?;
    if is_remote(&request.output) {
        transfer.upload(&written, &request.output)?;
        return Ok(PathBuf::from(&request.output));
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ffmpeg::FfmpegCommand;
    use crate::probe::ProbeInfo;
    use reelsmith_audio_ai::music::GeneratedAudio;
    use reelsmith_timeline_model::{FrameSize, ScoreBlockSources};

    /// Durations by file stem.
    struct StemProbe;

    impl MediaProbe for StemProbe {
        fn probe(&self, path: &Path) -> ReelResult<ProbeInfo> {
            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
            let duration = match stem {
                "baseline" => 200.0,
                "rise" => 60.0,
                "climax" => 30.0,
                _ => 400.0,
            };
            Ok(ProbeInfo {
                duration_secs: Some(duration),
                frame: Some(FrameSize::new(1080, 1920)),
                has_audio: true,
            })
        }
    }

    struct Silence;

    impl MusicGenerator for Silence {
        fn sample_rate(&self) -> u32 {
            100
        }

        fn generate(&self, _prompt: &str, duration_secs: f64) -> ReelResult<GeneratedAudio> {
            Ok(GeneratedAudio {
                sample_rate: 100,
                frames: vec![[0.0, 0.0]; (duration_secs * 100.0) as usize],
            })
        }
    }

    struct WritingBackend {
        runs: Vec<FfmpegCommand>,
    }

    impl RenderBackend for WritingBackend {
        fn run(&mut self, command: &FfmpegCommand, _: Option<&ProgressCallback>) -> ReelResult<()> {
            self.runs.push(command.clone());
            std::fs::write(&command.output, b"scored")?;
            Ok(())
        }

        fn is_available(&self) -> bool {
            true
        }

        fn name(&self) -> &str {
            "writing"
        }
    }

    fn request(dir: &Path) -> ScoringRequest {
        let touch = |name: &str| {
            let p = dir.join(name);
            std::fs::write(&p, b"x").unwrap();
            p
        };
        ScoringRequest {
            source: touch("film.mp4").to_string_lossy().into_owned(),
            output: dir.join("out/film-scored.mp4").to_string_lossy().into_owned(),
            notable_seconds: vec![10.0, 40.0, 305.0],
            detect_peaks: false,
            blocks: Some(ScoreBlockSources {
                baseline: touch("baseline.wav"),
                rise: touch("rise.wav"),
                climax: touch("climax.wav"),
            }),
            music_prompt: None,
        }
    }

    #[test]
    fn test_scored_render_writes_output() {
        let dir = tempfile::tempdir().unwrap();
        let request = request(dir.path());
        let mut backend = WritingBackend { runs: vec![] };

        let out = ScoreRenderer::new(&StemProbe, EncodeSettings::default())
            .score(&request, &mut backend, &dir.path().join("work"), None)
            .unwrap();

        assert!(out.is_file());
        assert!(!Path::new(&format!("{}.part.mp4", request.output)).exists());
        let args = &backend.runs[0].args;
        let aspect = args.iter().position(|a| a == "-aspect").unwrap();
        assert_eq!(args[aspect + 1], "9:16");
    }

    #[test]
    fn test_cue_sheet_lands_rise_first() {
        let dir = tempfile::tempdir().unwrap();
        let request = request(dir.path());
        let sheet = ScoreRenderer::new(&StemProbe, EncodeSettings::default())
            .cue_sheet(&request, Path::new(&request.source), 400.0, dir.path())
            .unwrap();
        assert_eq!(sheet.entries[0].kind, MusicBlockKind::Rise);
        assert!(sheet.total_duration_secs() >= 400.0);
        assert_eq!(sheet.volume_scale, 0.2);
    }

    #[test]
    fn test_blocks_generated_from_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let mut request = request(dir.path());
        request.blocks = None;
        request.music_prompt = Some("Low strings".to_string());

        let blocks = ScoreRenderer::new(&StemProbe, EncodeSettings::default())
            .with_generator(&Silence)
            .resolve_blocks(&request, dir.path())
            .unwrap();
        assert!((blocks.baseline.natural_duration_secs - 200.0).abs() < 1e-9);
        assert!((blocks.climax.natural_duration_secs - 30.0).abs() < 1e-9);
        assert!(blocks.rise.source.ends_with("rise.wav"));
        assert!(blocks.rise.source.is_file());
    }

    #[test]
    fn test_prompt_without_generator_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut request = request(dir.path());
        request.blocks = None;
        request.music_prompt = Some("Low strings".to_string());

        let err = ScoreRenderer::new(&StemProbe, EncodeSettings::default())
            .resolve_blocks(&request, dir.path())
            .unwrap_err();
        assert!(matches!(err, ReelError::Generation { .. }));
    }

    #[test]
    fn test_missing_block_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let request = request(dir.path());
        std::fs::remove_file(dir.path().join("rise.wav")).unwrap();
        let err = ScoreRenderer::new(&StemProbe, EncodeSettings::default())
            .resolve_blocks(&request, dir.path())
            .unwrap_err();
        assert!(err.is_fatal_input());
    }
}
