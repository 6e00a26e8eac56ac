//! Full-program render.
//!
//! A render request is validated, its descriptors resolved into clips, the
//! clips scheduled into a plan, and the plan encoded to a staging file that
//! is renamed onto the final path only when ffmpeg succeeds.

use std::path::{Path, PathBuf};

use rand::Rng;
use reelsmith_audio_ai::{CommandTranscriber, Transcriber, TranscriptionConfig};
use reelsmith_common::{AppConfig, ReelError, ReelResult};
use reelsmith_scheduling_core::planner::{PlannerConfig, RenderOptions};
use reelsmith_scheduling_core::ProgramPlanner;
use reelsmith_timeline_model::{RenderPlan, RenderRequest};

use crate::compositor::program_command;
use crate::ffmpeg::{
    EncodeSettings, FfmpegBackend, ProgressCallback, RenderBackend, RenderProgress, RenderStage,
};
use crate::probe::{FfprobeProbe, MediaProbe};
use crate::resolver::ClipResolver;

/// Resolves, schedules and renders program requests.
pub struct ProgramRenderer<'a> {
    probe: &'a dyn MediaProbe,
    transcriber: Option<&'a dyn Transcriber>,
    planner: ProgramPlanner,
    settings: EncodeSettings,
}

impl<'a> ProgramRenderer<'a> {
    pub fn new(
        probe: &'a dyn MediaProbe,
        transcriber: Option<&'a dyn Transcriber>,
        planner: ProgramPlanner,
        settings: EncodeSettings,
    ) -> Self {
        Self {
            probe,
            transcriber,
            planner,
            settings,
        }
    }

    /// Validate the request, resolve its clips and schedule them.
    pub fn plan<R: Rng + ?Sized>(
        &self,
        request: &RenderRequest,
        rng: &mut R,
    ) -> ReelResult<RenderPlan> {
        let errors = request.validate();
        if !errors.is_empty() {
            return Err(ReelError::invalid_request(errors.join(" ")));
        }
        let descriptors = request.descriptors()?;

        let mut resolver = ClipResolver::new(self.probe, request.filepath_prefix.clone());
        if let Some(transcriber) = self.transcriber {
            resolver = resolver.with_transcriber(transcriber, &request.language);
        }
        let clips = resolver.resolve_all(&descriptors)?;

        let options = RenderOptions {
            short_form: request.is_short_form,
            title: request.thumbnail_text.clone(),
            watermark: Some(request.watermark_text.clone()).filter(|w| !w.trim().is_empty()),
        };
        self.planner.plan(clips, &options, rng)
    }

    /// Plan and render a request to its output path.
    pub fn render<R: Rng + ?Sized>(
        &self,
        request: &RenderRequest,
        backend: &mut dyn RenderBackend,
        progress: Option<&ProgressCallback>,
        rng: &mut R,
    ) -> ReelResult<PathBuf> {
        tracing::info!(
            key = %request.content_lookup_key,
            short_form = request.is_short_form,
            "Starting program render"
        );
        if let Some(cb) = progress {
            cb(RenderProgress {
                progress: 0.0,
                eta_secs: 0.0,
                stage: RenderStage::Preparing,
            });
        }

        let plan = self.plan(request, rng)?;
        render_plan(
            &plan,
            &self.settings,
            backend,
            &request.staging_path(),
            &request.output_path(),
            progress,
        )
    }
}

/// Encode `plan` into `staging`, then rename it onto `output`.
///
/// The staging file is removed when the encode fails.
pub fn render_plan(
    plan: &RenderPlan,
    settings: &EncodeSettings,
    backend: &mut dyn RenderBackend,
    staging: &Path,
    output: &Path,
    progress: Option<&ProgressCallback>,
) -> ReelResult<PathBuf> {
    if let Some(parent) = staging.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let command = program_command(plan, settings, staging)?;
    tracing::info!(backend = backend.name(), "Using render backend");

    if let Err(err) = backend.run(&command, progress) {
        discard_staging(staging);
        return Err(err);
    }

    if !staging.is_file() {
        return Err(ReelError::render(format!(
            "Render finished but {} was not written",
            staging.display()
        )));
    }
    std::fs::rename(staging, output)?;

    tracing::info!(
        output = %output.display(),
        duration_secs = plan.duration_secs,
        "Program render complete"
    );
    Ok(output.to_path_buf())
}

/// Remove a partial encode. Failures are logged, never raised, so the
/// encode error stays the one reported.
pub(crate) fn discard_staging(staging: &Path) {
    match std::fs::remove_file(staging) {
        Ok(()) => tracing::debug!(path = %staging.display(), "Removed staging file"),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => {
            tracing::warn!(path = %staging.display(), error = %err, "Failed to remove staging file")
        }
    }
}

/// Run one render request with the configured external tools.
pub fn render_job(
    request: &RenderRequest,
    config: &AppConfig,
    progress: Option<&ProgressCallback>,
) -> ReelResult<PathBuf> {
    let mut backend = FfmpegBackend::new(config.render.ffmpeg_bin.clone());
    if !backend.is_available() {
        return Err(ReelError::unsupported(format!(
            "No supported render backend found (expected {} in PATH)",
            config.render.ffmpeg_bin
        )));
    }

    let probe = FfprobeProbe::new(config.render.ffprobe_bin.clone());
    let transcriber = CommandTranscriber::new(TranscriptionConfig::from(&config.services));
    let renderer = ProgramRenderer::new(
        &probe,
        Some(&transcriber),
        ProgramPlanner::new(PlannerConfig::from_render_defaults(&config.render)),
        EncodeSettings::from(&config.render),
    );
    renderer.render(request, &mut backend, progress, &mut rand::thread_rng())
}
