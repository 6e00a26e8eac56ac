//! Resolve and schedule a request without encoding it.

use std::path::PathBuf;

use reelsmith_audio_ai::{CommandTranscriber, Transcriber, TranscriptionConfig};
use reelsmith_common::AppConfig;
use reelsmith_render_engine::{EncodeSettings, FfprobeProbe, ProgramRenderer};
use reelsmith_scheduling_core::planner::PlannerConfig;
use reelsmith_scheduling_core::ProgramPlanner;
use reelsmith_timeline_model::RenderRequest;

pub fn run(
    config: &AppConfig,
    path: PathBuf,
    output: Option<PathBuf>,
    captions: bool,
) -> anyhow::Result<()> {
    let request = RenderRequest::load(&path)
        .map_err(|e| anyhow::anyhow!("Failed to load request: {e}"))?;

    let probe = FfprobeProbe::new(config.render.ffprobe_bin.clone());
    let transcriber =
        captions.then(|| CommandTranscriber::new(TranscriptionConfig::from(&config.services)));
    let renderer = ProgramRenderer::new(
        &probe,
        transcriber.as_ref().map(|t| t as &dyn Transcriber),
        ProgramPlanner::new(PlannerConfig::from_render_defaults(&config.render)),
        EncodeSettings::from(&config.render),
    );

    let plan = renderer
        .plan(&request, &mut rand::thread_rng())
        .map_err(|e| anyhow::anyhow!("Failed to plan {}: {e}", request.content_lookup_key))?;

    match output {
        Some(out) => {
            plan.save(&out)
                .map_err(|e| anyhow::anyhow!("Failed to write plan: {e}"))?;
            println!("Plan written: {}", out.display());
            println!(
                "  Frame: {}x{} @ {} fps",
                plan.frame.width, plan.frame.height, plan.fps
            );
            println!("  Duration: {:.2}s", plan.duration_secs);
            println!("  Visual layers: {}", plan.visuals.len());
            println!("  Audio tracks: {}", plan.audio.len());
            println!("  Text overlays: {}", plan.overlays.len());
            if plan.music_video {
                println!("  Music video: ambience muted");
            }
        }
        None => println!("{}", serde_json::to_string_pretty(&plan)?),
    }

    Ok(())
}
