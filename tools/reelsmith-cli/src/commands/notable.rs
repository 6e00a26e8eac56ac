//! Pick notable timestamps from a transcript, optionally merged with
//! audio-energy peaks.

use std::path::PathBuf;

use reelsmith_audio_ai::analysis::AnalysisConfig;
use reelsmith_audio_ai::peaks::{detect_file_peaks, PeakConfig};
use reelsmith_audio_ai::{load_transcript, HttpAnalysisModel, TranscriptAnalyzer};
use reelsmith_common::AppConfig;
use reelsmith_scheduling_core::notable::merge_notable;
use reelsmith_timeline_model::NotableTimestamp;

pub async fn run(
    config: AppConfig,
    transcript: PathBuf,
    peaks: Option<PathBuf>,
    window_secs: f64,
) -> anyhow::Result<()> {
    // The analysis client blocks on HTTP.
    let notable = tokio::task::spawn_blocking(move || {
        pick_notable(&config, &transcript, peaks.as_deref(), window_secs)
    })
    .await
    .map_err(|e| anyhow::anyhow!("Analysis task failed: {e}"))??;

    println!("{}", serde_json::to_string_pretty(&notable)?);
    Ok(())
}

fn pick_notable(
    config: &AppConfig,
    transcript: &std::path::Path,
    peaks: Option<&std::path::Path>,
    window_secs: f64,
) -> anyhow::Result<Vec<NotableTimestamp>> {
    let transcript = load_transcript(transcript)
        .map_err(|e| anyhow::anyhow!("Failed to load transcript: {e}"))?;

    let model = HttpAnalysisModel::from_services(&config.services)?.ok_or_else(|| {
        anyhow::anyhow!("No analysis endpoint configured (services.analysis_endpoint)")
    })?;
    let analyzer = TranscriptAnalyzer::new(model, AnalysisConfig::from(&config.services));
    let notable = analyzer
        .analyze(&transcript.segments)
        .map_err(|e| anyhow::anyhow!("Analysis failed: {e}"))?;
    tracing::info!(count = notable.len(), "Analysis complete");

    let Some(media) = peaks else {
        return Ok(notable);
    };
    let peaks = detect_file_peaks(&config.render.ffmpeg_bin, media, &PeakConfig::default())
        .map_err(|e| anyhow::anyhow!("Peak detection failed: {e}"))?;
    let peak_secs: Vec<f64> = peaks.iter().map(|p| p.seconds).collect();
    Ok(merge_notable(&notable, &peak_secs, window_secs))
}
