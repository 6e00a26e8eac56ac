//! Lay a music cue sheet under an existing video.

use std::path::PathBuf;

use reelsmith_common::AppConfig;
use reelsmith_render_engine::scoring_job;
use reelsmith_timeline_model::ScoringRequest;

pub async fn run(config: AppConfig, path: PathBuf) -> anyhow::Result<()> {
    let request = ScoringRequest::load(&path)
        .map_err(|e| anyhow::anyhow!("Failed to load request: {e}"))?;

    println!("Scoring video");
    println!("  Notable timestamps: {}", request.notable_seconds.len());
    println!(
        "  Peak detection: {}",
        if request.detect_peaks { "on" } else { "off" }
    );
    println!(
        "  Music blocks: {}",
        if request.blocks.is_some() {
            "provided"
        } else {
            "generated"
        }
    );

    let output = tokio::task::spawn_blocking(move || scoring_job(&request, &config))
        .await
        .map_err(|e| anyhow::anyhow!("Scoring task failed: {e}"))?
        .map_err(|e| anyhow::anyhow!("Scoring failed: {e}"))?;

    println!("Scoring complete: {}", output.display());
    Ok(())
}
