//! Extract sub-clips from a source video.

use std::path::PathBuf;

use reelsmith_common::AppConfig;
use reelsmith_render_engine::subclip_job;
use reelsmith_timeline_model::SubclipRequest;

pub async fn run(config: AppConfig, path: PathBuf) -> anyhow::Result<()> {
    let request = SubclipRequest::load(&path)
        .map_err(|e| anyhow::anyhow!("Failed to load request: {e}"))?;

    println!("Cutting {} clips", request.cuts.len());
    println!("  Ratio: {}", request.desired_ratio);
    println!("  Cropping: {}", if request.allow_cropping { "on" } else { "off" });
    println!("  Subtitles: {}", if request.enable_subtitles { "on" } else { "off" });

    let outcomes = tokio::task::spawn_blocking(move || subclip_job(&request, &config))
        .await
        .map_err(|e| anyhow::anyhow!("Cut task failed: {e}"))?
        .map_err(|e| anyhow::anyhow!("Sub-clip extraction failed: {e}"))?;

    let mut failed = 0;
    for outcome in &outcomes {
        let span = format!(
            "#{} {:.2}s-{:.2}s",
            outcome.index, outcome.start_secs, outcome.end_secs
        );
        match &outcome.error {
            None if outcome.success => println!("[OK]   {span}"),
            error => {
                failed += 1;
                println!(
                    "[FAIL] {span}: {}",
                    error.as_deref().unwrap_or("unknown error")
                );
            }
        }
    }

    if failed > 0 {
        return Err(anyhow::anyhow!(
            "{failed} of {} cuts failed",
            outcomes.len()
        ));
    }
    println!("All {} cuts complete.", outcomes.len());
    Ok(())
}
