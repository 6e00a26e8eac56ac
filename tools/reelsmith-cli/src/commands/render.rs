//! Render program requests.
//!
//! A single request renders in the foreground with a progress line. Several
//! requests go through the worker pool.

use std::path::PathBuf;

use reelsmith_common::AppConfig;
use reelsmith_render_engine::{render_job, ProgressCallback, RenderJob, RenderWorkerPool};
use reelsmith_timeline_model::RenderRequest;

pub async fn run(config: AppConfig, paths: Vec<PathBuf>) -> anyhow::Result<()> {
    let mut requests = Vec::with_capacity(paths.len());
    for path in &paths {
        let request = RenderRequest::load(path)
            .map_err(|e| anyhow::anyhow!("Failed to load request {}: {e}", path.display()))?;
        requests.push(request);
    }

    if requests.len() == 1 {
        let request = requests.remove(0);
        return render_one(config, request).await;
    }

    let pool = RenderWorkerPool::new(config);
    println!(
        "Rendering {} programs ({} at a time)",
        requests.len(),
        pool.max_concurrent()
    );

    let jobs = requests
        .into_iter()
        .map(|r| (r.content_lookup_key.clone(), RenderJob::Program(r)))
        .collect();
    let outcomes = pool.run_all(jobs).await;

    let mut failed = 0;
    for outcome in &outcomes {
        match &outcome.error {
            None => println!("[OK]   {} ({:.1}s)", outcome.job_id, outcome.elapsed_secs()),
            Some(err) => {
                failed += 1;
                println!("[FAIL] {}: {err}", outcome.job_id);
            }
        }
    }

    if failed > 0 {
        return Err(anyhow::anyhow!(
            "{failed} of {} renders failed",
            outcomes.len()
        ));
    }
    Ok(())
}

async fn render_one(config: AppConfig, request: RenderRequest) -> anyhow::Result<()> {
    println!("Rendering program: {}", request.content_lookup_key);
    println!("  Output: {}", request.output_path().display());
    println!(
        "  Format: {}",
        if request.is_short_form {
            "short-form (9:16)"
        } else {
            "landscape (16:9)"
        }
    );

    let progress_cb: ProgressCallback = Box::new(|p| {
        print!(
            "\r  Progress: {:.1}% ({:?}, ETA: {:.0}s)  ",
            p.progress * 100.0,
            p.stage,
            p.eta_secs,
        );
    });

    let result =
        tokio::task::spawn_blocking(move || render_job(&request, &config, Some(&progress_cb)))
            .await
            .map_err(|e| anyhow::anyhow!("Render task failed: {e}"))?;

    match result {
        Ok(output) => {
            println!("\nRender complete: {}", output.display());
            Ok(())
        }
        Err(e) => {
            println!("\nRender failed: {e}");
            Err(anyhow::anyhow!("Render failed: {e}"))
        }
    }
}
