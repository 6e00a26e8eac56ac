//! Check external tools and configuration.

use std::path::Path;

use reelsmith_common::{config_file_path, AppConfig};
use reelsmith_render_engine::locate_binary;

pub fn run(config: &AppConfig, explicit: Option<&Path>) -> anyhow::Result<()> {
    println!("Reelsmith System Check");
    println!("{}", "=".repeat(50));

    let config_path = explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(config_file_path);
    if config_path.exists() {
        println!("[OK] Config: {}", config_path.display());
    } else {
        println!("[WARN] Config: {} not found, using defaults", config_path.display());
    }

    let tools = [
        ("ffmpeg", config.render.ffmpeg_bin.as_str(), true),
        ("ffprobe", config.render.ffprobe_bin.as_str(), true),
        ("speech recognition", config.services.asr_command.as_str(), false),
    ];
    let mut required_ok = true;
    for (label, binary, required) in tools {
        if let Some(found) = locate_binary(binary) {
            println!("[OK] {label}: {}", found.display());
        } else if required {
            required_ok = false;
            println!("[MISSING] {label}: {binary} not found in PATH");
        } else {
            println!("[WARN] {label}: {binary} not found; captions unavailable");
        }
    }

    match &config.render.font_file {
        Some(font) if font.is_file() => println!("[OK] Font: {}", font.display()),
        Some(font) => println!("[WARN] Font: {} not found", font.display()),
        None => println!("[OK] Font: ffmpeg default"),
    }

    match &config.services.analysis_endpoint {
        Some(endpoint) => println!("[OK] Analysis endpoint: {endpoint}"),
        None => println!("[WARN] Analysis endpoint: not configured"),
    }
    match &config.services.music_endpoint {
        Some(endpoint) => println!("[OK] Music endpoint: {endpoint}"),
        None => println!("[WARN] Music endpoint: not configured; scoring needs provided blocks"),
    }

    println!(
        "     Concurrent renders: {}",
        config.workers.max_concurrent_renders.max(1)
    );
    println!("     Work directory: {}", config.work_dir.display());

    println!();
    if required_ok {
        println!("All required tools are available. Reelsmith is ready.");
    } else {
        println!("Some required tools are missing. See above.");
    }

    Ok(())
}
