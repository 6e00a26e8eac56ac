//! Transcribe speech in a media file.

use std::path::PathBuf;

use reelsmith_audio_ai::{
    save_subtitles, save_transcript, segment_cues, word_cues, CommandTranscriber, Transcriber,
    TranscriptionConfig,
};
use reelsmith_common::AppConfig;

pub fn run(
    config: &AppConfig,
    media: PathBuf,
    language: String,
    output: Option<PathBuf>,
    words: bool,
) -> anyhow::Result<()> {
    let transcriber = CommandTranscriber::new(TranscriptionConfig::from(&config.services));
    let transcript = transcriber
        .transcribe(&media, &language)
        .map_err(|e| anyhow::anyhow!("Failed to transcribe {}: {e}", media.display()))?;

    let Some(out) = output else {
        println!("{}", serde_json::to_string_pretty(&transcript)?);
        return Ok(());
    };

    match out.extension().and_then(|e| e.to_str()) {
        Some("srt") | Some("vtt") => {
            let cues = if words {
                word_cues(&transcript.segments)
            } else {
                segment_cues(&transcript.segments)
            };
            save_subtitles(&cues, &out)?;
            println!("Wrote {} subtitle cues to {}", cues.len(), out.display());
        }
        Some("json") | None => {
            save_transcript(&transcript, &out)?;
            println!(
                "Wrote transcript ({} segments) to {}",
                transcript.segments.len(),
                out.display()
            );
        }
        Some(other) => {
            return Err(anyhow::anyhow!(
                "Unknown output format: .{other}. Use: .json, .srt, .vtt"
            ));
        }
    }

    Ok(())
}
