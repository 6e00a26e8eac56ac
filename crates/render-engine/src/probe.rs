//! Media inspection via ffprobe.

use std::path::Path;
use std::process::Command;

use reelsmith_common::{ReelError, ReelResult};
use reelsmith_timeline_model::FrameSize;
use serde::Deserialize;

/// What the renderer needs to know about a source file.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ProbeInfo {
    pub duration_secs: Option<f64>,
    pub frame: Option<FrameSize>,
    pub has_audio: bool,
}

/// Inspects media files.
pub trait MediaProbe {
    fn probe(&self, path: &Path) -> ReelResult<ProbeInfo>;
}

/// Runs `ffprobe -print_format json`.
pub struct FfprobeProbe {
    binary: String,
}

impl FfprobeProbe {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for FfprobeProbe {
    fn default() -> Self {
        Self::new("ffprobe")
    }
}

impl MediaProbe for FfprobeProbe {
    fn probe(&self, path: &Path) -> ReelResult<ProbeInfo> {
        let out = Command::new(&self.binary)
            .args([
                "-v",
                "error",
                "-print_format",
                "json",
                "-show_streams",
                "-show_format",
            ])
            .arg(path)
            .output()
            .map_err(|e| ReelError::render(format!("failed to run {}: {e}", self.binary)))?;
        if !out.status.success() {
            return Err(ReelError::render(format!(
                "ffprobe failed for '{}': {}",
                path.display(),
                String::from_utf8_lossy(&out.stderr).trim()
            )));
        }
        parse_probe_output(&out.stdout)
    }
}

#[derive(Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<String>,
}

#[derive(Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

#[derive(Deserialize)]
struct ProbeOut {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

/// Parse ffprobe's JSON report.
pub fn parse_probe_output(json: &[u8]) -> ReelResult<ProbeInfo> {
    let parsed: ProbeOut = serde_json::from_slice(json)
        .map_err(|e| ReelError::render(format!("ffprobe json parse failed: {e}")))?;

    let video = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"));
    let frame = video.and_then(|s| match (s.width, s.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => Some(FrameSize::new(w, h)),
        _ => None,
    });

    let duration_secs = parsed
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .or_else(|| parsed.streams.iter().find_map(|s| s.duration.as_deref()))
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0);

    let has_audio = parsed
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));

    Ok(ProbeInfo {
        duration_secs,
        frame,
        has_audio,
    })
}
