//! ffmpeg process backend.

use std::io::{BufRead, BufReader, Read};
use std::path::PathBuf;
use std::process::{Child, ChildStdout, Command, ExitStatus, Stdio};
use std::thread::JoinHandle;
use std::time::Instant;

use reelsmith_common::{ReelError, ReelResult, RenderDefaults};

/// Progress callback for rendering.
pub type ProgressCallback = Box<dyn Fn(RenderProgress) + Send>;

/// Render progress report.
#[derive(Debug, Clone)]
pub struct RenderProgress {
    /// Current progress [0.0, 1.0].
    pub progress: f64,

    /// Estimated time remaining in seconds.
    pub eta_secs: f64,

    pub stage: RenderStage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStage {
    Preparing,
    Rendering,
    Finalizing,
    Complete,
}

/// A fully assembled ffmpeg invocation.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    /// Arguments after the binary name.
    pub args: Vec<String>,

    /// Expected output length, used for progress.
    pub expected_duration_secs: f64,

    pub output: PathBuf,
}

/// Encoder settings shared by every render path.
#[derive(Debug, Clone)]
pub struct EncodeSettings {
    pub crf: u8,
    pub preset: String,
    pub audio_codec: String,
    pub audio_bitrate: String,
    pub font_file: Option<PathBuf>,
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self::from(&RenderDefaults::default())
    }
}

impl From<&RenderDefaults> for EncodeSettings {
    fn from(render: &RenderDefaults) -> Self {
        Self {
            crf: render.crf,
            preset: render.preset.clone(),
            audio_codec: render.audio_codec.clone(),
            audio_bitrate: render.audio_bitrate.clone(),
            font_file: render.font_file.clone(),
        }
    }
}

impl EncodeSettings {
    pub fn codec_args(&self) -> Vec<String> {
        vec![
            "-c:v".to_string(),
            "libx264".to_string(),
            "-preset".to_string(),
            self.preset.clone(),
            "-crf".to_string(),
            self.crf.to_string(),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
            "-c:a".to_string(),
            self.audio_codec.clone(),
            "-b:a".to_string(),
            self.audio_bitrate.clone(),
            "-movflags".to_string(),
            "+faststart".to_string(),
        ]
    }
}

/// Leading arguments common to every invocation.
pub fn base_args() -> Vec<String> {
    vec![
        "-y".to_string(),
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-nostats".to_string(),
        "-progress".to_string(),
        "pipe:1".to_string(),
    ]
}

/// Trait for render backends.
pub trait RenderBackend: Send {
    /// Execute one command to completion.
    fn run(&mut self, command: &FfmpegCommand, progress: Option<&ProgressCallback>)
        -> ReelResult<()>;

    /// Check if this backend is available on the system.
    fn is_available(&self) -> bool;

    /// Backend name.
    fn name(&self) -> &str;
}

/// Where `binary` resolves, by name on `PATH` or as a path.
pub fn locate_binary(binary: &str) -> Option<PathBuf> {
    which::which(binary).ok()
}

/// Runs the ffmpeg binary, reading `-progress pipe:1` output.
pub struct FfmpegBackend {
    binary: String,
}

impl FfmpegBackend {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for FfmpegBackend {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl RenderBackend for FfmpegBackend {
    fn run(
        &mut self,
        command: &FfmpegCommand,
        progress: Option<&ProgressCallback>,
    ) -> ReelResult<()> {
        tracing::debug!(args = ?command.args, "Running ffmpeg");
        let started = Instant::now();
        let (process, stdout) = EncodeProcess::spawn(&self.binary, &command.args)?;
        tracing::info!(
            pid = process.id(),
            output = %command.output.display(),
            "ffmpeg process started"
        );

        let mut reader = BufReader::new(stdout);
        let mut raw = Vec::new();
        let mut out_time_secs = 0.0;
        loop {
            raw.clear();
            let read = reader
                .read_until(b'\n', &mut raw)
                .map_err(|e| ReelError::render(format!("Failed reading ffmpeg progress: {e}")))?;
            if read == 0 {
                break;
            }
            let line = String::from_utf8_lossy(&raw);
            match line.trim().split_once('=') {
                Some(("out_time_us" | "out_time_ms", value)) => {
                    if let Ok(us) = value.parse::<f64>() {
                        out_time_secs = us / 1_000_000.0;
                    }
                }
                Some(("progress", state)) => {
                    if let Some(cb) = progress {
                        cb(encode_progress(
                            out_time_secs,
                            command.expected_duration_secs,
                            started.elapsed().as_secs_f64(),
                            state == "end",
                        ));
                    }
                }
                _ => {}
            }
        }
        drop(reader);

        let (status, log) = process.finish()?;
        if !status.success() {
            return Err(ReelError::render(format!(
                "ffmpeg failed (status {status}): {}",
                log.trim()
            )));
        }

        if let Some(cb) = progress {
            cb(RenderProgress {
                progress: 1.0,
                eta_secs: 0.0,
                stage: RenderStage::Complete,
            });
        }
        tracing::info!(
            elapsed_secs = started.elapsed().as_secs_f64(),
            output = %command.output.display(),
            "ffmpeg finished"
        );
        Ok(())
    }

    fn is_available(&self) -> bool {
        locate_binary(&self.binary).is_some()
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

/// A running encode. Dropped before [`EncodeProcess::finish`], it kills and
/// reaps the process.
struct EncodeProcess {
    child: Child,
    stderr: Option<JoinHandle<String>>,
    reaped: bool,
}

impl EncodeProcess {
    fn spawn(binary: &str, args: &[String]) -> ReelResult<(Self, ChildStdout)> {
        let mut child = Command::new(binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ReelError::render(format!("Failed to start {binary}: {e}")))?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let mut process = Self {
            child,
            stderr: None,
            reaped: false,
        };
        let (Some(stdout), Some(stderr)) = (stdout, stderr) else {
            return Err(ReelError::render("ffmpeg output pipes were not captured"));
        };

        // ffmpeg stalls once the stderr pipe fills.
        process.stderr = Some(std::thread::spawn(move || {
            let mut log = String::new();
            match BufReader::new(stderr).read_to_string(&mut log) {
                Ok(_) => log,
                Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
            }
        }));
        Ok((process, stdout))
    }

    fn id(&self) -> u32 {
        self.child.id()
    }

    /// Wait for exit and collect stderr.
    fn finish(mut self) -> ReelResult<(ExitStatus, String)> {
        let status = self
            .child
            .wait()
            .map_err(|e| ReelError::render(format!("Failed to wait on ffmpeg: {e}")))?;
        self.reaped = true;
        Ok((status, self.take_log()))
    }

    fn take_log(&mut self) -> String {
        match self.stderr.take() {
            Some(handle) => handle
                .join()
                .unwrap_or_else(|_| "<stderr reader panicked>".to_string()),
            None => String::new(),
        }
    }
}

impl Drop for EncodeProcess {
    fn drop(&mut self) {
        if !self.reaped {
            let pid = self.child.id();
            if let Err(err) = self.child.kill() {
                tracing::debug!(pid, error = %err, "ffmpeg already exited");
            }
            match self.child.wait() {
                Ok(status) => tracing::warn!(pid, %status, "Abandoned ffmpeg process reaped"),
                Err(err) => tracing::warn!(pid, error = %err, "Failed to reap ffmpeg process"),
            }
        }
        // The pipe closes with the process, so the reader returns.
        self.take_log();
    }
}

/// Progress of an encode that has written `out_time_secs` of an
/// `expected_secs` output.
fn encode_progress(
    out_time_secs: f64,
    expected_secs: f64,
    elapsed_secs: f64,
    ended: bool,
) -> RenderProgress {
    if ended {
        return RenderProgress {
            progress: 1.0,
            eta_secs: 0.0,
            stage: RenderStage::Finalizing,
        };
    }
    let progress = if expected_secs > 0.0 {
        (out_time_secs / expected_secs).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let eta_secs = if progress > 0.0 {
        (elapsed_secs * (1.0 - progress) / progress).max(0.0)
    } else {
        0.0
    };
    RenderProgress {
        progress,
        eta_secs,
        stage: RenderStage::Rendering,
    }
}
