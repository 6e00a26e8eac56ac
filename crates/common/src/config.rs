//! Application configuration.

use crate::error::{ReelError, ReelResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory where render jobs stage their media.
    pub work_dir: PathBuf,

    /// Default encoding settings.
    pub render: RenderDefaults,

    /// External service endpoints and retry policy.
    pub services: ServiceConfig,

    /// Render worker pool settings.
    pub workers: WorkerConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Default encoding parameters handed to ffmpeg.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderDefaults {
    /// Frame rate for landscape programs.
    pub landscape_fps: u32,

    /// Frame rate for short-form (portrait) programs.
    pub short_form_fps: u32,

    /// Constant rate factor for libx264.
    pub crf: u8,

    /// x264 preset.
    pub preset: String,

    /// Audio codec for rendered programs.
    pub audio_codec: String,

    /// Audio bitrate, ffmpeg syntax (e.g. "192k").
    pub audio_bitrate: String,

    /// Font file used for drawtext overlays. Uses fontconfig default if unset.
    pub font_file: Option<PathBuf>,

    /// ffmpeg binary.
    pub ffmpeg_bin: String,

    /// ffprobe binary.
    pub ffprobe_bin: String,
}

/// External service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Speech-to-text command (whisper-compatible CLI).
    pub asr_command: String,

    /// ASR model name passed to the command.
    pub asr_model: String,

    /// Transcript analysis endpoint. Analysis is disabled when unset.
    pub analysis_endpoint: Option<String>,

    /// Environment variable holding the analysis API key.
    pub analysis_api_key_env: String,

    /// Maximum transcript segments per analysis request.
    pub analysis_batch_size: usize,

    /// JSON repair attempts before an analysis batch fails.
    pub analysis_max_retries: u32,

    /// Delay between repair attempts, in seconds.
    pub analysis_retry_delay_secs: u64,

    /// Music generation endpoint. Generation is disabled when unset.
    pub music_endpoint: Option<String>,

    /// Sample rate of generated music.
    pub music_sample_rate: u32,

    /// Timeout for presigned URL transfers, in seconds.
    pub transfer_timeout_secs: u64,
}

/// Render worker settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Maximum renders running at the same time.
    pub max_concurrent_renders: usize,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "reelsmith=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            work_dir: default_work_dir(),
            render: RenderDefaults::default(),
            services: ServiceConfig::default(),
            workers: WorkerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for RenderDefaults {
    fn default() -> Self {
        Self {
            landscape_fps: 30,
            short_form_fps: 60,
            crf: 18,
            preset: "medium".to_string(),
            audio_codec: "aac".to_string(),
            audio_bitrate: "192k".to_string(),
            font_file: None,
            ffmpeg_bin: "ffmpeg".to_string(),
            ffprobe_bin: "ffprobe".to_string(),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            asr_command: "whisper".to_string(),
            asr_model: "tiny".to_string(),
            analysis_endpoint: None,
            analysis_api_key_env: "REELSMITH_ANALYSIS_KEY".to_string(),
            analysis_batch_size: 100,
            analysis_max_retries: 3,
            analysis_retry_delay_secs: 15,
            music_endpoint: None,
            music_sample_rate: 32_000,
            transfer_timeout_secs: 300,
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_renders: 2,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match Self::load_from(&config_path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Failed to load config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Load config from an explicit path. Missing keys take their defaults.
    pub fn load_from(path: &Path) -> ReelResult<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| ReelError::config(format!("{}: {e}", path.display())))
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        self.save_to(&config_file_path())
    }

    /// Save config to an explicit path.
    pub fn save_to(&self, path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("reelsmith").join("config.json")
}

/// Default staging directory.
fn default_work_dir() -> PathBuf {
    let base = std::env::var("XDG_CACHE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".cache")
        });
    base.join("reelsmith").join("jobs")
}
