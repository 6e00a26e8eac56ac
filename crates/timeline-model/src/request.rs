//! Job documents accepted by the CLI and the render worker.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::asset::{AssetDescriptor, DescriptorList};
use crate::error::ModelError;
use crate::geometry::{AspectRatio, FitMode};

fn default_language() -> String {
    "en".to_string()
}

/// Read and parse a JSON job document.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, ModelError> {
    let json = std::fs::read_to_string(path).map_err(|e| ModelError::IoError {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(serde_json::from_str(&json)?)
}

/// Full-program render job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderRequest {
    /// Portrait, capped-duration output.
    pub is_short_form: bool,

    /// Title shown on the thumbnail card.
    #[serde(default)]
    pub thumbnail_text: String,

    /// Asset descriptors, inline or string-encoded.
    pub final_render_sequences: DescriptorList,

    /// ASR language code.
    #[serde(default = "default_language")]
    pub language: String,

    /// Rotating corner watermark. Empty disables it.
    #[serde(default)]
    pub watermark_text: String,

    /// Output key, relative to `filepath_prefix`.
    pub content_lookup_key: String,

    /// Prefix prepended to every content key and to the output key.
    #[serde(default)]
    pub filepath_prefix: String,
}

impl RenderRequest {
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        load_json(path)
    }

    pub fn descriptors(&self) -> Result<Vec<AssetDescriptor>, ModelError> {
        self.final_render_sequences.resolve()
    }

    /// Final location of the rendered program.
    pub fn output_path(&self) -> PathBuf {
        PathBuf::from(format!("{}{}", self.filepath_prefix, self.content_lookup_key))
    }

    /// Location written during encoding; renamed to `output_path` on success.
    pub fn staging_path(&self) -> PathBuf {
        PathBuf::from(format!(
            "{}{}.mp4",
            self.filepath_prefix, self.content_lookup_key
        ))
    }

    pub fn validate(&self) -> Vec<String> {
        let mut errors = vec![];
        if self.content_lookup_key.trim().is_empty() {
            errors.push("contentLookupKey must be a non-empty string.".to_string());
        }
        if let Err(e) = self.descriptors() {
            errors.push(format!("finalRenderSequences: {e}"));
        }
        errors
    }
}

/// One sub-clip to extract.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CutSpec {
    /// Destination: presigned PUT URL or local path.
    #[serde(default)]
    pub presigned_s3_url: String,

    pub start_time_seconds: i64,

    pub end_time_seconds: i64,
}

impl CutSpec {
    pub fn duration_secs(&self) -> f64 {
        (self.end_time_seconds - self.start_time_seconds) as f64
    }
}

/// Sub-clip extraction job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubclipRequest {
    /// Source: presigned GET URL or local path.
    #[serde(default)]
    pub source_video_url: String,

    /// "Portrait" or "Landscape".
    #[serde(default)]
    pub desired_ratio: String,

    pub allow_cropping: bool,

    #[serde(default)]
    pub enable_subtitles: bool,

    #[serde(rename = "Cuts", alias = "cuts", default)]
    pub cuts: Vec<CutSpec>,

    #[serde(default = "default_language")]
    pub language: String,
}

impl SubclipRequest {
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        load_json(path)
    }

    pub fn aspect(&self) -> Option<AspectRatio> {
        AspectRatio::parse_label(&self.desired_ratio)
    }

    pub fn fit_mode(&self) -> FitMode {
        FitMode::from_allow_cropping(self.allow_cropping)
    }

    /// Every problem with the request, in field order.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = vec![];

        if self.source_video_url.trim().is_empty() {
            errors.push("sourceVideoUrl must be a non-empty string.".to_string());
        }
        if self.aspect().is_none() {
            errors.push("desiredRatio must be either 'Portrait' or 'Landscape'.".to_string());
        }
        if self.cuts.is_empty() {
            errors.push("Cuts must be a non-empty list/array.".to_string());
        }

        for (i, cut) in self.cuts.iter().enumerate() {
            if cut.presigned_s3_url.trim().is_empty() {
                errors.push(format!(
                    "Cut at index {i}: presignedS3Url must be a non-empty string."
                ));
            }
            if cut.start_time_seconds < 0 {
                errors.push(format!(
                    "Cut at index {i}: startTimeSeconds must be a non-negative integer."
                ));
            }
            if cut.end_time_seconds < 0 {
                errors.push(format!(
                    "Cut at index {i}: endTimeSeconds must be a non-negative integer."
                ));
            }
            if cut.end_time_seconds <= cut.start_time_seconds {
                errors.push(format!(
                    "Cut at index {i}: endTimeSeconds ({}) must be greater than startTimeSeconds ({}).",
                    cut.end_time_seconds, cut.start_time_seconds
                ));
            }
        }

        errors
    }

    /// Validate, folding all problems into one error.
    pub fn validated(self) -> Result<Self, ModelError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(ModelError::ValidationError {
                message: errors.join(" "),
            })
        }
    }
}

/// Pre-rendered music blocks for scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreBlockSources {
    pub baseline: PathBuf,
    pub rise: PathBuf,
    pub climax: PathBuf,
}

/// Music scoring job: lay a cue sheet under an existing video.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringRequest {
    /// Source: presigned GET URL or local path.
    pub source: String,

    /// Destination: presigned PUT URL or local path.
    pub output: String,

    /// Notable instants, in seconds.
    #[serde(default)]
    pub notable_seconds: Vec<f64>,

    /// Add audio-energy peaks to the notable instants.
    #[serde(default)]
    pub detect_peaks: bool,

    /// Existing blocks. Generated from `music_prompt` when absent.
    #[serde(default)]
    pub blocks: Option<ScoreBlockSources>,

    #[serde(default)]
    pub music_prompt: Option<String>,
}

impl ScoringRequest {
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        load_json(path)
    }

    pub fn validate(&self) -> Vec<String> {
        let mut errors = vec![];
        if self.source.trim().is_empty() {
            errors.push("source must be a non-empty string.".to_string());
        }
        if self.output.trim().is_empty() {
            errors.push("output must be a non-empty string.".to_string());
        }
        if self.blocks.is_none() && self.music_prompt.is_none() {
            errors.push("either blocks or musicPrompt is required.".to_string());
        }
        if self.notable_seconds.iter().any(|s| !s.is_finite() || *s < 0.0) {
            errors.push("notableSeconds must be non-negative numbers.".to_string());
        }
        errors
    }
}
