//! Clip resolution.
//!
//! Turns asset descriptors into clip handles: the content key is joined to
//! the path prefix, the file is probed for duration and frame size, text
//! cards are read, and Vocal clips are transcribed.

use std::path::PathBuf;

use reelsmith_audio_ai::Transcriber;
use reelsmith_common::{ReelError, ReelResult};
use reelsmith_timeline_model::{AssetDescriptor, ClipHandle, MediaSource, MediaType};

use crate::probe::MediaProbe;

pub struct ClipResolver<'a> {
    probe: &'a dyn MediaProbe,
    transcriber: Option<&'a dyn Transcriber>,
    prefix: String,
    language: String,
}

impl<'a> ClipResolver<'a> {
    pub fn new(probe: &'a dyn MediaProbe, prefix: impl Into<String>) -> Self {
        Self {
            probe,
            transcriber: None,
            prefix: prefix.into(),
            language: "en".to_string(),
        }
    }

    /// Transcribe Vocal clips with `transcriber` in `language`.
    pub fn with_transcriber(mut self, transcriber: &'a dyn Transcriber, language: &str) -> Self {
        self.transcriber = Some(transcriber);
        self.language = language.to_string();
        self
    }

    pub fn path_for(&self, descriptor: &AssetDescriptor) -> PathBuf {
        PathBuf::from(format!("{}{}", self.prefix, descriptor.content_key))
    }

    /// Resolve every descriptor. All paths are checked before any file is
    /// probed, so a missing asset fails the job up front.
    pub fn resolve_all(&self, descriptors: &[AssetDescriptor]) -> ReelResult<Vec<ClipHandle>> {
        for descriptor in descriptors {
            let path = self.path_for(descriptor);
            if !path.is_file() {
                return Err(ReelError::missing_asset(path));
            }
        }
        let clips = descriptors
            .iter()
            .map(|d| self.resolve(d))
            .collect::<ReelResult<Vec<_>>>()?;
        tracing::info!(clips = clips.len(), "Resolved clips");
        Ok(clips)
    }

    pub fn resolve(&self, descriptor: &AssetDescriptor) -> ReelResult<ClipHandle> {
        let path = self.path_for(descriptor);
        if !path.is_file() {
            return Err(ReelError::missing_asset(path));
        }

        if descriptor.media_type == MediaType::Text {
            let text = std::fs::read_to_string(&path)?;
            let source = MediaSource {
                path,
                frame: None,
                has_audio: false,
                text: Some(text.trim().to_string()),
            };
            return Ok(ClipHandle::new(descriptor.clone(), source, None));
        }

        let info = self.probe.probe(&path)?;
        let natural = match descriptor.media_type {
            MediaType::Image => None,
            _ => Some(info.duration_secs.ok_or_else(|| {
                ReelError::render(format!("no duration for {}", path.display()))
            })?),
        };

        let mut clip = ClipHandle::new(
            descriptor.clone(),
            MediaSource {
                path: path.clone(),
                frame: info.frame,
                has_audio: info.has_audio,
                text: None,
            },
            natural,
        );

        if descriptor.media_type == MediaType::Vocal {
            if let Some(transcriber) = self.transcriber {
                clip.subtitle_segments = transcriber.transcribe(&path, &self.language)?.segments;
            }
        }

        tracing::debug!(
            key = %descriptor.content_key,
            media_type = %descriptor.media_type,
            duration = ?natural,
            "Resolved clip"
        );
        Ok(clip)
    }
}
