//! Music generation.
//!
//! A generation model produces short windows of stereo audio. Longer pieces
//! are built by feeding the tail of the previous window back as context and
//! linearly crossfading each new window over half its length onto the end
//! of the piece, then trimming to the requested duration.

use std::io::Write;
use std::path::Path;

use reelsmith_common::{ReelError, ReelResult, ServiceConfig};
use reelsmith_timeline_model::{MusicBlock, MusicBlockKind};
use serde::{Deserialize, Serialize};

pub type StereoFrame = [f32; 2];

/// Generated stereo audio.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedAudio {
    pub sample_rate: u32,
    pub frames: Vec<StereoFrame>,
}

impl GeneratedAudio {
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames.len() as f64 / f64::from(self.sample_rate)
    }
}

/// Produces music of a requested length from a text prompt.
pub trait MusicGenerator {
    fn sample_rate(&self) -> u32;
    fn generate(&self, prompt: &str, duration_secs: f64) -> ReelResult<GeneratedAudio>;
}

/// A model producing one window of audio at a time.
pub trait WindowModel {
    fn sample_rate(&self) -> u32;

    /// Next window, conditioned on the tail of the previous one if given.
    fn next_window(&self, prompt: &str, context: Option<&[StereoFrame]>)
        -> ReelResult<Vec<StereoFrame>>;
}

/// Stitching parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlidingWindowConfig {
    /// Seconds of previous output fed back as context.
    pub context_secs: f64,

    /// Fraction of each new window crossfaded onto the piece.
    pub overlap_ratio: f64,
}

impl Default for SlidingWindowConfig {
    fn default() -> Self {
        Self {
            context_secs: 20.0,
            overlap_ratio: 0.5,
        }
    }
}

/// Builds arbitrary-length pieces from a [`WindowModel`].
pub struct SlidingWindowGenerator<M> {
    model: M,
    config: SlidingWindowConfig,
}

impl<M: WindowModel> SlidingWindowGenerator<M> {
    pub fn new(model: M, config: SlidingWindowConfig) -> Self {
        Self { model, config }
    }

    fn context_frames(&self) -> usize {
        (self.config.context_secs * f64::from(self.model.sample_rate())).round() as usize
    }

    fn window(&self, prompt: &str, context: Option<&[StereoFrame]>) -> ReelResult<Vec<StereoFrame>> {
        let window = self.model.next_window(prompt, context)?;
        if window.is_empty() {
            return Err(ReelError::generation("model returned an empty window"));
        }
        Ok(window)
    }
}

impl<M: WindowModel> MusicGenerator for SlidingWindowGenerator<M> {
    fn sample_rate(&self) -> u32 {
        self.model.sample_rate()
    }

    fn generate(&self, prompt: &str, duration_secs: f64) -> ReelResult<GeneratedAudio> {
        let sample_rate = self.model.sample_rate();
        if !(duration_secs.is_finite() && duration_secs > 0.0) {
            return Err(ReelError::generation(format!(
                "invalid music duration {duration_secs}"
            )));
        }
        let target = (duration_secs * f64::from(sample_rate)).round() as usize;
        let context_len = self.context_frames();

        let mut piece = self.window(prompt, None)?;
        let mut context = tail(&piece, context_len).to_vec();
        let mut windows = 1usize;

        while piece.len() < target {
            let next = self.window(prompt, Some(&context))?;
            let overlap = ((next.len() as f64 * self.config.overlap_ratio) as usize)
                .min(piece.len())
                .min(next.len());
            crossfade_into(&mut piece, &next, overlap);
            context = tail(&next, context_len).to_vec();
            windows += 1;
        }

        piece.truncate(target);
        tracing::info!(
            windows,
            frames = piece.len(),
            duration_secs,
            "Generated music"
        );
        Ok(GeneratedAudio {
            sample_rate,
            frames: piece,
        })
    }
}

fn tail(frames: &[StereoFrame], len: usize) -> &[StereoFrame] {
    &frames[frames.len().saturating_sub(len)..]
}

/// Linearly crossfade the first `overlap` frames of `next` over the last
/// `overlap` frames of `piece`, then append the rest of `next`.
pub fn crossfade_into(piece: &mut Vec<StereoFrame>, next: &[StereoFrame], overlap: usize) {
    let overlap = overlap.min(piece.len()).min(next.len());
    let base = piece.len() - overlap;
    for i in 0..overlap {
        let w = if overlap == 1 {
            1.0
        } else {
            i as f32 / (overlap - 1) as f32
        };
        for c in 0..2 {
            piece[base + i][c] = piece[base + i][c] * (1.0 - w) + next[i][c] * w;
        }
    }
    piece.extend_from_slice(&next[overlap..]);
}

/// Write 16-bit PCM stereo WAV.
pub fn write_wav(audio: &GeneratedAudio, path: &Path) -> ReelResult<()> {
    let data_len = (audio.frames.len() * 4) as u32;
    let byte_rate = audio.sample_rate * 4;

    let mut bytes: Vec<u8> = Vec::with_capacity(44 + data_len as usize);
    bytes.extend_from_slice(b"RIFF");
    bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
    bytes.extend_from_slice(b"WAVE");
    bytes.extend_from_slice(b"fmt ");
    bytes.extend_from_slice(&16u32.to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes()); // PCM
    bytes.extend_from_slice(&2u16.to_le_bytes());
    bytes.extend_from_slice(&audio.sample_rate.to_le_bytes());
    bytes.extend_from_slice(&byte_rate.to_le_bytes());
    bytes.extend_from_slice(&4u16.to_le_bytes());
    bytes.extend_from_slice(&16u16.to_le_bytes());
    bytes.extend_from_slice(b"data");
    bytes.extend_from_slice(&data_len.to_le_bytes());
    for frame in &audio.frames {
        for &sample in frame {
            let s = (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)).round() as i16;
            bytes.extend_from_slice(&s.to_le_bytes());
        }
    }

    let mut file = std::fs::File::create(path)?;
    file.write_all(&bytes)?;
    Ok(())
}

/// Prompt for one score block.
pub fn block_prompt(prompt: &str, kind: MusicBlockKind) -> String {
    format!("{} {}", prompt.trim(), kind.prompt_suffix())
}

/// Generate Baseline, Rise and Climax blocks into `out_dir`.
pub fn generate_score_blocks(
    generator: &dyn MusicGenerator,
    prompt: &str,
    out_dir: &Path,
) -> ReelResult<Vec<MusicBlock>> {
    std::fs::create_dir_all(out_dir)?;
    let mut blocks = Vec::with_capacity(MusicBlockKind::ALL.len());
    for kind in MusicBlockKind::ALL {
        let audio = generator.generate(&block_prompt(prompt, kind), kind.default_duration_secs())?;
        let source = out_dir.join(format!("{}.wav", kind.file_stem()));
        write_wav(&audio, &source)?;
        tracing::info!(block = kind.file_stem(), path = %source.display(), "Wrote score block");
        blocks.push(MusicBlock {
            kind,
            source,
            natural_duration_secs: audio.duration_secs(),
        });
    }
    Ok(blocks)
}

#[derive(Serialize)]
struct WindowRequest<'a> {
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<Vec<f32>>,
}

#[derive(Deserialize)]
struct WindowResponse {
    sample_rate: u32,
    /// Interleaved stereo.
    samples: Vec<f32>,
}

/// Window model reached over HTTP.
///
/// Posts `{"prompt", "context"}` with interleaved stereo context and
/// expects `{"sample_rate", "samples"}`.
pub struct HttpWindowModel {
    client: reqwest::blocking::Client,
    endpoint: String,
    sample_rate: u32,
}

impl HttpWindowModel {
    pub fn new(endpoint: impl Into<String>, sample_rate: u32) -> ReelResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("reelsmith/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ReelError::generation(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            sample_rate,
        })
    }

    /// `None` when no music endpoint is configured.
    pub fn from_services(services: &ServiceConfig) -> ReelResult<Option<Self>> {
        match services.music_endpoint.as_deref() {
            Some(endpoint) => Self::new(endpoint, services.music_sample_rate).map(Some),
            None => Ok(None),
        }
    }
}

impl WindowModel for HttpWindowModel {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn next_window(
        &self,
        prompt: &str,
        context: Option<&[StereoFrame]>,
    ) -> ReelResult<Vec<StereoFrame>> {
        let request = WindowRequest {
            prompt,
            context: context.map(|frames| frames.iter().flatten().copied().collect()),
        };
        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .map_err(|e| ReelError::generation(format!("music request failed: {e}")))?;
        if !response.status().is_success() {
            return Err(ReelError::generation(format!(
                "music service returned status {}",
                response.status()
            )));
        }
        let body: WindowResponse = response
            .json()
            .map_err(|e| ReelError::generation(format!("unreadable music response: {e}")))?;
        if body.sample_rate != self.sample_rate {
            return Err(ReelError::generation(format!(
                "music service sample rate {} does not match configured {}",
                body.sample_rate, self.sample_rate
            )));
        }
        Ok(body
            .samples
            .chunks_exact(2)
            .map(|c| [c[0], c[1]])
            .collect())
    }
}
