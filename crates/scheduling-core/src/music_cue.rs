//! Music cue scheduling.
//!
//! Lays Baseline, Rise and Climax blocks back to back so that a Rise lands
//! just before each notable moment, with Baseline filling the rest.

use reelsmith_common::{ReelError, ReelResult};
use reelsmith_timeline_model::{CueEntry, CueSheet, MusicBlock, MusicBlockKind};
use serde::{Deserialize, Serialize};

use crate::notable::{dedupe_timestamps, MIN_SPACING_SECS};

/// Cue scheduling constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CueConfig {
    /// Timestamps closer than this to the last retained one are dropped.
    pub min_spacing_secs: f64,

    /// Crossfade window at each interior boundary.
    pub crossfade_secs: f64,

    /// A Climax follows the Rise for every retained timestamp whose index
    /// is a multiple of this.
    pub climax_every: usize,

    /// Gain applied to the blocks when mixed under the source audio.
    pub volume_scale: f64,
}

impl Default for CueConfig {
    fn default() -> Self {
        Self {
            min_spacing_secs: MIN_SPACING_SECS,
            crossfade_secs: 3.0,
            climax_every: 5,
            volume_scale: 0.2,
        }
    }
}

/// The three blocks a score is built from.
#[derive(Debug, Clone)]
pub struct ScoreBlocks {
    pub baseline: MusicBlock,
    pub rise: MusicBlock,
    pub climax: MusicBlock,
}

impl ScoreBlocks {
    fn get(&self, kind: MusicBlockKind) -> &MusicBlock {
        match kind {
            MusicBlockKind::Baseline => &self.baseline,
            MusicBlockKind::Rise => &self.rise,
            MusicBlockKind::Climax => &self.climax,
        }
    }

    fn validate(&self) -> ReelResult<()> {
        for kind in MusicBlockKind::ALL {
            let d = self.get(kind).natural_duration_secs;
            if !(d.is_finite() && d > 0.0) {
                return Err(ReelError::scheduling(format!(
                    "{} block has non-positive duration {d}",
                    kind.file_stem()
                )));
            }
        }
        Ok(())
    }
}

/// Builds cue sheets from notable timestamps.
pub struct MusicCueScheduler {
    config: CueConfig,
}

impl MusicCueScheduler {
    pub fn new(config: CueConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(CueConfig::default())
    }

    pub fn config(&self) -> &CueConfig {
        &self.config
    }

    /// Block sequence for the given timestamps. The result always reaches
    /// at least `total_secs`; the caller truncates.
    pub fn schedule(
        &self,
        blocks: &ScoreBlocks,
        notable_secs: &[f64],
        total_secs: f64,
    ) -> ReelResult<CueSheet> {
        blocks.validate()?;

        let retained = dedupe_timestamps(notable_secs, self.config.min_spacing_secs);
        let base = blocks.baseline.natural_duration_secs;
        let rise = blocks.rise.natural_duration_secs;
        let climax = blocks.climax.natural_duration_secs;

        let mut kinds: Vec<MusicBlockKind> = vec![];
        let mut cursor = 0.0f64;

        for (i, &t) in retained.iter().enumerate() {
            if cursor > t {
                tracing::trace!(timestamp = t, cursor, "timestamp already passed");
                continue;
            }
            let fill = ((t - cursor) / base).floor() as usize;
            for _ in 0..fill {
                kinds.push(MusicBlockKind::Baseline);
                cursor += base;
            }
            if cursor < t {
                kinds.push(MusicBlockKind::Rise);
                cursor += rise;
            }
            if self.config.climax_every > 0 && i % self.config.climax_every == 0 {
                kinds.push(MusicBlockKind::Climax);
                cursor += climax;
            }
        }

        if cursor < total_secs {
            let pad = ((total_secs - cursor) / base).ceil() as usize;
            for _ in 0..pad {
                kinds.push(MusicBlockKind::Baseline);
                cursor += base;
            }
        }

        let sheet = self.lay_out(blocks, &kinds);
        tracing::debug!(
            timestamps = retained.len(),
            blocks = sheet.entries.len(),
            total = sheet.total_duration_secs(),
            "scheduled music cues"
        );
        Ok(sheet)
    }

    /// Place blocks back to back and set the crossfades.
    fn lay_out(&self, blocks: &ScoreBlocks, kinds: &[MusicBlockKind]) -> CueSheet {
        let last = kinds.len().saturating_sub(1);
        let mut start_secs = 0.0;
        let entries = kinds
            .iter()
            .enumerate()
            .map(|(k, &kind)| {
                let block = blocks.get(kind);
                let duration_secs = block.natural_duration_secs;
                let fade = self.config.crossfade_secs.min(duration_secs / 2.0);
                let entry = CueEntry {
                    kind,
                    source: block.source.clone(),
                    start_secs,
                    duration_secs,
                    fade_in_secs: if k > 0 { fade } else { 0.0 },
                    fade_out_secs: if k < last { fade } else { 0.0 },
                };
                start_secs += duration_secs;
                entry
            })
            .collect();

        CueSheet {
            entries,
            volume_scale: self.config.volume_scale,
        }
    }
}
