//! Notable timestamps, music blocks and music cue sheets.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A narratively significant instant in the source media.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotableTimestamp {
    pub seconds: f64,

    #[serde(default)]
    pub reason: String,
}

impl NotableTimestamp {
    pub fn new(seconds: f64, reason: impl Into<String>) -> Self {
        Self {
            seconds,
            reason: reason.into(),
        }
    }
}

/// Role of a pre-rendered music block in the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MusicBlockKind {
    /// Steady bed used to fill time.
    Baseline,
    /// Tension build leading into a notable moment.
    Rise,
    /// Emphasis landing after a rise.
    Climax,
}

impl MusicBlockKind {
    pub const ALL: [MusicBlockKind; 3] = [
        MusicBlockKind::Baseline,
        MusicBlockKind::Rise,
        MusicBlockKind::Climax,
    ];

    /// Length the block is generated at unless the caller overrides it.
    pub fn default_duration_secs(self) -> f64 {
        match self {
            MusicBlockKind::Baseline => 200.0,
            MusicBlockKind::Rise => 60.0,
            MusicBlockKind::Climax => 30.0,
        }
    }

    /// Text appended to the caller's music prompt for this role.
    pub fn prompt_suffix(self) -> &'static str {
        match self {
            MusicBlockKind::Baseline => "Rhythmic, steady score for an approaching battle.",
            MusicBlockKind::Rise => {
                "Rising tension, building suspense to a coming climax. Something momentous is just about to happen!"
            }
            MusicBlockKind::Climax => {
                "Climactic, finale music signaling a grand crescendo. Exciting and high energy."
            }
        }
    }

    pub fn file_stem(self) -> &'static str {
        match self {
            MusicBlockKind::Baseline => "baseline",
            MusicBlockKind::Rise => "rise",
            MusicBlockKind::Climax => "climax",
        }
    }
}

/// A generated music block; immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MusicBlock {
    pub kind: MusicBlockKind,
    pub source: PathBuf,
    pub natural_duration_secs: f64,
}

/// One placed block in a cue sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CueEntry {
    pub kind: MusicBlockKind,
    pub source: PathBuf,
    pub start_secs: f64,
    pub duration_secs: f64,
    pub fade_in_secs: f64,
    pub fade_out_secs: f64,
}

impl CueEntry {
    pub fn end_secs(&self) -> f64 {
        self.start_secs + self.duration_secs
    }
}

/// Back-to-back music blocks with crossfaded interior boundaries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CueSheet {
    pub entries: Vec<CueEntry>,

    /// Linear gain applied to every block when mixed under the program.
    pub volume_scale: f64,
}

impl CueSheet {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// End of the last block.
    pub fn total_duration_secs(&self) -> f64 {
        self.entries.last().map(|e| e.end_secs()).unwrap_or(0.0)
    }

    pub fn count(&self, kind: MusicBlockKind) -> usize {
        self.entries.iter().filter(|e| e.kind == kind).count()
    }

    pub fn kinds(&self) -> Vec<MusicBlockKind> {
        self.entries.iter().map(|e| e.kind).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_block_durations() {
        assert_eq!(MusicBlockKind::Baseline.default_duration_secs(), 200.0);
        assert_eq!(MusicBlockKind::Rise.default_duration_secs(), 60.0);
        assert_eq!(MusicBlockKind::Climax.default_duration_secs(), 30.0);
    }

    #[test]
    fn test_empty_sheet_has_zero_duration() {
        let sheet = CueSheet::default();
        assert!(sheet.is_empty());
        assert_eq!(sheet.total_duration_secs(), 0.0);
    }

    #[test]
    fn test_notable_reason_defaults_to_empty() {
        let ts: NotableTimestamp = serde_json::from_str(r#"{"seconds": 42.5}"#).unwrap();
        assert_eq!(ts.seconds, 42.5);
        assert!(ts.reason.is_empty());
    }
}
