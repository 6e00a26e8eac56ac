//! Reelsmith Render Engine
//!
//! Everything that touches media files or external processes:
//! resolving descriptors into clips, turning plans into ffmpeg
//! invocations, and running render jobs.
//!
//! # Pipeline Architecture
//!
//! ```text
//! RenderRequest ── validate ── ClipResolver (ffprobe, ASR)
//!                                   │
//!                                   ▼
//!                         ProgramPlanner (scheduling-core)
//!                                   │
//!                                   ▼
//!                     compositor: filter graph + inputs
//!                                   │
//!                                   ▼
//!                   FfmpegBackend ── <prefix><key>.mp4
//!                                   │ rename on success
//!                                   ▼
//!                            <prefix><key>
//! ```
//!
//! Sub-clip extraction and music scoring reuse the same backend and
//! compositor with their own command builders.

pub mod compositor;
pub mod export;
pub mod ffmpeg;
pub mod probe;
pub mod resolver;
pub mod scoring;
pub mod subclip;
pub mod transfer;
pub mod worker;

pub use export::*;
pub use ffmpeg::{
    locate_binary, EncodeSettings, FfmpegBackend, FfmpegCommand, ProgressCallback,
    RenderBackend, RenderProgress, RenderStage,
};
pub use probe::{FfprobeProbe, MediaProbe, ProbeInfo};
pub use resolver::ClipResolver;
pub use scoring::{scoring_job, ScoreRenderer};
pub use subclip::{subclip_job, CutOutcome, SubclipExtractor};
pub use transfer::TransferClient;
pub use worker::{JobOutcome, RenderJob, RenderWorkerPool};
