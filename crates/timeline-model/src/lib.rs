//! Reelsmith Timeline Model
//!
//! Defines the data contracts shared by the scheduler and the renderer:
//! - **Assets:** Tagged media descriptors supplied by the caller
//! - **Clips:** Resolved media handles whose timing is filled in by scheduling
//! - **Transcripts:** Word-timed ASR segments used for captions
//! - **Cues:** Notable timestamps, music blocks, and the resulting cue sheet
//! - **Plans:** The fully timed, geometry-resolved render plan
//! - **Requests:** Job documents accepted by the CLI and worker
//!
//! All times are in seconds on the program timeline unless a field says
//! otherwise. Pixel geometry is absolute, not normalized.

pub mod asset;
pub mod clip;
pub mod cue;
pub mod error;
pub mod geometry;
pub mod plan;
pub mod request;
pub mod transcript;

pub use asset::*;
pub use clip::*;
pub use cue::*;
pub use error::*;
pub use geometry::*;
pub use plan::*;
pub use request::*;
pub use transcript::*;
