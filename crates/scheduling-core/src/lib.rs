//! Reelsmith Scheduling Core
//!
//! Turns resolved clips into a timed render plan and notable timestamps
//! into a music cue sheet:
//! - **Sequence:** Chain render-sequence groups end-to-start
//! - **Layers:** Visual and audio stacks, mixing and short-form treatment
//! - **Duration & Geometry:** Program length, frame profile and clip fits
//! - **Captions:** Word-level caption cues from transcripts
//! - **Music Cues:** Baseline/rise/climax block placement
//! - **Planner:** Runs the passes above in order and emits a `RenderPlan`
//!
//! This crate is pure computation: no I/O and no external processes.
//! Randomized styling takes the RNG as a parameter.

pub mod captions;
pub mod duration;
pub mod geometry;
pub mod layers;
pub mod music_cue;
pub mod notable;
pub mod planner;
pub mod sequence;

pub use layers::LayerComposer;
pub use music_cue::MusicCueScheduler;
pub use planner::ProgramPlanner;
