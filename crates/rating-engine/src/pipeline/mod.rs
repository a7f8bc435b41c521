//! Pipeline module
//!
//! Runs pricing over a window of usage frames:
//! - RatingPipeline: label discovery, frame loading, rating, emission
//! - ReportRater: report event -> catalog version -> pipeline run
//! - ports: collaborator traits, with in-memory implementations in `memory`

pub mod memory;
pub mod orchestrator;
pub mod ports;
pub mod report;

pub use orchestrator::{rate_frame, rate_frames, RatingPipeline, RunOutcome, RunState};
pub use ports::{FrameQuery, FrameSource, LabelSource, RatedSink, RatingHistory};
pub use report::{ReportOutcome, ReportRater, SkipReason};
