//! Integration module for connecting frame sources, detection backends and
//! compliance observers with the tracker.
//!
//! This module provides the collaborator traits and the per-stream pipeline
//! that drives them, plus a replay backend for recorded detection streams.

mod detector;
mod frame;
mod observer;
mod pipeline;
mod replay;
mod schedule;

pub use detector::{DetectionSource, IntoDetections};
pub use frame::{Frame, FrameCrop, FrameSource, IterSource};
pub use observer::{ComplianceObserver, DEFAULT_VIEW_DEPENDENT_ITEMS, SimulatedObserver};
pub use pipeline::{CompliancePipeline, ErrorPolicy, FrameReport, RunSummary};
pub use replay::{ReplayDetector, ReplayFrames, ReplayRecording};
pub use schedule::{DetectionSchedule, EveryNFrames};
