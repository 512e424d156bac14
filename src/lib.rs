//! Person tracking with sticky PPE compliance verdicts.
//!
//! A [`SortTracker`] keeps stable identities for people across frames, a
//! [`ComplianceAggregator`] folds noisy per-frame PPE observations into one
//! verdict per item and track, and a [`CompliancePipeline`] drives both for a
//! single stream.

pub mod compliance;
pub mod config;
pub mod error;
pub mod integration;
pub mod tracker;

pub use compliance::{ComplianceAggregator, ComplianceRecord, ComplianceState, RawObservations};
pub use config::{Config, DetectorConfig};
pub use error::{BoxError, ConfigError, PipelineError, ReplayError};
pub use integration::{
    ComplianceObserver, CompliancePipeline, DetectionSource, ErrorPolicy, Frame, FrameCrop,
    FrameReport, FrameSource, IntoDetections, RunSummary, SimulatedObserver,
};
pub use tracker::{Detection, Rect, SortTracker, TrackedBox, TrackerConfig};
