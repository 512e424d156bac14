//! Sticky per-track compliance verdicts built from noisy observations.

mod aggregator;
mod state;

pub use aggregator::{ComplianceAggregator, ComplianceRecord, RawObservations};
pub use state::{ComplianceState, ParseComplianceStateError};
