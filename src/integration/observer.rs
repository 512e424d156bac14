//! Trait for per-crop PPE observers, plus a seeded simulator.

use std::convert::Infallible;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::compliance::{ComplianceState, RawObservations};
use crate::integration::frame::FrameCrop;

/// Produces a compliance observation for one cropped subject.
///
/// The output is untrusted: values are free-form strings that the aggregator
/// parses case-insensitively and drops when unrecognised.
pub trait ComplianceObserver {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Observe `items` on `crop`.
    fn observe(&mut self, crop: &FrameCrop<'_>, items: &[String]) -> Result<RawObservations, Self::Error>;
}

/// Items usually hidden by the viewing angle.
pub const DEFAULT_VIEW_DEPENDENT_ITEMS: [&str; 2] = ["glasses", "breathing_device"];

const VISIBLE_OUTCOMES: [(ComplianceState, f64); 3] = [
    (ComplianceState::Compliant, 0.7),
    (ComplianceState::NonCompliant, 0.2),
    (ComplianceState::Unknown, 0.1),
];
const VIEW_DEPENDENT_OUTCOMES: [(ComplianceState, f64); 3] = [
    (ComplianceState::Compliant, 0.4),
    (ComplianceState::NonCompliant, 0.1),
    (ComplianceState::Unknown, 0.5),
];

/// Stand-in for a trained verifier: draws random verdicts, with view-dependent
/// items far more likely to come back UNKNOWN.
#[derive(Debug, Clone)]
pub struct SimulatedObserver {
    rng: StdRng,
    view_dependent: Vec<String>,
}

impl SimulatedObserver {
    pub fn new(seed: u64) -> Self {
        Self::with_view_dependent_items(seed, DEFAULT_VIEW_DEPENDENT_ITEMS)
    }

    pub fn with_view_dependent_items<I, S>(seed: u64, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            rng: StdRng::seed_from_u64(seed),
            view_dependent: items.into_iter().map(Into::into).collect(),
        }
    }
}

impl ComplianceObserver for SimulatedObserver {
    type Error = Infallible;

    fn observe(&mut self, _crop: &FrameCrop<'_>, items: &[String]) -> Result<RawObservations, Self::Error> {
        let observations = items
            .iter()
            .map(|item| {
                let outcomes = if self.view_dependent.contains(item) {
                    &VIEW_DEPENDENT_OUTCOMES
                } else {
                    &VISIBLE_OUTCOMES
                };
                let state = outcomes
                    .choose_weighted(&mut self.rng, |(_, weight)| *weight)
                    .map(|(state, _)| *state)
                    .unwrap_or(ComplianceState::Unknown);
                (item.clone(), state.to_string())
            })
            .collect();
        Ok(observations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integration::frame::Frame;
    use crate::tracker::Rect;

    #[test]
    fn test_simulated_observer_covers_items() {
        let frame = Frame::blank(0, 64, 64);
        let crop = frame.crop(&Rect::new(0.0, 0.0, 32.0, 32.0)).unwrap();
        let items = vec!["helmet".to_string(), "glasses".to_string()];

        let mut observer = SimulatedObserver::new(7);
        let obs = observer.observe(&crop, &items).unwrap();
        assert_eq!(obs.len(), 2);
        for value in obs.values() {
            assert!(value.parse::<ComplianceState>().is_ok());
        }
    }

    #[test]
    fn test_simulated_observer_is_seeded() {
        let frame = Frame::blank(0, 16, 16);
        let crop = frame.crop(&Rect::new(0.0, 0.0, 8.0, 8.0)).unwrap();
        let items = vec!["helmet".to_string(), "vest".to_string(), "glasses".to_string()];

        let mut a = SimulatedObserver::new(42);
        let mut b = SimulatedObserver::new(42);
        for _ in 0..10 {
            assert_eq!(a.observe(&crop, &items).unwrap(), b.observe(&crop, &items).unwrap());
        }
    }

    #[test]
    fn test_view_dependent_items_mostly_unknown() {
        let frame = Frame::blank(0, 16, 16);
        let crop = frame.crop(&Rect::new(0.0, 0.0, 8.0, 8.0)).unwrap();
        let items = vec!["helmet".to_string(), "glasses".to_string()];

        let mut observer = SimulatedObserver::new(3);
        let (mut helmet_unknown, mut glasses_unknown) = (0, 0);
        for _ in 0..2000 {
            let obs = observer.observe(&crop, &items).unwrap();
            helmet_unknown += (obs["helmet"] == "UNKNOWN") as u32;
            glasses_unknown += (obs["glasses"] == "UNKNOWN") as u32;
        }
        assert!(glasses_unknown > helmet_unknown * 2);
    }
}
