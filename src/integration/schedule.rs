//! When to run the detector.

/// Decides, per frame, whether the detector runs or the tracker coasts on its
/// motion model.
pub trait DetectionSchedule {
    /// `frame_number` counts processed frames from zero.
    fn should_detect(&mut self, frame_number: u64) -> bool;
}

/// Run the detector on every `period`-th frame, starting with the first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EveryNFrames {
    period: u64,
}

impl EveryNFrames {
    /// A zero period is treated as 1.
    pub fn new(period: u32) -> Self {
        Self {
            period: u64::from(period.max(1)),
        }
    }

    pub fn period(&self) -> u64 {
        self.period
    }
}

impl DetectionSchedule for EveryNFrames {
    fn should_detect(&mut self, frame_number: u64) -> bool {
        frame_number % self.period == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_third_frame() {
        let mut schedule = EveryNFrames::new(3);
        let hits: Vec<u64> = (0..10).filter(|&n| schedule.should_detect(n)).collect();
        assert_eq!(hits, vec![0, 3, 6, 9]);
    }

    #[test]
    fn test_period_one_runs_always() {
        let mut schedule = EveryNFrames::new(1);
        assert!((0..5).all(|n| schedule.should_detect(n)));
        assert_eq!(EveryNFrames::new(0).period(), 1);
    }
}
