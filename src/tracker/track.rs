//! Single tracked subject with its motion state and lifecycle counters.

use ndarray::{Array1, Array2};

use crate::tracker::kalman_filter::KalmanFilter;
use crate::tracker::matching::Detection;
use crate::tracker::rect::Rect;
use crate::tracker::track_state::TrackState;

/// Single object track.
#[derive(Debug, Clone)]
pub struct Track {
    /// Unique track identifier, never reused within one tracker
    pub track_id: u64,
    /// Current lifecycle state
    pub state: TrackState,
    /// Confidence of the last matched detection
    pub score: f32,
    /// Total number of matched frames
    pub hits: u32,
    /// Consecutive matched frames since the last miss
    pub hit_streak: u32,
    /// Frames since creation
    pub age: u32,
    /// Frames since the last successful match
    pub time_since_update: u32,
    /// Kalman filter state mean (7-dim)
    pub mean: Array1<f64>,
    /// Kalman filter state covariance (7x7)
    pub covariance: Array2<f64>,
}

impl Track {
    /// Start a tentative track from an unmatched detection.
    ///
    /// The seeding detection counts as the first hit.
    pub fn new(track_id: u64, detection: &Detection, kalman_filter: &KalmanFilter) -> Self {
        let (mean, covariance) = kalman_filter.initiate(detection.bbox.to_xysr());
        Self {
            track_id,
            state: TrackState::Tentative,
            score: detection.score,
            hits: 1,
            hit_streak: 1,
            age: 0,
            time_since_update: 0,
            mean,
            covariance,
        }
    }

    /// Get the current bounding box estimate.
    pub fn rect(&self) -> Rect {
        Rect::from_xysr(self.mean[0], self.mean[1], self.mean[2], self.mean[3])
    }

    pub fn is_confirmed(&self) -> bool {
        self.state == TrackState::Confirmed
    }

    /// Advance the motion state one frame without evidence.
    pub fn predict(&mut self, kalman_filter: &KalmanFilter) {
        let (mean, covariance) = kalman_filter.predict(&self.mean, &self.covariance);
        self.mean = mean;
        self.covariance = covariance;
    }

    /// Fuse a matched detection into the motion state.
    pub fn correct(&mut self, detection: &Detection, kalman_filter: &KalmanFilter) {
        if let Some((mean, covariance)) =
            kalman_filter.update(&self.mean, &self.covariance, detection.bbox.to_xysr())
        {
            self.mean = mean;
            self.covariance = covariance;
        }

        self.time_since_update = 0;
        self.hits += 1;
        self.hit_streak += 1;
        self.score = detection.score;
    }

    /// Record a frame without a matching detection.
    pub fn mark_missed(&mut self) {
        self.time_since_update += 1;
        self.hit_streak = 0;
    }

    pub fn mark_confirmed(&mut self) {
        self.state = TrackState::Confirmed;
    }

    pub fn mark_dead(&mut self) {
        self.state = TrackState::Dead;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_track_reproduces_detection() {
        let kf = KalmanFilter::new();
        let det = Detection::new(10.0, 20.0, 50.0, 100.0, 0.8);
        let track = Track::new(7, &det, &kf);

        assert_eq!(track.track_id, 7);
        assert_eq!(track.state, TrackState::Tentative);
        assert_eq!(track.hit_streak, 1);
        let [x1, y1, x2, y2] = track.rect().to_tlbr();
        assert!((x1 - 10.0).abs() < 1e-3);
        assert!((y1 - 20.0).abs() < 1e-3);
        assert!((x2 - 50.0).abs() < 1e-3);
        assert!((y2 - 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_miss_then_correct() {
        let kf = KalmanFilter::new();
        let det = Detection::new(10.0, 20.0, 50.0, 100.0, 0.8);
        let mut track = Track::new(1, &det, &kf);

        track.predict(&kf);
        track.mark_missed();
        track.predict(&kf);
        track.mark_missed();
        assert_eq!(track.time_since_update, 2);
        assert_eq!(track.hit_streak, 0);

        track.predict(&kf);
        track.correct(&det, &kf);
        assert_eq!(track.time_since_update, 0);
        assert_eq!(track.hit_streak, 1);
        assert_eq!(track.hits, 2);
    }
}
