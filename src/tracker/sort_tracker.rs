//! Track lifecycle manager: predict, associate, correct, spawn, confirm, expire.

use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};

use crate::tracker::kalman_filter::{
    DEFAULT_MEASUREMENT_NOISE, DEFAULT_PROCESS_NOISE, KalmanFilter, MEASUREMENT_DIM, STATE_DIM,
};
use crate::tracker::matching::{self, AssignmentResult, Detection};
use crate::tracker::rect::Rect;
use crate::tracker::track::Track;
use crate::tracker::track_state::TrackState;

/// Configuration for the [`SortTracker`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Frames a track may go unmatched before it is dropped.
    pub max_age: u32,
    /// Consecutive hits needed before a track is reported.
    pub min_hits: u32,
    /// Minimum IoU for a track/detection pair to be matched.
    pub iou_threshold: f32,
    /// Confirm every track born in the tracker's first step.
    #[serde(default)]
    pub confirm_first_frame: bool,
    /// Diagonal of the measurement noise covariance (cx, cy, s, r).
    #[serde(default = "default_measurement_noise")]
    pub measurement_noise: [f64; MEASUREMENT_DIM],
    /// Diagonal of the process noise covariance (cx, cy, s, r, vx, vy, vs).
    #[serde(default = "default_process_noise")]
    pub process_noise: [f64; STATE_DIM],
}

fn default_measurement_noise() -> [f64; MEASUREMENT_DIM] {
    DEFAULT_MEASUREMENT_NOISE
}

fn default_process_noise() -> [f64; STATE_DIM] {
    DEFAULT_PROCESS_NOISE
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_age: 1,
            min_hits: 3,
            iou_threshold: 0.3,
            confirm_first_frame: false,
            measurement_noise: DEFAULT_MEASUREMENT_NOISE,
            process_noise: DEFAULT_PROCESS_NOISE,
        }
    }
}

/// A confirmed track as reported to callers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackedBox {
    pub track_id: u64,
    pub bbox: Rect,
}

impl TrackedBox {
    /// The `[x1, y1, x2, y2, track_id]` output row.
    ///
    /// Ids above 2^24 do not fit an `f32` exactly; use [`TrackedBox::to_row_f64`]
    /// for long-running streams.
    pub fn to_row(&self) -> [f32; 5] {
        let [x1, y1, x2, y2] = self.bbox.to_tlbr();
        [x1, y1, x2, y2, self.track_id as f32]
    }

    /// Same row in `f64`; ids stay exact up to 2^53.
    pub fn to_row_f64(&self) -> [f64; 5] {
        let [x1, y1, x2, y2] = self.bbox.to_tlbr().map(f64::from);
        [x1, y1, x2, y2, self.track_id as f64]
    }
}

pub struct SortTracker {
    tracks: Vec<Track>,
    next_track_id: u64,
    frame_count: u64,
    config: TrackerConfig,
    kalman_filter: KalmanFilter,
}

impl SortTracker {
    pub fn new(config: TrackerConfig) -> Self {
        let kalman_filter = KalmanFilter::with_noise(config.measurement_noise, config.process_noise);
        Self {
            tracks: Vec::new(),
            next_track_id: 1,
            frame_count: 0,
            config,
            kalman_filter,
        }
    }

    /// Advance every track by one frame and return the confirmed tracks, ascending by id.
    ///
    /// Detections with non-finite values or no area are dropped before association.
    pub fn step(&mut self, detections: Vec<Detection>) -> Vec<TrackedBox> {
        self.frame_count += 1;

        let detections: Vec<Detection> = detections
            .into_iter()
            .filter(|det| {
                let valid = det.is_valid();
                if !valid {
                    warn!("frame {}: dropping malformed detection {:?}", self.frame_count, det);
                }
                valid
            })
            .collect();

        // Step 1: Predict
        for track in self.tracks.iter_mut() {
            track.predict(&self.kalman_filter);
        }

        // Step 2: Associate
        let track_rects: Vec<Rect> = self.tracks.iter().map(Track::rect).collect();
        let det_rects: Vec<Rect> = detections.iter().map(|d| d.bbox).collect();
        let AssignmentResult {
            matches,
            unmatched_tracks,
            unmatched_detections,
        } = matching::associate(&track_rects, &det_rects, self.config.iou_threshold);

        trace!(
            "frame {}: {} tracks, {} detections, {} matched",
            self.frame_count,
            track_rects.len(),
            det_rects.len(),
            matches.len()
        );

        // Step 3: Correct matched tracks
        for (itrack, idet) in matches {
            self.tracks[itrack].correct(&detections[idet], &self.kalman_filter);
        }

        // Step 4: Age out unmatched tracks
        for itrack in unmatched_tracks {
            let track = &mut self.tracks[itrack];
            track.mark_missed();
            if track.time_since_update > self.config.max_age {
                track.mark_dead();
                debug!(
                    "track {} removed after {} missed frames",
                    track.track_id, track.time_since_update
                );
            }
        }
        self.tracks.retain(|t| t.state != TrackState::Dead);

        // Step 5: Init new tracks
        for idet in unmatched_detections {
            let track_id = self.next_track_id;
            self.next_track_id += 1;
            self.tracks
                .push(Track::new(track_id, &detections[idet], &self.kalman_filter));
            debug!("track {track_id} started");
        }

        // Step 6: Promote and age
        let confirm_all = self.config.confirm_first_frame && self.frame_count == 1;
        for track in self.tracks.iter_mut() {
            if track.state == TrackState::Tentative
                && (confirm_all || track.hit_streak >= self.config.min_hits)
            {
                track.mark_confirmed();
                debug!("track {} confirmed", track.track_id);
            }
            track.age += 1;
        }

        self.confirmed()
    }

    /// Confirmed tracks, ascending by id.
    pub fn confirmed(&self) -> Vec<TrackedBox> {
        self.tracks
            .iter()
            .filter(|t| t.is_confirmed())
            .map(|t| TrackedBox {
                track_id: t.track_id,
                bbox: t.rect(),
            })
            .collect()
    }

    pub fn confirmed_ids(&self) -> Vec<u64> {
        self.tracks
            .iter()
            .filter(|t| t.is_confirmed())
            .map(|t| t.track_id)
            .collect()
    }

    /// All live tracks, tentative ones included, ascending by id.
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Number of steps taken so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }
}
