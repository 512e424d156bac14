//! Per-stream frame loop tying detection, tracking, observation and aggregation together.

use log::{debug, info, warn};
use serde::Serialize;

use crate::compliance::{ComplianceAggregator, ComplianceRecord};
use crate::config::Config;
use crate::error::{BoxError, PipelineError};
use crate::integration::detector::DetectionSource;
use crate::integration::frame::{Frame, FrameSource};
use crate::integration::observer::ComplianceObserver;
use crate::integration::schedule::{DetectionSchedule, EveryNFrames};
use crate::tracker::{Detection, SortTracker, TrackedBox, TrackerConfig};

/// What the run loop does when a frame fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Stop and return the error.
    #[default]
    Abort,
    /// Log the error, emit nothing for the frame and carry on.
    SkipFrame,
}

/// The externally visible result of one processed frame.
#[derive(Debug, Clone, Serialize)]
pub struct FrameReport {
    pub frame_number: u64,
    /// Number of compliance records alive after pruning.
    pub active_tracks: usize,
    pub compliance_status: Vec<ComplianceRecord>,
    /// Confirmed track boxes of this frame.
    #[serde(skip)]
    pub tracks: Vec<TrackedBox>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub frames_processed: u64,
    pub frames_skipped: u64,
}

/// One stream's full pipeline. Owns its tracker and aggregator outright, so
/// separate streams share no mutable state.
pub struct CompliancePipeline<D: DetectionSource, O: ComplianceObserver> {
    detector: D,
    observer: O,
    tracker: SortTracker,
    aggregator: ComplianceAggregator,
    schedule: Box<dyn DetectionSchedule + Send>,
    confidence_threshold: f32,
    frame_number: u64,
}

impl<D: DetectionSource, O: ComplianceObserver> CompliancePipeline<D, O> {
    /// Create a pipeline that runs the detector on every frame and keeps every detection.
    pub fn new<I, S>(detector: D, observer: O, tracker_config: TrackerConfig, ppe_items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            detector,
            observer,
            tracker: SortTracker::new(tracker_config),
            aggregator: ComplianceAggregator::new(ppe_items),
            schedule: Box::new(EveryNFrames::new(1)),
            confidence_threshold: 0.0,
            frame_number: 0,
        }
    }

    pub fn from_config(detector: D, observer: O, config: &Config) -> Self {
        Self::new(
            detector,
            observer,
            config.tracker.clone(),
            config.ppe_items.iter().cloned(),
        )
        .with_confidence_threshold(config.person_detector.confidence_threshold)
        .with_schedule(Box::new(EveryNFrames::new(config.run_detection_every_n_frames)))
    }

    /// Drop detections scoring below `threshold`.
    pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    /// Replace the detector sampling schedule.
    pub fn with_schedule(mut self, schedule: Box<dyn DetectionSchedule + Send>) -> Self {
        self.schedule = schedule;
        self
    }

    /// Run the full pipeline on the next frame of the stream, stopping at the
    /// first failure.
    pub fn process_frame(&mut self, frame: &Frame) -> Result<FrameReport, PipelineError> {
        self.advance(frame, |err| Err(err))
    }

    /// One frame of work. Each failure is handed to `on_error`; returning it
    /// aborts the frame, returning `Ok` degrades gracefully: a failed detector
    /// counts as no detections and a failed observation leaves that track's
    /// record as it was.
    fn advance<E>(&mut self, frame: &Frame, mut on_error: E) -> Result<FrameReport, PipelineError>
    where
        E: FnMut(PipelineError) -> Result<(), PipelineError>,
    {
        let frame_number = self.frame_number;
        self.frame_number += 1;

        let detections = if self.schedule.should_detect(frame_number) {
            match self.detector.detect(frame) {
                Ok(raw) => self.prepare_detections(raw, frame),
                Err(err) => {
                    on_error(PipelineError::Detector {
                        frame: frame_number,
                        source: Box::new(err),
                    })?;
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        let tracks = self.tracker.step(detections);

        for tracked in &tracks {
            let Some(crop) = frame.crop(&tracked.bbox) else {
                debug!(
                    "frame {frame_number}: track {} has an empty crop, skipping observation",
                    tracked.track_id
                );
                continue;
            };
            match self.observer.observe(&crop, self.aggregator.items()) {
                Ok(observations) => self.aggregator.update_raw(tracked.track_id, &observations),
                Err(err) => on_error(PipelineError::Observer {
                    frame: frame_number,
                    track_id: tracked.track_id,
                    source: Box::new(err),
                })?,
            }
        }

        let active_ids: Vec<u64> = tracks.iter().map(|t| t.track_id).collect();
        self.aggregator.prune(&active_ids);

        let compliance_status = self.aggregator.snapshot();
        Ok(FrameReport {
            frame_number,
            active_tracks: compliance_status.len(),
            compliance_status,
            tracks,
        })
    }

    /// Drive the pipeline until `source` runs dry, handing each report to `sink`.
    ///
    /// Frame-source and sink failures always stop the run. Per-frame failures
    /// follow `policy`; under [`ErrorPolicy::SkipFrame`] the tracker and the
    /// aggregator still advance over the failed frame, but no report is emitted.
    pub fn run<S, F>(
        &mut self,
        source: &mut S,
        policy: ErrorPolicy,
        mut sink: F,
    ) -> Result<RunSummary, PipelineError>
    where
        S: FrameSource,
        F: FnMut(&FrameReport) -> Result<(), BoxError>,
    {
        let mut summary = RunSummary::default();
        loop {
            let frame = match source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(err) => {
                    return Err(PipelineError::Source {
                        frame: self.frame_number,
                        source: Box::new(err),
                    });
                }
            };

            let mut failed = false;
            let report = self.advance(&frame, |err| match policy {
                ErrorPolicy::Abort => Err(err),
                ErrorPolicy::SkipFrame => {
                    warn!("{err}; skipping frame");
                    failed = true;
                    Ok(())
                }
            })?;

            if failed {
                summary.frames_skipped += 1;
                continue;
            }
            summary.frames_processed += 1;
            sink(&report).map_err(|source| PipelineError::Sink {
                frame: report.frame_number,
                source,
            })?;
        }

        info!(
            "stream finished: {} frames processed, {} skipped",
            summary.frames_processed, summary.frames_skipped
        );
        Ok(summary)
    }

    /// Apply the confidence threshold and clip boxes to the frame.
    ///
    /// Boxes left without area are dropped; non-finite ones are passed on so the
    /// tracker can reject them.
    fn prepare_detections(&self, detections: Vec<Detection>, frame: &Frame) -> Vec<Detection> {
        let (width, height) = (frame.width as f32, frame.height as f32);
        detections
            .into_iter()
            .filter(|det| !(det.score.is_finite() && det.score < self.confidence_threshold))
            .filter_map(|det| {
                if !det.bbox.is_finite() {
                    return Some(det);
                }
                let bbox = det.bbox.clip(width, height);
                if bbox.is_empty() {
                    debug!("dropping detection outside the frame: {:?}", det.bbox);
                    return None;
                }
                Some(Detection::from_rect(bbox, det.score))
            })
            .collect()
    }

    /// Frames processed (or attempted) so far.
    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    pub fn tracker(&self) -> &SortTracker {
        &self.tracker
    }

    pub fn aggregator(&self) -> &ComplianceAggregator {
        &self.aggregator
    }

}
