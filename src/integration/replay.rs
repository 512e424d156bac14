//! Recorded detection streams, for running the pipeline without a model or a decoder.
//!
//! The recording is JSON lines: line `n` holds the `[x1, y1, x2, y2, score]`
//! rows detected on frame `n`. A blank line is a frame without detections.

use std::convert::Infallible;
use std::fs;
use std::path::Path;

use log::info;

use crate::error::ReplayError;
use crate::integration::detector::{DetectionSource, IntoDetections};
use crate::integration::frame::{Frame, FrameSource};
use crate::tracker::Detection;

#[derive(Debug, Clone, Default)]
pub struct ReplayRecording {
    frames: Vec<Vec<[f32; 5]>>,
}

impl ReplayRecording {
    /// Read and parse a whole recording. Any unreadable or malformed input is fatal.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ReplayError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ReplayError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let recording = Self::from_jsonl(&text)?;
        info!(
            "loaded replay stream {} ({} frames)",
            path.display(),
            recording.len()
        );
        Ok(recording)
    }

    pub fn from_jsonl(text: &str) -> Result<Self, ReplayError> {
        let frames = text
            .lines()
            .enumerate()
            .map(|(i, line)| {
                if line.trim().is_empty() {
                    return Ok(Vec::new());
                }
                serde_json::from_str(line).map_err(|source| ReplayError::Parse {
                    line: i + 1,
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { frames })
    }

    /// Number of recorded frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Split into a source of blank `width x height` frames and a detector
    /// serving the recorded rows by frame index.
    pub fn into_parts(self, width: u32, height: u32) -> (ReplayFrames, ReplayDetector) {
        let frames = ReplayFrames {
            next: 0,
            total: self.frames.len() as u64,
            template: Frame::blank(0, width, height),
        };
        (frames, ReplayDetector { frames: self.frames })
    }
}

#[derive(Debug)]
pub struct ReplayFrames {
    next: u64,
    total: u64,
    template: Frame,
}

impl FrameSource for ReplayFrames {
    type Error = Infallible;

    fn next_frame(&mut self) -> Result<Option<Frame>, Self::Error> {
        if self.next >= self.total {
            return Ok(None);
        }
        let frame = self.template.with_index(self.next);
        self.next += 1;
        Ok(Some(frame))
    }
}

#[derive(Debug)]
pub struct ReplayDetector {
    frames: Vec<Vec<[f32; 5]>>,
}

impl DetectionSource for ReplayDetector {
    type Error = Infallible;

    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Self::Error> {
        let rows = usize::try_from(frame.index)
            .ok()
            .and_then(|i| self.frames.get(i));
        Ok(rows.map(|rows| rows.as_slice().into_detections()).unwrap_or_default())
    }
}
