//! Person detector seam.

use crate::integration::frame::Frame;
use crate::tracker::Detection;

/// Finds people in a frame.
///
/// Returned boxes may score below the configured confidence threshold or
/// stick out of the frame; the pipeline filters and clips them.
///
/// ```ignore
/// use ppe_compliance_rs::{Detection, DetectionSource, Frame};
///
/// struct OnnxPersonDetector { /* session, input size, ... */ }
///
/// impl DetectionSource for OnnxPersonDetector {
///     type Error = std::io::Error;
///
///     fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Self::Error> {
///         let _pixels = frame.data();
///         Ok(vec![])
///     }
/// }
/// ```
pub trait DetectionSource {
    type Error: std::error::Error + Send + Sync + 'static;

    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Self::Error>;
}

/// Raw model output that can be turned into detections.
pub trait IntoDetections {
    fn into_detections(self) -> Vec<Detection>;
}

impl IntoDetections for Vec<Detection> {
    fn into_detections(self) -> Vec<Detection> {
        self
    }
}

/// `[x1, y1, x2, y2, score]` rows.
impl IntoDetections for Vec<[f32; 5]> {
    fn into_detections(self) -> Vec<Detection> {
        self.into_iter().map(Detection::from_row).collect()
    }
}

impl IntoDetections for &[[f32; 5]] {
    fn into_detections(self) -> Vec<Detection> {
        self.iter().copied().map(Detection::from_row).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_into_detections() {
        let rows = vec![[10.0, 20.0, 50.0, 80.0, 0.95], [0.0, 0.0, 1.0, 1.0, 0.1]];
        let dets = rows.into_detections();
        assert_eq!(dets.len(), 2);
        assert_eq!(dets[0].score, 0.95);
        assert_eq!(dets[0].bbox.to_tlbr(), [10.0, 20.0, 50.0, 80.0]);
    }
}
