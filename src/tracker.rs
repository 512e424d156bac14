//! SORT-style multi-object tracking: constant-velocity Kalman motion model,
//! IoU-gated optimal association and track lifecycle management.

mod kalman_filter;
mod matching;
mod rect;
mod sort_tracker;
mod track;
mod track_state;

pub use kalman_filter::{KalmanFilter, MIN_SHAPE};
pub use matching::{AssignmentResult, Detection, associate, iou_distance, linear_assignment};
pub use rect::{Rect, iou_batch};
pub use sort_tracker::{SortTracker, TrackedBox, TrackerConfig};
pub use track::Track;
pub use track_state::TrackState;
