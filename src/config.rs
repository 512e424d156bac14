//! Run configuration, loaded once from YAML and read-only afterwards.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::integration::DEFAULT_VIEW_DEPENDENT_ITEMS;
use crate::tracker::TrackerConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Model reference; must exist when given.
    #[serde(default)]
    pub model_path: Option<PathBuf>,
    /// Detections scoring below this are discarded.
    pub confidence_threshold: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Stream to process.
    pub video_stream: PathBuf,
    /// Frame geometry for streams that do not carry their own, as `[width, height]`.
    #[serde(default = "default_frame_size")]
    pub frame_size: [u32; 2],
    pub person_detector: DetectorConfig,
    pub tracker: TrackerConfig,
    /// Detector sampling period, in frames.
    pub run_detection_every_n_frames: u32,
    /// Monitored items, in report order.
    pub ppe_items: Vec<String>,
    /// Items the simulated observer treats as often hidden.
    #[serde(default = "default_view_dependent_items")]
    pub view_dependent_items: Vec<String>,
}

fn default_frame_size() -> [u32; 2] {
    [1920, 1080]
}

fn default_view_dependent_items() -> Vec<String> {
    DEFAULT_VIEW_DEPENDENT_ITEMS.iter().map(|s| s.to_string()).collect()
}

impl Config {
    /// Load and validate a config file. Relative paths inside it are resolved
    /// against the file's directory.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_yaml_str(&text)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        Ok(config)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let threshold = self.person_detector.confidence_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::invalid(format!(
                "person_detector.confidence_threshold must be in [0, 1], got {threshold}"
            )));
        }

        let tracker = &self.tracker;
        if tracker.min_hits < 1 {
            return Err(ConfigError::invalid("tracker.min_hits must be at least 1"));
        }
        if !(0.0..=1.0).contains(&tracker.iou_threshold) {
            return Err(ConfigError::invalid(format!(
                "tracker.iou_threshold must be in [0, 1], got {}",
                tracker.iou_threshold
            )));
        }
        let noise_ok = tracker
            .measurement_noise
            .iter()
            .chain(tracker.process_noise.iter())
            .all(|v| v.is_finite() && *v > 0.0);
        if !noise_ok {
            return Err(ConfigError::invalid(
                "tracker noise variances must be positive and finite",
            ));
        }

        if self.run_detection_every_n_frames < 1 {
            return Err(ConfigError::invalid(
                "run_detection_every_n_frames must be at least 1",
            ));
        }

        if self.ppe_items.is_empty() {
            return Err(ConfigError::invalid("ppe_items must name at least one item"));
        }
        for (i, item) in self.ppe_items.iter().enumerate() {
            if item.trim().is_empty() {
                return Err(ConfigError::invalid("ppe_items contains an empty name"));
            }
            if self.ppe_items[..i].contains(item) {
                return Err(ConfigError::invalid(format!(
                    "ppe_items lists {item:?} more than once"
                )));
            }
        }

        let [width, height] = self.frame_size;
        if width == 0 || height == 0 {
            return Err(ConfigError::invalid("frame_size must be non-zero"));
        }

        Ok(())
    }

    fn resolve_paths(&mut self, base: &Path) {
        if self.video_stream.is_relative() {
            self.video_stream = base.join(&self.video_stream);
        }
        if let Some(model_path) = self.person_detector.model_path.as_mut() {
            if model_path.is_relative() {
                *model_path = base.join(&*model_path);
            }
        }
    }
}
