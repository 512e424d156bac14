//! Error types for setup and the per-frame loop.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Boxed error from an external collaborator.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Fatal configuration problems, raised before the frame loop starts.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn invalid<S: Into<String>>(msg: S) -> Self {
        Self::Invalid(msg.into())
    }
}

/// Fatal problems opening a recorded detection stream.
#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("failed to open replay stream {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("replay stream line {line}: {source}")]
    Parse {
        line: usize,
        source: serde_json::Error,
    },
}

/// A failure inside the frame loop, tagged with the frame it happened on.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("frame {frame}: frame source failed: {source}")]
    Source { frame: u64, source: BoxError },

    #[error("frame {frame}: detector failed: {source}")]
    Detector { frame: u64, source: BoxError },

    #[error("frame {frame}: observer failed for track {track_id}: {source}")]
    Observer {
        frame: u64,
        track_id: u64,
        source: BoxError,
    },

    #[error("frame {frame}: report sink failed: {source}")]
    Sink { frame: u64, source: BoxError },
}

impl PipelineError {
    /// The frame number the failure happened on.
    pub fn frame_number(&self) -> u64 {
        match self {
            Self::Source { frame, .. }
            | Self::Detector { frame, .. }
            | Self::Observer { frame, .. }
            | Self::Sink { frame, .. } => *frame,
        }
    }
}
