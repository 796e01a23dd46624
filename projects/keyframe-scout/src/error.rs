// Error taxonomy for a scan run
//
// Per-frame errors are absorbed by the analyzer, per-video errors by the
// batch reporter. Setup errors and `ReportWrite` reach the caller.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ScanError>;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("video source unavailable: {path:?}: {reason}")]
    SourceUnavailable { path: PathBuf, reason: String },

    #[error("failed to initialize text recognition engine: {0}")]
    EngineInit(String),

    #[error("text recognition failed: {0}")]
    Detection(String),

    #[error("failed to persist annotated frame {path:?}: {reason}")]
    FramePersistence { path: PathBuf, reason: String },

    #[error("failed to write report {path:?}: {reason}")]
    ReportWrite { path: PathBuf, reason: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("worker stopped before returning frame {frame_index}")]
    WorkerLost { frame_index: usize },

    #[error("opencv: {0}")]
    Vision(#[from] opencv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ScanError {
    /// Whether the error ends processing of the current video.
    pub fn is_video_fatal(&self) -> bool {
        matches!(
            self,
            ScanError::SourceUnavailable { .. } | ScanError::EngineInit(_)
        )
    }

    pub(crate) fn report_write(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        ScanError::ReportWrite {
            path: path.into(),
            reason: err.to_string(),
        }
    }
}
