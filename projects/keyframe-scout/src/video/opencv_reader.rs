use super::VideoReader;
use crate::error::{Result, ScanError};
use opencv::{
    core::Mat,
    prelude::*,
    videoio::{
        VideoCapture, CAP_ANY, CAP_PROP_FPS, CAP_PROP_FRAME_COUNT, CAP_PROP_HW_ACCELERATION,
        VIDEO_ACCELERATION_ANY,
    },
};
use std::path::Path;

pub struct OpencvReader {
    capture: VideoCapture,
    source_fps: f64,
    total_frames: usize,
}

impl OpencvReader {
    pub fn open(path: &Path) -> Result<Self> {
        let unavailable = |reason: String| ScanError::SourceUnavailable {
            path: path.to_path_buf(),
            reason,
        };

        let path_str = path
            .to_str()
            .ok_or_else(|| unavailable("path is not valid UTF-8".to_string()))?;
        let mut capture =
            VideoCapture::from_file(path_str, CAP_ANY).map_err(|e| unavailable(e.to_string()))?;
        if !capture.is_opened().map_err(|e| unavailable(e.to_string()))? {
            return Err(unavailable("failed to open video file".to_string()));
        }

        // Ask the backend for hardware decoding (VA-API, VideoToolbox, D3D11, ...)
        match capture.set(CAP_PROP_HW_ACCELERATION, VIDEO_ACCELERATION_ANY as f64) {
            Ok(true) => tracing::debug!("OpencvReader: hardware acceleration enabled"),
            _ => tracing::debug!("OpencvReader: hardware acceleration not available"),
        }

        // Left as reported; the sampler decides how to treat a missing rate.
        let fps = capture.get(CAP_PROP_FPS).unwrap_or(0.0);
        if fps <= 0.0 || !fps.is_finite() {
            tracing::warn!("OpencvReader: no usable FPS in metadata for {}", path_str);
        }
        let raw_count = capture.get(CAP_PROP_FRAME_COUNT).unwrap_or(0.0);
        let total_frames = if raw_count.is_finite() && raw_count > 0.0 {
            raw_count as usize
        } else {
            0
        };

        tracing::info!(
            "OpencvReader: opened {}, fps={:.2}, stream_frames={}",
            path_str,
            fps,
            total_frames
        );

        Ok(Self {
            capture,
            source_fps: fps,
            total_frames,
        })
    }
}

impl VideoReader for OpencvReader {
    fn frame_count(&self) -> Result<usize> {
        Ok(self.total_frames)
    }

    fn source_fps(&self) -> Result<f64> {
        Ok(self.source_fps)
    }

    fn next_frame(&mut self) -> Result<Option<Mat>> {
        let mut frame = Mat::default();
        let success = self.capture.read(&mut frame)?;
        if !success || frame.empty() {
            return Ok(None);
        }
        Ok(Some(frame))
    }

    // grab() demuxes and decodes without the color conversion of retrieve()
    fn skip_frame(&mut self) -> Result<bool> {
        Ok(self.capture.grab()?)
    }
}

impl Drop for OpencvReader {
    fn drop(&mut self) {
        if let Err(e) = self.capture.release() {
            tracing::warn!("OpencvReader: failed to release capture: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_source_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let result = OpencvReader::open(&dir.path().join("missing.mp4"));
        assert!(matches!(result, Err(ScanError::SourceUnavailable { .. })));
    }

    #[test]
    fn test_garbage_file_is_source_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.mp4");
        std::fs::write(&path, b"definitely not a video container").unwrap();
        let result = OpencvReader::open(&path);
        assert!(matches!(result, Err(ScanError::SourceUnavailable { .. })));
    }
}
