use opencv::core::Mat;
use std::collections::BTreeSet;

/// Literal placeholder written to the report for "no match".
pub const NONE_SENTINEL: &str = "None";

/// A 2D point in upscaled-image pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Four corners, clockwise from top-left.
pub type Quad = [Point; 4];

/// Quad for an axis-aligned box.
pub fn quad_from_rect(x: f32, y: f32, w: f32, h: f32) -> Quad {
    [
        Point::new(x, y),
        Point::new(x + w, y),
        Point::new(x + w, y + h),
        Point::new(x, y + h),
    ]
}

/// A frame picked by the sampler. Moved into exactly one worker and dropped
/// there once the frame is processed.
pub struct SampledFrame {
    pub frame_index: usize,
    pub timestamp_secs: f64,
    pub image: Mat,
}

/// Output of preprocessing: the 2x color frame used for drawing and its
/// binarized single-channel counterpart used for recognition. Both share
/// the same pixel grid.
pub struct PreparedFrame {
    pub upscaled: Mat,
    pub binary: Mat,
}

/// One text region reported by the recognition engine
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionHit {
    pub text: String,
    pub bounding_box: Quad,
    pub confidence: f32,
}

impl DetectionHit {
    pub fn top_left(&self) -> Point {
        self.bounding_box[0]
    }

    pub fn bottom_right(&self) -> Point {
        self.bounding_box[2]
    }
}

/// Per-frame record. Immutable once built; ordered by `frame_index`.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameResult {
    pub frame_index: usize,
    /// Seconds, rounded to two decimals.
    pub exact_time_secs: f64,
    pub saved_file_name: Option<String>,
    /// Matched detected text, deduplicated and sorted.
    pub detected_keywords: BTreeSet<String>,
    /// False when a match was found but the annotated image could not be
    /// written. The file name is still reported.
    pub persisted: bool,
}

impl FrameResult {
    pub fn new(
        frame_index: usize,
        timestamp_secs: f64,
        saved_file_name: Option<String>,
        detected_keywords: BTreeSet<String>,
        persisted: bool,
    ) -> Self {
        Self {
            frame_index,
            exact_time_secs: round_to_hundredths(timestamp_secs),
            saved_file_name,
            detected_keywords,
            persisted,
        }
    }

    pub fn warning_flag(&self) -> u8 {
        u8::from(!self.detected_keywords.is_empty())
    }

    pub fn file_name_column(&self) -> String {
        self.saved_file_name
            .clone()
            .unwrap_or_else(|| NONE_SENTINEL.to_string())
    }

    pub fn keywords_column(&self) -> String {
        if self.detected_keywords.is_empty() {
            return NONE_SENTINEL.to_string();
        }
        self.detected_keywords
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// All results of one video, ascending by frame index.
#[derive(Debug, Clone, Default)]
pub struct VideoReport {
    pub stride: usize,
    pub sampled: usize,
    /// Frames whose processing failed; they have no entry in `frames`.
    pub failed: usize,
    pub frames: Vec<FrameResult>,
}

impl VideoReport {
    pub fn matched(&self) -> usize {
        self.frames.iter().filter(|f| f.warning_flag() == 1).count()
    }

    pub fn unsaved(&self) -> usize {
        self.frames.iter().filter(|f| !f.persisted).count()
    }
}

/// File name for an annotated frame; frame-index qualified so concurrent
/// workers never collide.
pub fn annotated_file_name(frame_index: usize) -> String {
    format!("frame_motion_{}.png", frame_index)
}

pub fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
