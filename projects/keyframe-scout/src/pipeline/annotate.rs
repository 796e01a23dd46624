use crate::error::{Result, ScanError};
use crate::keywords::KeywordSet;
use crate::pipeline::types::{annotated_file_name, DetectionHit, FrameResult};
use opencv::core::{Mat, Point, Rect, Scalar, Vector};
use opencv::imgcodecs;
use opencv::imgproc::{put_text, rectangle, FONT_HERSHEY_SIMPLEX, LINE_8};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

const HIGHLIGHT: (f64, f64, f64) = (0.0, 255.0, 0.0); // Green (BGR)
const BOX_THICKNESS: i32 = 2;
const LABEL_SCALE: f64 = 0.5;
const LABEL_OFFSET: i32 = 10;

/// Decides whether a frame matched, draws the matches and saves the frame.
#[derive(Debug, Clone)]
pub struct FrameAnnotator {
    keywords: KeywordSet,
    output_dir: PathBuf,
}

impl FrameAnnotator {
    pub fn new(keywords: KeywordSet, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            keywords,
            output_dir: output_dir.into(),
        }
    }

    /// Hits whose text contains any keyword.
    pub fn matching_hits<'h>(&self, hits: &'h [DetectionHit]) -> Vec<&'h DetectionHit> {
        hits.iter()
            .filter(|hit| self.keywords.matches(&hit.text))
            .collect()
    }

    /// Builds the frame's result. On a match, `upscaled` is drawn on and
    /// written to `<output_dir>/frame_motion_<index>.png`. A failed write is
    /// logged and reflected in `persisted`; the file name is still reported.
    pub fn annotate(
        &self,
        frame_index: usize,
        timestamp_secs: f64,
        upscaled: &mut Mat,
        hits: &[DetectionHit],
    ) -> Result<FrameResult> {
        let matched = self.matching_hits(hits);
        if matched.is_empty() {
            return Ok(FrameResult::new(
                frame_index,
                timestamp_secs,
                None,
                BTreeSet::new(),
                true,
            ));
        }

        let mut detected = BTreeSet::new();
        for hit in &matched {
            draw_hit(upscaled, hit)?;
            detected.insert(hit.text.clone());
        }

        let file_name = annotated_file_name(frame_index);
        let path = self.output_dir.join(&file_name);
        let persisted = match save_png(&path, upscaled) {
            Ok(()) => {
                tracing::debug!("Saved annotated frame {}", path.display());
                true
            }
            Err(e) => {
                tracing::warn!("{}", e);
                false
            }
        };

        Ok(FrameResult::new(
            frame_index,
            timestamp_secs,
            Some(file_name),
            detected,
            persisted,
        ))
    }
}

/// Box over the hit's corners with its text as a label just above.
fn draw_hit(img: &mut Mat, hit: &DetectionHit) -> Result<()> {
    let color = Scalar::new(HIGHLIGHT.0, HIGHLIGHT.1, HIGHLIGHT.2, 0.0);
    let top_left = hit.top_left();
    let bottom_right = hit.bottom_right();
    let (x_min, y_min) = (top_left.x as i32, top_left.y as i32);
    let (x_max, y_max) = (bottom_right.x as i32, bottom_right.y as i32);

    let rect = Rect::new(
        x_min.min(x_max),
        y_min.min(y_max),
        (x_max - x_min).abs(),
        (y_max - y_min).abs(),
    );
    rectangle(img, rect, color, BOX_THICKNESS, LINE_8, 0)?;
    put_text(
        img,
        &hit.text,
        Point::new(x_min, y_min - LABEL_OFFSET),
        FONT_HERSHEY_SIMPLEX,
        LABEL_SCALE,
        color,
        BOX_THICKNESS,
        LINE_8,
        false,
    )?;
    Ok(())
}

fn save_png(path: &Path, img: &Mat) -> Result<()> {
    let persistence_error = |reason: String| ScanError::FramePersistence {
        path: path.to_path_buf(),
        reason,
    };
    let path_str = path
        .to_str()
        .ok_or_else(|| persistence_error("path is not valid UTF-8".to_string()))?;
    match imgcodecs::imwrite(path_str, img, &Vector::new()) {
        Ok(true) => Ok(()),
        Ok(false) => Err(persistence_error("encoder refused to write".to_string())),
        Err(e) => Err(persistence_error(e.to_string())),
    }
}
