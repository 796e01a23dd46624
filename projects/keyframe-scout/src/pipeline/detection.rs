use crate::error::{Result, ScanError};
use crate::pipeline::types::{quad_from_rect, DetectionHit};
use leptess::{capi::TessPageIteratorLevel_RIL_WORD, LepTess};
use opencv::core::{Mat, Vector};
use opencv::imgcodecs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A text recognition engine instance. Instances are owned by a single
/// worker thread and never shared.
pub trait TextDetector {
    /// Runs recognition on a binarized image. Hit order is engine-defined.
    fn detect(&mut self, binary: &Mat) -> Result<Vec<DetectionHit>>;
}

/// Builds one engine per worker. Called on the worker's own thread.
pub type DetectorFactory = Arc<dyn Fn() -> Result<Box<dyn TextDetector>> + Send + Sync>;

/// Tesseract, via leptess, configured for a single language.
pub struct TesseractDetector {
    engine: LepTess,
}

impl TesseractDetector {
    pub fn new(tessdata_dir: Option<&Path>, language: &str) -> Result<Self> {
        let datapath = tessdata_dir.map(|p| p.to_string_lossy().into_owned());
        let engine = LepTess::new(datapath.as_deref(), language).map_err(|e| {
            ScanError::EngineInit(format!(
                "Tesseract could not load language '{}': {}. Make sure the traineddata is installed",
                language, e
            ))
        })?;
        Ok(Self { engine })
    }
}

impl TextDetector for TesseractDetector {
    fn detect(&mut self, binary: &Mat) -> Result<Vec<DetectionHit>> {
        // leptess takes encoded image bytes
        let mut png = Vector::<u8>::new();
        imgcodecs::imencode(".png", binary, &mut png, &Vector::new())?;
        self.engine
            .set_image_from_mem(png.as_slice())
            .map_err(|e| ScanError::Detection(format!("failed to load frame: {}", e)))?;
        self.engine.set_source_resolution(300);

        // None means no text on the page
        let boxes = match self
            .engine
            .get_component_boxes(TessPageIteratorLevel_RIL_WORD, true)
        {
            Some(boxes) => boxes,
            None => return Ok(Vec::new()),
        };

        let mut hits = Vec::new();
        for word in &boxes {
            let geom = word.get_geometry();
            self.engine.set_rectangle(geom.x, geom.y, geom.w, geom.h);

            let text = self
                .engine
                .get_utf8_text()
                .unwrap_or_default()
                .trim()
                .to_string();
            if text.is_empty() {
                continue;
            }
            let confidence = self.engine.mean_text_conf() as f32 / 100.0;

            tracing::trace!(
                "Tesseract: '{}' ({:.2}) at {},{} {}x{}",
                text,
                confidence,
                geom.x,
                geom.y,
                geom.w,
                geom.h
            );

            hits.push(DetectionHit {
                text,
                bounding_box: quad_from_rect(
                    geom.x as f32,
                    geom.y as f32,
                    geom.w as f32,
                    geom.h as f32,
                ),
                confidence,
            });
        }

        Ok(hits)
    }
}

/// Factory producing a fresh Tesseract engine per call.
pub fn tesseract_factory(tessdata_dir: Option<PathBuf>, language: String) -> DetectorFactory {
    Arc::new(move || {
        let detector = TesseractDetector::new(tessdata_dir.as_deref(), &language)?;
        Ok(Box::new(detector) as Box<dyn TextDetector>)
    })
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::preprocess::prepare_frame;
    use crate::video::testing::white_frame;
    use opencv::core::{Point, Scalar};
    use opencv::imgproc;

    #[test]
    fn test_missing_language_is_engine_init_failure() {
        let dir = tempfile::tempdir().unwrap();
        let result = TesseractDetector::new(Some(dir.path()), "no_such_language");
        assert!(matches!(result, Err(ScanError::EngineInit(_))));
    }

    #[test]
    #[ignore = "requires a Tesseract installation with eng.traineddata"]
    fn test_tesseract_reads_rendered_text() {
        let mut frame = white_frame(480, 120);
        imgproc::put_text(
            &mut frame,
            "TESTKEY",
            Point::new(20, 80),
            imgproc::FONT_HERSHEY_SIMPLEX,
            2.0,
            Scalar::all(0.0),
            4,
            imgproc::LINE_8,
            false,
        )
        .unwrap();

        let prepared = prepare_frame(&frame).unwrap();
        let mut detector = TesseractDetector::new(None, "eng").unwrap();
        let hits = detector.detect(&prepared.binary).unwrap();
        assert!(
            hits.iter().any(|h| h.text.to_lowercase().contains("testkey")),
            "hits: {:?}",
            hits
        );
    }
}
