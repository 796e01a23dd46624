use crate::error::Result;
use crate::pipeline::types::PreparedFrame;
use opencv::core::{self, Mat, Size};
use opencv::imgproc;
use opencv::prelude::*;

pub const UPSCALE_FACTOR: f64 = 2.0;
pub const BLUR_KERNEL: i32 = 5;
pub const THRESHOLD_BLOCK_SIZE: i32 = 11;
pub const THRESHOLD_OFFSET: f64 = 2.0;

/// Upscales a frame 2x with cubic interpolation.
pub fn upscale(img: &Mat) -> Result<Mat> {
    let mut out = Mat::default();
    imgproc::resize(
        img,
        &mut out,
        Size::new(0, 0),
        UPSCALE_FACTOR,
        UPSCALE_FACTOR,
        imgproc::INTER_CUBIC,
    )?;
    Ok(out)
}

/// Grayscale, 5x5 Gaussian smoothing, then Gaussian-weighted adaptive
/// threshold (block 11, offset 2). Output holds only 0 and 255.
pub fn binarize(img: &Mat) -> Result<Mat> {
    let gray = if img.channels() == 1 {
        img.clone()
    } else {
        let mut gray = Mat::default();
        let code = if img.channels() == 4 {
            imgproc::COLOR_BGRA2GRAY
        } else {
            imgproc::COLOR_BGR2GRAY
        };
        imgproc::cvt_color_def(img, &mut gray, code)?;
        gray
    };

    // Suppress compression noise before thresholding
    let mut blurred = Mat::default();
    imgproc::gaussian_blur_def(
        &gray,
        &mut blurred,
        Size::new(BLUR_KERNEL, BLUR_KERNEL),
        0.0,
    )?;

    let mut binary = Mat::default();
    imgproc::adaptive_threshold(
        &blurred,
        &mut binary,
        255.0,
        imgproc::ADAPTIVE_THRESH_GAUSSIAN_C,
        imgproc::THRESH_BINARY,
        THRESHOLD_BLOCK_SIZE,
        THRESHOLD_OFFSET,
    )?;
    Ok(binary)
}

/// Full preprocessing of one decoded frame. Deterministic and stateless, so
/// workers call it concurrently.
pub fn prepare_frame(img: &Mat) -> Result<PreparedFrame> {
    let upscaled = upscale(img)?;
    let binary = binarize(&upscaled)?;
    Ok(PreparedFrame { upscaled, binary })
}

/// Pixels at 0 in a binarized image.
pub fn dark_pixel_count(binary: &Mat) -> Result<usize> {
    let total = (binary.rows() as usize) * (binary.cols() as usize);
    let lit = core::count_non_zero(binary)? as usize;
    Ok(total.saturating_sub(lit))
}
