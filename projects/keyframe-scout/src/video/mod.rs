pub mod opencv_reader;
pub mod sampler;

use crate::error::Result;
use opencv::core::Mat;

/// Sequential frame source. Frames come out in decode order, starting at
/// frame index 1.
pub trait VideoReader: Send {
    /// Frame count reported by the container; may be 0 when unknown.
    fn frame_count(&self) -> Result<usize>;
    /// Returns `None` once the source is exhausted.
    fn next_frame(&mut self) -> Result<Option<Mat>>;
    /// Raw frame rate from metadata. 0.0 or NaN when the container does not
    /// report one.
    fn source_fps(&self) -> Result<f64>;

    /// Advances past one frame without handing it out. Returns `false` once
    /// the source is exhausted.
    fn skip_frame(&mut self) -> Result<bool> {
        Ok(self.next_frame()?.is_some())
    }
}
