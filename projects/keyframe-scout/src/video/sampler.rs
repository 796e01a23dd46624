use super::VideoReader;
use crate::error::Result;
use crate::pipeline::types::SampledFrame;

/// Frames between two samples: `round(fps * period)`, at least 1. An unknown
/// or zero frame rate samples every frame.
pub fn sampling_stride(fps: f64, period_secs: f64) -> usize {
    if !has_usable_rate(fps) || !period_secs.is_finite() || period_secs <= 0.0 {
        return 1;
    }
    let stride = (fps * period_secs).round();
    if stride < 1.0 {
        1
    } else {
        stride as usize
    }
}

/// Position of a frame in seconds. Without a usable rate, one frame per
/// second is assumed so timestamps stay monotonic.
pub fn frame_timestamp(frame_index: usize, fps: f64) -> f64 {
    if has_usable_rate(fps) {
        frame_index as f64 / fps
    } else {
        frame_index as f64
    }
}

fn has_usable_rate(fps: f64) -> bool {
    fps.is_finite() && fps > 0.0
}

/// Lazily decodes a source and yields every `stride`-th frame, counting from
/// index 1. Finite and not restartable; stops at the first decode failure.
pub struct FrameSampler<R: VideoReader> {
    reader: R,
    fps: f64,
    stride: usize,
    decoded: usize,
    exhausted: bool,
}

impl<R: VideoReader> FrameSampler<R> {
    pub fn new(reader: R, period_secs: f64) -> Result<Self> {
        let fps = reader.source_fps()?;
        let stride = sampling_stride(fps, period_secs);
        tracing::debug!(
            "FrameSampler: fps={:.3}, period={}s, stride={}",
            fps,
            period_secs,
            stride
        );
        Ok(Self {
            reader,
            fps,
            stride,
            decoded: 0,
            exhausted: false,
        })
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Expected number of samples, from the container's frame count.
    pub fn estimated_samples(&self) -> usize {
        self.reader.frame_count().unwrap_or(0) / self.stride
    }
}

impl<R: VideoReader> Iterator for FrameSampler<R> {
    type Item = Result<SampledFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.exhausted {
            let next_index = self.decoded + 1;

            if next_index % self.stride != 0 {
                match self.reader.skip_frame() {
                    Ok(true) => self.decoded = next_index,
                    Ok(false) => self.exhausted = true,
                    Err(e) => {
                        self.exhausted = true;
                        return Some(Err(e));
                    }
                }
                continue;
            }

            match self.reader.next_frame() {
                Ok(Some(image)) => {
                    self.decoded = next_index;
                    return Some(Ok(SampledFrame {
                        frame_index: next_index,
                        timestamp_secs: frame_timestamp(next_index, self.fps),
                        image,
                    }));
                }
                Ok(None) => self.exhausted = true,
                Err(e) => {
                    self.exhausted = true;
                    return Some(Err(e));
                }
            }
        }
        None
    }
}
