// Progress hooks for front-ends
//
// The scan itself runs synchronously; a front-end that wants a progress bar
// or a completion signal implements `ProgressObserver`. All hooks default to
// no-ops.

use crate::report::{VideoStatus, VideoSummary};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;

pub trait ProgressObserver: Sync {
    fn batch_started(&self, _total_videos: usize) {}

    /// `estimated_frames` comes from container metadata and may be 0.
    fn video_started(&self, _index: usize, _source_name: &str, _estimated_frames: usize) {}

    fn frame_collected(&self, _source_name: &str, _frame_index: usize) {}

    fn video_finished(&self, _index: usize, _summary: &VideoSummary) {}

    /// Always called once per batch, also when the report could not be
    /// written.
    fn batch_finished(&self, _succeeded: bool) {}
}

/// Observer that ignores every event
pub struct NoProgress;

impl ProgressObserver for NoProgress {}

/// indicatif bar per video, plus a log line per finished video.
pub struct TerminalProgress {
    bar: Mutex<Option<ProgressBar>>,
    total_videos: Mutex<usize>,
    hidden: bool,
}

impl TerminalProgress {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
            total_videos: Mutex::new(0),
            hidden: false,
        }
    }

    /// Same bookkeeping without drawing anything
    pub fn hidden() -> Self {
        Self {
            hidden: true,
            ..Self::new()
        }
    }

    fn position(&self) -> Option<u64> {
        self.bar
            .lock()
            .ok()
            .and_then(|bar| bar.as_ref().map(|b| b.position()))
    }
}

impl Default for TerminalProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressObserver for TerminalProgress {
    fn batch_started(&self, total_videos: usize) {
        if let Ok(mut total) = self.total_videos.lock() {
            *total = total_videos;
        }
    }

    fn video_started(&self, _index: usize, source_name: &str, estimated_frames: usize) {
        let pb = if self.hidden {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(estimated_frames as u64)
        };
        if let Ok(style) = ProgressStyle::default_bar().template(
            "{spinner:.green} {msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
        ) {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb.set_message(source_name.to_string());
        if let Ok(mut bar) = self.bar.lock() {
            *bar = Some(pb);
        }
    }

    fn frame_collected(&self, _source_name: &str, _frame_index: usize) {
        if let Ok(bar) = self.bar.lock() {
            if let Some(pb) = bar.as_ref() {
                pb.inc(1);
            }
        }
    }

    fn video_finished(&self, index: usize, summary: &VideoSummary) {
        if let Ok(mut bar) = self.bar.lock() {
            if let Some(pb) = bar.take() {
                pb.finish_and_clear();
            }
        }
        let total = self.total_videos.lock().map(|t| *t).unwrap_or(0);
        let percent = percent_complete(index + 1, total);
        match &summary.status {
            VideoStatus::Analyzed {
                sampled, matched, ..
            } => tracing::info!(
                "[{}%] {}: {} of {} sampled frames matched",
                percent,
                summary.source_name,
                matched,
                sampled
            ),
            VideoStatus::Skipped { reason } => tracing::warn!(
                "[{}%] {}: skipped ({})",
                percent,
                summary.source_name,
                reason
            ),
        }
    }

    fn batch_finished(&self, succeeded: bool) {
        if succeeded {
            tracing::info!("Batch finished");
        } else {
            tracing::error!("Batch failed");
        }
    }
}

/// Whole-batch completion in percent, 0 to 100.
pub fn percent_complete(finished_videos: usize, total_videos: usize) -> u8 {
    if total_videos == 0 {
        return 100;
    }
    let ratio = finished_videos.min(total_videos) as f64 / total_videos as f64;
    (ratio * 100.0).round() as u8
}
