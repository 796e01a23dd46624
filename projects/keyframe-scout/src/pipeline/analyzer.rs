// Per-video orchestration
//
// Decoding stays on the calling thread. Sampled frames are handed to the
// worker pool as they are decoded; results are read back only once the
// sampler is exhausted, in the order the frames were submitted.

use crate::config::ScanConfig;
use crate::error::{Result, ScanError};
use crate::pipeline::annotate::FrameAnnotator;
use crate::pipeline::detection::DetectorFactory;
use crate::pipeline::types::VideoReport;
use crate::pipeline::worker::{FrameOutcome, WorkerPool};
use crate::progress::ProgressObserver;
use crate::video::opencv_reader::OpencvReader;
use crate::video::sampler::FrameSampler;
use crate::video::VideoReader;
use crossbeam::channel::Receiver;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

pub struct VideoAnalyzer {
    config: ScanConfig,
    factory: DetectorFactory,
}

impl VideoAnalyzer {
    pub fn new(config: ScanConfig, factory: DetectorFactory) -> Self {
        Self { config, factory }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Analyzes one video file; annotated frames go to `output_dir`, which
    /// is created if missing.
    pub fn analyze_video(
        &self,
        video_path: &Path,
        output_dir: &Path,
        index: usize,
        observer: &dyn ProgressObserver,
    ) -> Result<VideoReport> {
        let source_name = video_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| video_path.display().to_string());
        let reader = OpencvReader::open(video_path)?;
        self.analyze_source(reader, output_dir, &source_name, index, observer)
    }

    /// Runs the sample -> dispatch -> collect cycle over any frame source.
    pub fn analyze_source<R: VideoReader>(
        &self,
        reader: R,
        output_dir: &Path,
        source_name: &str,
        index: usize,
        observer: &dyn ProgressObserver,
    ) -> Result<VideoReport> {
        let start_time = Instant::now();
        let sampler = FrameSampler::new(reader, self.config.sample_period_secs)?;
        let stride = sampler.stride();
        observer.video_started(index, source_name, sampler.estimated_samples());

        fs::create_dir_all(output_dir)?;
        let annotator = Arc::new(FrameAnnotator::new(
            self.config.keywords.clone(),
            output_dir,
        ));

        // One engine per worker for the lifetime of this video
        let pool = WorkerPool::start(
            self.config.workers,
            self.config.queue_depth,
            self.factory.clone(),
            annotator,
        )?;

        let mut pending: Vec<(usize, Receiver<FrameOutcome>)> = Vec::new();
        let mut dispatch_lost = false;
        for sampled in sampler {
            let frame = match sampled {
                Ok(frame) => frame,
                Err(e) => {
                    // Treat as end of stream; keep what was decoded so far
                    tracing::warn!(
                        "{}: decode stopped after {} samples: {}",
                        source_name,
                        pending.len(),
                        e
                    );
                    break;
                }
            };
            tracing::debug!(
                "{}: sampled frame {} at {:.2}s",
                source_name,
                frame.frame_index,
                frame.timestamp_secs
            );
            let frame_index = frame.frame_index;
            match pool.submit(frame) {
                Ok(reply) => pending.push((frame_index, reply)),
                Err(e) => {
                    // No worker left to take frames; collect what was queued
                    tracing::warn!(
                        "{}: dispatch stopped at frame {}: {}",
                        source_name,
                        frame_index,
                        e
                    );
                    dispatch_lost = true;
                    break;
                }
            }
        }

        // Dropping the queue releases jobs no worker will pick up, so their
        // replies disconnect instead of blocking collection
        let pool = if dispatch_lost {
            pool.shutdown();
            None
        } else {
            Some(pool)
        };

        let mut report = VideoReport {
            stride,
            sampled: pending.len(),
            ..Default::default()
        };

        for (frame_index, reply) in pending {
            let outcome = reply
                .recv()
                .unwrap_or_else(|_| Err(ScanError::WorkerLost { frame_index }));
            match outcome {
                Ok(result) => {
                    observer.frame_collected(source_name, frame_index);
                    report.frames.push(result);
                }
                Err(e) => {
                    tracing::warn!("{}: frame {} skipped: {}", source_name, frame_index, e);
                    report.failed += 1;
                }
            }
        }
        if let Some(pool) = pool {
            pool.shutdown();
        }

        tracing::info!(
            "{}: {} frames sampled (stride {}), {} matched, {} failed in {:.1}s",
            source_name,
            report.sampled,
            stride,
            report.matched(),
            report.failed,
            start_time.elapsed().as_secs_f64()
        );

        Ok(report)
    }
}
