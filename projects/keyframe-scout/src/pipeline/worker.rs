// Fixed-size worker pool for per-frame processing
//
// Every worker owns its own text detection engine, built on the worker's
// thread. Frames reach the workers through a bounded job queue and each job
// carries a one-shot reply channel, so the submitter can read results back
// in submission order no matter which worker finishes first.

use crate::error::{Result, ScanError};
use crate::pipeline::annotate::FrameAnnotator;
use crate::pipeline::detection::{DetectorFactory, TextDetector};
use crate::pipeline::preprocess::prepare_frame;
use crate::pipeline::types::{FrameResult, PreparedFrame, SampledFrame};
use crossbeam::channel::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

pub type FrameOutcome = Result<FrameResult>;

/// A sampled frame plus where to deliver its outcome
pub struct FrameJob {
    pub frame: SampledFrame,
    pub reply: Sender<FrameOutcome>,
}

/// Preprocess, detect and annotate one frame. The decoded image is dropped
/// as soon as its upscaled copy exists.
pub fn process_frame(
    frame: SampledFrame,
    detector: &mut dyn TextDetector,
    annotator: &FrameAnnotator,
) -> FrameOutcome {
    let SampledFrame {
        frame_index,
        timestamp_secs,
        image,
    } = frame;

    let PreparedFrame {
        mut upscaled,
        binary,
    } = prepare_frame(&image)?;
    drop(image);

    let hits = detector.detect(&binary)?;
    annotator.annotate(frame_index, timestamp_secs, &mut upscaled, &hits)
}

/// Worker loop: builds its engine, reports readiness, then drains jobs until
/// the queue closes.
fn frame_worker(
    worker_id: usize,
    rx: Receiver<FrameJob>,
    factory: DetectorFactory,
    annotator: Arc<FrameAnnotator>,
    ready: Sender<Result<()>>,
) {
    let mut detector = match factory() {
        Ok(detector) => {
            let _ = ready.send(Ok(()));
            detector
        }
        Err(e) => {
            tracing::error!("Frame worker {} failed to start engine: {}", worker_id, e);
            let _ = ready.send(Err(e));
            return;
        }
    };
    drop(ready);

    let mut processed = 0usize;
    for job in rx {
        let frame_index = job.frame.frame_index;
        let start_inst = Instant::now();

        let outcome = process_frame(job.frame, detector.as_mut(), &annotator);

        let duration_ms = start_inst.elapsed().as_secs_f64() * 1000.0;
        tracing::debug!(
            "Frame worker {}: frame {} done in {:.1}ms",
            worker_id,
            frame_index,
            duration_ms
        );
        processed += 1;

        // The collector may have given up on this video
        if job.reply.send(outcome).is_err() {
            tracing::debug!("Frame worker {}: reply for frame {} dropped", worker_id, frame_index);
        }
    }

    tracing::debug!(
        "Frame worker {} finished gracefully after {} frames",
        worker_id,
        processed
    );
}

pub struct WorkerPool {
    jobs: Option<Sender<FrameJob>>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns `width` workers and waits until every engine is up. Any engine
    /// failure tears the pool down and is returned.
    pub fn start(
        width: usize,
        queue_depth: usize,
        factory: DetectorFactory,
        annotator: Arc<FrameAnnotator>,
    ) -> Result<Self> {
        let (job_tx, job_rx) = channel::bounded::<FrameJob>(queue_depth.max(1));
        let (ready_tx, ready_rx) = channel::bounded::<Result<()>>(width);

        let mut pool = Self {
            jobs: Some(job_tx),
            handles: Vec::with_capacity(width),
        };

        for worker_id in 0..width {
            let rx = job_rx.clone();
            let factory = factory.clone();
            let annotator = annotator.clone();
            let ready = ready_tx.clone();
            let handle = thread::Builder::new()
                .name(format!("frame-worker-{}", worker_id))
                .spawn(move || frame_worker(worker_id, rx, factory, annotator, ready))?;
            pool.handles.push(handle);
        }
        drop(ready_tx);
        drop(job_rx);

        let mut failure = None;
        for _ in 0..width {
            match ready_rx.recv() {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    failure.get_or_insert(e);
                }
                Err(_) => {
                    failure.get_or_insert(ScanError::EngineInit(
                        "worker exited before its engine was ready".to_string(),
                    ));
                    break;
                }
            }
        }

        if let Some(e) = failure {
            pool.close_and_join();
            return Err(e);
        }

        tracing::info!("Worker pool ready with {} engines", width);
        Ok(pool)
    }

    /// Queues a frame, blocking while the queue is full. The returned
    /// receiver yields exactly one outcome, or disconnects if the worker
    /// died mid-frame.
    pub fn submit(&self, frame: SampledFrame) -> Result<Receiver<FrameOutcome>> {
        let frame_index = frame.frame_index;
        let jobs = self
            .jobs
            .as_ref()
            .ok_or(ScanError::WorkerLost { frame_index })?;

        let (reply_tx, reply_rx) = channel::bounded(1);
        jobs.send(FrameJob {
            frame,
            reply: reply_tx,
        })
        .map_err(|_| ScanError::WorkerLost { frame_index })?;
        Ok(reply_rx)
    }

    /// Closes the queue and waits for workers to drain it.
    pub fn shutdown(mut self) {
        self.close_and_join();
    }

    fn close_and_join(&mut self) {
        self.jobs.take();
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                tracing::error!("Frame worker panicked");
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.close_and_join();
    }
}
