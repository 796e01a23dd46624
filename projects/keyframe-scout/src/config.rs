use crate::error::{Result, ScanError};
use crate::keywords::KeywordSet;
use std::path::PathBuf;

pub const DEFAULT_WORKERS: usize = 4;
pub const DEFAULT_SAMPLE_PERIOD_SECS: f64 = 2.0;
pub const DEFAULT_LANGUAGE: &str = "eng";
pub const DEFAULT_VIDEO_EXTENSION: &str = "mp4";
pub const DEFAULT_REPORT_NAME: &str = "combined_report.csv";

/// Settings shared by every component of a scan run. Passed explicitly into
/// each entry point; nothing here is global.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub keywords: KeywordSet,
    pub workers: usize,
    /// Frames waiting for a free worker. Bounds decoded frames held in memory.
    pub queue_depth: usize,
    pub sample_period_secs: f64,
    pub language: String,
    pub tessdata_dir: Option<PathBuf>,
    /// Extension of the single supported container, without the dot.
    pub video_extension: String,
}

impl ScanConfig {
    pub fn new(keywords: KeywordSet) -> Self {
        Self {
            keywords,
            workers: DEFAULT_WORKERS,
            queue_depth: DEFAULT_WORKERS * 2,
            sample_period_secs: DEFAULT_SAMPLE_PERIOD_SECS,
            language: DEFAULT_LANGUAGE.to_string(),
            tessdata_dir: None,
            video_extension: DEFAULT_VIDEO_EXTENSION.to_string(),
        }
    }

    /// Sets the pool width and resizes the job queue to match.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self.queue_depth = workers.saturating_mul(2);
        self
    }

    pub fn with_video_extension(mut self, extension: &str) -> Self {
        self.video_extension = extension.trim_start_matches('.').to_string();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(ScanError::InvalidConfig(
                "worker pool needs at least one worker".to_string(),
            ));
        }
        if self.queue_depth == 0 {
            return Err(ScanError::InvalidConfig(
                "queue depth must be at least 1".to_string(),
            ));
        }
        if !self.sample_period_secs.is_finite() || self.sample_period_secs <= 0.0 {
            return Err(ScanError::InvalidConfig(format!(
                "sample period must be a positive number of seconds, got {}",
                self.sample_period_secs
            )));
        }
        if self.video_extension.is_empty() {
            return Err(ScanError::InvalidConfig(
                "video extension must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// One batch invocation: the inputs handed over by a front-end.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub input_folder: PathBuf,
    pub output_folder: PathBuf,
    pub report_path: PathBuf,
    pub config: ScanConfig,
}

impl ScanRequest {
    /// Report lands at `<output_folder>/combined_report.csv` unless overridden.
    pub fn new(
        input_folder: impl Into<PathBuf>,
        output_folder: impl Into<PathBuf>,
        config: ScanConfig,
    ) -> Self {
        let output_folder = output_folder.into();
        Self {
            input_folder: input_folder.into(),
            report_path: output_folder.join(DEFAULT_REPORT_NAME),
            output_folder,
            config,
        }
    }

    pub fn with_report_path(mut self, report_path: impl Into<PathBuf>) -> Self {
        self.report_path = report_path.into();
        self
    }
}
