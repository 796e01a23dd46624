use clap::Parser;
use keyframe_scout::config::{
    DEFAULT_LANGUAGE, DEFAULT_SAMPLE_PERIOD_SECS, DEFAULT_VIDEO_EXTENSION, DEFAULT_WORKERS,
};
use keyframe_scout::{KeywordSet, ScanConfig, ScanRequest};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Folder containing the videos to scan
    #[arg(long, env = "KEYFRAME_SCOUT_INPUT")]
    pub input_folder: PathBuf,

    /// Folder for annotated frames and the combined report
    #[arg(long, env = "KEYFRAME_SCOUT_OUTPUT")]
    pub output_folder: PathBuf,

    /// Comma-separated keywords, matched case-insensitively
    #[arg(long, env = "KEYFRAME_SCOUT_KEYWORDS", value_delimiter = ',', required = true)]
    pub keywords: Vec<String>,

    /// Report path; defaults to <output-folder>/combined_report.csv
    #[arg(long, env = "KEYFRAME_SCOUT_REPORT")]
    pub report: Option<PathBuf>,

    /// Number of frame workers, each with its own OCR engine
    #[arg(long, env = "KEYFRAME_SCOUT_WORKERS", default_value_t = DEFAULT_WORKERS)]
    pub workers: usize,

    /// Seconds between sampled frames
    #[arg(long, env = "KEYFRAME_SCOUT_PERIOD", default_value_t = DEFAULT_SAMPLE_PERIOD_SECS)]
    pub period: f64,

    /// Tesseract language
    #[arg(long, env = "KEYFRAME_SCOUT_LANGUAGE", default_value = DEFAULT_LANGUAGE)]
    pub language: String,

    /// Tesseract data directory; the system default when unset
    #[arg(long, env = "KEYFRAME_SCOUT_TESSDATA")]
    pub tessdata: Option<PathBuf>,

    /// Video file extension to pick up
    #[arg(long, env = "KEYFRAME_SCOUT_EXTENSION", default_value = DEFAULT_VIDEO_EXTENSION)]
    pub extension: String,
}

impl Args {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn into_request(self) -> keyframe_scout::Result<ScanRequest> {
        let keywords = KeywordSet::new(&self.keywords)?;
        let mut config = ScanConfig::new(keywords)
            .with_workers(self.workers)
            .with_video_extension(&self.extension);
        config.sample_period_secs = self.period;
        config.language = self.language;
        config.tessdata_dir = self.tessdata;
        config.validate()?;

        let request = ScanRequest::new(self.input_folder, self.output_folder, config);
        Ok(match self.report {
            Some(report) => request.with_report_path(report),
            None => request,
        })
    }
}
