pub mod config;
pub mod error;
pub mod keywords;
pub mod pipeline;
pub mod progress;
pub mod report;
pub mod video;

pub use config::{ScanConfig, ScanRequest};
pub use error::{Result, ScanError};
pub use keywords::KeywordSet;
pub use pipeline::analyzer::VideoAnalyzer;
pub use pipeline::detection::{tesseract_factory, DetectorFactory, TextDetector};
pub use progress::{NoProgress, ProgressObserver, TerminalProgress};
pub use report::{scan_folder, scan_folder_with_tesseract, BatchSummary, VideoStatus, VideoSummary};
