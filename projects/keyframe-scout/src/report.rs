// Batch processing of a folder of videos into one CSV report

use crate::config::ScanRequest;
use crate::error::{Result, ScanError};
use crate::pipeline::analyzer::VideoAnalyzer;
use crate::pipeline::detection::{tesseract_factory, DetectorFactory};
use crate::pipeline::types::FrameResult;
use crate::progress::ProgressObserver;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const REPORT_COLUMNS: [&str; 5] = [
    "Exact Time (s)",
    "File Name",
    "Detected Keywords",
    "Warning",
    "Video Source",
];

/// One CSV line. Field order matches `REPORT_COLUMNS`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    #[serde(rename = "Exact Time (s)")]
    pub exact_time_secs: f64,
    #[serde(rename = "File Name")]
    pub file_name: String,
    #[serde(rename = "Detected Keywords")]
    pub detected_keywords: String,
    #[serde(rename = "Warning")]
    pub warning: u8,
    #[serde(rename = "Video Source")]
    pub video_source: String,
}

impl ReportRow {
    pub fn from_result(result: &FrameResult, video_source: &str) -> Self {
        Self {
            exact_time_secs: result.exact_time_secs,
            file_name: result.file_name_column(),
            detected_keywords: result.keywords_column(),
            warning: result.warning_flag(),
            video_source: video_source.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum VideoStatus {
    Analyzed {
        sampled: usize,
        matched: usize,
        failed: usize,
        /// Matches whose annotated frame could not be written
        unsaved: usize,
    },
    Skipped {
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct VideoSummary {
    pub source_name: String,
    pub status: VideoStatus,
}

/// What a successful batch produced
#[derive(Debug, Clone)]
pub struct BatchSummary {
    pub report_path: PathBuf,
    pub rows: usize,
    pub videos: Vec<VideoSummary>,
}

impl BatchSummary {
    pub fn skipped(&self) -> impl Iterator<Item = &VideoSummary> {
        self.videos
            .iter()
            .filter(|v| matches!(v.status, VideoStatus::Skipped { .. }))
    }

    pub fn is_clean(&self) -> bool {
        self.videos.iter().all(|v| {
            matches!(
                v.status,
                VideoStatus::Analyzed {
                    failed: 0,
                    unsaved: 0,
                    ..
                }
            )
        })
    }
}

/// Files directly inside `folder` whose extension is exactly `extension`,
/// sorted by file name. `clip.MP4` is not an `mp4` video, so no two picked
/// files share a stem-named output folder.
pub fn list_videos(folder: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    if !folder.is_dir() {
        return Err(ScanError::InvalidConfig(format!(
            "input folder {:?} is not a readable directory",
            folder
        )));
    }

    let wanted = extension.trim_start_matches('.');
    let mut videos = Vec::new();
    for entry in WalkDir::new(folder)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Skipping unreadable entry in {:?}: {}", folder, e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let matches = entry
            .path()
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s == wanted)
            .unwrap_or(false);
        if matches {
            videos.push(entry.into_path());
        }
    }
    Ok(videos)
}

/// Writes the header and all rows. The header is written even with no rows.
pub fn write_report(path: &Path, rows: &[ReportRow]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| ScanError::report_write(path, e))?;
        }
    }

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(|e| ScanError::report_write(path, e))?;
    writer
        .write_record(REPORT_COLUMNS)
        .map_err(|e| ScanError::report_write(path, e))?;
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| ScanError::report_write(path, e))?;
    }
    writer
        .flush()
        .map_err(|e| ScanError::report_write(path, e))?;
    Ok(())
}

/// Runs the analyzer over every video of a folder and merges the results.
pub struct BatchReporter {
    analyzer: VideoAnalyzer,
}

impl BatchReporter {
    pub fn new(analyzer: VideoAnalyzer) -> Self {
        Self { analyzer }
    }

    pub fn run(&self, request: &ScanRequest, observer: &dyn ProgressObserver) -> Result<BatchSummary> {
        let videos = list_videos(&request.input_folder, &self.analyzer.config().video_extension)?;
        tracing::info!(
            "Found {} video(s) in {:?}",
            videos.len(),
            request.input_folder
        );
        observer.batch_started(videos.len());

        let mut rows = Vec::new();
        let mut summaries = Vec::with_capacity(videos.len());

        for (index, video_path) in videos.iter().enumerate() {
            let source_name = video_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let stem = video_path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| source_name.clone());
            let video_output = request.output_folder.join(&stem);

            tracing::info!("Analyzing video: {}", source_name);
            let status =
                match self
                    .analyzer
                    .analyze_video(video_path, &video_output, index, observer)
                {
                    Ok(report) => {
                        rows.extend(
                            report
                                .frames
                                .iter()
                                .map(|frame| ReportRow::from_result(frame, &source_name)),
                        );
                        VideoStatus::Analyzed {
                            sampled: report.sampled,
                            matched: report.matched(),
                            failed: report.failed,
                            unsaved: report.unsaved(),
                        }
                    }
                    Err(e) => {
                        if e.is_video_fatal() {
                            tracing::warn!("Skipping {}: {}", source_name, e);
                        } else {
                            tracing::error!("Skipping {} after unexpected error: {}", source_name, e);
                        }
                        VideoStatus::Skipped {
                            reason: e.to_string(),
                        }
                    }
                };

            let summary = VideoSummary {
                source_name,
                status,
            };
            observer.video_finished(index, &summary);
            summaries.push(summary);
        }

        write_report(&request.report_path, &rows)?;
        tracing::info!(
            "Analysis complete. Combined report saved to {:?} ({} rows)",
            request.report_path,
            rows.len()
        );

        Ok(BatchSummary {
            report_path: request.report_path.clone(),
            rows: rows.len(),
            videos: summaries,
        })
    }
}

/// Entry point for front-ends: scans `request.input_folder` and writes the
/// combined report. Runs synchronously; `observer.batch_finished` is always
/// called before returning.
pub fn scan_folder(
    request: &ScanRequest,
    factory: DetectorFactory,
    observer: &dyn ProgressObserver,
) -> Result<BatchSummary> {
    let result = request.config.validate().and_then(|()| {
        fs::create_dir_all(&request.output_folder)?;
        let analyzer = VideoAnalyzer::new(request.config.clone(), factory);
        BatchReporter::new(analyzer).run(request, observer)
    });

    if let Err(e) = &result {
        tracing::error!("Scan failed: {}", e);
    }
    observer.batch_finished(result.is_ok());
    result
}

/// `scan_folder` with the Tesseract engine named in the request's config.
pub fn scan_folder_with_tesseract(
    request: &ScanRequest,
    observer: &dyn ProgressObserver,
) -> Result<BatchSummary> {
    let factory = tesseract_factory(
        request.config.tessdata_dir.clone(),
        request.config.language.clone(),
    );
    scan_folder(request, factory, observer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScanConfig;
    use crate::keywords::KeywordSet;
    use crate::pipeline::detection::testing::{failing_factory, marker_factory};
    use crate::progress::NoProgress;
    use crate::video::testing::{marked_frame, white_frame};
    use opencv::core::Size;
    use opencv::prelude::*;
    use opencv::videoio::VideoWriter;
    use std::collections::BTreeSet;
    use std::sync::atomic::{AtomicBool, Ordering};

    const HEADER: &str = "Exact Time (s),File Name,Detected Keywords,Warning,Video Source\n";

    fn config() -> ScanConfig {
        ScanConfig::new(KeywordSet::new(["testkey"]).unwrap()).with_workers(2)
    }

    /// 10 seconds at 10 fps, MJPG in AVI; `marked` frames (1-based) carry a
    /// dark block.
    fn write_video(path: &Path, marked: &[usize]) {
        let fourcc = VideoWriter::fourcc('M', 'J', 'P', 'G').unwrap();
        let mut writer =
            VideoWriter::new(path.to_str().unwrap(), fourcc, 10.0, Size::new(64, 48), true)
                .unwrap();
        assert!(writer.is_opened().unwrap());
        for index in 1..=100 {
            let frame = if marked.contains(&index) {
                marked_frame(64, 48)
            } else {
                white_frame(64, 48)
            };
            writer.write(&frame).unwrap();
        }
        writer.release().unwrap();
    }

    #[test]
    fn test_list_videos_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.mp4", "a.mp4", "c.mp4", "D.MP4", "notes.txt", "clip.mp4.bak"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        fs::create_dir(dir.path().join("nested.mp4")).unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("deep.mp4"), b"").unwrap();

        let names: Vec<String> = list_videos(dir.path(), "mp4")
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.mp4", "b.mp4", "c.mp4"]);
    }

    #[test]
    fn test_list_videos_extension_is_case_sensitive() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("clip.avi"), b"").unwrap();
        fs::write(dir.path().join("clip.AVI"), b"").unwrap();

        let lower = list_videos(dir.path(), "avi").unwrap();
        let upper = list_videos(dir.path(), "AVI").unwrap();

        assert_eq!(lower, vec![dir.path().join("clip.avi")]);
        assert_eq!(upper, vec![dir.path().join("clip.AVI")]);
    }

    #[test]
    fn test_same_stem_videos_do_not_share_frames() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        write_video(&input.path().join("clip.avi"), &[20]);
        write_video(&input.path().join("clip.AVI"), &[20]);
        let request = ScanRequest::new(
            input.path(),
            output.path(),
            config().with_video_extension("avi"),
        );

        let summary = scan_folder(&request, marker_factory("TESTKEY"), &NoProgress).unwrap();

        assert_eq!(summary.videos.len(), 1);
        assert_eq!(summary.videos[0].source_name, "clip.avi");
        let content = fs::read_to_string(&summary.report_path).unwrap();
        let flagged: Vec<&str> = content.lines().filter(|l| l.contains(",1,")).collect();
        assert_eq!(flagged, vec!["2.0,frame_motion_20.png,TESTKEY,1,clip.avi"]);
        assert!(!content.contains("clip.AVI"));
    }

    #[test]
    fn test_list_videos_missing_folder() {
        let dir = tempfile::tempdir().unwrap();
        assert!(list_videos(&dir.path().join("missing"), "mp4").is_err());
    }

    #[test]
    fn test_empty_report_has_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.csv");
        write_report(&path, &[]).unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), HEADER);
    }

    #[test]
    fn test_report_rows_and_quoting() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("report.csv");
        let keywords: BTreeSet<String> = ["EXIT", "Exit"].iter().map(|s| s.to_string()).collect();
        let rows = vec![
            ReportRow::from_result(
                &FrameResult::new(20, 2.0, Some("frame_motion_20.png".into()), keywords, true),
                "a.mp4",
            ),
            ReportRow::from_result(
                &FrameResult::new(40, 4.0, None, BTreeSet::new(), true),
                "a.mp4",
            ),
        ];
        write_report(&path, &rows).unwrap();

        let content = fs::read_to_string(path).unwrap();
        let expected = format!(
            "{}{}{}",
            HEADER,
            "2.0,frame_motion_20.png,\"EXIT, Exit\",1,a.mp4\n",
            "4.0,None,None,0,a.mp4\n"
        );
        assert_eq!(content, expected);
    }

    #[test]
    fn test_report_write_failure_is_surfaced() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the report file should go
        let path = dir.path().join("report.csv");
        fs::create_dir(&path).unwrap();
        let result = write_report(&path, &[]);
        assert!(matches!(result, Err(ScanError::ReportWrite { .. })));
    }

    #[test]
    fn test_empty_folder_produces_header_only_report() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        fs::write(input.path().join("readme.txt"), b"no videos here").unwrap();
        let request = ScanRequest::new(input.path(), output.path(), config());

        let summary = scan_folder(&request, marker_factory("TESTKEY"), &NoProgress).unwrap();

        assert_eq!(summary.rows, 0);
        assert!(summary.videos.is_empty());
        let content = fs::read_to_string(output.path().join("combined_report.csv")).unwrap();
        assert_eq!(content, HEADER);
    }

    #[test]
    fn test_unreadable_video_is_skipped() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        fs::write(input.path().join("broken.mp4"), b"garbage").unwrap();
        let request = ScanRequest::new(input.path(), output.path(), config());

        let summary = scan_folder(&request, marker_factory("TESTKEY"), &NoProgress).unwrap();

        assert_eq!(summary.rows, 0);
        assert_eq!(summary.skipped().count(), 1);
        assert!(!summary.is_clean());
        let content = fs::read_to_string(&summary.report_path).unwrap();
        assert_eq!(content, HEADER);
    }

    #[test]
    fn test_end_to_end_keyword_frame() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        write_video(&input.path().join("clip.avi"), &[20]);
        let request = ScanRequest::new(
            input.path(),
            output.path(),
            config().with_video_extension("avi"),
        );

        let summary = scan_folder(&request, marker_factory("TESTKEY"), &NoProgress).unwrap();

        assert_eq!(summary.rows, 5);
        assert_eq!(
            summary.videos[0].status,
            VideoStatus::Analyzed {
                sampled: 5,
                matched: 1,
                failed: 0,
                unsaved: 0,
            }
        );
        assert!(output.path().join("clip").join("frame_motion_20.png").exists());

        let content = fs::read_to_string(&summary.report_path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[1], "2.0,frame_motion_20.png,TESTKEY,1,clip.avi");
        assert_eq!(lines[2], "4.0,None,None,0,clip.avi");
        assert_eq!(lines[5], "10.0,None,None,0,clip.avi");
    }

    #[test]
    fn test_rerun_is_idempotent_and_videos_stay_in_order() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        write_video(&input.path().join("b.avi"), &[40]);
        write_video(&input.path().join("a.avi"), &[20, 60]);
        let request = ScanRequest::new(
            input.path(),
            output.path(),
            config().with_video_extension("avi"),
        );

        let first = scan_folder(&request, marker_factory("TESTKEY"), &NoProgress).unwrap();
        let first_content = fs::read_to_string(&first.report_path).unwrap();
        let second = scan_folder(&request, marker_factory("TESTKEY"), &NoProgress).unwrap();
        let second_content = fs::read_to_string(&second.report_path).unwrap();

        assert_eq!(first_content, second_content);
        let sources: Vec<&str> = first_content
            .lines()
            .skip(1)
            .map(|l| l.rsplit(',').next().unwrap())
            .collect();
        assert_eq!(sources[..5], ["a.avi"; 5]);
        assert_eq!(sources[5..], ["b.avi"; 5]);
        assert!(output.path().join("a").join("frame_motion_60.png").exists());
        assert!(output.path().join("b").join("frame_motion_40.png").exists());
    }

    #[test]
    fn test_engine_failure_skips_video_but_writes_report() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        write_video(&input.path().join("clip.avi"), &[20]);
        let request = ScanRequest::new(
            input.path(),
            output.path(),
            config().with_video_extension("avi"),
        );

        let summary = scan_folder(&request, failing_factory(0), &NoProgress).unwrap();

        assert_eq!(summary.skipped().count(), 1);
        assert_eq!(
            fs::read_to_string(&summary.report_path).unwrap(),
            HEADER
        );
    }

    struct FinishFlag(AtomicBool, AtomicBool);

    impl ProgressObserver for FinishFlag {
        fn batch_finished(&self, succeeded: bool) {
            self.0.store(true, Ordering::SeqCst);
            self.1.store(succeeded, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_completion_signalled_on_failure() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let blocked = output.path().join("combined_report.csv");
        fs::create_dir(&blocked).unwrap();
        let request = ScanRequest::new(input.path(), output.path(), config());
        let flag = FinishFlag(AtomicBool::new(false), AtomicBool::new(true));

        let result = scan_folder(&request, marker_factory("TESTKEY"), &flag);

        assert!(matches!(result, Err(ScanError::ReportWrite { .. })));
        assert!(flag.0.load(Ordering::SeqCst));
        assert!(!flag.1.load(Ordering::SeqCst));
    }

    #[test]
    fn test_invalid_config_rejected_before_scanning() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let request = ScanRequest::new(input.path(), output.path(), config().with_workers(0));

        let result = scan_folder(&request, marker_factory("TESTKEY"), &NoProgress);
        assert!(matches!(result, Err(ScanError::InvalidConfig(_))));
        assert!(!output.path().join("combined_report.csv").exists());
    }
}
