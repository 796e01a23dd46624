mod cli;

use anyhow::Result;
use cli::Args;
use keyframe_scout::{scan_folder_with_tesseract, TerminalProgress};

fn main() -> Result<()> {
    // Load environment variables from .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    let args = Args::parse_args();
    let request = args.into_request()?;

    let progress = TerminalProgress::new();
    let summary = scan_folder_with_tesseract(&request, &progress)?;

    let skipped = summary.skipped().count();
    tracing::info!(
        "{} rows from {} video(s) written to {:?}",
        summary.rows,
        summary.videos.len() - skipped,
        summary.report_path
    );
    if skipped > 0 {
        tracing::warn!("{} video(s) skipped", skipped);
    }
    if !summary.is_clean() {
        tracing::warn!("Some frames failed or could not be saved; see warnings above");
    }

    Ok(())
}
