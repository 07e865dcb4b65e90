//! JSON download report.
//!
//! After each batch the downloader's [`DownloadReport`] is written next to the
//! PDFs so a run's exports, skips and failures can be inspected afterwards:
//!
//! ```text
//! output_dir/
//! ├── 20240310 First post.pdf
//! ├── 20240305 Second post.pdf
//! └── download_report.json
//! ```
//!
//! The file is overwritten by every run.

use crate::error::Result;
use crate::models::DownloadReport;
use chrono::Local;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument};

pub const REPORT_FILENAME: &str = "download_report.json";

#[derive(Debug, Serialize)]
struct ReportFile<'a> {
    generated_at: String,
    archive_url: &'a str,
    #[serde(flatten)]
    report: &'a DownloadReport,
}

/// Write `report` to `{output_dir}/download_report.json`.
///
/// # Returns
///
/// The path written.
#[instrument(level = "info", skip_all, fields(output_dir = %output_dir.display()))]
pub async fn write_report(report: &DownloadReport, archive_url: &str, output_dir: &Path) -> Result<PathBuf> {
    let file = ReportFile {
        generated_at: Local::now().to_rfc3339(),
        archive_url,
        report,
    };
    let json = serde_json::to_string_pretty(&file).map_err(std::io::Error::other)?;

    if let Err(e) = fs::create_dir_all(output_dir).await {
        error!(error = %e, "Failed to create report dir");
        return Err(e.into());
    }

    let path = output_dir.join(REPORT_FILENAME);
    fs::write(&path, json).await?;
    info!(path = %path.display(), "Wrote download report");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::DateKey;
    use crate::models::{ArticleRecord, FailedExport};

    #[tokio::test]
    async fn test_write_report() {
        let dir = tempfile::tempdir().unwrap();
        let report = DownloadReport {
            exported: vec![dir.path().join("20240310 A.pdf")],
            skipped: Vec::new(),
            failed: vec![FailedExport {
                article: ArticleRecord::new(DateKey::from_ymd_int(20240305).unwrap(), "B", "/b"),
                error: "print failed".to_string(),
            }],
        };

        let path = write_report(&report, "https://example.substack.com/archive", dir.path())
            .await
            .unwrap();

        assert_eq!(path, dir.path().join(REPORT_FILENAME));
        let written: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["archive_url"], "https://example.substack.com/archive");
        assert_eq!(written["exported"].as_array().unwrap().len(), 1);
        assert_eq!(written["failed"][0]["article"]["date"], 20240305);
        assert_eq!(written["failed"][0]["error"], "print failed");
        assert!(written["generated_at"].is_string());
    }
}
