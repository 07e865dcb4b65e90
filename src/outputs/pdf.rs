//! PDF export of cached articles.
//!
//! Each article lands at `{output_dir}/{YYYYMMDD} {clean title}.pdf`. If that
//! file already exists the article is skipped, which makes re-running a
//! download cheap. Two articles sharing both date and cleaned title map to
//! the same file; the second is skipped.
//!
//! # Modes
//!
//! - [`ExportMode::Direct`]: the driver renders the page to PDF and returns
//!   it base64-encoded; the bytes are validated and written directly.
//! - [`ExportMode::PrintDialog`]: the page's print dialog saves a PDF into a
//!   temp directory, which is then moved to the final path. Only a PDF that
//!   was not in the temp directory before the print is taken, and only once
//!   its size stops changing.

use crate::browser::BrowserDriver;
use crate::browser::wait::BoundedPoll;
use crate::error::{ArchiveError, Result};
use crate::models::{ArticleRecord, DownloadReport, FailedExport};
use crate::utils::clean_filename;
use base64::{Engine as _, engine::general_purpose};
use std::cell::Cell;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, error, info, instrument, warn};

const PDF_MAGIC: &[u8] = b"%PDF-";

/// How the rendered page becomes a PDF file.
#[derive(Debug, Clone)]
pub enum ExportMode {
    Direct,
    PrintDialog { temp_dir: PathBuf, poll: BoundedPoll },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Exported(PathBuf),
    /// A file already existed at the derived path.
    Skipped(PathBuf),
}

#[derive(Debug, Clone)]
pub struct PdfExporter {
    output_dir: PathBuf,
    mode: ExportMode,
}

impl PdfExporter {
    pub fn new(output_dir: impl Into<PathBuf>, mode: ExportMode) -> Self {
        Self {
            output_dir: output_dir.into(),
            mode,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Derived destination for `record`.
    pub fn output_path(&self, record: &ArticleRecord) -> PathBuf {
        self.output_dir
            .join(format!("{} {}.pdf", record.date, clean_filename(&record.title)))
    }

    /// Export one article unless its file already exists.
    #[instrument(level = "info", skip_all, fields(date = %record.date, url = %record.url))]
    pub async fn export<D: BrowserDriver>(&self, driver: &D, record: &ArticleRecord) -> Result<ExportOutcome> {
        let path = self.output_path(record);
        if fs::try_exists(&path).await? {
            debug!(path = %path.display(), "PDF already exists; skipping");
            return Ok(ExportOutcome::Skipped(path));
        }

        driver.navigate(&record.url).await?;
        match &self.mode {
            ExportMode::Direct => {
                let encoded = driver.print_page().await?;
                let bytes = decode_pdf(&encoded)?;
                fs::write(&path, bytes).await?;
            }
            ExportMode::PrintDialog { temp_dir, poll } => {
                fs::create_dir_all(temp_dir).await?;
                let stale = pdf_files(temp_dir).await?;
                if !stale.is_empty() {
                    debug!(count = stale.len(), "Ignoring PDFs already in temp dir");
                }
                driver.evaluate_script("window.print();").await?;
                let printed = poll
                    .until(|| new_pdf(temp_dir, &stale))
                    .await?
                    .ok_or_else(|| ArchiveError::Pdf(format!("no new PDF appeared in {}", temp_dir.display())))?;
                wait_until_written(&printed, poll).await?;
                move_file(&printed, &path).await?;
            }
        }

        info!(path = %path.display(), "Exported PDF");
        Ok(ExportOutcome::Exported(path))
    }

    /// Export every record in order.
    ///
    /// A failing article is logged and recorded in the report; the rest of
    /// the batch still runs.
    #[instrument(level = "info", skip_all, fields(count = records.len()))]
    pub async fn export_all<D: BrowserDriver>(&self, driver: &D, records: &[ArticleRecord]) -> DownloadReport {
        let mut report = DownloadReport::default();
        for record in records {
            match self.export(driver, record).await {
                Ok(ExportOutcome::Exported(path)) => report.exported.push(path),
                Ok(ExportOutcome::Skipped(path)) => report.skipped.push(path),
                Err(e) => {
                    error!(error = %e, title = %record.title, "Export failed; continuing with next article");
                    report.failed.push(FailedExport {
                        article: record.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }
        info!(
            exported = report.exported.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "Export batch complete"
        );
        report
    }
}

/// Decode a base64 PDF payload and check it is actually a PDF.
pub fn decode_pdf(encoded: &str) -> Result<Vec<u8>> {
    let bytes = general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| ArchiveError::Pdf(format!("invalid base64: {e}")))?;
    if !bytes.starts_with(PDF_MAGIC) {
        return Err(ArchiveError::Pdf("payload is not a PDF document".to_string()));
    }
    Ok(bytes)
}

/// Every `*.pdf` file directly inside `dir`.
async fn pdf_files(dir: &Path) -> Result<HashSet<PathBuf>> {
    let mut found = HashSet::new();
    let mut entries = fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_pdf = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
        if is_pdf && entry.file_type().await?.is_file() {
            found.insert(path);
        }
    }
    Ok(found)
}

/// A `*.pdf` in `dir` that was not there before the print.
async fn new_pdf(dir: &Path, stale: &HashSet<PathBuf>) -> Result<Option<PathBuf>> {
    let mut fresh: Vec<PathBuf> = pdf_files(dir).await?.difference(stale).cloned().collect();
    fresh.sort();
    Ok(fresh.into_iter().next())
}

/// Wait until `path` is non-empty and its size holds steady between two polls.
async fn wait_until_written(path: &Path, poll: &BoundedPoll) -> Result<()> {
    let last_len = Cell::new(None);
    let settled = poll
        .until(|| {
            let last_len = &last_len;
            async move {
                let len = fs::metadata(path).await?.len();
                let previous = last_len.replace(Some(len));
                Ok((len > 0 && previous == Some(len)).then_some(()))
            }
        })
        .await?;
    settled.ok_or_else(|| ArchiveError::Pdf(format!("{} never finished writing", path.display())))
}

/// Rename, falling back to copy + remove across filesystems.
async fn move_file(from: &Path, to: &Path) -> Result<()> {
    if fs::rename(from, to).await.is_ok() {
        return Ok(());
    }
    warn!(from = %from.display(), to = %to.display(), "Rename failed; copying instead");
    fs::copy(from, to).await?;
    fs::remove_file(from).await?;
    Ok(())
}
