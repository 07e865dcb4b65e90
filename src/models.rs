//! Data models for archived articles and download results.
//!
//! - [`PreviewTriple`]: raw text pulled from one article preview on the listing page
//! - [`ArticleRecord`]: a normalized, immutable cache entry
//! - [`DownloadReport`]: per-batch outcome of an export run

use crate::dates::DateKey;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The raw `(date, title, href)` text of one article preview, before the
/// date is normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewTriple {
    /// The date as rendered on the preview (e.g. `"Mar 5, 2024"`).
    pub raw_date: String,
    pub title: String,
    pub href: String,
}

/// An article discovered on the archive listing page.
///
/// Records are immutable once created; the cache only ever appends them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRecord {
    /// Publication date key (`YYYYMMDD`).
    pub date: DateKey,
    /// The article title/headline as shown on the preview.
    pub title: String,
    /// Absolute or site-relative link to the article.
    pub url: String,
}

impl ArticleRecord {
    pub fn new(date: DateKey, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            date,
            title: title.into(),
            url: url.into(),
        }
    }
}

/// An article whose export failed, with the error rendered for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedExport {
    pub article: ArticleRecord,
    pub error: String,
}

/// Outcome of a download batch.
///
/// One failing article does not abort the batch; it lands in `failed` and
/// the remaining articles are still exported.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadReport {
    /// Newly written PDFs.
    pub exported: Vec<PathBuf>,
    /// PDFs that already existed at their derived path.
    pub skipped: Vec<PathBuf>,
    pub failed: Vec<FailedExport>,
}

impl DownloadReport {
    /// Total number of articles this batch attempted.
    pub fn attempted(&self) -> usize {
        self.exported.len() + self.skipped.len() + self.failed.len()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}
