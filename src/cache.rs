//! In-memory archive cache.
//!
//! [`ArchiveCache`] holds every article discovered on one publication's archive
//! listing, in the order the listing presents them: newest first. The cache
//! never sorts and never deduplicates; the loader appends previews top to
//! bottom and is responsible for not appending a preview twice.
//!
//! All lookups are linear scans. Archives are small enough that this is not
//! a concern, and the query interface does not expose the backing `Vec`, so
//! a structure with logarithmic range queries could replace it later.

use crate::dates::DateKey;
use crate::error::{ArchiveError, Result};
use crate::models::ArticleRecord;
use tracing::trace;

/// Ordered, append-only store of [`ArticleRecord`]s for a single archive.
///
/// Invariant: dates are non-increasing from the first record to the last.
#[derive(Debug, Clone)]
pub struct ArchiveCache {
    root_url: String,
    archive_url: String,
    records: Vec<ArticleRecord>,
}

impl ArchiveCache {
    /// Create an empty cache for a validated root URL (no trailing slash).
    pub fn new(root_url: impl Into<String>) -> Self {
        let root_url = root_url.into();
        let archive_url = format!("{}/archive", root_url.trim_end_matches('/'));
        Self {
            root_url,
            archive_url,
            records: Vec::new(),
        }
    }

    pub fn root_url(&self) -> &str {
        &self.root_url
    }

    /// The listing page the loader grows.
    pub fn archive_url(&self) -> &str {
        &self.archive_url
    }

    /// Append a record to the tail.
    ///
    /// The caller must append in non-increasing date order. Debug builds
    /// assert this; release builds trust the caller.
    pub fn append(&mut self, date: DateKey, title: impl Into<String>, url: impl Into<String>) {
        self.push(ArticleRecord::new(date, title, url));
    }

    pub(crate) fn push(&mut self, record: ArticleRecord) {
        debug_assert!(
            self.records.last().is_none_or(|tail| tail.date >= record.date),
            "append out of order: {} after {}",
            record.date,
            self.records.last().map(|r| r.date.value()).unwrap_or_default(),
        );
        trace!(date = %record.date, title = %record.title, "Appending article to cache");
        self.records.push(record);
    }

    pub fn size(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ArticleRecord> {
        self.records.iter()
    }

    pub fn records(&self) -> &[ArticleRecord] {
        &self.records
    }

    /// All records published on `date`, in stored order.
    pub fn by_exact_date(&self, date: DateKey) -> Vec<ArticleRecord> {
        self.records
            .iter()
            .filter(|r| r.date == date)
            .cloned()
            .collect()
    }

    /// All records with `start <= date <= end`, in stored order.
    ///
    /// # Errors
    ///
    /// [`ArchiveError::InvalidRange`] when `end < start`.
    pub fn by_date_range(&self, start: DateKey, end: DateKey) -> Result<Vec<ArticleRecord>> {
        if end < start {
            return Err(ArchiveError::InvalidRange { start, end });
        }
        Ok(self
            .records
            .iter()
            .filter(|r| (start..=end).contains(&r.date))
            .cloned()
            .collect())
    }

    pub fn by_index(&self, index: usize) -> Result<&ArticleRecord> {
        self.records.get(index).ok_or(ArchiveError::IndexOutOfRange {
            index,
            size: self.records.len(),
        })
    }

    /// The newest record (first in storage).
    pub fn latest(&self) -> Result<&ArticleRecord> {
        self.records.first().ok_or(ArchiveError::EmptyCache)
    }

    /// The oldest record loaded so far (last in storage).
    pub fn earliest(&self) -> Result<&ArticleRecord> {
        self.records.last().ok_or(ArchiveError::EmptyCache)
    }

    /// The first `k` records, or every record when fewer than `k` are cached.
    ///
    /// # Errors
    ///
    /// [`ArchiveError::InvalidCount`] when `k == 0`.
    pub fn most_recent_k(&self, k: usize) -> Result<Vec<ArticleRecord>> {
        if k == 0 {
            return Err(ArchiveError::InvalidCount(k));
        }
        Ok(self.records.iter().take(k).cloned().collect())
    }
}
