//! Incremental loading of the archive listing.
//!
//! The listing page only renders a first batch of previews and appends more
//! as the reader scrolls. [`IncrementalLoader`] drives that growth:
//!
//! 1. Navigate to the listing (resetting scroll position).
//! 2. Record the content height.
//! 3. Scroll to the bottom and wait the settle delay.
//! 4. Re-measure the height and enumerate visible previews.
//! 5. Stop when the target is met or the height did not change; otherwise
//!    go back to 3.
//!
//! Once growth stops, an extraction pass reads each visible preview top to
//! bottom and appends the ones the cache does not hold yet.
//!
//! # Assumptions
//!
//! - The listing is newest-first and does not change during a session, so
//!   the first `cache.size()` visible previews are exactly the cached ones.
//! - The cache is never refreshed: once a range is covered, later calls
//!   are no-ops even if the publisher has posted since.

use crate::browser::fragment::Fragment;
use crate::browser::{BrowserDriver, ElementHandle};
use crate::cache::ArchiveCache;
use crate::config::Selectors;
use crate::dates::{DateKey, DateNormalizer};
use crate::error::{ArchiveError, Result};
use crate::models::{ArticleRecord, PreviewTriple};
use crate::utils::truncate_for_log;
use serde_json::Value;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, instrument, trace, warn};
use url::Url;

const SCROLL_TO_BOTTOM: &str = "window.scrollTo(0, document.body.scrollHeight);";
const CONTENT_HEIGHT: &str = "return document.body.scrollHeight";

/// Why a growth loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// A scroll did not grow the page: the listing is exhausted.
    HeightUnchanged,
    TargetReached,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Idle,
    Scrolling,
    Stable(StopReason),
}

/// What a growth loop is scrolling towards.
#[derive(Debug, Clone, Copy)]
enum Target {
    /// At least this many previews visible.
    Count(usize),
    /// The last visible preview strictly older than this date.
    OlderThan(DateKey),
}

/// Grows the archive listing and feeds newly visible previews into an
/// [`ArchiveCache`].
#[derive(Debug)]
pub struct IncrementalLoader {
    selectors: Selectors,
    settle_delay: Duration,
    normalizer: DateNormalizer,
    state: LoadState,
    passes: usize,
}

impl IncrementalLoader {
    pub fn new(selectors: Selectors, settle_delay: Duration, normalizer: DateNormalizer) -> Self {
        Self {
            selectors,
            settle_delay,
            normalizer,
            state: LoadState::Idle,
            passes: 0,
        }
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    /// Number of growth loops run so far.
    pub fn passes(&self) -> usize {
        self.passes
    }

    /// Ensure the cache holds at least `k` records, if the archive has them.
    ///
    /// No-op when the cache already holds `k` or more.
    #[instrument(level = "info", skip_all, fields(k = k, cached = cache.size()))]
    pub async fn load_k_into_cache<D: BrowserDriver>(
        &mut self,
        driver: &D,
        cache: &mut ArchiveCache,
        k: usize,
    ) -> Result<()> {
        if cache.size() >= k {
            debug!("Cache already holds enough articles; skipping load");
            return Ok(());
        }
        self.scroll_until_count(driver, cache.archive_url(), k).await?;
        self.extract_visible_into(driver, cache).await?;
        Ok(())
    }

    /// Ensure the cache covers every article published on or after `start`.
    ///
    /// No-op when the earliest cached record already predates `start`.
    #[instrument(level = "info", skip_all, fields(%start, cached = cache.size()))]
    pub async fn load_all_after_start_date<D: BrowserDriver>(
        &mut self,
        driver: &D,
        cache: &mut ArchiveCache,
        start: DateKey,
    ) -> Result<()> {
        if let Ok(earliest) = cache.earliest() {
            if earliest.date < start {
                debug!(earliest = %earliest.date, "Range already covered; skipping load");
                return Ok(());
            }
        }
        self.scroll_until_date(driver, cache.archive_url(), start).await?;
        self.extract_visible_into(driver, cache).await?;
        Ok(())
    }

    /// Scroll until `k` previews are visible or the listing stops growing.
    pub async fn scroll_until_count<D: BrowserDriver>(
        &mut self,
        driver: &D,
        archive_url: &str,
        k: usize,
    ) -> Result<StopReason> {
        self.grow(driver, archive_url, Target::Count(k)).await
    }

    /// Scroll until the last visible preview is strictly older than `start`
    /// or the listing stops growing.
    ///
    /// The comparison is strict so same-day articles on the boundary are
    /// still loaded.
    pub async fn scroll_until_date<D: BrowserDriver>(
        &mut self,
        driver: &D,
        archive_url: &str,
        start: DateKey,
    ) -> Result<StopReason> {
        self.grow(driver, archive_url, Target::OlderThan(start)).await
    }

    #[instrument(level = "info", skip(self, driver, target), fields(target = ?target))]
    async fn grow<D: BrowserDriver>(
        &mut self,
        driver: &D,
        archive_url: &str,
        target: Target,
    ) -> Result<StopReason> {
        self.passes += 1;
        self.state = LoadState::Scrolling;
        driver.navigate(archive_url).await?;

        let mut height_before = content_height(driver).await?;
        let mut scrolls = 0usize;
        let reason = loop {
            driver.evaluate_script(SCROLL_TO_BOTTOM).await?;
            sleep(self.settle_delay).await;
            scrolls += 1;

            let previews = driver.find_elements(&self.selectors.article_preview).await?;
            let height_after = content_height(driver).await?;
            trace!(scrolls, height_before, height_after, visible = previews.len(), "Scrolled");

            let reached = match target {
                Target::Count(k) => previews.len() >= k,
                Target::OlderThan(start) => match previews.last() {
                    Some(last) => self.read_preview(driver, last).await?.date < start,
                    None => false,
                },
            };
            if reached {
                break StopReason::TargetReached;
            }
            if height_after == height_before {
                break StopReason::HeightUnchanged;
            }
            height_before = height_after;
        };

        self.state = LoadState::Stable(reason);
        info!(scrolls, ?reason, "Archive listing stable");
        Ok(reason)
    }

    /// Append every visible preview the cache does not already hold.
    ///
    /// Previews are read top to bottom (newest to oldest). All new previews
    /// are parsed before any is appended, so a preview that fails to parse
    /// leaves the cache unchanged.
    ///
    /// # Returns
    ///
    /// The number of records appended.
    #[instrument(level = "info", skip_all, fields(cached = cache.size()))]
    pub async fn extract_visible_into<D: BrowserDriver>(
        &self,
        driver: &D,
        cache: &mut ArchiveCache,
    ) -> Result<usize> {
        let previews = driver.find_elements(&self.selectors.article_preview).await?;
        let known = cache.size();
        if previews.len() < known {
            warn!(visible = previews.len(), known, "Fewer previews visible than already cached");
        }

        let mut staged = Vec::with_capacity(previews.len().saturating_sub(known));
        for preview in previews.iter().skip(known) {
            let record = self.read_preview(driver, preview).await?;
            staged.push(resolve(record, cache.root_url())?);
        }

        let appended = staged.len();
        for record in staged {
            cache.push(record);
        }
        info!(appended, total = cache.size(), "Extracted visible previews into cache");
        Ok(appended)
    }

    async fn read_preview<D: BrowserDriver>(
        &self,
        driver: &D,
        preview: &ElementHandle,
    ) -> Result<ArticleRecord> {
        let html = driver.outer_html(preview).await?;
        let triple = self.parse_triple(&html).inspect_err(|e| {
            warn!(error = %e, html = %truncate_for_log(&html, 300), "Unreadable article preview");
        })?;
        let date = self.normalizer.normalize(&triple.raw_date)?;
        Ok(ArticleRecord::new(date, triple.title, triple.href))
    }

    fn parse_triple(&self, html: &str) -> Result<PreviewTriple> {
        let fragment = Fragment::parse(html);
        Ok(PreviewTriple {
            raw_date: fragment.text(&self.selectors.preview_date)?,
            title: fragment.text(&self.selectors.preview_title)?,
            href: fragment.attr(&self.selectors.preview_link, "href")?,
        })
    }
}

async fn content_height<D: BrowserDriver>(driver: &D) -> Result<u64> {
    let value = driver.evaluate_script(CONTENT_HEIGHT).await?;
    match value {
        Value::Number(n) => Ok(n.as_u64().or_else(|| n.as_f64().map(|f| f as u64)).unwrap_or_default()),
        other => Err(ArchiveError::Driver {
            error: "unexpected script result".to_string(),
            message: format!("content height was {other}"),
        }),
    }
}

/// Make site-relative links absolute against the archive root.
fn resolve(mut record: ArticleRecord, root_url: &str) -> Result<ArticleRecord> {
    if Url::parse(&record.url).is_ok() {
        return Ok(record);
    }
    let base = Url::parse(root_url).map_err(|e| ArchiveError::InvalidUrl {
        url: root_url.to_string(),
        reason: e.to_string(),
    })?;
    let joined = base.join(&record.url).map_err(|e| ArchiveError::InvalidUrl {
        url: record.url.clone(),
        reason: e.to_string(),
    })?;
    record.url = joined.to_string();
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::mock::{MockBrowser, preview_html};
    use chrono::NaiveDate;
    use itertools::Itertools;

    const ROOT: &str = "https://example.substack.com";
    const ARCHIVE: &str = "https://example.substack.com/archive";

    const LISTING: [(&str, &str, &str); 7] = [
        ("Mar 10, 2024", "Ten", "https://example.substack.com/p/ten"),
        ("Mar 8, 2024", "Eight", "https://example.substack.com/p/eight"),
        ("Mar 5, 2024", "Five A", "https://example.substack.com/p/five-a"),
        ("Mar 5, 2024", "Five B", "https://example.substack.com/p/five-b"),
        ("Mar 1, 2024", "One", "/p/one"),
        ("Feb 20, 2024", "Twenty", "https://example.substack.com/p/twenty"),
        ("Feb 1, 2024", "Feb One", "https://example.substack.com/p/feb-one"),
    ];

    fn date(v: u32) -> DateKey {
        DateKey::from_ymd_int(v).unwrap()
    }

    fn browser_with(listing: &[(&str, &str, &str)], page_size: usize) -> MockBrowser {
        let previews = listing
            .iter()
            .map(|(d, t, h)| preview_html(d, t, h))
            .collect();
        MockBrowser::new(ARCHIVE, Selectors::default().article_preview, previews, page_size)
    }

    fn loader() -> IncrementalLoader {
        let today = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        IncrementalLoader::new(Selectors::default(), Duration::ZERO, DateNormalizer::new(today))
    }

    fn assert_reverse_chronological(cache: &ArchiveCache) {
        assert!(cache.iter().tuple_windows().all(|(a, b)| a.date >= b.date));
    }

    #[tokio::test]
    async fn test_count_target_stops_once_enough_are_visible() {
        let browser = browser_with(&LISTING, 2);
        let mut loader = loader();
        let mut cache = ArchiveCache::new(ROOT);

        loader.load_k_into_cache(&browser, &mut cache, 3).await.unwrap();

        assert_eq!(browser.scrolls(), 1);
        assert_eq!(loader.state(), LoadState::Stable(StopReason::TargetReached));
        // Everything visible is extracted, not just k.
        assert_eq!(cache.size(), 4);
        assert_eq!(cache.latest().unwrap().title, "Ten");
        assert_reverse_chronological(&cache);
    }

    #[tokio::test]
    async fn test_count_target_beyond_archive_stops_on_unchanged_height() {
        let browser = browser_with(&LISTING, 3);
        let mut loader = loader();
        let mut cache = ArchiveCache::new(ROOT);

        loader.load_k_into_cache(&browser, &mut cache, 100).await.unwrap();

        assert_eq!(loader.state(), LoadState::Stable(StopReason::HeightUnchanged));
        assert_eq!(cache.size(), LISTING.len());
        assert_eq!(cache.earliest().unwrap().title, "Feb One");
    }

    #[tokio::test]
    async fn test_repeated_load_is_a_no_op() {
        let browser = browser_with(&LISTING, 2);
        let mut loader = loader();
        let mut cache = ArchiveCache::new(ROOT);

        loader.load_k_into_cache(&browser, &mut cache, 3).await.unwrap();
        let calls = browser.total_calls();
        let passes = loader.passes();

        loader.load_k_into_cache(&browser, &mut cache, 3).await.unwrap();
        loader.load_k_into_cache(&browser, &mut cache, 4).await.unwrap();

        assert_eq!(browser.total_calls(), calls);
        assert_eq!(loader.passes(), passes);
        assert_eq!(cache.size(), 4);
    }

    #[tokio::test]
    async fn test_larger_reload_appends_only_new_previews() {
        let browser = browser_with(&LISTING, 2);
        let mut loader = loader();
        let mut cache = ArchiveCache::new(ROOT);

        loader.load_k_into_cache(&browser, &mut cache, 3).await.unwrap();
        loader.load_k_into_cache(&browser, &mut cache, 6).await.unwrap();

        assert_eq!(loader.passes(), 2);
        assert_eq!(browser.navigations(), vec![ARCHIVE.to_string(), ARCHIVE.to_string()]);
        assert_eq!(cache.size(), 6);
        assert!(cache.iter().map(|r| &r.url).all_unique());
        assert_reverse_chronological(&cache);
    }

    #[tokio::test]
    async fn test_date_target_is_strict_about_boundary_day() {
        let browser = browser_with(&LISTING, 2);
        let mut loader = loader();
        let mut cache = ArchiveCache::new(ROOT);

        loader
            .load_all_after_start_date(&browser, &mut cache, date(20240305))
            .await
            .unwrap();

        // After one scroll the last visible preview is dated exactly Mar 5,
        // which is not strictly older, so a second scroll happens.
        assert_eq!(browser.scrolls(), 2);
        assert_eq!(loader.state(), LoadState::Stable(StopReason::TargetReached));
        assert_eq!(cache.size(), 6);
        assert_eq!(cache.by_exact_date(date(20240305)).len(), 2);
        assert_eq!(cache.earliest().unwrap().date, date(20240220));
    }

    #[tokio::test]
    async fn test_date_target_older_than_archive_loads_everything() {
        let browser = browser_with(&LISTING, 2);
        let mut loader = loader();
        let mut cache = ArchiveCache::new(ROOT);

        loader
            .load_all_after_start_date(&browser, &mut cache, date(20230101))
            .await
            .unwrap();

        assert_eq!(loader.state(), LoadState::Stable(StopReason::HeightUnchanged));
        assert_eq!(cache.size(), LISTING.len());
        assert_eq!(cache.earliest().unwrap().title, "Feb One");
        assert_reverse_chronological(&cache);
    }

    #[tokio::test]
    async fn test_covered_date_range_is_not_reloaded() {
        let browser = browser_with(&LISTING, 2);
        let mut loader = loader();
        let mut cache = ArchiveCache::new(ROOT);

        loader
            .load_all_after_start_date(&browser, &mut cache, date(20240305))
            .await
            .unwrap();
        let calls = browser.total_calls();

        loader
            .load_all_after_start_date(&browser, &mut cache, date(20240301))
            .await
            .unwrap();

        assert_eq!(browser.total_calls(), calls);
        assert_eq!(loader.passes(), 1);
    }

    #[tokio::test]
    async fn test_relative_links_are_resolved() {
        let browser = browser_with(&LISTING, 7);
        let mut loader = loader();
        let mut cache = ArchiveCache::new(ROOT);

        loader.load_k_into_cache(&browser, &mut cache, 7).await.unwrap();

        assert_eq!(cache.by_index(4).unwrap().url, "https://example.substack.com/p/one");
    }

    #[tokio::test]
    async fn test_unparseable_date_aborts_without_touching_cache() {
        let listing = [
            ("Mar 10, 2024", "Ten", "https://example.substack.com/p/ten"),
            ("the ides of March", "Bad", "https://example.substack.com/p/bad"),
        ];
        let browser = browser_with(&listing, 2);
        let mut loader = loader();
        let mut cache = ArchiveCache::new(ROOT);

        let err = loader.load_k_into_cache(&browser, &mut cache, 2).await.unwrap_err();

        assert!(matches!(err, ArchiveError::ParseError(raw) if raw == "the ides of March"));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_preview_missing_fields_is_element_not_found() {
        let previews = vec![r#"<div class="post-preview-content"><p>no title</p></div>"#.to_string()];
        let browser = MockBrowser::new(ARCHIVE, Selectors::default().article_preview, previews, 1);
        let mut cache = ArchiveCache::new(ROOT);

        browser.navigate(ARCHIVE).await.unwrap();
        let err = loader().extract_visible_into(&browser, &mut cache).await.unwrap_err();

        assert!(matches!(err, ArchiveError::ElementNotFound(_)));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_loader_starts_idle() {
        assert_eq!(loader().state(), LoadState::Idle);
        assert_eq!(loader().passes(), 0);
    }
}
