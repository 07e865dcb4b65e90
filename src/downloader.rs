//! Download orchestration.
//!
//! [`ArchiveDownloader`] owns one browser session and everything tied to it:
//! credentials, sign-in state, the archive cache and the loader. Its two
//! download policies share the same shape:
//!
//! 1. Gate on credentials and sign-in, then validate arguments. Failures
//!    here happen before any browser call.
//! 2. Grow the listing until the cache covers the request.
//! 3. Select the records from the cache.
//! 4. Export each one, isolating per-article failures in the report.

use crate::browser::BrowserDriver;
use crate::cache::ArchiveCache;
use crate::config::Config;
use crate::dates::{DateKey, DateNormalizer};
use crate::error::{ArchiveError, Result};
use crate::loader::IncrementalLoader;
use crate::models::{ArticleRecord, DownloadReport};
use crate::outputs::pdf::{ExportMode, PdfExporter};
use crate::session::{Credentials, SessionState, ready_to_download};
use crate::utils::validate_root_url;
use tracing::{info, instrument, warn};

/// Archive downloader bound to one publication and one browser session.
#[derive(Debug)]
pub struct ArchiveDownloader<D> {
    driver: D,
    config: Config,
    credentials: Credentials,
    session: SessionState,
    cache: ArchiveCache,
    loader: IncrementalLoader,
    exporter: PdfExporter,
}

impl<D: BrowserDriver> ArchiveDownloader<D> {
    /// Build a downloader for the publication at `input_url`.
    ///
    /// # Errors
    ///
    /// [`ArchiveError::InvalidUrl`] when `input_url` is not an HTTP(S) URL.
    pub fn new(driver: D, input_url: &str, config: Config) -> Result<Self> {
        let root_url = validate_root_url(input_url)?;
        let mode = if config.headless {
            ExportMode::Direct
        } else {
            ExportMode::PrintDialog {
                temp_dir: config.paths.temp_dir.clone(),
                poll: config.waits.print_poll(),
            }
        };
        let exporter = PdfExporter::new(config.paths.output_dir.clone(), mode);
        let loader = IncrementalLoader::new(
            config.selectors.clone(),
            config.waits.settle_delay(),
            DateNormalizer::default(),
        );
        info!(%root_url, headless = config.headless, "Archive downloader ready");
        Ok(Self {
            driver,
            cache: ArchiveCache::new(root_url),
            credentials: Credentials::default(),
            session: SessionState::default(),
            loader,
            exporter,
            config,
        })
    }

    /// Replace the date normalizer, e.g. to pin "today" for relative dates.
    pub fn with_date_normalizer(mut self, normalizer: DateNormalizer) -> Self {
        self.loader = IncrementalLoader::new(
            self.config.selectors.clone(),
            self.config.waits.settle_delay(),
            normalizer,
        );
        self
    }

    pub fn load_credentials(&mut self, username: impl Into<String>, password: impl Into<String>) {
        self.credentials.set(username, password);
    }

    /// Run the sign-in protocol. See [`SessionState::sign_in`].
    pub async fn sign_in(&mut self) -> Result<()> {
        let poll = self.config.waits.element_poll();
        self.session
            .sign_in(
                &self.driver,
                self.cache.archive_url(),
                &self.credentials,
                &self.config.selectors,
                &poll,
            )
            .await
    }

    pub fn sign_out(&mut self) {
        self.session.sign_out();
    }

    pub fn is_signed_in(&self) -> bool {
        self.session.is_authenticated()
    }

    pub fn ready_to_download(&self) -> Result<()> {
        ready_to_download(&self.credentials, &self.session)
    }

    pub fn cache(&self) -> &ArchiveCache {
        &self.cache
    }

    pub fn loader(&self) -> &IncrementalLoader {
        &self.loader
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Give back the browser session, e.g. to close it.
    pub fn into_driver(self) -> D {
        self.driver
    }

    /// Export the `k` newest articles.
    ///
    /// When the whole archive holds fewer than `k` articles, all of them are
    /// exported.
    #[instrument(level = "info", skip(self))]
    pub async fn download_k_most_recent(&mut self, k: usize) -> Result<DownloadReport> {
        self.ready_to_download()?;
        if k == 0 {
            return Err(ArchiveError::InvalidCount(k));
        }

        self.loader
            .load_k_into_cache(&self.driver, &mut self.cache, k)
            .await?;
        if self.cache.size() < k {
            warn!(requested = k, available = self.cache.size(), "Archive holds fewer articles than requested");
        }
        let records = self.cache.most_recent_k(k)?;
        self.export(&records).await
    }

    /// Export every article published between `start` and `end`, inclusive.
    #[instrument(level = "info", skip(self), fields(%start, %end))]
    pub async fn download_date_range(&mut self, start: DateKey, end: DateKey) -> Result<DownloadReport> {
        self.ready_to_download()?;
        if end < start {
            return Err(ArchiveError::InvalidRange { start, end });
        }

        self.loader
            .load_all_after_start_date(&self.driver, &mut self.cache, start)
            .await?;
        let records = self.cache.by_date_range(start, end)?;
        self.export(&records).await
    }

    async fn export(&self, records: &[ArticleRecord]) -> Result<DownloadReport> {
        info!(count = records.len(), "Exporting articles");
        tokio::fs::create_dir_all(self.exporter.output_dir()).await?;
        Ok(self.exporter.export_all(&self.driver, records).await)
    }
}
