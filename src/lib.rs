//! # Substack Archiver
//!
//! Exports a newsletter publisher's archived articles to PDF through an
//! authenticated browser session.
//!
//! ## Architecture
//!
//! 1. **Session**: sign in through the publisher's login UI ([`session`])
//! 2. **Loading**: scroll the archive listing until it covers the request,
//!    parsing each preview into the [`cache::ArchiveCache`] ([`loader`])
//! 3. **Selection**: pick the newest `k` articles or a date range from the cache
//! 4. **Export**: render each article to `{YYYYMMDD} {title}.pdf` ([`outputs`])
//!
//! [`downloader::ArchiveDownloader`] ties these together behind one
//! [`browser::BrowserDriver`].

pub mod browser;
pub mod cache;
pub mod cli;
pub mod config;
pub mod dates;
pub mod downloader;
pub mod error;
pub mod loader;
pub mod models;
pub mod outputs;
pub mod session;
pub mod utils;

pub use cache::ArchiveCache;
pub use config::Config;
pub use dates::{DateKey, DateNormalizer};
pub use downloader::ArchiveDownloader;
pub use error::{ArchiveError, Result};
pub use models::{ArticleRecord, DownloadReport};
