//! Error taxonomy for the archive cache, loader, session and export layers.
//!
//! Validation failures ([`ArchiveError::InvalidRange`], [`ArchiveError::InvalidCount`],
//! and the two gating errors) are raised before any browser interaction, so a
//! caller that receives one can assume nothing was navigated, loaded or written.

use crate::dates::DateKey;
use crate::session::SignInStep;
use thiserror::Error;

/// Errors produced by the archiver core and its browser/export collaborators.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Credentials were never loaded into the downloader.
    #[error("credentials have not been loaded")]
    CredentialsNotLoaded,

    /// No successful sign-in has happened in this session.
    #[error("not signed in")]
    NotSignedIn,

    /// A date range whose end precedes its start.
    #[error("invalid date range: end {end} precedes start {start}")]
    InvalidRange { start: DateKey, end: DateKey },

    /// A top-k request with `k == 0`.
    #[error("article count must be at least 1, got {0}")]
    InvalidCount(usize),

    /// `latest`/`earliest` on a cache with no records.
    #[error("archive cache is empty")]
    EmptyCache,

    #[error("index {index} out of range for cache of size {size}")]
    IndexOutOfRange { index: usize, size: usize },

    /// A preview date string matching none of the rendered formats.
    #[error("unrecognized date format: {0:?}")]
    ParseError(String),

    /// A sign-in step's target element never appeared within its deadline.
    #[error("sign-in step {step} timed out waiting for {locator}")]
    ElementTimeout { step: SignInStep, locator: String },

    /// Any other failure during a sign-in step, tagged with that step.
    #[error("sign-in step {step} failed: {source}")]
    SignInFailed {
        step: SignInStep,
        source: Box<ArchiveError>,
    },

    #[error("element not found: {0}")]
    ElementNotFound(String),

    #[error("invalid selector {0:?}")]
    InvalidSelector(String),

    #[error("invalid archive url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The WebDriver endpoint answered with a protocol-level error.
    #[error("webdriver error ({error}): {message}")]
    Driver { error: String, message: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The exported payload was not a decodable PDF.
    #[error("invalid PDF payload: {0}")]
    Pdf(String),

    #[error("failed to parse configuration: {0}")]
    Config(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, ArchiveError>;
