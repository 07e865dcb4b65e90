//! # Substack Archiver
//!
//! Signs in to a publication, grows its archive listing as far as needed and
//! saves the selected articles as PDFs.
//!
//! ## Usage
//!
//! ```sh
//! chromedriver --port=9515 &
//! SUBSTACK_USERNAME=me@example.com SUBSTACK_PASSWORD=... \
//!     substack_archiver --url example.substack.com recent --count 10
//! ```
//!
//! ## Pipeline
//!
//! 1. **Setup**: load config, check the output directory, open a WebDriver session
//! 2. **Sign-in**: walk the publisher's login UI
//! 3. **Download**: load the listing and export the selected articles
//! 4. **Report**: write `download_report.json` next to the PDFs

use clap::Parser;
use std::error::Error;
use substack_archiver::browser::webdriver::{SessionOptions, WebDriverClient};
use substack_archiver::cli::{Cli, Command};
use substack_archiver::outputs::json::write_report;
use substack_archiver::utils::{ensure_writable_dir, validate_root_url};
use substack_archiver::{ArchiveDownloader, Config, DownloadReport};
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("substack_archiver starting up");

    // Parse CLI
    let args = Cli::parse();
    debug!(url = %args.url, command = ?args.command, "Parsed CLI arguments");

    // ---- Load config, CLI flags win ----
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(dir) = args.output_dir.clone() {
        config.paths.output_dir = dir;
    }
    if let Some(url) = args.webdriver_url.clone() {
        config.webdriver_url = url;
    }
    if args.headed {
        config.headless = false;
    }

    // Early check: ensure output dir is writable
    if let Err(e) = ensure_writable_dir(&config.paths.output_dir).await {
        error!(
            path = %config.paths.output_dir.display(),
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e.into());
    }
    let output_dir = config.paths.output_dir.clone();

    // Reject a bad URL before a browser is started for it
    if let Err(e) = validate_root_url(&args.url) {
        error!(url = %args.url, error = %e, "Invalid publication URL");
        return Err(e.into());
    }

    // ---- Browser session ----
    let options = SessionOptions {
        headless: config.headless,
        download_dir: config.paths.temp_dir.clone(),
    };
    let client = WebDriverClient::connect(&config.webdriver_url, &options).await?;
    let mut downloader = ArchiveDownloader::new(client, &args.url, config)?;
    let archive_url = downloader.cache().archive_url().to_string();

    let outcome = run(&mut downloader, &args).await;

    // The session is closed whether or not the download succeeded.
    if let Err(e) = downloader.into_driver().close().await {
        warn!(error = %e, "Failed to close browser session");
    }
    let report = outcome?;

    if let Err(e) = write_report(&report, &archive_url, &output_dir).await {
        error!(error = %e, "Failed to write download report");
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        exported = report.exported.len(),
        skipped = report.skipped.len(),
        failed = report.failed.len(),
        "Execution complete"
    );

    if !report.is_success() {
        warn!(failed = report.failed.len(), "Some articles could not be exported; see the report");
    }
    Ok(())
}

async fn run(downloader: &mut ArchiveDownloader<WebDriverClient>, args: &Cli) -> substack_archiver::Result<DownloadReport> {
    downloader.load_credentials(args.username.clone(), args.password.clone());
    downloader.sign_in().await?;

    match args.command {
        Command::Recent { count } => downloader.download_k_most_recent(count).await,
        Command::Range { start, end } => downloader.download_date_range(start, end).await,
    }
}
