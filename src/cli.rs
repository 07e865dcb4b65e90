//! Command-line interface definitions for the archive exporter.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Credentials and the WebDriver endpoint can also come from environment
//! variables.

use crate::dates::DateKey;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments for the archive exporter.
///
/// Flags given here override the matching values from the config file.
///
/// # Examples
///
/// ```sh
/// # Export the five newest articles
/// substack_archiver --url example.substack.com recent --count 5
///
/// # Export everything published in March 2024, with a visible browser
/// substack_archiver --url example.substack.com --headed \
///     range --start 2024-03-01 --end 2024-03-31
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Publication URL, e.g. example.substack.com
    #[arg(short, long)]
    pub url: String,

    /// Optional path to config.yaml file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory the PDFs and report are written to
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// WebDriver endpoint, e.g. http://localhost:9515
    #[arg(long, env = "WEBDRIVER_URL")]
    pub webdriver_url: Option<String>,

    /// Run a visible browser and save PDFs through its print dialog
    #[arg(long)]
    pub headed: bool,

    /// Account email
    #[arg(long, env = "SUBSTACK_USERNAME")]
    pub username: String,

    /// Account password
    #[arg(long, env = "SUBSTACK_PASSWORD", hide_env_values = true)]
    pub password: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Export the newest articles
    Recent {
        /// How many articles to export
        #[arg(short = 'k', long, default_value_t = 1)]
        count: usize,
    },
    /// Export articles published between two dates, inclusive
    Range {
        /// First day, as YYYY-MM-DD or YYYYMMDD
        #[arg(short, long)]
        start: DateKey,
        /// Last day, as YYYY-MM-DD or YYYYMMDD
        #[arg(short, long)]
        end: DateKey,
    },
}
