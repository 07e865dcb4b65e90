//! YAML configuration.
//!
//! Every field has a default matching the publisher's current markup, so an
//! empty (or absent) config file is valid. A typical override file:
//!
//! ```yaml
//! webdriver_url: http://localhost:4444
//! headless: false
//! waits:
//!   settle_delay_ms: 5000
//! selectors:
//!   menu_button:
//!     css: ".menu-button > svg"
//!   preview_date:
//!     tag: td
//!     class: post-meta-item post-date
//! paths:
//!   output_dir: ./pdfs
//! ```

use crate::browser::Locator;
use crate::browser::fragment::FindArgs;
use crate::browser::wait::BoundedPoll;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, instrument};

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the WebDriver endpoint.
    pub webdriver_url: String,
    /// Headless sessions print through the driver; headed sessions print
    /// through the browser's print dialog into `paths.temp_dir`.
    pub headless: bool,
    pub selectors: Selectors,
    pub waits: Waits,
    pub paths: Paths,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:9515".to_string(),
            headless: true,
            selectors: Selectors::default(),
            waits: Waits::default(),
            paths: Paths::default(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file.
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config = Self::from_yaml(&raw)?;
        info!("Loaded configuration");
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }
}

/// Element locators for sign-in and the archive listing, plus the
/// fragment lookups used inside each article preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Selectors {
    pub menu_button: Locator,
    pub go_to_login: Locator,
    pub password_login: Locator,
    pub username_field: Locator,
    pub password_field: Locator,
    pub submit_button: Locator,
    pub article_preview: Locator,
    pub preview_date: FindArgs,
    pub preview_title: FindArgs,
    pub preview_link: FindArgs,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            menu_button: Locator::Css(".menu-button > svg".to_string()),
            go_to_login: Locator::LinkText("Log in".to_string()),
            password_login: Locator::LinkText("log in with password".to_string()),
            username_field: Locator::XPath(r#"//input[@name="email"]"#.to_string()),
            password_field: Locator::XPath(r#"//input[@name="password"]"#.to_string()),
            submit_button: Locator::XPath(r#"//button[@type="submit"]"#.to_string()),
            article_preview: Locator::XPath(r#"//*[@class="post-preview-content"]"#.to_string()),
            preview_date: FindArgs::new("td", "post-meta-item post-date"),
            preview_title: FindArgs::new("a", "post-preview-title newsletter"),
            preview_link: FindArgs::new("a", "post-preview-title newsletter"),
        }
    }
}

/// Wait timings, all in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Waits {
    /// Pause after each scroll for the listing to fetch more previews.
    pub settle_delay_ms: u64,
    /// Deadline for each sign-in step's target element.
    pub element_timeout_ms: u64,
    pub poll_interval_ms: u64,
    /// Deadline for the print dialog to drop a PDF into the temp directory.
    pub print_timeout_ms: u64,
}

impl Default for Waits {
    fn default() -> Self {
        Self {
            settle_delay_ms: 3_000,
            element_timeout_ms: 10_000,
            poll_interval_ms: 250,
            print_timeout_ms: 30_000,
        }
    }
}

impl Waits {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn element_poll(&self) -> BoundedPoll {
        BoundedPoll::new(
            Duration::from_millis(self.poll_interval_ms),
            Duration::from_millis(self.element_timeout_ms),
        )
    }

    pub fn print_poll(&self) -> BoundedPoll {
        BoundedPoll::new(
            Duration::from_millis(self.poll_interval_ms),
            Duration::from_millis(self.print_timeout_ms),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Paths {
    /// Final destination of exported PDFs.
    pub output_dir: PathBuf,
    /// Where the print dialog saves PDFs before they are moved.
    pub temp_dir: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            temp_dir: std::env::temp_dir().join("substack_archiver"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_yaml_yields_defaults() {
        assert_eq!(Config::from_yaml("").unwrap(), Config::default());
        assert_eq!(Config::from_yaml("   \n").unwrap(), Config::default());
    }

    #[test]
    fn test_partial_override_keeps_other_defaults() {
        let yaml = r#"
headless: false
waits:
  settle_delay_ms: 5000
paths:
  output_dir: ./pdfs
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert!(!config.headless);
        assert_eq!(config.waits.settle_delay(), Duration::from_secs(5));
        assert_eq!(config.waits.element_timeout_ms, 10_000);
        assert_eq!(config.paths.output_dir, PathBuf::from("./pdfs"));
        assert_eq!(config.selectors, Selectors::default());
        assert_eq!(config.webdriver_url, "http://localhost:9515");
    }

    #[test]
    fn test_selector_override() {
        let yaml = r#"
selectors:
  menu_button:
    css: "button.menu"
  article_preview:
    xpath: "//div[@class='preview']"
  preview_date:
    tag: time
    class: date
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.selectors.menu_button, Locator::Css("button.menu".to_string()));
        assert_eq!(
            config.selectors.article_preview,
            Locator::XPath("//div[@class='preview']".to_string())
        );
        assert_eq!(config.selectors.preview_date, FindArgs::new("time", "date"));
        assert_eq!(config.selectors.go_to_login, Locator::LinkText("Log in".to_string()));
    }

    #[test]
    fn test_malformed_yaml_is_an_error() {
        assert!(Config::from_yaml("waits: [1, 2").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "webdriver_url: http://grid:4444\n").unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.webdriver_url, "http://grid:4444");
    }

    #[test]
    fn test_poll_settings() {
        let waits = Waits::default();
        let poll = waits.element_poll();
        assert_eq!(poll.interval, Duration::from_millis(250));
        assert_eq!(poll.timeout, Duration::from_secs(10));
        assert_eq!(waits.print_poll().timeout, Duration::from_secs(30));
    }
}
