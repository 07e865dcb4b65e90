//! Browser-driver boundary.
//!
//! The archiver never talks to a browser directly; it goes through the
//! [`BrowserDriver`] trait. Two implementations exist:
//!
//! - [`webdriver::WebDriverClient`]: W3C WebDriver over HTTP (chromedriver,
//!   geckodriver, Selenium Grid)
//! - `mock::MockBrowser`: in-memory test double simulating a growing archive page
//!
//! Element markup returned by the driver is interpreted with [`fragment`],
//! and bounded waits are expressed with [`wait::BoundedPoll`].

pub mod fragment;
#[cfg(test)]
pub(crate) mod mock;
pub mod wait;
pub mod webdriver;

use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use wait::BoundedPoll;

/// How an element is located on the page.
///
/// Locators come from configuration; none are derived at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Locator {
    Css(String),
    LinkText(String),
    #[serde(rename = "xpath")]
    XPath(String),
}

impl Locator {
    /// The W3C WebDriver location strategy name.
    pub fn strategy(&self) -> &'static str {
        match self {
            Locator::Css(_) => "css selector",
            Locator::LinkText(_) => "link text",
            Locator::XPath(_) => "xpath",
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Locator::Css(v) | Locator::LinkText(v) | Locator::XPath(v) => v,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={:?}", self.strategy(), self.value())
    }
}

/// Opaque reference to an element in the current page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementHandle(pub String);

/// The operations the archiver needs from a browser session.
///
/// One implementor instance is one browser session; it is acquired before the
/// downloader is built and held for the downloader's lifetime.
///
/// Calls are awaited one at a time on the caller's task, so the returned
/// futures carry no `Send` bound.
#[allow(async_fn_in_trait)]
pub trait BrowserDriver {
    /// Load `url` in the current tab, resetting scroll position.
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Run `script` synchronously in the page and return its result.
    async fn evaluate_script(&self, script: &str) -> Result<Value>;

    /// # Errors
    ///
    /// [`crate::error::ArchiveError::ElementNotFound`] when nothing matches.
    async fn find_element(&self, locator: &Locator) -> Result<ElementHandle>;

    /// All matches in document order; empty when nothing matches.
    async fn find_elements(&self, locator: &Locator) -> Result<Vec<ElementHandle>>;

    async fn click(&self, element: &ElementHandle) -> Result<()>;

    async fn send_keys(&self, element: &ElementHandle, text: &str) -> Result<()>;

    /// Serialized markup of the element, including the element itself.
    async fn outer_html(&self, element: &ElementHandle) -> Result<String>;

    /// Render the current page to PDF, returned base64-encoded.
    async fn print_page(&self) -> Result<String>;

    /// Poll until `locator` matches at least one element.
    ///
    /// Returns `Ok(false)` when the poll's deadline passes first.
    async fn wait_for_element(&self, locator: &Locator, poll: &BoundedPoll) -> Result<bool> {
        let found = poll
            .until(|| async move {
                let matches = self.find_elements(locator).await?;
                Ok((!matches.is_empty()).then_some(()))
            })
            .await?;
        Ok(found.is_some())
    }
}
