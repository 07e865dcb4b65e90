//! HTML fragment lookups for article previews.
//!
//! The driver hands back an element's outer HTML; [`Fragment`] parses it with
//! `scraper` and answers "first `tag` carrying these classes" queries, the
//! same shape of lookup a preview needs for its date, title and link.

use crate::error::{ArchiveError, Result};
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

/// A `find(tag, class)` query. `class` may list several space-separated
/// classes, all of which must be present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindArgs {
    pub tag: String,
    pub class: String,
}

impl FindArgs {
    pub fn new(tag: impl Into<String>, class: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            class: class.into(),
        }
    }

    fn selector(&self) -> Result<Selector> {
        let css = self
            .class
            .split_whitespace()
            .fold(self.tag.clone(), |mut css, class| {
                css.push('.');
                css.push_str(class);
                css
            });
        Selector::parse(&css).map_err(|_| ArchiveError::InvalidSelector(css.clone()))
    }

    fn describe(&self) -> String {
        format!("<{} class=\"{}\">", self.tag, self.class)
    }
}

/// Parsed markup of a single element.
pub struct Fragment {
    html: Html,
}

impl Fragment {
    pub fn parse(markup: &str) -> Self {
        Self {
            html: Html::parse_fragment(markup),
        }
    }

    fn find(&self, args: &FindArgs) -> Result<ElementRef<'_>> {
        let selector = args.selector()?;
        self.html
            .select(&selector)
            .next()
            .ok_or_else(|| ArchiveError::ElementNotFound(args.describe()))
    }

    /// Whitespace-trimmed text content of the first match.
    pub fn text(&self, args: &FindArgs) -> Result<String> {
        let element = self.find(args)?;
        Ok(element.text().collect::<String>().trim().to_string())
    }

    /// Value of attribute `name` on the first match.
    pub fn attr(&self, args: &FindArgs, name: &str) -> Result<String> {
        let element = self.find(args)?;
        element
            .value()
            .attr(name)
            .map(str::to_string)
            .ok_or_else(|| ArchiveError::ElementNotFound(format!("{}[{}]", args.describe(), name)))
    }
}
