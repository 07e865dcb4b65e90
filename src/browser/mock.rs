//! In-memory browser for tests.
//!
//! Simulates a single archive listing that reveals `page_size` more previews
//! per scroll until it runs out, plus a set of "present" elements for the
//! sign-in flow, where clicking one element can reveal another. Every
//! interaction is recorded so tests can assert on call counts.

use super::{BrowserDriver, ElementHandle, Locator};
use crate::error::{ArchiveError, Result};
use base64::{Engine as _, engine::general_purpose};
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

pub(crate) const MOCK_PDF: &[u8] = b"%PDF-1.4\n% mock article\n%%EOF\n";

#[derive(Debug, Default)]
pub(crate) struct MockState {
    pub archive_url: String,
    pub preview_locator: Option<Locator>,
    pub previews: Vec<String>,
    pub page_size: usize,
    pub visible: usize,
    pub current_url: String,
    pub navigations: Vec<String>,
    pub scrolls: usize,
    pub present: HashSet<Locator>,
    pub reveals: HashMap<String, Locator>,
    pub clicks: Vec<String>,
    pub typed: Vec<(String, String)>,
    pub prints: usize,
    pub window_prints: usize,
    pub failing_urls: HashSet<String>,
    /// Where `window.print()` saves a PDF, if anywhere.
    pub print_dialog_dir: Option<PathBuf>,
}

impl MockState {
    fn height(&self) -> usize {
        500 + self.visible * 100
    }
}

/// Cloneable handle; clones share state.
#[derive(Debug, Clone, Default)]
pub(crate) struct MockBrowser {
    state: Arc<Mutex<MockState>>,
}

impl MockBrowser {
    pub fn new(archive_url: &str, preview_locator: Locator, previews: Vec<String>, page_size: usize) -> Self {
        let state = MockState {
            archive_url: archive_url.to_string(),
            preview_locator: Some(preview_locator),
            previews,
            page_size,
            ..MockState::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    pub fn make_present(&self, locator: Locator) {
        self.state().present.insert(locator);
    }

    /// Clicking the element found by `trigger` makes `revealed` present.
    pub fn reveal_on_click(&self, trigger: &Locator, revealed: Locator) {
        self.state().reveals.insert(trigger.to_string(), revealed);
    }

    pub fn fail_print_for(&self, url: &str) {
        self.state().failing_urls.insert(url.to_string());
    }

    /// Make `window.print()` save a PDF into `dir`, like a kiosk-printing browser.
    pub fn save_prints_to(&self, dir: impl Into<PathBuf>) {
        self.state().print_dialog_dir = Some(dir.into());
    }

    pub fn scrolls(&self) -> usize {
        self.state().scrolls
    }

    pub fn navigations(&self) -> Vec<String> {
        self.state().navigations.clone()
    }

    pub fn total_calls(&self) -> usize {
        let s = self.state();
        s.navigations.len() + s.scrolls + s.clicks.len() + s.typed.len() + s.prints + s.window_prints
    }
}

/// Preview markup shaped like the listing's real previews.
pub(crate) fn preview_html(date: &str, title: &str, href: &str) -> String {
    format!(
        r#"<div class="post-preview-content"><a class="post-preview-title newsletter" href="{href}">{title}</a><table><tbody><tr><td class="post-meta-item post-date">{date}</td></tr></tbody></table></div>"#
    )
}

impl BrowserDriver for MockBrowser {
    async fn navigate(&self, url: &str) -> Result<()> {
        let mut s = self.state();
        s.navigations.push(url.to_string());
        s.current_url = url.to_string();
        if url == s.archive_url {
            s.visible = s.page_size.min(s.previews.len());
        }
        Ok(())
    }

    async fn evaluate_script(&self, script: &str) -> Result<Value> {
        let mut s = self.state();
        if script.contains("scrollTo") {
            s.scrolls += 1;
            s.visible = (s.visible + s.page_size).min(s.previews.len());
            Ok(Value::Null)
        } else if script.contains("scrollHeight") {
            Ok(json!(s.height()))
        } else if script.contains("window.print") {
            s.window_prints += 1;
            if let Some(dir) = &s.print_dialog_dir {
                let path = dir.join(format!("Printed article {}.pdf", s.window_prints));
                std::fs::write(path, MOCK_PDF)?;
            }
            Ok(Value::Null)
        } else {
            Ok(Value::Null)
        }
    }

    async fn find_element(&self, locator: &Locator) -> Result<ElementHandle> {
        self.find_elements(locator)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ArchiveError::ElementNotFound(locator.to_string()))
    }

    async fn find_elements(&self, locator: &Locator) -> Result<Vec<ElementHandle>> {
        let s = self.state();
        if s.preview_locator.as_ref() == Some(locator) {
            return Ok((0..s.visible)
                .map(|i| ElementHandle(format!("preview-{i}")))
                .collect());
        }
        if s.present.contains(locator) {
            return Ok(vec![ElementHandle(locator.to_string())]);
        }
        Ok(Vec::new())
    }

    async fn click(&self, element: &ElementHandle) -> Result<()> {
        let mut s = self.state();
        s.clicks.push(element.0.clone());
        if let Some(revealed) = s.reveals.get(&element.0).cloned() {
            s.present.insert(revealed);
        }
        Ok(())
    }

    async fn send_keys(&self, element: &ElementHandle, text: &str) -> Result<()> {
        self.state().typed.push((element.0.clone(), text.to_string()));
        Ok(())
    }

    async fn outer_html(&self, element: &ElementHandle) -> Result<String> {
        let s = self.state();
        element
            .0
            .strip_prefix("preview-")
            .and_then(|i| i.parse::<usize>().ok())
            .and_then(|i| s.previews.get(i).cloned())
            .ok_or_else(|| ArchiveError::ElementNotFound(element.0.clone()))
    }

    async fn print_page(&self) -> Result<String> {
        let mut s = self.state();
        if s.failing_urls.contains(&s.current_url) {
            return Err(ArchiveError::Driver {
                error: "unknown error".to_string(),
                message: format!("print failed for {}", s.current_url),
            });
        }
        s.prints += 1;
        Ok(general_purpose::STANDARD.encode(MOCK_PDF))
    }
}
