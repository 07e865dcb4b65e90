//! W3C WebDriver client.
//!
//! Talks to a running driver endpoint (chromedriver, Selenium Grid, ...) over
//! HTTP with `reqwest`. Only the handful of commands the archiver needs are
//! implemented: session lifecycle, navigation, synchronous script execution,
//! element lookup/interaction, and Print Page.
//!
//! # Error mapping
//!
//! Non-2xx responses carry `{"value": {"error": ..., "message": ...}}`. The
//! `"no such element"` error becomes [`ArchiveError::ElementNotFound`]; every
//! other error becomes [`ArchiveError::Driver`].

use super::{BrowserDriver, ElementHandle, Locator};
use crate::error::{ArchiveError, Result};
use reqwest::{Client, Method};
use serde_json::{Value, json};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Key under which W3C drivers return element references.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Browser launch options for a new session.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub headless: bool,
    /// Where the print dialog saves PDFs when not headless.
    pub download_dir: PathBuf,
}

impl SessionOptions {
    /// Chrome capabilities. Non-headless sessions print silently ("kiosk
    /// printing") to `download_dir` as PDF.
    fn capabilities(&self) -> Value {
        let mut args = vec!["--disable-gpu".to_string(), "--window-size=1280,2000".to_string()];
        let mut prefs = json!({});
        if self.headless {
            args.push("--headless=new".to_string());
        } else {
            args.push("--kiosk-printing".to_string());
            let app_state = json!({
                "recentDestinations": [{ "id": "Save as PDF", "origin": "local", "account": "" }],
                "selectedDestinationId": "Save as PDF",
                "version": 2,
                "isHeaderFooterEnabled": false,
                "isCssBackgroundEnabled": true,
            });
            prefs = json!({
                "printing.print_preview_sticky_settings.appState": app_state.to_string(),
                "savefile.default_directory": self.download_dir.display().to_string(),
                "download.default_directory": self.download_dir.display().to_string(),
            });
        }
        json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": { "args": args, "prefs": prefs }
                }
            }
        })
    }
}

/// A live WebDriver session.
#[derive(Debug)]
pub struct WebDriverClient {
    http: Client,
    endpoint: String,
    session_id: String,
}

impl WebDriverClient {
    /// Open a new session on the driver at `endpoint` (e.g. `http://localhost:9515`).
    #[instrument(level = "info", skip(options), fields(headless = options.headless))]
    pub async fn connect(endpoint: &str, options: &SessionOptions) -> Result<Self> {
        let http = Client::new();
        let endpoint = endpoint.trim_end_matches('/').to_string();
        let response = http
            .post(format!("{endpoint}/session"))
            .json(&options.capabilities())
            .send()
            .await?;
        let value = unwrap_response(response).await?;
        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| ArchiveError::Driver {
                error: "session not created".to_string(),
                message: format!("missing sessionId in {value}"),
            })?
            .to_string();
        info!(%session_id, "WebDriver session created");
        Ok(Self {
            http,
            endpoint,
            session_id,
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Delete the session, closing the browser.
    #[instrument(level = "info", skip_all, fields(session_id = %self.session_id))]
    pub async fn close(self) -> Result<()> {
        let response = self
            .http
            .delete(format!("{}/session/{}", self.endpoint, self.session_id))
            .send()
            .await?;
        unwrap_response(response).await?;
        info!("WebDriver session closed");
        Ok(())
    }

    async fn command(&self, method: Method, path: &str, body: Value) -> Result<Value> {
        let url = format!("{}/session/{}/{}", self.endpoint, self.session_id, path);
        let t0 = Instant::now();
        let request = self.http.request(method.clone(), url.as_str());
        let request = if method == Method::GET {
            request
        } else {
            request.json(&body)
        };
        let result = unwrap_response(request.send().await?).await;
        debug!(%method, path, elapsed_ms = t0.elapsed().as_millis() as u64, ok = result.is_ok(), "WebDriver command");
        result
    }
}

async fn unwrap_response(response: reqwest::Response) -> Result<Value> {
    let status = response.status();
    let payload: Value = response.json().await?;
    let value = payload.get("value").cloned().unwrap_or(Value::Null);
    if status.is_success() {
        return Ok(value);
    }
    Err(protocol_error(&value))
}

fn protocol_error(value: &Value) -> ArchiveError {
    let error = value
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("unknown error")
        .to_string();
    let message = value
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    if error == "no such element" {
        return ArchiveError::ElementNotFound(message);
    }
    warn!(%error, %message, "WebDriver returned an error");
    ArchiveError::Driver { error, message }
}

fn element_from(value: &Value) -> Result<ElementHandle> {
    value
        .get(ELEMENT_KEY)
        .and_then(Value::as_str)
        .map(|id| ElementHandle(id.to_string()))
        .ok_or_else(|| ArchiveError::Driver {
            error: "invalid element reference".to_string(),
            message: value.to_string(),
        })
}

fn locate_body(locator: &Locator) -> Value {
    json!({ "using": locator.strategy(), "value": locator.value() })
}

impl BrowserDriver for WebDriverClient {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.command(Method::POST, "url", json!({ "url": url })).await?;
        Ok(())
    }

    async fn evaluate_script(&self, script: &str) -> Result<Value> {
        self.command(Method::POST, "execute/sync", json!({ "script": script, "args": [] }))
            .await
    }

    async fn find_element(&self, locator: &Locator) -> Result<ElementHandle> {
        match self.command(Method::POST, "element", locate_body(locator)).await {
            Ok(value) => element_from(&value),
            Err(ArchiveError::ElementNotFound(_)) => Err(ArchiveError::ElementNotFound(locator.to_string())),
            Err(e) => Err(e),
        }
    }

    async fn find_elements(&self, locator: &Locator) -> Result<Vec<ElementHandle>> {
        let value = self.command(Method::POST, "elements", locate_body(locator)).await?;
        value
            .as_array()
            .map(|items| items.iter().map(element_from).collect())
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn click(&self, element: &ElementHandle) -> Result<()> {
        self.command(Method::POST, &format!("element/{}/click", element.0), json!({}))
            .await?;
        Ok(())
    }

    async fn send_keys(&self, element: &ElementHandle, text: &str) -> Result<()> {
        self.command(
            Method::POST,
            &format!("element/{}/value", element.0),
            json!({ "text": text }),
        )
        .await?;
        Ok(())
    }

    async fn outer_html(&self, element: &ElementHandle) -> Result<String> {
        let value = self
            .command(Method::GET, &format!("element/{}/property/outerHTML", element.0), Value::Null)
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn print_page(&self) -> Result<String> {
        let value = self
            .command(Method::POST, "print", json!({ "background": true }))
            .await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ArchiveError::Pdf("print command returned no data".to_string()))
    }
}
