//! Credentials, sign-in, and download gating.
//!
//! Sign-in is a fixed five-step walk through the publisher's login UI. Each
//! step waits (bounded) for its target element before acting on it. The
//! first step whose element never shows up aborts the whole protocol with
//! [`ArchiveError::ElementTimeout`] naming that step; nothing is retried.
//! Any other driver failure inside a step comes back as
//! [`ArchiveError::SignInFailed`], also naming the step.

use crate::browser::wait::BoundedPoll;
use crate::browser::{BrowserDriver, ElementHandle, Locator};
use crate::config::Selectors;
use crate::error::{ArchiveError, Result};
use std::fmt;
use tracing::{debug, info, instrument, warn};

/// Account credentials. Empty until [`Credentials::set`] is called.
#[derive(Clone, Default)]
pub struct Credentials {
    username: String,
    password: String,
    present: bool,
}

impl Credentials {
    pub fn set(&mut self, username: impl Into<String>, password: impl Into<String>) {
        self.username = username.into();
        self.password = password.into();
        self.present = true;
    }

    pub fn is_present(&self) -> bool {
        self.present
    }

    pub fn username(&self) -> &str {
        &self.username
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("present", &self.present)
            .finish()
    }
}

/// The five steps of the sign-in protocol, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignInStep {
    OpenMenu,
    GoToLogin,
    ChoosePasswordLogin,
    SubmitCredentials,
    ConfirmArticleList,
}

impl fmt::Display for SignInStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SignInStep::OpenMenu => "open-menu",
            SignInStep::GoToLogin => "go-to-login",
            SignInStep::ChoosePasswordLogin => "choose-password-login",
            SignInStep::SubmitCredentials => "submit-credentials",
            SignInStep::ConfirmArticleList => "confirm-article-list",
        };
        f.write_str(name)
    }
}

/// Whether the browser session is authenticated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionState {
    authenticated: bool,
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Run the sign-in protocol against `archive_url`.
    ///
    /// `authenticated` is true afterwards only if every step succeeded.
    ///
    /// # Errors
    ///
    /// - [`ArchiveError::CredentialsNotLoaded`] before any navigation
    /// - [`ArchiveError::ElementTimeout`] naming the step that timed out
    /// - [`ArchiveError::SignInFailed`] for any other failure, naming its step
    #[instrument(level = "info", skip_all, fields(%archive_url))]
    pub async fn sign_in<D: BrowserDriver>(
        &mut self,
        driver: &D,
        archive_url: &str,
        credentials: &Credentials,
        selectors: &Selectors,
        poll: &BoundedPoll,
    ) -> Result<()> {
        self.authenticated = false;
        if !credentials.is_present() {
            warn!("Sign-in requested before credentials were loaded");
            return Err(ArchiveError::CredentialsNotLoaded);
        }

        match run_protocol(driver, archive_url, credentials, selectors, poll).await {
            Ok(()) => {
                self.authenticated = true;
                info!(username = %credentials.username(), "Signed in");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Sign-in failed");
                Err(e)
            }
        }
    }

    pub fn sign_out(&mut self) {
        if self.authenticated {
            info!("Signed out");
        }
        self.authenticated = false;
    }
}

async fn run_protocol<D: BrowserDriver>(
    driver: &D,
    archive_url: &str,
    credentials: &Credentials,
    selectors: &Selectors,
    poll: &BoundedPoll,
) -> Result<()> {
    let step = SignInStep::OpenMenu;
    at_step(step, async {
        driver.navigate(archive_url).await?;
        let menu = await_target(driver, step, &selectors.menu_button, poll).await?;
        driver.click(&menu).await
    })
    .await?;

    let step = SignInStep::GoToLogin;
    at_step(step, async {
        let login = await_target(driver, step, &selectors.go_to_login, poll).await?;
        driver.click(&login).await
    })
    .await?;

    let step = SignInStep::ChoosePasswordLogin;
    at_step(step, async {
        let with_password = await_target(driver, step, &selectors.password_login, poll).await?;
        driver.click(&with_password).await
    })
    .await?;

    let step = SignInStep::SubmitCredentials;
    at_step(step, async {
        let username = await_target(driver, step, &selectors.username_field, poll).await?;
        driver.send_keys(&username, &credentials.username).await?;
        let password = driver.find_element(&selectors.password_field).await?;
        driver.send_keys(&password, &credentials.password).await?;
        let submit = driver.find_element(&selectors.submit_button).await?;
        driver.click(&submit).await
    })
    .await?;

    let step = SignInStep::ConfirmArticleList;
    at_step(step, async {
        await_target(driver, step, &selectors.article_preview, poll).await?;
        Ok(())
    })
    .await
}

/// Tag any error from `work` with `step`. Timeouts already carry their step.
async fn at_step<T>(step: SignInStep, work: impl Future<Output = Result<T>>) -> Result<T> {
    work.await.map_err(|e| match e {
        ArchiveError::ElementTimeout { .. } => e,
        other => ArchiveError::SignInFailed {
            step,
            source: Box::new(other),
        },
    })
}

async fn await_target<D: BrowserDriver>(
    driver: &D,
    step: SignInStep,
    locator: &Locator,
    poll: &BoundedPoll,
) -> Result<ElementHandle> {
    debug!(%step, %locator, "Waiting for sign-in element");
    if !driver.wait_for_element(locator, poll).await? {
        return Err(ArchiveError::ElementTimeout {
            step,
            locator: locator.to_string(),
        });
    }
    driver.find_element(locator).await
}

/// Gate every download on loaded credentials and an authenticated session.
///
/// Credentials are checked first.
pub fn ready_to_download(credentials: &Credentials, session: &SessionState) -> Result<()> {
    if !credentials.is_present() {
        return Err(ArchiveError::CredentialsNotLoaded);
    }
    if !session.is_authenticated() {
        return Err(ArchiveError::NotSignedIn);
    }
    Ok(())
}
