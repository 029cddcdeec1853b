//! Interactive login against the platform's embedded sign-in form.

use std::time::Duration;

use tablewatch_core::Credentials;

use crate::browser::{Browser, BrowsingContext};
use crate::error::{BrowserError, TablewatchError};
use crate::session::SessionState;

/// The sign-in form is rendered inside the first iframe on the login page.
pub const LOGIN_FRAME_SELECTOR: &str = "iframe";
pub const EMAIL_SELECTOR: &str = "input[type=email]";
pub const PASSWORD_SELECTOR: &str = "input[type=password]";
pub const SUBMIT_SELECTOR: &str = "button[type=submit]";
/// Only rendered on the availability page once the visitor is signed in.
pub const SIGNED_IN_SELECTOR: &str = "#search-time-button button";

/// Drives the login form in a fresh context and captures the resulting
/// session.
pub struct Authenticator<'a, B: Browser> {
    browser: &'a B,
    login_url: String,
    timeout: Duration,
}

impl<'a, B: Browser> Authenticator<'a, B> {
    /// `timeout` bounds each wait for the form and for the signed-in marker.
    pub fn new(browser: &'a B, login_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            browser,
            login_url: login_url.into(),
            timeout,
        }
    }

    /// Logs in with `credentials` and returns the authenticated state.
    ///
    /// The context is closed whether or not login succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`TablewatchError::LoginFailed`] naming the step that failed:
    /// the form never appeared, was rejected, or the signed-in marker did not
    /// show up within the timeout.
    pub async fn login(&self, credentials: &Credentials) -> Result<SessionState, TablewatchError> {
        tracing::info!(login_url = %self.login_url, "logging in");

        let context = self
            .browser
            .new_context()
            .await
            .map_err(|e| login_failed("open browser context", &e))?;

        let outcome = self.sign_in(&context, credentials).await;

        if let Err(err) = context.close().await {
            tracing::warn!(error = %err, "failed to close login context");
        }

        match &outcome {
            Ok(state) => tracing::info!(cookies = state.cookies.len(), "login succeeded"),
            Err(err) => tracing::warn!(error = %err, "login failed"),
        }
        outcome
    }

    async fn sign_in(
        &self,
        context: &B::Context,
        credentials: &Credentials,
    ) -> Result<SessionState, TablewatchError> {
        step("open login page", context.goto(&self.login_url).await)?;
        step(
            "wait for login form",
            context
                .wait_for_selector(LOGIN_FRAME_SELECTOR, self.timeout)
                .await,
        )?;
        step(
            "enter login form",
            context.enter_frame(LOGIN_FRAME_SELECTOR).await,
        )?;
        step(
            "wait for email field",
            context.wait_for_selector(EMAIL_SELECTOR, self.timeout).await,
        )?;
        step(
            "fill email",
            context.fill(EMAIL_SELECTOR, &credentials.username).await,
        )?;
        step(
            "fill password",
            context
                .fill(PASSWORD_SELECTOR, &credentials.password)
                .await,
        )?;
        step("submit login form", context.click(SUBMIT_SELECTOR).await)?;
        step("leave login form", context.leave_frame().await)?;
        step(
            "confirm signed in",
            context
                .wait_for_selector(SIGNED_IN_SELECTOR, self.timeout)
                .await,
        )?;

        let state = step("capture session", context.storage_state().await)?;
        if state.cookies.is_empty() {
            return Err(TablewatchError::LoginFailed {
                reason: "capture session: browser returned no cookies".to_owned(),
            });
        }
        Ok(state)
    }
}

fn step<T>(name: &str, result: Result<T, BrowserError>) -> Result<T, TablewatchError> {
    result.map_err(|e| login_failed(name, &e))
}

fn login_failed(step: &str, err: &BrowserError) -> TablewatchError {
    TablewatchError::LoginFailed {
        reason: format!("{step}: {err}"),
    }
}
