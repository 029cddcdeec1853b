//! Browser-automation collaborator.
//!
//! The engine only needs a handful of page operations, captured by
//! [`Browser`] and [`BrowsingContext`]. [`webdriver`] implements them over the
//! W3C WebDriver HTTP protocol.
//!
//! Futures returned by these traits are not required to be `Send`: the
//! orchestrator drives every venue on the calling task.

pub mod webdriver;

use std::time::Duration;

use crate::error::BrowserError;
use crate::session::SessionState;

pub use webdriver::{WebDriverBrowser, WebDriverContext, WebDriverOptions};

/// Opens isolated browsing contexts.
#[allow(async_fn_in_trait)]
pub trait Browser {
    type Context: BrowsingContext;

    /// Opens a fresh, unauthenticated context.
    async fn new_context(&self) -> Result<Self::Context, BrowserError>;
}

/// One browsing context. Executes one navigation at a time.
#[allow(async_fn_in_trait)]
pub trait BrowsingContext {
    /// Loads a previously captured session into this context.
    async fn restore_session(&self, session: &SessionState) -> Result<(), BrowserError>;

    async fn goto(&self, url: &str) -> Result<(), BrowserError>;

    /// Waits until `selector` matches, failing with
    /// [`BrowserError::SelectorTimeout`] once `timeout` has elapsed.
    async fn wait_for_selector(&self, selector: &str, timeout: Duration)
        -> Result<(), BrowserError>;

    /// Scopes subsequent element operations to the frame matched by `selector`.
    async fn enter_frame(&self, selector: &str) -> Result<(), BrowserError>;

    /// Returns element operations to the top-level document.
    async fn leave_frame(&self) -> Result<(), BrowserError>;

    async fn fill(&self, selector: &str, value: &str) -> Result<(), BrowserError>;

    async fn click(&self, selector: &str) -> Result<(), BrowserError>;

    /// Rendered text of the first element matching `selector`.
    async fn inner_text(&self, selector: &str) -> Result<String, BrowserError>;

    /// Snapshot of the context's authentication state.
    async fn storage_state(&self) -> Result<SessionState, BrowserError>;

    /// Releases the context.
    async fn close(self) -> Result<(), BrowserError>
    where
        Self: Sized;
}
