use chrono::NaiveDate;
use tablewatch_core::MealPeriod;
use thiserror::Error;

/// Errors raised by the browser collaborator.
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("HTTP error talking to WebDriver: {0}")]
    Http(#[from] reqwest::Error),

    #[error("WebDriver command {command} failed ({error}): {message}")]
    Command {
        command: String,
        error: String,
        message: String,
    },

    #[error("unexpected WebDriver response for {command}: {reason}")]
    Protocol { command: String, reason: String },

    #[error("no element matches `{selector}`")]
    NoSuchElement { selector: String },

    #[error("timed out after {timeout_ms} ms waiting for `{selector}`")]
    SelectorTimeout { selector: String, timeout_ms: u64 },

    #[error("invalid WebDriver URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Errors raised by the availability-polling engine.
#[derive(Debug, Error)]
pub enum TablewatchError {
    #[error("invalid query parameters: {reason}")]
    InvalidQueryParameters { reason: String },

    #[error("no stored session at {path}")]
    SessionUnavailable { path: String },

    #[error("session file I/O error for {path}: {source}")]
    SessionIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("session file {path} does not hold valid session state: {source}")]
    SessionFormat {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("login credentials unavailable: {0}")]
    Credentials(#[from] tablewatch_core::ConfigError),

    #[error("login failed: {reason}")]
    LoginFailed { reason: String },

    #[error("could not parse availability for {venue} {meal} {date}: {source}")]
    FetchParse {
        venue: String,
        meal: MealPeriod,
        date: NaiveDate,
        #[source]
        source: serde_json::Error,
    },

    #[error("browser context for {venue} could not be opened: {reason}")]
    ContextUnavailable { venue: String, reason: String },

    #[error("venue {venue} exceeded its {timeout_secs}s deadline")]
    VenueTimeout { venue: String, timeout_secs: u64 },

    #[error("browser error: {0}")]
    Browser(#[from] BrowserError),
}
