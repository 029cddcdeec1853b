pub mod aggregate;
pub mod auth;
pub mod browser;
pub mod error;
pub mod fetch;
pub mod parse;
pub mod query;
pub mod session;
pub mod types;

pub use aggregate::{aggregate, format_offer, AvailabilityReport, VenueReport, VenueStatus};
pub use auth::Authenticator;
pub use browser::{Browser, BrowsingContext, WebDriverBrowser, WebDriverOptions};
pub use error::{BrowserError, TablewatchError};
pub use fetch::{FetchOrchestrator, FetchResults, QueryFailure, VenueFetch};
pub use parse::parse_availability;
pub use query::{QueryBuilder, QueryPlan, QueryTarget, VenueQueries, MAX_EXTRA_DAYS};
pub use session::{Cookie, SessionState, SessionStore};
pub use types::{Offer, RawAvailabilityResponse};
