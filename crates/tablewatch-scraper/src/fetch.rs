//! Concurrent execution of a [`QueryPlan`].
//!
//! Every venue gets its own browsing context and runs its queries one after
//! another. Venues run concurrently on the calling task and the results are
//! assembled once all of them have finished.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::NaiveDate;
use futures::future::join_all;
use tablewatch_core::MealPeriod;
use tokio::time::{timeout_at, Instant};

use crate::browser::{Browser, BrowsingContext};
use crate::error::TablewatchError;
use crate::parse::parse_availability;
use crate::query::{QueryPlan, QueryTarget, VenueQueries};
use crate::session::SessionState;
use crate::types::RawAvailabilityResponse;

/// Element whose text holds the endpoint's JSON body.
const BODY_SELECTOR: &str = "body";

/// One query that produced no response.
#[derive(Debug)]
pub struct QueryFailure {
    pub venue_key: String,
    pub meal: MealPeriod,
    pub date: NaiveDate,
    pub url: String,
    pub error: TablewatchError,
}

impl QueryFailure {
    fn new(target: &QueryTarget, error: TablewatchError) -> Self {
        Self {
            venue_key: target.venue.key.clone(),
            meal: target.meal,
            date: target.date,
            url: target.resolved_url.clone(),
            error,
        }
    }
}

/// Outcome of one venue unit, in query order.
#[derive(Debug, Default)]
pub struct VenueFetch {
    pub responses: Vec<RawAvailabilityResponse>,
    pub failures: Vec<QueryFailure>,
}

impl VenueFetch {
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.responses.len() + self.failures.len()
    }
}

/// Per-venue outcomes of a whole plan, keyed by venue key.
#[derive(Debug, Default)]
pub struct FetchResults {
    venues: BTreeMap<String, VenueFetch>,
}

impl FetchResults {
    #[must_use]
    pub fn get(&self, venue_key: &str) -> Option<&VenueFetch> {
        self.venues.get(venue_key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &VenueFetch)> {
        self.venues.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn total_responses(&self) -> usize {
        self.venues.values().map(|v| v.responses.len()).sum()
    }

    #[must_use]
    pub fn total_failures(&self) -> usize {
        self.venues.values().map(|v| v.failures.len()).sum()
    }

    /// `true` when queries ran and not one of them produced a response.
    #[must_use]
    pub fn all_failed(&self) -> bool {
        self.total_responses() == 0 && self.total_failures() > 0
    }

    pub fn insert(&mut self, venue_key: impl Into<String>, fetch: VenueFetch) {
        self.venues.insert(venue_key.into(), fetch);
    }
}

pub struct FetchOrchestrator<'a, B: Browser> {
    browser: &'a B,
    venue_timeout: Duration,
}

impl<'a, B: Browser> FetchOrchestrator<'a, B> {
    /// `venue_timeout` bounds session restore and the queries of each venue
    /// unit. Opening the context is bounded by the browser's own request
    /// timeout instead.
    pub fn new(browser: &'a B, venue_timeout: Duration) -> Self {
        Self {
            browser,
            venue_timeout,
        }
    }

    /// Runs every query in `plan` using `session`.
    ///
    /// Never fails as a whole: each query that does not produce a response is
    /// recorded as a [`QueryFailure`] under its venue.
    pub async fn fetch(&self, plan: &QueryPlan, session: &SessionState) -> FetchResults {
        tracing::info!(
            venues = plan.groups().len(),
            queries = plan.len(),
            "fetching availability"
        );

        let units: Vec<_> = plan
            .groups()
            .iter()
            .map(|group| self.fetch_venue(group, session))
            .collect();
        let outcomes = join_all(units).await;

        let mut results = FetchResults::default();
        for (group, fetch) in plan.groups().iter().zip(outcomes) {
            results.insert(group.venue_key.clone(), fetch);
        }

        tracing::info!(
            responses = results.total_responses(),
            failures = results.total_failures(),
            "fetch complete"
        );
        results
    }

    async fn fetch_venue(&self, group: &VenueQueries, session: &SessionState) -> VenueFetch {
        let venue = group.venue_key.as_str();
        let deadline = Instant::now() + self.venue_timeout;
        let mut fetch = VenueFetch::default();

        // Session creation runs to completion even past the deadline: a
        // session created after cancellation could never be deleted.
        let context = match self.browser.new_context().await {
            Ok(context) => context,
            Err(err) => {
                tracing::warn!(venue, error = %err, "could not open browser context");
                fetch.failures = context_unavailable(venue, &group.targets, &err.to_string());
                return fetch;
            }
        };

        match timeout_at(deadline, context.restore_session(session)).await {
            Ok(Ok(())) => self.run_targets(&context, group, deadline, &mut fetch).await,
            Ok(Err(err)) => {
                tracing::warn!(venue, error = %err, "could not restore session");
                fetch.failures = context_unavailable(venue, &group.targets, &err.to_string());
            }
            Err(_) => {
                tracing::warn!(venue, "deadline passed while restoring session");
                fetch.failures = self.timed_out(venue, &group.targets);
            }
        }

        if let Err(err) = context.close().await {
            tracing::warn!(venue, error = %err, "failed to close browser context");
        }
        fetch
    }

    async fn run_targets(
        &self,
        context: &B::Context,
        group: &VenueQueries,
        deadline: Instant,
        fetch: &mut VenueFetch,
    ) {
        let venue = group.venue_key.as_str();
        for (idx, target) in group.targets.iter().enumerate() {
            match timeout_at(deadline, fetch_one(context, target)).await {
                Ok(Ok(raw)) => {
                    tracing::debug!(
                        venue,
                        meal = %target.meal,
                        date = %target.date,
                        offers = raw.offers.len(),
                        "query complete"
                    );
                    fetch.responses.push(raw);
                }
                Ok(Err(err)) => {
                    tracing::warn!(
                        venue,
                        meal = %target.meal,
                        date = %target.date,
                        url = %target.resolved_url,
                        error = %err,
                        "query failed"
                    );
                    fetch.failures.push(QueryFailure::new(target, err));
                }
                Err(_) => {
                    let remaining = &group.targets[idx..];
                    tracing::warn!(
                        venue,
                        timeout_secs = self.venue_timeout.as_secs(),
                        skipped = remaining.len(),
                        "venue deadline passed"
                    );
                    fetch.failures.extend(self.timed_out(venue, remaining));
                    break;
                }
            }
        }
    }

    fn timed_out(&self, venue: &str, targets: &[QueryTarget]) -> Vec<QueryFailure> {
        targets
            .iter()
            .map(|t| {
                QueryFailure::new(
                    t,
                    TablewatchError::VenueTimeout {
                        venue: venue.to_owned(),
                        timeout_secs: self.venue_timeout.as_secs(),
                    },
                )
            })
            .collect()
    }
}

fn context_unavailable(venue: &str, targets: &[QueryTarget], reason: &str) -> Vec<QueryFailure> {
    targets
        .iter()
        .map(|t| {
            QueryFailure::new(
                t,
                TablewatchError::ContextUnavailable {
                    venue: venue.to_owned(),
                    reason: reason.to_owned(),
                },
            )
        })
        .collect()
}

async fn fetch_one<C: BrowsingContext>(
    context: &C,
    target: &QueryTarget,
) -> Result<RawAvailabilityResponse, TablewatchError> {
    context.goto(&target.resolved_url).await?;
    let body = context.inner_text(BODY_SELECTOR).await?;
    parse_availability(target, &body)
}
