//! Typed construction of availability query targets.
//!
//! One [`QueryTarget`] per (venue, meal, date). Targets are grouped by venue
//! in catalog order; within a venue they run meal-major, then by ascending
//! date, which is also the order their slots appear in the report.

use chrono::{Days, NaiveDate};
use reqwest::Url;
use tablewatch_core::{Catalog, MealPeriod, Venue};

use crate::error::TablewatchError;

/// Longest date span a single run may cover.
pub const MAX_EXTRA_DAYS: i64 = 366;

/// One availability query, immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTarget {
    pub venue: Venue,
    pub meal: MealPeriod,
    pub date: NaiveDate,
    pub guest_count: u32,
    pub resolved_url: String,
}

/// All targets for one venue, in execution order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VenueQueries {
    pub venue_key: String,
    pub targets: Vec<QueryTarget>,
}

/// Every target of a run, grouped by venue in catalog order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPlan {
    groups: Vec<VenueQueries>,
    start_date: NaiveDate,
    end_date: NaiveDate,
}

impl QueryPlan {
    #[must_use]
    pub fn groups(&self) -> &[VenueQueries] {
        &self.groups
    }

    /// Targets flattened in venue, meal, date order.
    pub fn targets(&self) -> impl Iterator<Item = &QueryTarget> {
        self.groups.iter().flat_map(|g| g.targets.iter())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.iter().map(|g| g.targets.len()).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    /// Last date covered, inclusive.
    #[must_use]
    pub fn end_date(&self) -> NaiveDate {
        self.end_date
    }
}

/// Builds [`QueryPlan`]s against a catalog and an endpoint base.
#[derive(Debug)]
pub struct QueryBuilder<'a> {
    catalog: &'a Catalog,
    api_base: String,
}

impl<'a> QueryBuilder<'a> {
    /// # Errors
    ///
    /// Returns [`TablewatchError::InvalidQueryParameters`] if `api_base` is not
    /// an absolute http(s) URL.
    pub fn new(catalog: &'a Catalog, api_base: &str) -> Result<Self, TablewatchError> {
        let trimmed = api_base.trim_end_matches('/');
        let parsed = Url::parse(trimmed).map_err(|e| TablewatchError::InvalidQueryParameters {
            reason: format!("endpoint base \"{api_base}\" is not a valid URL: {e}"),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.cannot_be_a_base() {
            return Err(TablewatchError::InvalidQueryParameters {
                reason: format!("endpoint base \"{api_base}\" must be an http(s) URL"),
            });
        }
        Ok(Self {
            catalog,
            api_base: trimmed.to_owned(),
        })
    }

    /// Produce one target per venue × meal × date, spanning `extra_days + 1`
    /// consecutive dates from `start_date`.
    ///
    /// Pure and deterministic: identical inputs yield identical plans.
    ///
    /// # Errors
    ///
    /// Returns [`TablewatchError::InvalidQueryParameters`] if `guests` is zero,
    /// `extra_days` is negative or above [`MAX_EXTRA_DAYS`], `meals` is empty,
    /// the date span leaves the supported calendar range, or a venue's
    /// platform id is not safe to interpolate.
    pub fn build(
        &self,
        guests: u32,
        start_date: NaiveDate,
        extra_days: i64,
        meals: &[MealPeriod],
    ) -> Result<QueryPlan, TablewatchError> {
        if guests == 0 {
            return Err(invalid("guest count must be a positive integer"));
        }
        if extra_days < 0 {
            return Err(invalid(format!("extra days must be >= 0, got {extra_days}")));
        }
        if extra_days > MAX_EXTRA_DAYS {
            return Err(invalid(format!(
                "extra days must be <= {MAX_EXTRA_DAYS}, got {extra_days}"
            )));
        }
        if meals.is_empty() {
            return Err(invalid("at least one meal period is required"));
        }

        let dates = date_span(start_date, extra_days.unsigned_abs())?;
        let end_date = dates.last().copied().unwrap_or(start_date);

        let mut groups = Vec::with_capacity(self.catalog.len());
        for venue in self.catalog.venues() {
            let mut targets = Vec::with_capacity(meals.len() * dates.len());
            for &meal in meals {
                for &date in &dates {
                    let resolved_url = self.resolve_url(venue, meal, date, guests)?;
                    targets.push(QueryTarget {
                        venue: venue.clone(),
                        meal,
                        date,
                        guest_count: guests,
                        resolved_url,
                    });
                }
            }
            groups.push(VenueQueries {
                venue_key: venue.key.clone(),
                targets,
            });
        }

        Ok(QueryPlan {
            groups,
            start_date,
            end_date,
        })
    }

    /// `{base}/{venue_id};entityType=restaurant/table-service/{guests}/{date}/?mealPeriod={meal_id}`
    fn resolve_url(
        &self,
        venue: &Venue,
        meal: MealPeriod,
        date: NaiveDate,
        guests: u32,
    ) -> Result<String, TablewatchError> {
        if !venue.has_valid_external_id() {
            return Err(invalid(format!(
                "venue '{}' has unsafe platform id '{}'",
                venue.key, venue.external_id
            )));
        }

        let raw = format!(
            "{base}/{id};entityType=restaurant/table-service/{guests}/{date}/",
            base = self.api_base,
            id = venue.external_id,
            date = date.format("%Y-%m-%d"),
        );
        let mut url = Url::parse(&raw).map_err(|e| {
            invalid(format!("could not build query URL for '{}': {e}", venue.key))
        })?;
        url.query_pairs_mut()
            .append_pair("mealPeriod", meal.platform_id());
        Ok(url.to_string())
    }
}

fn date_span(start: NaiveDate, extra_days: u64) -> Result<Vec<NaiveDate>, TablewatchError> {
    (0..=extra_days)
        .map(|offset| {
            start
                .checked_add_days(Days::new(offset))
                .ok_or_else(|| invalid(format!("date range from {start} overflows the calendar")))
        })
        .collect()
}

fn invalid(reason: impl Into<String>) -> TablewatchError {
    TablewatchError::InvalidQueryParameters {
        reason: reason.into(),
    }
}
