use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::error::TablewatchError;
use crate::query::QueryTarget;
use crate::types::{AvailabilityPayload, RawAvailabilityResponse};

/// Parse the rendered body of one availability query and tag it with the
/// query's venue, meal, and date.
///
/// # Errors
///
/// Returns [`TablewatchError::FetchParse`] if `body` is not a JSON object of
/// the expected shape, e.g. when the platform served an HTML error page.
pub fn parse_availability(
    target: &QueryTarget,
    body: &str,
) -> Result<RawAvailabilityResponse, TablewatchError> {
    let payload: AvailabilityPayload =
        serde_json::from_str(body.trim()).map_err(|e| TablewatchError::FetchParse {
            venue: target.venue.key.clone(),
            meal: target.meal,
            date: target.date,
            source: e,
        })?;

    Ok(RawAvailabilityResponse {
        venue_key: target.venue.key.clone(),
        meal: target.meal,
        date: target.date,
        offers: payload.offers,
    })
}

/// Extract the calendar date from an offer `dateTime`.
///
/// Accepts RFC 3339 (`2023-07-01T18:00:00-04:00`), naive date-times with or
/// without seconds, and bare dates. The date is taken as written, without
/// converting between offsets.
pub(crate) fn parse_offer_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.date());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

#[cfg(test)]
#[path = "parse_test.rs"]
mod tests;
