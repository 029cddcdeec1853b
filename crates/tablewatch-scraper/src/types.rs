//! Availability endpoint response types.
//!
//! ## Observed shape
//!
//! The endpoint returns a JSON object. When a venue has open tables for the
//! requested party, meal, and date it carries an `offers` array:
//!
//! ```json
//! {"offers": [{"dateTime": "2023-07-01T18:00:00-04:00", "time": "6:00 PM", ...}]}
//! ```
//!
//! When nothing is open the `offers` key is absent, so it defaults to empty.
//! `dateTime` has been seen both with and without a UTC offset; only its
//! calendar date is used. `time` is the platform's display string and is
//! passed through untouched.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};
use tablewatch_core::MealPeriod;

use crate::parse::parse_offer_date;

/// Top-level body of one availability query.
#[derive(Debug, Deserialize)]
pub struct AvailabilityPayload {
    #[serde(default)]
    pub offers: Vec<Offer>,
}

/// A single bookable slot.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Offer {
    #[serde(rename = "dateTime", deserialize_with = "deserialize_offer_date")]
    pub date: NaiveDate,
    /// Display time, e.g. `"6:00 PM"`.
    pub time: String,
}

/// Parsed result of one (venue, meal, date) query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAvailabilityResponse {
    pub venue_key: String,
    pub meal: MealPeriod,
    pub date: NaiveDate,
    pub offers: Vec<Offer>,
}

fn deserialize_offer_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_offer_date(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("unrecognised dateTime \"{raw}\"")))
}
