use tablewatch_core::Catalog;

use crate::fetch::FetchResults;
use crate::types::Offer;

/// What is known about one venue after a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VenueStatus {
    /// At least one slot, formatted as `"Jul 01 @ 6:00 PM"`, in response order.
    Available(Vec<String>),
    /// Queries answered and none offered a slot.
    NoAvailability,
    /// Every query for the venue failed.
    Unknown,
    /// No query was planned for the venue.
    NotChecked,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VenueReport {
    pub venue_key: String,
    pub page_url: String,
    pub status: VenueStatus,
    pub failed_queries: usize,
}

/// One entry per catalog venue, in catalog order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilityReport {
    venues: Vec<VenueReport>,
}

impl AvailabilityReport {
    #[must_use]
    pub fn venues(&self) -> &[VenueReport] {
        &self.venues
    }

    #[must_use]
    pub fn get(&self, venue_key: &str) -> Option<&VenueReport> {
        self.venues.iter().find(|v| v.venue_key == venue_key)
    }

    #[must_use]
    pub fn any_available(&self) -> bool {
        self.venues
            .iter()
            .any(|v| matches!(v.status, VenueStatus::Available(_)))
    }
}

/// Reduces fetch results to a per-venue report.
///
/// Pure: the same inputs always give the same report.
#[must_use]
pub fn aggregate(catalog: &Catalog, results: &FetchResults) -> AvailabilityReport {
    let venues = catalog
        .venues()
        .iter()
        .map(|venue| {
            let Some(fetch) = results.get(&venue.key) else {
                return VenueReport {
                    venue_key: venue.key.clone(),
                    page_url: venue.page_url.clone(),
                    status: VenueStatus::NotChecked,
                    failed_queries: 0,
                };
            };

            let slots: Vec<String> = fetch
                .responses
                .iter()
                .flat_map(|r| r.offers.iter().map(format_offer))
                .collect();

            let status = if !slots.is_empty() {
                VenueStatus::Available(slots)
            } else if !fetch.responses.is_empty() {
                VenueStatus::NoAvailability
            } else if !fetch.failures.is_empty() {
                VenueStatus::Unknown
            } else {
                VenueStatus::NotChecked
            };

            VenueReport {
                venue_key: venue.key.clone(),
                page_url: venue.page_url.clone(),
                status,
                failed_queries: fetch.failures.len(),
            }
        })
        .collect();

    AvailabilityReport { venues }
}

/// `"Jul 01 @ 6:00 PM"`.
#[must_use]
pub fn format_offer(offer: &Offer) -> String {
    format!("{} @ {}", offer.date.format("%b %d"), offer.time)
}
