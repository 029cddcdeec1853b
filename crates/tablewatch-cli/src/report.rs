//! Terminal rendering of an [`AvailabilityReport`].

use chrono::NaiveDate;
use colored::Colorize;
use tablewatch_scraper::{AvailabilityReport, VenueReport, VenueStatus};

pub(crate) fn headline(guests: u32, start: NaiveDate, end: NaiveDate) -> String {
    if start == end {
        format!("Searching for availability for {guests} guests on {start}...")
    } else {
        format!("Searching for availability for {guests} guests from {start} to {end}...")
    }
}

/// One block per venue in report order. Venues with slots list them
/// indented under the label; every other state is a single line.
pub(crate) fn render(report: &AvailabilityReport, color: bool) -> String {
    let mut lines = Vec::new();
    for venue in report.venues() {
        let name = label(venue, color);
        match &venue.status {
            VenueStatus::Available(slots) => {
                lines.push(format!("{name} {}", venue.page_url));
                lines.extend(slots.iter().map(|slot| format!("    - {slot}")));
            }
            VenueStatus::NoAvailability => lines.push(name),
            VenueStatus::Unknown => lines.push(format!(
                "{name} (unknown: {} queries failed)",
                venue.failed_queries
            )),
            VenueStatus::NotChecked => lines.push(format!("{name} (not checked)")),
        }
        if venue.failed_queries > 0
            && matches!(
                venue.status,
                VenueStatus::Available(_) | VenueStatus::NoAvailability
            )
        {
            lines.push(format!("    ({} queries failed)", venue.failed_queries));
        }
    }

    let mut out = lines.join("\n");
    if !out.is_empty() {
        out.push('\n');
    }
    out
}

fn label(venue: &VenueReport, color: bool) -> String {
    let key = venue.venue_key.as_str();
    if !color {
        return key.to_owned();
    }
    match venue.status {
        VenueStatus::Available(_) => key.green().bold().to_string(),
        VenueStatus::NoAvailability => key.red().to_string(),
        VenueStatus::Unknown => key.yellow().to_string(),
        VenueStatus::NotChecked => key.dimmed().to_string(),
    }
}
