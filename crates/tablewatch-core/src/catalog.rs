//! Venue and meal-period catalog.
//!
//! The catalog is built once at startup, either from the built-in venue list or
//! from a YAML file, and then passed by reference to everything that needs it.
//! Venue order in the catalog is the order queries are issued and the order
//! the report is printed in.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Coarse booking window the platform partitions availability by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealPeriod {
    Lunch,
    Dinner,
}

impl MealPeriod {
    /// All meal periods in query order.
    pub const ALL: [MealPeriod; 2] = [MealPeriod::Lunch, MealPeriod::Dinner];

    /// Opaque identifier the platform expects in the `mealPeriod` query parameter.
    #[must_use]
    pub fn platform_id(self) -> &'static str {
        match self {
            MealPeriod::Lunch => "80000717",
            MealPeriod::Dinner => "80000714",
        }
    }
}

impl std::fmt::Display for MealPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MealPeriod::Lunch => write!(f, "lunch"),
            MealPeriod::Dinner => write!(f, "dinner"),
        }
    }
}

/// A single dining location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Venue {
    /// Short unique name used as the report key, e.g. `"be-our-guest"`.
    pub key: String,
    /// Platform restaurant identifier, e.g. `"16660079"`.
    #[serde(rename = "id")]
    pub external_id: String,
    /// Human-facing availability page.
    #[serde(rename = "url")]
    pub page_url: String,
}

impl Venue {
    #[must_use]
    pub fn new(key: &str, external_id: &str, page_url: &str) -> Self {
        Self {
            key: key.to_owned(),
            external_id: external_id.to_owned(),
            page_url: page_url.to_owned(),
        }
    }

    /// Platform ids are interpolated into a URL path, so only ASCII
    /// alphanumerics are accepted.
    #[must_use]
    pub fn has_valid_external_id(&self) -> bool {
        !self.external_id.is_empty() && self.external_id.chars().all(|c| c.is_ascii_alphanumeric())
    }
}

/// Shape of the YAML catalog file.
#[derive(Debug, Deserialize)]
pub struct CatalogFile {
    pub venues: Vec<Venue>,
}

/// Immutable, validated, ordered set of venues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    venues: Vec<Venue>,
}

impl Catalog {
    /// Builds a catalog from an ordered venue list.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if the list is empty, a key is empty
    /// or duplicated, a platform id is not alphanumeric, or a page URL is not
    /// an http(s) URL.
    pub fn new(venues: Vec<Venue>) -> Result<Self, ConfigError> {
        validate_venues(&venues)?;
        Ok(Self { venues })
    }

    /// The venues checked when no catalog file is configured.
    #[must_use]
    pub fn builtin() -> Self {
        const BASE: &str = "https://disneyworld.disney.go.com/dining";
        let venues = [
            ("be-our-guest", "16660079", "magic-kingdom/be-our-guest-restaurant"),
            ("ohana", "90002606", "polynesian-resort/ohana"),
            ("cinderella", "90002464", "magic-kingdom/cinderella-royal-table"),
            ("crystal-palace", "90002660", "magic-kingdom/crystal-palace"),
            ("ogas-cantina", "19267226", "hollywood-studios/ogas-cantina"),
            ("chef-mickey", "90001369", "contemporary-resort/chef-mickeys"),
        ]
        .into_iter()
        .map(|(key, id, page)| Venue::new(key, id, &format!("{BASE}/{page}/availability-modal")))
        .collect();
        Self { venues }
    }

    #[must_use]
    pub fn venues(&self) -> &[Venue] {
        &self.venues
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Venue> {
        self.venues.iter().find(|v| v.key == key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.venues.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.venues.is_empty()
    }

    /// Page the login flow starts from: the first venue's availability page.
    #[must_use]
    pub fn login_page(&self) -> &str {
        // Construction guarantees at least one venue.
        self.venues.first().map_or("", |v| v.page_url.as_str())
    }
}

/// Load and validate a venue catalog from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_catalog(path: &Path) -> Result<Catalog, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::CatalogFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let file: CatalogFile =
        serde_yaml::from_str(&content).map_err(ConfigError::CatalogFileParse)?;

    Catalog::new(file.venues)
}

fn validate_venues(venues: &[Venue]) -> Result<(), ConfigError> {
    if venues.is_empty() {
        return Err(ConfigError::Validation(
            "catalog must contain at least one venue".to_string(),
        ));
    }

    let mut seen_keys = HashSet::new();

    for venue in venues {
        if venue.key.trim().is_empty() {
            return Err(ConfigError::Validation(
                "venue key must be non-empty".to_string(),
            ));
        }

        if !seen_keys.insert(venue.key.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate venue key: '{}'",
                venue.key
            )));
        }

        if !venue.has_valid_external_id() {
            return Err(ConfigError::Validation(format!(
                "venue '{}' has invalid platform id '{}'; must be ASCII alphanumeric",
                venue.key, venue.external_id
            )));
        }

        if !(venue.page_url.starts_with("https://") || venue.page_url.starts_with("http://")) {
            return Err(ConfigError::Validation(format!(
                "venue '{}' has invalid page url '{}'",
                venue.key, venue.page_url
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "catalog_test.rs"]
mod tests;
