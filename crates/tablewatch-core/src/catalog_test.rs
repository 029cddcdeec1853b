use std::io::Write;

use super::*;

fn venue(key: &str, id: &str) -> Venue {
    Venue::new(key, id, "https://example.com/dining/venue/availability-modal")
}

#[test]
fn builtin_catalog_is_valid_and_ordered() {
    let catalog = Catalog::builtin();
    assert!(validate_venues(catalog.venues()).is_ok());
    let keys: Vec<&str> = catalog.venues().iter().map(|v| v.key.as_str()).collect();
    assert_eq!(
        keys,
        [
            "be-our-guest",
            "ohana",
            "cinderella",
            "crystal-palace",
            "ogas-cantina",
            "chef-mickey"
        ]
    );
}

#[test]
fn builtin_login_page_is_first_venue() {
    let catalog = Catalog::builtin();
    assert_eq!(
        catalog.login_page(),
        "https://disneyworld.disney.go.com/dining/magic-kingdom/be-our-guest-restaurant/availability-modal"
    );
}

#[test]
fn meal_period_platform_ids() {
    assert_eq!(MealPeriod::Lunch.platform_id(), "80000717");
    assert_eq!(MealPeriod::Dinner.platform_id(), "80000714");
    assert_eq!(MealPeriod::ALL, [MealPeriod::Lunch, MealPeriod::Dinner]);
}

#[test]
fn get_finds_venue_by_key() {
    let catalog = Catalog::builtin();
    assert_eq!(catalog.get("ohana").map(|v| v.external_id.as_str()), Some("90002606"));
    assert!(catalog.get("missing").is_none());
}

#[test]
fn validate_rejects_empty_catalog() {
    let err = Catalog::new(vec![]).unwrap_err();
    assert!(matches!(err, ConfigError::Validation(_)));
}

#[test]
fn validate_rejects_duplicate_key() {
    let err = Catalog::new(vec![venue("ohana", "1"), venue("ohana", "2")]).unwrap_err();
    assert!(
        matches!(err, ConfigError::Validation(ref msg) if msg.contains("duplicate")),
        "expected duplicate key error, got: {err:?}"
    );
}

#[test]
fn validate_rejects_blank_key() {
    let err = Catalog::new(vec![venue("  ", "1")]).unwrap_err();
    assert!(matches!(err, ConfigError::Validation(_)));
}

#[test]
fn validate_rejects_non_alphanumeric_platform_id() {
    let err = Catalog::new(vec![venue("ohana", "9000/../2606")]).unwrap_err();
    assert!(
        matches!(err, ConfigError::Validation(ref msg) if msg.contains("platform id")),
        "expected platform id error, got: {err:?}"
    );
}

#[test]
fn validate_rejects_non_http_page_url() {
    let err = Catalog::new(vec![Venue::new("ohana", "90002606", "ftp://example.com")]).unwrap_err();
    assert!(matches!(err, ConfigError::Validation(ref msg) if msg.contains("page url")));
}

#[test]
fn load_catalog_reads_yaml_in_file_order() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        "venues:\n  - key: crystal-palace\n    id: \"90002660\"\n    url: https://example.com/crystal\n  - key: ohana\n    id: \"90002606\"\n    url: https://example.com/ohana\n"
    )
    .unwrap();

    let catalog = load_catalog(file.path()).unwrap();
    assert_eq!(catalog.len(), 2);
    assert_eq!(catalog.venues()[0].key, "crystal-palace");
    assert_eq!(catalog.venues()[1].external_id, "90002606");
}

#[test]
fn load_catalog_missing_file_is_io_error() {
    let err = load_catalog(Path::new("/definitely/not/here/venues.yaml")).unwrap_err();
    assert!(matches!(err, ConfigError::CatalogFileIo { .. }));
}

#[test]
fn load_catalog_malformed_yaml_is_parse_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "venues: [this is: not: valid").unwrap();
    let err = load_catalog(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::CatalogFileParse(_)));
}
