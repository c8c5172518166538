//! The bundled reference data file

use std::path::PathBuf;

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rust_decimal::Decimal;
use sowgen_core::reference::RateSource;
use sowgen_core::ReferenceData;

fn bundled() -> ReferenceData {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../data/sow-reference-data.json");
    ReferenceData::load(path).unwrap()
}

#[test]
fn test_rate_keys_use_listed_practices_and_roles() {
    let data = bundled();
    assert!(!data.rates.is_empty());
    for key in data.rates.keys() {
        let (practice, role) = key.split_once('|').unwrap();
        assert!(data.practices.iter().any(|p| p == practice), "{}", key);
        assert!(data.roles.iter().any(|r| r == role), "{}", key);
    }
}

#[test]
fn test_deliverable_phases_keep_file_order() {
    let phases: Vec<String> = bundled()
        .default_deliverables()
        .into_iter()
        .map(|p| p.phase)
        .collect();
    assert_eq!(phases.first().map(String::as_str), Some("Mobilize"));
    assert_eq!(phases.last().map(String::as_str), Some("HyperCare"));
}

#[test]
fn test_india_rates_stay_in_band() {
    let data = bundled();
    for (key, entry) in &data.rates {
        if key.contains("India") {
            assert!(
                entry.bill_rate >= Decimal::from(45) && entry.bill_rate <= Decimal::from(75),
                "{} = {}",
                key,
                entry.bill_rate
            );
        }
    }
}

#[test]
fn test_missing_file_names_path() {
    let err = ReferenceData::load("does/not/exist.json").unwrap_err();
    assert!(err.to_string().contains("does/not/exist.json"), "{}", err);
}

proptest! {
    #[test]
    fn prop_unknown_roles_resolve_to_fallback(role in "[A-Z][a-z]{3,12} [A-Z][a-z]{3,12}") {
        let data = bundled();
        prop_assume!(!data.roles.contains(&role));

        let india = data.resolve_rate("TS_Practice_India", &role, None);
        prop_assert_eq!(india.source, RateSource::Regional("India".into()));
        prop_assert_eq!(india.rate, Decimal::from(55));

        let usa = data.resolve_rate("TS_Practice_USA", &role, None);
        prop_assert_eq!(usa.source, RateSource::Default);
        prop_assert_eq!(usa.rate, Decimal::from(200));
    }
}
