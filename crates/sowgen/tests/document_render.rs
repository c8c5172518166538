//! Document rendering through the built-in template

use std::path::PathBuf;

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rust_decimal::Decimal;
use sowgen::prelude::*;
use sowgen::{money, DocxPackage};
use tempfile::TempDir;

fn reference_data() -> ReferenceData {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../data/sow-reference-data.json");
    ReferenceData::load(path).unwrap()
}

fn options() -> DocumentOptions {
    DocumentOptions {
        template: None,
        date: Some("2026-03-01".into()),
    }
}

fn manager_model() -> ContentModel {
    let reference = reference_data();
    Builder::new(&reference, BuildOptions::default())
        .from_json_str(
            r#"{
                "project": {"client_name": "IEEE", "project_name": "Planning Rollout", "duration_months": 2},
                "resources": [{"practice": "EPM_Practice_USA", "resource_role": "Project Manager", "monthly_hours": [24, 168]}]
            }"#,
            "manager.json",
        )
        .unwrap()
        .model
}

#[test]
fn test_fee_total_formatting() {
    let model = manager_model();
    assert_eq!(money::round_cents(model.totals().total_fees), Decimal::new(4416000, 2));

    let (package, report) = render_document(&model, &ScopeOverrides::default(), &options()).unwrap();
    assert!(report.is_clean(), "{:?}", report.unresolved);
    let text = package.document_text().unwrap();
    assert!(text.contains("$44,160.00"), "{}", text);
    assert!(text.contains("$230"), "{}", text);
}

#[test]
fn test_no_placeholder_survives() {
    let (package, report) =
        render_document(&manager_model(), &ScopeOverrides::default(), &options()).unwrap();
    assert!(report.unresolved.is_empty());
    let text = package.document_text().unwrap();
    assert!(!text.contains('{'), "{}", text);
    assert!(!text.contains('}'), "{}", text);
}

#[test]
fn test_overrides_take_precedence() {
    let overrides: ScopeOverrides = serde_json::from_str(
        r#"{
            "msa_date": "2024-05-01",
            "scope_items": ["Configure planning models", "Migrate historical actuals"],
            "out_of_scope": ["Hardware procurement"]
        }"#,
    )
    .unwrap();
    let (package, _) = render_document(&manager_model(), &overrides, &options()).unwrap();
    let text = package.document_text().unwrap();

    assert!(text.contains("Configure planning models"));
    assert!(text.contains("Migrate historical actuals"));
    assert!(text.contains("Hardware procurement"));
    assert!(!text.contains("Provide Project Manager services"));
    assert!(!text.contains("[MSA DATE]"));
}

#[test]
fn test_unknown_about_field_is_reported() {
    let overrides: ScopeOverrides =
        serde_json::from_str(r#"{"about": "For {client_name} see {unknown_field}"}"#).unwrap();
    let (package, report) = render_document(&manager_model(), &overrides, &options()).unwrap();

    let text = package.document_text().unwrap();
    assert!(text.contains("For IEEE see"), "{}", text);
    assert!(!text.contains("{unknown_field}"), "{}", text);
    assert!(!report.is_clean());
    assert!(report.unresolved.contains("unknown_field"), "{:?}", report.unresolved);
}

#[test]
fn test_empty_sections_are_left_out() {
    let mut model = ContentModel::default();
    model.project.client_name = "IEEE".into();
    let overrides = ScopeOverrides {
        misc_provisions: Some(Vec::new()),
        ..ScopeOverrides::default()
    };
    let (package, report) = render_document(&model, &overrides, &options()).unwrap();
    assert!(report.is_clean(), "{:?}", report.unresolved);

    let text = package.document_text().unwrap();
    assert!(text.contains("Engagement Fees"), "{}", text);
    assert!(!text.contains("Practice / Role"), "{}", text);
    assert!(!text.contains("Miscellaneous Provisions"), "{}", text);
    assert!(!text.contains("Narrative"), "{}", text);

    let (package, _) = render_document(&manager_model(), &ScopeOverrides::default(), &options()).unwrap();
    let text = package.document_text().unwrap();
    assert!(text.contains("Practice / Role"));
    assert!(text.contains("Miscellaneous Provisions"));
}

#[test]
fn test_regional_rate_from_reference_data() {
    let reference = reference_data();
    let report = Builder::new(&reference, BuildOptions::default())
        .from_json_str(
            r#"{"resources": [{"practice": "TS_Practice_India", "resource_role": "Developer", "location": "India", "monthly_hours": [160]}]}"#,
            "india.json",
        )
        .unwrap();
    let rate = report.model.resources[0].rate();
    assert!(rate >= Decimal::from(45) && rate <= Decimal::from(75), "{}", rate);
    assert!(report.warnings.is_empty(), "{:?}", report.warnings);
}

#[test]
fn test_written_document_reopens() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sow.docx");
    let report = write_document(&manager_model(), &ScopeOverrides::default(), &options(), &path).unwrap();
    assert!(report.is_clean());

    let reopened = DocxPackage::open(&path).unwrap();
    let text = reopened.document_text().unwrap();
    assert!(text.contains("Planning Rollout"));
    assert!(text.contains("March 01, 2026"));
}

#[test]
fn test_json_only_output() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sow.json");
    write_document_json(&manager_model(), &ScopeOverrides::default(), &options(), &path).unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["context"]["fees_total"], "$44,160.00");
    assert_eq!(json["context"]["client_name"], "IEEE");
    assert_eq!(json["totals"]["total_fees"].as_f64(), Some(44160.0));
    assert_eq!(json["model"]["resources"].as_array().map(Vec::len), Some(1));
    assert!(!dir.path().join("sow.docx").exists());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_assumption_count_is_preserved(count in 0usize..=50) {
        let items: Vec<String> = (0..count).map(|i| format!("Assumption number {}", i)).collect();
        let overrides = ScopeOverrides {
            assumptions: Some(items.clone()),
            ..ScopeOverrides::default()
        };
        let (package, report) = render_document(&manager_model(), &overrides, &options()).unwrap();
        prop_assert!(report.unresolved.is_empty());

        let text = package.document_text().unwrap();
        let rendered: Vec<&str> = text
            .lines()
            .filter(|line| line.starts_with("Assumption number "))
            .collect();
        prop_assert_eq!(rendered, items.iter().map(String::as_str).collect::<Vec<_>>());
    }
}
