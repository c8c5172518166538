//! Cloning a rendered workbook with scalar and structural patches

use std::path::{Path, PathBuf};

use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use sowgen::prelude::*;
use sowgen::{Workbook, XlsxReader};
use sowgen_xlsx::XlsxWriter;
use tempfile::TempDir;

fn reference() -> ReferenceData {
    let mut data = ReferenceData::default();
    data.insert_rate("EPM_Practice_USA", "Project Manager", Decimal::from(230));
    data.insert_rate("TS_Practice_India", "Developer", Decimal::from(55));
    data
}

fn source_workbook(dir: &Path, reference: &ReferenceData) -> (PathBuf, ContentModel) {
    let model = Builder::new(reference, BuildOptions::default())
        .from_json_str(
            r#"{
                "project": {"client_name": "IEEE", "project_name": "Planning Rollout", "duration_months": 2},
                "sales_team": {"sales_rep": "Sam Ortiz"},
                "resources": [{"practice": "EPM_Practice_USA", "resource_role": "Project Manager", "monthly_hours": [24, 168]}]
            }"#,
            "source.json",
        )
        .unwrap()
        .model;
    let path = dir.join("source.xlsx");
    write_workbook(&model, reference, &path).unwrap();
    (path, model)
}

fn read_back(path: &Path, reference: &ReferenceData) -> ContentModel {
    Builder::new(reference, BuildOptions::default())
        .from_workbook_file(path)
        .unwrap()
        .model
}

#[test]
fn test_scalar_patch_edits_in_place() {
    let reference = reference();
    let dir = TempDir::new().unwrap();
    let (source, model) = source_workbook(dir.path(), &reference);
    let dest = dir.path().join("clone.xlsx");

    let patch: ContentPatch = serde_json::from_str(
        r#"{"project": {"client_name": "ACME", "project_name": "Close Automation"}, "sales_team": {"sales_rep": "Kim Lee"}}"#,
    )
    .unwrap();
    let outcome = clone_workbook(&source, &dest, &patch, &reference, &BuildOptions::default()).unwrap();
    assert_eq!(outcome, CloneOutcome::Patched { cells: 5 });

    let cloned = read_back(&dest, &reference);
    assert_eq!(cloned.project.client_name, "ACME");
    assert_eq!(cloned.project.project_name, "Close Automation");
    assert_eq!(cloned.sales_team.sales_rep, "Kim Lee");
    assert_eq!(cloned.resources, model.resources);
    assert_eq!(cloned.phases, model.phases);

    // Untouched sheets carry over cell for cell
    let before = XlsxReader::read_file(&source).unwrap();
    let after = XlsxReader::read_file(&dest).unwrap();
    assert_eq!(after.sheet_names(), before.sheet_names());
    for name in ["Timeline", "Deliverables", "Picklist"] {
        let a: Vec<_> = before.sheet(name).unwrap().iter_cells().map(|(addr, c)| (addr, c.value.clone())).collect();
        let b: Vec<_> = after.sheet(name).unwrap().iter_cells().map(|(addr, c)| (addr, c.value.clone())).collect();
        assert_eq!(a, b, "sheet {}", name);
    }

    // The source is never written
    assert_eq!(read_back(&source, &reference).project.client_name, "IEEE");
}

#[test]
fn test_structural_patch_rebuilds() {
    let reference = reference();
    let dir = TempDir::new().unwrap();
    let (source, model) = source_workbook(dir.path(), &reference);
    let dest = dir.path().join("clone.xlsx");

    let patch: ContentPatch = serde_json::from_str(
        r#"{
            "project": {"client_name": "ACME"},
            "resources": [
                {"practice": "EPM_Practice_USA", "resource_role": "Project Manager", "monthly_hours": [40, 40]},
                {"practice": "TS_Practice_India", "resource_role": "Developer", "location": "India", "monthly_hours": [160, 160]}
            ]
        }"#,
    )
    .unwrap();
    let outcome = clone_workbook(&source, &dest, &patch, &reference, &BuildOptions::default()).unwrap();
    assert!(matches!(outcome, CloneOutcome::Rebuilt { .. }));

    let cloned = read_back(&dest, &reference);
    assert_eq!(cloned.project.client_name, "ACME");
    assert_eq!(cloned.project.project_name, model.project.project_name);
    assert_eq!(cloned.sales_team, model.sales_team);
    assert_eq!(cloned.resources.len(), 2);
    assert_eq!(cloned.resources[1].rate(), Decimal::from(55));
    assert_eq!(cloned.totals().total_fees, Decimal::from(230 * 80 + 55 * 320));
}

#[test]
fn test_empty_patch_copies() {
    let reference = reference();
    let dir = TempDir::new().unwrap();
    let (source, model) = source_workbook(dir.path(), &reference);
    let dest = dir.path().join("copy.xlsx");

    let outcome = clone_workbook(&source, &dest, &ContentPatch::default(), &reference, &BuildOptions::default()).unwrap();
    assert_eq!(outcome, CloneOutcome::Copied);
    assert_eq!(read_back(&dest, &reference).resources, model.resources);
}

#[test]
fn test_clone_refuses_to_overwrite_source() {
    let reference = reference();
    let dir = TempDir::new().unwrap();
    let (source, _) = source_workbook(dir.path(), &reference);

    let patch: ContentPatch = serde_json::from_str(r#"{"project": {"client_name": "ACME"}}"#).unwrap();
    let err = clone_workbook(&source, &source, &patch, &reference, &BuildOptions::default()).unwrap_err();
    assert!(err.to_string().contains("source"), "{}", err);
    assert_eq!(read_back(&source, &reference).project.client_name, "IEEE");
}

#[test]
fn test_clone_requires_pricing_sheet() {
    let reference = reference();
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("foreign.xlsx");
    let mut workbook = Workbook::new();
    workbook.add_sheet("Sheet1").unwrap();
    XlsxWriter::write_file(&workbook, &source).unwrap();

    let patch: ContentPatch = serde_json::from_str(r#"{"project": {"client_name": "ACME"}}"#).unwrap();
    let err = clone_workbook(&source, dir.path().join("out.xlsx"), &patch, &reference, &BuildOptions::default())
        .unwrap_err();
    assert!(err.to_string().contains("Pricing Details"), "{}", err);
}
