//! Clone/merge of an existing pricing workbook
//!
//! A patch that only touches project or sales-team fields is applied in
//! place: the source package is streamed to the destination with just the
//! affected header cells rewritten, so anything the builder does not model
//! (extra sheets, comments, formatting) survives. A patch that changes
//! resources, phases, deliverables or the duration reshapes the tables; the
//! source is read into a model, the patch is merged and the workbook is
//! rendered afresh.

use std::path::Path;

use sowgen_core::{
    ContentPatch, Error as CoreError, ProjectPatch, ReferenceData, SalesTeamPatch, PRICING_SHEET,
};
use sowgen_xlsx::{patch_file, CellAddress, CellPatch, Workbook, XlsxReader};

use crate::builder::{self, BuildOptions, BuildWarning, Builder, SUMMARY_SHEET};
use crate::error::{Error, Result};
use crate::workbook::write_workbook;

/// How the destination was produced
#[derive(Debug, Clone, PartialEq)]
pub enum CloneOutcome {
    /// Empty patch: the package was copied entry for entry
    Copied,
    /// Header cells were rewritten in place
    Patched { cells: usize },
    /// The workbook was rebuilt from the merged model
    Rebuilt { warnings: Vec<BuildWarning> },
}

/// Read a patch document
pub fn load_patch<P: AsRef<Path>>(path: P) -> Result<ContentPatch> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| CoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let patch =
        serde_json::from_str(&text).map_err(|e| CoreError::json(path.display().to_string(), e))?;
    Ok(patch)
}

/// Copy `source` to `dest`, applying `patch`
pub fn clone_workbook<P: AsRef<Path>, Q: AsRef<Path>>(
    source: P,
    dest: Q,
    patch: &ContentPatch,
    reference: &ReferenceData,
    options: &BuildOptions,
) -> Result<CloneOutcome> {
    let source = source.as_ref();
    let dest = dest.as_ref();
    ensure_distinct(source, dest)?;

    if patch.is_structural() {
        let mut model = builder::load_workbook(source)?;
        patch.apply_to(&mut model);
        let report = Builder::new(reference, options.clone()).normalize(model);
        write_workbook(&report.model, reference, dest)?;
        log::info!(
            "rebuilt '{}' from '{}' with structural changes",
            dest.display(),
            source.display()
        );
        return Ok(CloneOutcome::Rebuilt {
            warnings: report.warnings,
        });
    }

    let workbook = XlsxReader::read_file(source).map_err(|e| Error::workbook(source, e))?;
    if workbook.sheet(PRICING_SHEET).is_none() {
        return Err(CoreError::MissingSheet {
            file: source.display().to_string(),
            sheet: PRICING_SHEET.to_string(),
        }
        .into());
    }
    let patches = cell_patches(&workbook, patch);
    let cells = patch_file(source, dest, &patches).map_err(|e| Error::workbook(dest, e))?;
    log::info!(
        "cloned '{}' to '{}' ({} cells patched)",
        source.display(),
        dest.display(),
        cells
    );
    Ok(if cells == 0 {
        CloneOutcome::Copied
    } else {
        CloneOutcome::Patched { cells }
    })
}

/// The source is only ever read; writing over it would lose it on failure
fn ensure_distinct(source: &Path, dest: &Path) -> Result<()> {
    let same = match (source.canonicalize(), dest.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    };
    if same {
        return Err(Error::output(
            dest,
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "destination is the source workbook",
            ),
        ));
    }
    Ok(())
}

/// A patchable field: where it lives on Pricing Details, and on Summary
/// together with the label that must be present there
struct FieldCell {
    pricing: Option<&'static str>,
    summary: Option<(&'static str, &'static str, &'static str)>,
}

const fn field(
    pricing: Option<&'static str>,
    summary: Option<(&'static str, &'static str, &'static str)>,
) -> FieldCell {
    FieldCell { pricing, summary }
}

fn project_fields(p: &ProjectPatch) -> Vec<(FieldCell, Option<&String>)> {
    vec![
        (field(Some("B1"), Some(("A4", "B4", "client name"))), p.client_name.as_ref()),
        (field(None, Some(("A5", "B5", "project name"))), p.project_name.as_ref()),
        (field(Some("B2"), Some(("A6", "B6", "capability"))), p.capability_area.as_ref()),
        (field(Some("B3"), Some(("A7", "B7", "service"))), p.service_type.as_ref()),
        (field(Some("B4"), Some(("A8", "B8", "contract type"))), p.contract_type.as_ref()),
        (field(Some("F2"), None), p.project_type.as_ref()),
        (field(Some("F3"), Some(("A9", "B9", "risk profile"))), p.risk_profile.as_ref()),
        (field(Some("D1"), Some(("A10", "B10", "pricing date"))), p.pricing_date.as_ref()),
        (field(Some("F4"), Some(("A11", "B11", "project start"))), p.project_start_date.as_ref()),
    ]
}

fn sales_fields(s: &SalesTeamPatch) -> Vec<(FieldCell, Option<&String>)> {
    vec![
        (field(Some("D3"), Some(("A15", "B15", "relationship owner"))), s.relationship_owner.as_ref()),
        (field(Some("D2"), Some(("A16", "B16", "sales rep"))), s.sales_rep.as_ref()),
        (field(None, Some(("A17", "B17", "inside sales"))), s.inside_sales.as_ref()),
        (field(Some("D4"), Some(("A18", "B18", "sales team leader"))), s.sales_team_leader.as_ref()),
    ]
}

/// Cell edits for the scalar fields of a patch
fn cell_patches(workbook: &Workbook, patch: &ContentPatch) -> Vec<CellPatch> {
    let mut fields = Vec::new();
    if let Some(project) = &patch.project {
        fields.extend(project_fields(project));
    }
    if let Some(sales) = &patch.sales_team {
        fields.extend(sales_fields(sales));
    }

    let summary = workbook.sheet(SUMMARY_SHEET);
    let mut patches = Vec::new();
    for (cell, value) in fields {
        let value = match value {
            Some(v) => v,
            None => continue,
        };
        let mut placed = false;
        if let Some(a1) = cell.pricing {
            if let Ok(addr) = CellAddress::parse(a1) {
                patches.push(CellPatch::new(PRICING_SHEET, addr, value.as_str()));
                placed = true;
            }
        }
        // Only a Summary laid out the way we render it is edited
        if let (Some(sheet), Some((label_a1, value_a1, label))) = (summary, cell.summary) {
            let label_matches = sheet
                .value_at(label_a1)
                .ok()
                .and_then(|v| v.as_text())
                .map_or(false, |text| text.to_ascii_lowercase().starts_with(label));
            if label_matches {
                if let Ok(addr) = CellAddress::parse(value_a1) {
                    patches.push(CellPatch::new(sheet.name(), addr, value.as_str()));
                    placed = true;
                }
            }
        }
        if !placed {
            log::warn!(
                "no cell to hold '{}' in this workbook; value not written",
                value
            );
        }
    }
    patches
}
