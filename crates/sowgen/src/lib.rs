//! # sowgen
//!
//! Statement of Work generation from pricing data.
//!
//! sowgen reads a SOW pricing specification (JSON, or a pricing workbook)
//! into a [`ContentModel`] and renders it as:
//!
//! - an eleven-sheet pricing workbook with live formulas ([`write_workbook`])
//! - a Statement of Work document from a placeholder template ([`write_document`])
//! - a patched copy of an existing workbook ([`clone_workbook`])
//!
//! Reference data (rates, picklists, default deliverables) is loaded once and
//! passed by reference into every pipeline.
//!
//! ## Example
//!
//! ```rust
//! use sowgen::prelude::*;
//!
//! let reference = ReferenceData::default();
//! let builder = Builder::new(&reference, BuildOptions::default());
//! let report = builder.from_json_str(r#"{
//!     "project": {"client_name": "IEEE", "duration_months": 2},
//!     "resources": [{
//!         "practice": "EPM_Practice_USA",
//!         "resource_role": "Project Manager",
//!         "hourly_rate": 230,
//!         "monthly_hours": [24, 168]
//!     }]
//! }"#, "example.json").unwrap();
//!
//! let workbook = render_workbook(&report.model, &reference).unwrap();
//! assert_eq!(workbook.sheet_count(), 11);
//!
//! // write_workbook(&report.model, &reference, "sow.xlsx").unwrap();
//! ```

pub mod builder;
pub mod clone;
pub mod document;
pub mod error;
pub mod prelude;
pub mod workbook;

pub use builder::{BuildOptions, BuildReport, BuildWarning, Builder};
pub use clone::{clone_workbook, load_patch, CloneOutcome};
pub use document::{
    document_context, render_document, write_document, write_document_json, DocumentContent,
    DocumentOptions,
};
pub use error::{Error, Result};
pub use workbook::{
    render_workbook, render_workbook_with_template, write_workbook, write_workbook_with,
    WorkbookOptions, SHEET_NAMES,
};

// Re-export the model and container types callers work with
pub use sowgen_core::{
    dates, money, ContentModel, ContentPatch, DeliverableSet, Phase, PhaseDeliverables,
    ProjectInfo, ReferenceData, ResourceRow, SalesTeam, ScopeOverrides, Totals, TBD,
};
pub use sowgen_docx::{Context, DocxPackage, RenderReport};
pub use sowgen_xlsx::{recalculate, CalculationStats, CellValue, Workbook, XlsxReader};
