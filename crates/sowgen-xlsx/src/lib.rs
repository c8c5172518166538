//! # sowgen-xlsx
//!
//! A lean XLSX (Office Open XML) layer: an in-memory workbook model, a
//! reader, a writer with style deduplication, a formula recalculator for
//! uncached formulas and a streaming cell patcher for editing packages in
//! place.

pub mod address;
pub mod calc;
pub mod error;
pub mod patch;
pub mod reader;
pub mod sheet;
pub mod style;
pub mod value;
pub mod workbook;
pub mod writer;

mod styles;

pub use address::{CellAddress, CellRange};
pub use calc::{evaluate, recalculate, CalculationStats};
pub use error::{XlsxError, XlsxResult};
pub use patch::{patch, patch_file, CellPatch};
pub use reader::XlsxReader;
pub use sheet::{Cell, ListValidation, Worksheet};
pub use style::{
    Alignment, BorderStyle, Color, FillStyle, FontStyle, HorizontalAlignment, Style, StylePool,
};
pub use value::CellValue;
pub use workbook::Workbook;
pub use writer::XlsxWriter;
