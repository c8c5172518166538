//! Workbook type

use crate::error::{XlsxError, XlsxResult};
use crate::sheet::{Worksheet, MAX_SHEET_NAME_LEN};

/// An ordered collection of worksheets
#[derive(Debug, Clone, Default)]
pub struct Workbook {
    sheets: Vec<Worksheet>,
}

impl Workbook {
    /// Create an empty workbook
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new sheet and return it for filling
    pub fn add_sheet<S: Into<String>>(&mut self, name: S) -> XlsxResult<&mut Worksheet> {
        self.push_sheet(Worksheet::new(name))
    }

    /// Append an existing sheet, e.g. one taken from another workbook
    pub fn push_sheet(&mut self, sheet: Worksheet) -> XlsxResult<&mut Worksheet> {
        let name = sheet.name();
        if name.is_empty() || name.chars().count() > MAX_SHEET_NAME_LEN {
            return Err(XlsxError::InvalidFormat(format!(
                "sheet name '{}' must be 1 to {} characters",
                name, MAX_SHEET_NAME_LEN
            )));
        }
        if name.contains(|c| matches!(c, ':' | '\\' | '/' | '?' | '*' | '[' | ']')) {
            return Err(XlsxError::InvalidFormat(format!(
                "sheet name '{}' contains a reserved character",
                name
            )));
        }
        if self.sheet(name).is_some() {
            return Err(XlsxError::InvalidFormat(format!(
                "duplicate sheet name '{}'",
                name
            )));
        }
        self.sheets.push(sheet);
        let last = self.sheets.len() - 1;
        Ok(&mut self.sheets[last])
    }

    /// Sheet names are matched case-insensitively, like Excel does
    pub fn sheet(&self, name: &str) -> Option<&Worksheet> {
        self.sheets
            .iter()
            .find(|s| s.name().eq_ignore_ascii_case(name))
    }

    pub fn sheet_mut(&mut self, name: &str) -> Option<&mut Worksheet> {
        self.sheets
            .iter_mut()
            .find(|s| s.name().eq_ignore_ascii_case(name))
    }

    /// Like [`Workbook::sheet`] but failing with [`XlsxError::SheetNotFound`]
    pub fn require(&self, name: &str) -> XlsxResult<&Worksheet> {
        self.sheet(name)
            .ok_or_else(|| XlsxError::SheetNotFound(name.to_string()))
    }

    pub fn sheets(&self) -> &[Worksheet] {
        &self.sheets
    }

    pub(crate) fn sheets_mut(&mut self) -> &mut [Worksheet] {
        &mut self.sheets
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name()).collect()
    }

    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }
}
