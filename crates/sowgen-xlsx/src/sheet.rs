//! Worksheet type

use std::collections::BTreeMap;

use crate::address::{CellAddress, CellRange};
use crate::error::XlsxResult;
use crate::style::{Style, StylePool};
use crate::value::CellValue;

/// Largest number of characters Excel accepts in a sheet name
pub const MAX_SHEET_NAME_LEN: usize = 31;

/// A single cell: value plus an index into the sheet's [`StylePool`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cell {
    pub value: CellValue,
    pub style_index: u32,
}

/// A list-type data validation (drop-down) over a range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListValidation {
    pub range: CellRange,
    /// Formula source, e.g. `Picklist!$E$2:$E$20`
    pub source: String,
}

/// A worksheet: sparse cells, column widths, merged regions and drop-downs
#[derive(Debug, Clone)]
pub struct Worksheet {
    name: String,
    cells: BTreeMap<(u32, u16), Cell>,
    styles: StylePool,
    column_widths: BTreeMap<u16, f64>,
    merged: Vec<CellRange>,
    validations: Vec<ListValidation>,
}

impl Worksheet {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            cells: BTreeMap::new(),
            styles: StylePool::new(),
            column_widths: BTreeMap::new(),
            merged: Vec::new(),
            validations: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename a sheet that is not yet part of a workbook
    pub fn set_name<S: Into<String>>(&mut self, name: S) {
        self.name = name.into();
    }

    /// Get a cell value; absent cells read as [`CellValue::Empty`]
    pub fn value(&self, addr: CellAddress) -> &CellValue {
        static EMPTY: CellValue = CellValue::Empty;
        self.cells
            .get(&(addr.row, addr.col))
            .map(|c| &c.value)
            .unwrap_or(&EMPTY)
    }

    /// Get a cell value by A1 reference
    pub fn value_at(&self, a1: &str) -> XlsxResult<&CellValue> {
        Ok(self.value(CellAddress::parse(a1)?))
    }

    /// Get the full cell (value and style index), if present
    pub fn cell(&self, addr: CellAddress) -> Option<&Cell> {
        self.cells.get(&(addr.row, addr.col))
    }

    /// Style applied to a cell
    pub fn style(&self, addr: CellAddress) -> Option<&Style> {
        self.cell(addr).and_then(|c| self.styles.get(c.style_index))
    }

    /// Set a cell value, keeping any existing style
    pub fn set_value<V: Into<CellValue>>(&mut self, addr: CellAddress, value: V) {
        self.cells
            .entry((addr.row, addr.col))
            .or_default()
            .value = value.into();
    }

    /// Set a cell value by A1 reference
    pub fn set_value_at<V: Into<CellValue>>(&mut self, a1: &str, value: V) -> XlsxResult<()> {
        self.set_value(CellAddress::parse(a1)?, value);
        Ok(())
    }

    /// Apply a style to a cell, creating an empty cell when absent
    pub fn set_style(&mut self, addr: CellAddress, style: &Style) {
        let idx = self.styles.get_or_insert(style);
        self.cells.entry((addr.row, addr.col)).or_default().style_index = idx;
    }

    /// Set value and style in one go
    pub fn set<V: Into<CellValue>>(&mut self, addr: CellAddress, value: V, style: &Style) {
        let idx = self.styles.get_or_insert(style);
        self.cells.insert(
            (addr.row, addr.col),
            Cell {
                value: value.into(),
                style_index: idx,
            },
        );
    }

    /// Set a column width in characters
    pub fn set_column_width(&mut self, col: u16, width: f64) {
        self.column_widths.insert(col, width);
    }

    pub fn column_width(&self, col: u16) -> Option<f64> {
        self.column_widths.get(&col).copied()
    }

    pub(crate) fn column_widths(&self) -> impl Iterator<Item = (u16, f64)> + '_ {
        self.column_widths.iter().map(|(c, w)| (*c, *w))
    }

    /// Merge a rectangular region
    pub fn merge_cells(&mut self, range: CellRange) {
        if !self.merged.contains(&range) {
            self.merged.push(range);
        }
    }

    pub fn merged_regions(&self) -> &[CellRange] {
        &self.merged
    }

    /// Add a list drop-down over `range`
    pub fn add_list_validation<S: Into<String>>(&mut self, range: CellRange, source: S) {
        self.validations.push(ListValidation {
            range,
            source: source.into(),
        });
    }

    pub fn list_validations(&self) -> &[ListValidation] {
        &self.validations
    }

    /// Iterate non-empty cells in row-major order
    pub fn iter_cells(&self) -> impl Iterator<Item = (CellAddress, &Cell)> {
        self.cells
            .iter()
            .map(|((row, col), cell)| (CellAddress::new(*row, *col), cell))
    }

    pub(crate) fn cell_mut(&mut self, addr: CellAddress) -> Option<&mut Cell> {
        self.cells.get_mut(&(addr.row, addr.col))
    }

    pub(crate) fn style_pool(&self) -> &StylePool {
        &self.styles
    }

    /// Highest used row index, if any cell exists
    pub fn max_row(&self) -> Option<u32> {
        self.cells.keys().next_back().map(|(row, _)| *row)
    }

    /// Highest used column index in a row
    pub fn max_col_in_row(&self, row: u32) -> Option<u16> {
        self.cells
            .range((row, 0)..=(row, u16::MAX))
            .next_back()
            .map(|((_, col), _)| *col)
    }

    /// Number of stored cells
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::Color;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_set_and_read() {
        let mut sheet = Worksheet::new("Pricing Details");
        sheet.set_value_at("B1", "IEEE").unwrap();
        sheet.set_value_at("F7", 230.0).unwrap();

        assert_eq!(sheet.value_at("B1").unwrap(), &CellValue::string("IEEE"));
        assert_eq!(sheet.value_at("Z99").unwrap(), &CellValue::Empty);
        assert_eq!(sheet.max_row(), Some(6));
        assert_eq!(sheet.max_col_in_row(6), Some(5));
    }

    #[test]
    fn test_style_kept_on_value_update() {
        let mut sheet = Worksheet::new("S");
        let addr = CellAddress::new(0, 0);
        let header = Style::new().bold(true).fill_color(Color::rgb(1, 2, 3));
        sheet.set(addr, "Practice", &header);
        sheet.set_value(addr, "Role");

        assert_eq!(sheet.style(addr), Some(&header));
        assert_eq!(sheet.value(addr), &CellValue::string("Role"));
    }
}
