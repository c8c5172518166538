//! Cell address and range types

use std::fmt;
use std::str::FromStr;

use crate::error::{XlsxError, XlsxResult};

/// Last valid row index (0-based)
pub const MAX_ROW: u32 = 1_048_575;

/// Last valid column index (0-based, XFD)
pub const MAX_COL: u16 = 16_383;

/// A cell address (e.g. "A1", "$B$2")
///
/// Rows and columns are 0-based internally and 1-based / lettered in display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellAddress {
    pub row: u32,
    pub col: u16,
}

impl CellAddress {
    pub const fn new(row: u32, col: u16) -> Self {
        Self { row, col }
    }

    /// Parse A1-style notation; `$` markers are accepted and dropped
    ///
    /// ```
    /// use sowgen_xlsx::CellAddress;
    ///
    /// let addr = CellAddress::parse("$F$4").unwrap();
    /// assert_eq!((addr.row, addr.col), (3, 5));
    /// assert_eq!(addr.to_string(), "F4");
    /// ```
    pub fn parse(s: &str) -> XlsxResult<Self> {
        let s = s.trim();
        let bytes = s.as_bytes();
        let mut pos = 0;

        if bytes.get(pos) == Some(&b'$') {
            pos += 1;
        }
        let col_start = pos;
        while pos < bytes.len() && bytes[pos].is_ascii_alphabetic() {
            pos += 1;
        }
        if pos == col_start {
            return Err(XlsxError::InvalidAddress(format!(
                "no column letters in '{}'",
                s
            )));
        }
        let col = Self::letters_to_column(&s[col_start..pos])?;

        if bytes.get(pos) == Some(&b'$') {
            pos += 1;
        }
        let row: u32 = s[pos..]
            .parse()
            .map_err(|_| XlsxError::InvalidAddress(format!("invalid row number in '{}'", s)))?;
        if row == 0 || row - 1 > MAX_ROW {
            return Err(XlsxError::InvalidAddress(format!(
                "row out of range in '{}'",
                s
            )));
        }

        Ok(Self { row: row - 1, col })
    }

    /// Convert column index to letters (0 = A, 25 = Z, 26 = AA, etc.)
    pub fn column_to_letters(col: u16) -> String {
        let mut result = String::new();
        let mut n = col as u32 + 1;

        while n > 0 {
            n -= 1;
            let c = ((n % 26) as u8 + b'A') as char;
            result.insert(0, c);
            n /= 26;
        }

        result
    }

    /// Convert column letters to index (A = 0, Z = 25, AA = 26, etc.)
    pub fn letters_to_column(letters: &str) -> XlsxResult<u16> {
        if letters.is_empty() {
            return Err(XlsxError::InvalidAddress("empty column letters".into()));
        }

        let mut col: u32 = 0;
        for c in letters.chars() {
            if !c.is_ascii_alphabetic() {
                return Err(XlsxError::InvalidAddress(format!(
                    "invalid column letter '{}'",
                    c
                )));
            }
            col = col * 26 + (c.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
            if col - 1 > MAX_COL as u32 {
                return Err(XlsxError::InvalidAddress(format!(
                    "column '{}' out of range",
                    letters
                )));
            }
        }

        Ok((col - 1) as u16)
    }

    /// Format as A1-style string
    pub fn to_a1_string(&self) -> String {
        format!("{}{}", Self::column_to_letters(self.col), self.row + 1)
    }

    /// Absolute A1-style string (`$A$1`)
    pub fn to_absolute_string(&self) -> String {
        format!("${}${}", Self::column_to_letters(self.col), self.row + 1)
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_a1_string())
    }
}

impl FromStr for CellAddress {
    type Err = XlsxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A rectangular range of cells (e.g. "A1:D1")
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRange {
    pub start: CellAddress,
    pub end: CellAddress,
}

impl CellRange {
    /// Create a range; corners are normalized so `start` is top-left
    pub fn new(a: CellAddress, b: CellAddress) -> Self {
        Self {
            start: CellAddress::new(a.row.min(b.row), a.col.min(b.col)),
            end: CellAddress::new(a.row.max(b.row), a.col.max(b.col)),
        }
    }

    /// Parse "A1:B2" or a single-cell "A1"
    pub fn parse(s: &str) -> XlsxResult<Self> {
        match s.split_once(':') {
            Some((a, b)) => Ok(Self::new(CellAddress::parse(a)?, CellAddress::parse(b)?)),
            None => {
                let a = CellAddress::parse(s)?;
                Ok(Self::new(a, a))
            }
        }
    }

    /// True when `addr` lies inside the range
    pub fn contains(&self, addr: CellAddress) -> bool {
        addr.row >= self.start.row
            && addr.row <= self.end.row
            && addr.col >= self.start.col
            && addr.col <= self.end.col
    }

    /// Addresses in row-major order
    pub fn cells(&self) -> impl Iterator<Item = CellAddress> + '_ {
        (self.start.row..=self.end.row)
            .flat_map(move |row| (self.start.col..=self.end.col).map(move |col| CellAddress::new(row, col)))
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}:{}", self.start, self.end)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_column_letters() {
        assert_eq!(CellAddress::column_to_letters(0), "A");
        assert_eq!(CellAddress::column_to_letters(25), "Z");
        assert_eq!(CellAddress::column_to_letters(26), "AA");
        assert_eq!(CellAddress::column_to_letters(MAX_COL), "XFD");
        assert_eq!(CellAddress::letters_to_column("aa").unwrap(), 26);
    }

    #[test]
    fn test_parse_errors() {
        assert!(CellAddress::parse("").is_err());
        assert!(CellAddress::parse("12").is_err());
        assert!(CellAddress::parse("A0").is_err());
        assert!(CellAddress::parse("XFE1").is_err());
    }

    #[test]
    fn test_range() {
        let range = CellRange::parse("D1:A1").unwrap();
        assert_eq!(range.to_string(), "A1:D1");
        assert!(range.contains(CellAddress::parse("C1").unwrap()));
        assert!(!range.contains(CellAddress::parse("C2").unwrap()));
        assert_eq!(range.cells().count(), 4);
    }
}
