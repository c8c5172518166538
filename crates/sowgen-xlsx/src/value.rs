//! Cell value types

use std::fmt;

/// Represents the value stored in a cell
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// Empty cell (no value)
    Empty,

    /// Boolean value (TRUE/FALSE)
    Boolean(bool),

    /// Numeric value (dates included, as serial days)
    Number(f64),

    /// String value
    String(String),

    /// Formula with its last calculated value
    Formula {
        /// Formula text without the leading `=`
        text: String,
        /// Cached result, `None` when the file carried no value
        cached: Option<Box<CellValue>>,
    },
}

impl CellValue {
    /// Create a new string value
    pub fn string<S: Into<String>>(s: S) -> Self {
        CellValue::String(s.into())
    }

    /// Create a formula without a cached value; a leading `=` is stripped
    pub fn formula<S: Into<String>>(text: S) -> Self {
        let text = text.into();
        let text = match text.strip_prefix('=') {
            Some(stripped) => stripped.to_string(),
            None => text,
        };
        CellValue::Formula { text, cached: None }
    }

    /// Create a formula with a cached value
    pub fn formula_with_value<S: Into<String>>(text: S, cached: CellValue) -> Self {
        match Self::formula(text) {
            CellValue::Formula { text, .. } => CellValue::Formula {
                text,
                cached: Some(Box::new(cached)),
            },
            other => other,
        }
    }

    /// Check if the cell is empty
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::String(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Check if the cell contains a formula
    pub fn is_formula(&self) -> bool {
        matches!(self, CellValue::Formula { .. })
    }

    /// The value a reader sees: the cached result for formulas, else the value itself
    pub fn resolved(&self) -> &CellValue {
        match self {
            CellValue::Formula {
                cached: Some(v), ..
            } => v.as_ref(),
            CellValue::Formula { cached: None, .. } => &CellValue::Empty,
            other => other,
        }
    }

    /// Numeric view; numeric strings are parsed
    pub fn as_number(&self) -> Option<f64> {
        match self.resolved() {
            CellValue::Number(n) => Some(*n),
            CellValue::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            CellValue::String(s) => s.trim().replace(',', "").parse().ok(),
            _ => None,
        }
    }

    /// Text view with surrounding whitespace trimmed; empty cells give `None`
    pub fn as_text(&self) -> Option<String> {
        match self.resolved() {
            CellValue::Empty => None,
            CellValue::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            }
            other => Some(other.to_string()),
        }
    }
}

impl Default for CellValue {
    fn default() -> Self {
        CellValue::Empty
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            CellValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            CellValue::String(s) => f.write_str(s),
            CellValue::Formula { cached, .. } => match cached {
                Some(v) => write!(f, "{}", v),
                None => Ok(()),
            },
        }
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::String(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::String(s)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Boolean(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_formula_strips_equals() {
        assert_eq!(
            CellValue::formula("=SUM(A1:A2)"),
            CellValue::Formula {
                text: "SUM(A1:A2)".into(),
                cached: None
            }
        );
    }

    #[test]
    fn test_resolved_views() {
        let f = CellValue::formula_with_value("F7*M7", CellValue::Number(44160.0));
        assert_eq!(f.as_number(), Some(44160.0));
        assert_eq!(f.as_text().as_deref(), Some("44160"));
        assert_eq!(CellValue::formula("A1").as_text(), None);
        assert_eq!(CellValue::string("  1,200 ").as_number(), Some(1200.0));
        assert!(CellValue::string("   ").is_empty());
    }
}
