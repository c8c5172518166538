//! Formula recalculation
//!
//! Workbooks written by tools that skip calculation carry formulas without
//! cached values. [`recalculate`] fills those caches for the arithmetic
//! subset pricing sheets use: numbers, cell and range references (optionally
//! sheet-qualified), `+ - * /`, unary minus, parentheses and the `SUM`,
//! `COUNTA`, `MIN`, `MAX`, `AVERAGE` and `ROUND` functions.
//!
//! Formulas outside that subset, and circular references, are counted and
//! left uncached.

use std::collections::{HashMap, HashSet};

use crate::address::{CellAddress, CellRange};
use crate::error::{XlsxError, XlsxResult};
use crate::value::CellValue;
use crate::workbook::Workbook;

/// Statistics from a recalculation run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalculationStats {
    /// Formula cells found without a cached value
    pub formula_count: usize,
    /// Number of cells given a fresh cached value
    pub cells_calculated: usize,
    /// Cells that are part of a reference cycle
    pub circular_references: usize,
    /// Cells whose formula could not be evaluated
    pub errors: usize,
}

/// Compute cached values for every formula cell that lacks one
pub fn recalculate(workbook: &mut Workbook) -> XlsxResult<CalculationStats> {
    let mut stats = CalculationStats::default();

    let pending: Vec<CellKey> = workbook
        .sheets()
        .iter()
        .enumerate()
        .flat_map(|(sheet, ws)| {
            ws.iter_cells().filter_map(move |(addr, cell)| match &cell.value {
                CellValue::Formula { cached: None, .. } => Some(CellKey { sheet, addr }),
                _ => None,
            })
        })
        .collect();
    stats.formula_count = pending.len();
    if pending.is_empty() {
        return Ok(stats);
    }

    let mut engine = Evaluator::new(workbook);
    let mut results = Vec::with_capacity(pending.len());
    for key in &pending {
        match engine.cell(*key) {
            Ok(value) => results.push((*key, value)),
            Err(EvalError::Cycle) => {
                log::warn!("circular reference at {}", key.describe(workbook));
                stats.circular_references += 1;
            }
            Err(EvalError::Failed(e)) => {
                log::warn!("{}", e);
                stats.errors += 1;
            }
        }
    }

    for (key, value) in results {
        if let Some(cell) = workbook.sheets_mut()[key.sheet].cell_mut(key.addr) {
            if let CellValue::Formula { cached, .. } = &mut cell.value {
                *cached = Some(Box::new(value.into_cell_value()));
                stats.cells_calculated += 1;
            }
        }
    }

    log::debug!(
        "recalculated {} of {} formula cells",
        stats.cells_calculated,
        stats.formula_count
    );
    Ok(stats)
}

/// Evaluate a single formula against a workbook, as if it sat on `sheet`
pub fn evaluate(workbook: &Workbook, sheet: &str, formula: &str) -> XlsxResult<CellValue> {
    let sheet_index = workbook
        .sheets()
        .iter()
        .position(|s| s.name().eq_ignore_ascii_case(sheet))
        .ok_or_else(|| XlsxError::SheetNotFound(sheet.to_string()))?;
    let expr = parse(formula.trim_start_matches('=')).map_err(|reason| XlsxError::Formula {
        cell: sheet.to_string(),
        reason,
    })?;
    let at = CellKey {
        sheet: sheet_index,
        addr: CellAddress::new(0, 0),
    };
    let mut engine = Evaluator::new(workbook);
    match engine.expr(&expr, at) {
        Ok(v) => Ok(v.into_cell_value()),
        Err(EvalError::Cycle) => Err(XlsxError::Formula {
            cell: sheet.to_string(),
            reason: "circular reference".into(),
        }),
        Err(EvalError::Failed(XlsxError::Formula { reason, .. })) => Err(XlsxError::Formula {
            cell: sheet.to_string(),
            reason,
        }),
        Err(EvalError::Failed(e)) => Err(e),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CellKey {
    sheet: usize,
    addr: CellAddress,
}

impl CellKey {
    fn describe(&self, workbook: &Workbook) -> String {
        let name = workbook.sheets().get(self.sheet).map_or("?", |s| s.name());
        format!("'{}'!{}", name, self.addr)
    }
}

#[derive(Debug)]
enum EvalError {
    Cycle,
    Failed(XlsxError),
}

/// Intermediate evaluation value
#[derive(Debug, Clone, PartialEq)]
enum Scalar {
    Blank,
    Number(f64),
    Text(String),
    Bool(bool),
}

impl Scalar {
    fn from_cell(value: &CellValue) -> Self {
        match value.resolved() {
            CellValue::Number(n) => Scalar::Number(*n),
            CellValue::String(s) => Scalar::Text(s.clone()),
            CellValue::Boolean(b) => Scalar::Bool(*b),
            _ => Scalar::Blank,
        }
    }

    fn into_cell_value(self) -> CellValue {
        match self {
            Scalar::Blank => CellValue::Number(0.0),
            Scalar::Number(n) => CellValue::Number(n),
            Scalar::Text(s) => CellValue::String(s),
            Scalar::Bool(b) => CellValue::Boolean(b),
        }
    }

    fn number(&self) -> Option<f64> {
        match self {
            Scalar::Blank => Some(0.0),
            Scalar::Number(n) => Some(*n),
            Scalar::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Scalar::Text(s) => s.trim().replace(',', "").parse().ok(),
        }
    }
}

// === Parsing ===

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Number(f64),
    Text(String),
    Bool(bool),
    Ref(Option<String>, CellAddress),
    Range(Option<String>, CellRange),
    Neg(Box<Expr>),
    Binary(char, Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Text(String),
    Word(String),
    Sheet(String),
    Op(char),
    LeftParen,
    RightParen,
    Comma,
    Colon,
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\n' | '\r' => i += 1,
            '+' | '-' | '*' | '/' => {
                tokens.push(Token::Op(c));
                i += 1;
            }
            '(' => {
                tokens.push(Token::LeftParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RightParen);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            ':' => {
                tokens.push(Token::Colon);
                i += 1;
            }
            '"' => {
                let mut s = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        Some('"') if chars.get(i + 1) == Some(&'"') => {
                            s.push('"');
                            i += 2;
                        }
                        Some('"') => {
                            i += 1;
                            break;
                        }
                        Some(ch) => {
                            s.push(*ch);
                            i += 1;
                        }
                        None => return Err("unterminated string literal".into()),
                    }
                }
                tokens.push(Token::Text(s));
            }
            '\'' => {
                let mut name = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        Some('\'') if chars.get(i + 1) == Some(&'\'') => {
                            name.push('\'');
                            i += 2;
                        }
                        Some('\'') => {
                            i += 1;
                            break;
                        }
                        Some(ch) => {
                            name.push(*ch);
                            i += 1;
                        }
                        None => return Err("unterminated sheet name".into()),
                    }
                }
                if chars.get(i) != Some(&'!') {
                    return Err(format!("expected '!' after sheet name '{}'", name));
                }
                i += 1;
                tokens.push(Token::Sheet(name));
            }
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let n = text
                    .parse()
                    .map_err(|_| format!("invalid number '{}'", text))?;
                tokens.push(Token::Number(n));
            }
            c if c.is_alphabetic() || c == '$' || c == '_' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_alphanumeric() || matches!(chars[i], '$' | '_' | '.'))
                {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                if chars.get(i) == Some(&'!') {
                    i += 1;
                    tokens.push(Token::Sheet(word));
                } else {
                    tokens.push(Token::Word(word));
                }
            }
            other => return Err(format!("unsupported character '{}'", other)),
        }
    }
    Ok(tokens)
}

fn parse(formula: &str) -> Result<Expr, String> {
    let tokens = tokenize(formula)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.additive()?;
    if parser.pos != parser.tokens.len() {
        return Err(format!("unexpected trailing input in '{}'", formula));
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn additive(&mut self) -> Result<Expr, String> {
        let mut left = self.multiplicative()?;
        while let Some(Token::Op(op @ ('+' | '-'))) = self.peek().cloned() {
            self.pos += 1;
            let right = self.multiplicative()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn multiplicative(&mut self) -> Result<Expr, String> {
        let mut left = self.unary()?;
        while let Some(Token::Op(op @ ('*' | '/'))) = self.peek().cloned() {
            self.pos += 1;
            let right = self.unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, String> {
        match self.peek() {
            Some(Token::Op('-')) => {
                self.pos += 1;
                Ok(Expr::Neg(Box::new(self.unary()?)))
            }
            Some(Token::Op('+')) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<Expr, String> {
        match self.next() {
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::Text(s)) => Ok(Expr::Text(s)),
            Some(Token::LeftParen) => {
                let inner = self.additive()?;
                match self.next() {
                    Some(Token::RightParen) => Ok(inner),
                    _ => Err("expected ')'".into()),
                }
            }
            Some(Token::Sheet(sheet)) => match self.next() {
                Some(Token::Word(word)) => self.reference(Some(sheet), &word),
                _ => Err(format!("expected a reference after '{}!'", sheet)),
            },
            Some(Token::Word(word)) => {
                if self.peek() == Some(&Token::LeftParen) {
                    self.pos += 1;
                    return self.call(word.to_ascii_uppercase());
                }
                match word.to_ascii_uppercase().as_str() {
                    "TRUE" => Ok(Expr::Bool(true)),
                    "FALSE" => Ok(Expr::Bool(false)),
                    _ => self.reference(None, &word),
                }
            }
            other => Err(format!("unexpected token {:?}", other)),
        }
    }

    fn reference(&mut self, sheet: Option<String>, word: &str) -> Result<Expr, String> {
        let start = CellAddress::parse(word).map_err(|e| e.to_string())?;
        if self.peek() == Some(&Token::Colon) {
            self.pos += 1;
            let end = match self.next() {
                Some(Token::Word(w)) => CellAddress::parse(&w).map_err(|e| e.to_string())?,
                _ => return Err("expected a cell after ':'".into()),
            };
            return Ok(Expr::Range(sheet, CellRange::new(start, end)));
        }
        Ok(Expr::Ref(sheet, start))
    }

    fn call(&mut self, name: String) -> Result<Expr, String> {
        let mut args = Vec::new();
        if self.peek() == Some(&Token::RightParen) {
            self.pos += 1;
            return Ok(Expr::Call(name, args));
        }
        loop {
            args.push(self.additive()?);
            match self.next() {
                Some(Token::Comma) => continue,
                Some(Token::RightParen) => break,
                _ => return Err(format!("expected ',' or ')' in {}()", name)),
            }
        }
        Ok(Expr::Call(name, args))
    }
}

// === Evaluation ===

struct Evaluator<'a> {
    workbook: &'a Workbook,
    memo: HashMap<CellKey, Scalar>,
    visiting: HashSet<CellKey>,
}

impl<'a> Evaluator<'a> {
    fn new(workbook: &'a Workbook) -> Self {
        Self {
            workbook,
            memo: HashMap::new(),
            visiting: HashSet::new(),
        }
    }

    fn fail(&self, at: CellKey, reason: impl Into<String>) -> EvalError {
        EvalError::Failed(XlsxError::Formula {
            cell: at.describe(self.workbook),
            reason: reason.into(),
        })
    }

    fn sheet_index(&self, name: Option<&str>, current: usize) -> Result<usize, EvalError> {
        match name {
            None => Ok(current),
            Some(name) => self
                .workbook
                .sheets()
                .iter()
                .position(|s| s.name().eq_ignore_ascii_case(name))
                .ok_or_else(|| EvalError::Failed(XlsxError::SheetNotFound(name.to_string()))),
        }
    }

    fn cell(&mut self, key: CellKey) -> Result<Scalar, EvalError> {
        if let Some(v) = self.memo.get(&key) {
            return Ok(v.clone());
        }
        let workbook = self.workbook;
        let value = match workbook.sheets().get(key.sheet) {
            Some(sheet) => sheet.value(key.addr),
            None => return Ok(Scalar::Blank),
        };
        let text = match value {
            CellValue::Formula { text, cached: None } => text,
            other => return Ok(Scalar::from_cell(other)),
        };
        if !self.visiting.insert(key) {
            return Err(EvalError::Cycle);
        }
        let result = match parse(text) {
            Ok(expr) => self.expr(&expr, key),
            Err(reason) => Err(self.fail(key, reason)),
        };
        self.visiting.remove(&key);
        let value = result?;
        self.memo.insert(key, value.clone());
        Ok(value)
    }

    fn expr(&mut self, expr: &Expr, at: CellKey) -> Result<Scalar, EvalError> {
        match expr {
            Expr::Number(n) => Ok(Scalar::Number(*n)),
            Expr::Text(s) => Ok(Scalar::Text(s.clone())),
            Expr::Bool(b) => Ok(Scalar::Bool(*b)),
            Expr::Ref(name, addr) => {
                let sheet = self.sheet_index(name.as_deref(), at.sheet)?;
                self.cell(CellKey { sheet, addr: *addr })
            }
            Expr::Range(..) => Err(self.fail(at, "a range is only valid as a function argument")),
            Expr::Neg(inner) => {
                let v = self.expr(inner, at)?;
                let n = v.number().ok_or_else(|| self.fail(at, "non-numeric operand"))?;
                Ok(Scalar::Number(-n))
            }
            Expr::Binary(op, left, right) => {
                let l = self.expr(left, at)?;
                let r = self.expr(right, at)?;
                let (l, r) = match (l.number(), r.number()) {
                    (Some(l), Some(r)) => (l, r),
                    _ => return Err(self.fail(at, "non-numeric operand")),
                };
                let n = match op {
                    '+' => l + r,
                    '-' => l - r,
                    '*' => l * r,
                    _ if r == 0.0 => return Err(self.fail(at, "division by zero")),
                    _ => l / r,
                };
                Ok(Scalar::Number(n))
            }
            Expr::Call(name, args) => self.call(name, args, at),
        }
    }

    /// Flatten function arguments, flagging values that came from a range
    fn values(&mut self, args: &[Expr], at: CellKey) -> Result<Vec<(Scalar, bool)>, EvalError> {
        let mut out = Vec::new();
        for arg in args {
            match arg {
                Expr::Range(name, range) => {
                    let sheet = self.sheet_index(name.as_deref(), at.sheet)?;
                    for addr in range.cells() {
                        out.push((self.cell(CellKey { sheet, addr })?, true));
                    }
                }
                other => out.push((self.expr(other, at)?, false)),
            }
        }
        Ok(out)
    }

    fn call(&mut self, name: &str, args: &[Expr], at: CellKey) -> Result<Scalar, EvalError> {
        // Ranges contribute their numeric members only; direct arguments are coerced
        let numbers = |values: Vec<(Scalar, bool)>| -> Vec<f64> {
            values
                .into_iter()
                .filter_map(|(v, from_range)| match (&v, from_range) {
                    (Scalar::Number(n), _) => Some(*n),
                    (_, true) => None,
                    _ => v.number(),
                })
                .collect()
        };
        match name {
            "SUM" => {
                let values = self.values(args, at)?;
                Ok(Scalar::Number(numbers(values).iter().sum()))
            }
            "COUNTA" => {
                let values = self.values(args, at)?;
                let count = values
                    .iter()
                    .filter(|(v, _)| !matches!(v, Scalar::Blank))
                    .filter(|(v, _)| !matches!(v, Scalar::Text(s) if s.is_empty()))
                    .count();
                Ok(Scalar::Number(count as f64))
            }
            "MIN" | "MAX" => {
                let values = numbers(self.values(args, at)?);
                let folded = values
                    .iter()
                    .copied()
                    .reduce(|a, b| if name == "MIN" { a.min(b) } else { a.max(b) });
                Ok(Scalar::Number(folded.unwrap_or(0.0)))
            }
            "AVERAGE" => {
                let values = numbers(self.values(args, at)?);
                if values.is_empty() {
                    return Err(self.fail(at, "AVERAGE of no numbers"));
                }
                Ok(Scalar::Number(values.iter().sum::<f64>() / values.len() as f64))
            }
            "ROUND" => {
                if args.len() != 2 {
                    return Err(self.fail(at, "ROUND takes 2 arguments"));
                }
                let v = self.expr(&args[0], at)?.number();
                let digits = self.expr(&args[1], at)?.number();
                match (v, digits) {
                    (Some(v), Some(d)) => {
                        let factor = 10f64.powi(d as i32);
                        Ok(Scalar::Number((v * factor).round() / factor))
                    }
                    _ => Err(self.fail(at, "non-numeric ROUND argument")),
                }
            }
            other => Err(self.fail(at, format!("unsupported function {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn pricing_book() -> Workbook {
        let mut wb = Workbook::new();
        let sheet = wb.add_sheet("Pricing Details").unwrap();
        sheet.set_value_at("F7", 230.0).unwrap();
        sheet.set_value_at("G7", 160.0).unwrap();
        sheet.set_value_at("H7", 32.0).unwrap();
        sheet.set_value_at("M7", CellValue::formula("SUM(G7:L7)")).unwrap();
        sheet.set_value_at("N7", CellValue::formula("=F7*M7")).unwrap();
        let summary = wb.add_sheet("Summary").unwrap();
        summary
            .set_value_at("B12", CellValue::formula("'Pricing Details'!N7"))
            .unwrap();
        wb
    }

    #[test]
    fn test_recalculate_fills_caches() {
        let mut wb = pricing_book();
        let stats = recalculate(&mut wb).unwrap();

        assert_eq!(stats.formula_count, 3);
        assert_eq!(stats.cells_calculated, 3);
        let pricing = wb.require("Pricing Details").unwrap();
        assert_eq!(pricing.value_at("M7").unwrap().as_number(), Some(192.0));
        assert_eq!(pricing.value_at("N7").unwrap().as_number(), Some(44160.0));
        let summary = wb.require("Summary").unwrap();
        assert_eq!(summary.value_at("B12").unwrap().as_number(), Some(44160.0));
    }

    #[test]
    fn test_cached_values_are_kept() {
        let mut wb = Workbook::new();
        let sheet = wb.add_sheet("S").unwrap();
        sheet
            .set_value_at("A1", CellValue::formula_with_value("1+1", CellValue::Number(7.0)))
            .unwrap();
        let stats = recalculate(&mut wb).unwrap();
        assert_eq!(stats.formula_count, 0);
        assert_eq!(wb.sheets()[0].value_at("A1").unwrap().as_number(), Some(7.0));
    }

    #[test]
    fn test_cycles_and_unsupported_are_counted() {
        let mut wb = Workbook::new();
        let sheet = wb.add_sheet("S").unwrap();
        sheet.set_value_at("A1", CellValue::formula("B1+1")).unwrap();
        sheet.set_value_at("B1", CellValue::formula("A1+1")).unwrap();
        sheet.set_value_at("C1", CellValue::formula("VLOOKUP(1,A1:B1,2)")).unwrap();

        let stats = recalculate(&mut wb).unwrap();
        assert_eq!(stats.cells_calculated, 0);
        assert_eq!(stats.circular_references, 2);
        assert_eq!(stats.errors, 1);
    }

    #[test]
    fn test_evaluate_functions() {
        let wb = pricing_book();
        let eval = |f: &str| evaluate(&wb, "Pricing Details", f).unwrap().as_number();
        assert_eq!(eval("=COUNTA(F7:H7)"), Some(3.0));
        assert_eq!(eval("MAX(G7:H7)-MIN(G7,H7)"), Some(128.0));
        assert_eq!(eval("ROUND(10/3, 2)"), Some(3.33));
        assert_eq!(eval("-(2+3)*2"), Some(-10.0));
        assert!(evaluate(&wb, "Pricing Details", "1/0").is_err());
        assert!(evaluate(&wb, "Nope", "1").is_err());
    }
}
