//! Raw cell values as produced by the tabular decoders
//!
//! CSV cells are always text. Spreadsheet cells keep their native type so the
//! identifier validator can recover numbers that were stored as floating point.

use std::fmt;

/// One raw cell of a source file
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// Blank cell, or a position past the end of a short row
    Empty,
    /// Textual content, verbatim
    Text(String),
    /// Native integer cell
    Int(i64),
    /// Native floating-point cell
    Float(f64),
    /// Native boolean cell
    Bool(bool),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Coerce to a string the way a spreadsheet export would show it
    ///
    /// Integral floats render without a fractional part or exponent
    /// (`9780306406157.0` → `"9780306406157"`).
    pub fn to_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Int(i) => i.to_string(),
            CellValue::Float(f) => render_float(*f),
            CellValue::Bool(b) => b.to_string(),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Int(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Float(value)
    }
}

/// Render a float without exponent, dropping the fraction when it is zero
pub(crate) fn render_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        // f64 Display never uses scientific notation
        value.to_string()
    }
}
