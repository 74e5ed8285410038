//! Identifier validation
//!
//! Turns one raw cell into a canonical 13-digit identifier (ISBN-13 shaped,
//! `978`/`979` prefix) or rejects it.
//!
//! **Algorithm:**
//! 1. Coerce the cell to a string
//! 2. If it carries an exponent marker (`e`/`E`), reinterpret it as a decimal
//!    number and re-render it without exponent or fractional part
//! 3. Strip every non-digit character
//! 4. Accept iff exactly 13 digits remain and they start with `978` or `979`
//!
//! No check-digit validation is performed.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::cell::CellValue;

const IDENTIFIER_LEN: usize = 13;
const ACCEPTED_PREFIXES: [&str; 2] = ["978", "979"];

/// Canonical 13-digit product identifier
///
/// Only constructed through validation, so any value of this type is exactly
/// 13 ASCII digits starting with `978` or `979`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identifier(String);

impl Identifier {
    /// Validate a textual identifier
    pub fn parse(raw: &str) -> Option<Self> {
        let text = if raw.contains(['e', 'E']) {
            expand_exponent(raw).unwrap_or_else(|| raw.to_string())
        } else {
            raw.to_string()
        };

        let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();

        if digits.len() != IDENTIFIER_LEN {
            return None;
        }
        if !ACCEPTED_PREFIXES.iter().any(|p| digits.starts_with(p)) {
            return None;
        }

        Some(Self(digits))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Validate one raw cell value
///
/// Returns `None` (rejection) for blank cells and anything that does not
/// reduce to a well-shaped identifier.
pub fn validate(cell: &CellValue) -> Option<Identifier> {
    match cell {
        CellValue::Empty | CellValue::Bool(_) => None,
        other => Identifier::parse(&other.to_text()),
    }
}

/// Re-render scientific notation (`9.780306406157E+12`) as a plain integer
///
/// Returns `None` when the text is not a number, so callers fall back to
/// digit stripping on the original string.
fn expand_exponent(raw: &str) -> Option<String> {
    let value: f64 = raw.trim().parse().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    Some(format!("{:.0}", value.trunc()))
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Identifier {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Identifier::parse(&value).ok_or_else(|| format!("invalid identifier: {}", value))
    }
}

impl From<Identifier> for String {
    fn from(value: Identifier) -> Self {
        value.0
    }
}
