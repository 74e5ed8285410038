//! Header normalization
//!
//! Maps the raw column names of heterogeneous vendor files onto the two
//! canonical fields the pipeline consumes. The alias table is immutable once
//! built and is passed explicitly to the decoders.
//!
//! **Lookup:** exact match first, then a trimmed case-insensitive match. The
//! built-in table stays over-enumerated (`"ISBN "`, `" GTIN"`, ...) so every
//! alias ever observed in a vendor file resolves by exact match; the folded
//! lookup catches whitespace and case variants nobody registered yet.

use std::collections::HashMap;
use std::fmt;

/// Canonical column a raw header can map onto
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalField {
    Identifier,
    Quantity,
}

impl CanonicalField {
    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalField::Identifier => "Identifier",
            CanonicalField::Quantity => "Quantity",
        }
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Column names seen in vendor sales reports, unioned across vendors
const BUILTIN_IDENTIFIER_ALIASES: &[&str] = &[
    "ISBN",
    "ISBN_number",
    "ISBN ",
    "ISBN         ",
    "SKU",
    "Ean",
    "GTIN",
    " GTIN",
    "Item Code",
];

const BUILTIN_QUANTITY_ALIASES: &[&str] = &[
    "Sales",
    "Net quantity",
    "Qty",
    "QTY",
    "Count",
    "Units",
    "Items Sold",
    "Units Sold",
    "SALES",
    "Sls",
    " Sls",
];

/// Immutable raw-header → canonical-field mapping
#[derive(Debug, Clone)]
pub struct HeaderAliases {
    exact: HashMap<String, CanonicalField>,
    folded: HashMap<String, CanonicalField>,
}

impl HeaderAliases {
    /// Empty table. Canonical names always map to themselves.
    pub fn empty() -> Self {
        let mut aliases = Self {
            exact: HashMap::new(),
            folded: HashMap::new(),
        };
        for field in [CanonicalField::Identifier, CanonicalField::Quantity] {
            aliases.insert(field.as_str(), field);
        }
        aliases
    }

    /// Built-in vendor table
    pub fn builtin() -> Self {
        let mut aliases = Self::empty();
        for alias in BUILTIN_IDENTIFIER_ALIASES {
            aliases.insert(alias, CanonicalField::Identifier);
        }
        for alias in BUILTIN_QUANTITY_ALIASES {
            aliases.insert(alias, CanonicalField::Quantity);
        }
        aliases
    }

    /// Builtin table extended with user aliases (user entries win on conflict)
    pub fn with_extra<I, Q>(identifier: I, quantity: Q) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
        Q: IntoIterator,
        Q::Item: AsRef<str>,
    {
        let mut aliases = Self::builtin();
        for alias in identifier {
            aliases.insert(alias.as_ref(), CanonicalField::Identifier);
        }
        for alias in quantity {
            aliases.insert(alias.as_ref(), CanonicalField::Quantity);
        }
        aliases
    }

    fn insert(&mut self, raw: &str, field: CanonicalField) {
        self.exact.insert(raw.to_string(), field);
        self.folded.insert(fold(raw), field);
    }

    /// Canonical field for one raw header, if any
    pub fn resolve(&self, raw: &str) -> Option<CanonicalField> {
        self.exact
            .get(raw)
            .or_else(|| self.folded.get(&fold(raw)))
            .copied()
    }

    /// Normalize a header row
    ///
    /// Output has the same length and order as the input; unmatched names are
    /// passed through verbatim.
    pub fn normalize<S: AsRef<str>>(&self, headers: &[S]) -> Vec<String> {
        headers
            .iter()
            .map(|h| {
                let raw = h.as_ref();
                match self.resolve(raw) {
                    Some(field) => field.as_str().to_string(),
                    None => raw.to_string(),
                }
            })
            .collect()
    }

    /// Number of registered aliases (exact keys)
    pub fn len(&self) -> usize {
        self.exact.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty()
    }
}

impl Default for HeaderAliases {
    fn default() -> Self {
        Self::builtin()
    }
}

fn fold(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Positions of the canonical columns within one normalized header row
///
/// A file may carry more than one column per field (e.g. both `ISBN` and
/// `GTIN`); every position is kept, in column order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMap {
    pub identifier: Vec<usize>,
    pub quantity: Vec<usize>,
}

impl ColumnMap {
    pub fn from_normalized<S: AsRef<str>>(normalized: &[S]) -> Self {
        let mut map = ColumnMap::default();
        for (index, name) in normalized.iter().enumerate() {
            match name.as_ref() {
                n if n == CanonicalField::Identifier.as_str() => map.identifier.push(index),
                n if n == CanonicalField::Quantity.as_str() => map.quantity.push(index),
                _ => {}
            }
        }
        map
    }

    /// True when the file carries both canonical fields
    pub fn is_complete(&self) -> bool {
        !self.identifier.is_empty() && !self.quantity.is_empty()
    }
}
