//! Sales ledger aggregation
//!
//! Folds every file's normalized rows into one entry per identifier:
//! summed quantity across all files, plus the number of distinct files that
//! carried the identifier (source breadth).
//!
//! Each file is first reduced to a [`FileTally`]; [`Ledger::absorb`] is the
//! only place breadth is incremented, once per identifier per tally. Tallies
//! can be built independently (in parallel) and absorbed in any order with the
//! same result.

use serde::Serialize;
use std::collections::HashMap;

use crate::cell::CellValue;
use crate::identifier::Identifier;
use crate::ingest::NormalizedRow;

/// Aggregate sales data for one identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerEntry {
    pub identifier: Identifier,
    /// Sum of every valid-quantity row across all files
    pub total_quantity: u64,
    /// Distinct files with at least one valid row for this identifier
    pub source_breadth: u32,
}

/// Parse a quantity cell as a non-negative integer
///
/// Integral floats (`5.0`, as spreadsheets store counts) are accepted; blank,
/// negative, fractional and non-numeric values are not and are never coerced
/// to zero.
pub fn parse_quantity(cell: &CellValue) -> Option<u64> {
    match cell {
        CellValue::Int(i) => u64::try_from(*i).ok(),
        CellValue::Float(f) => integral(*f),
        CellValue::Text(s) => {
            let trimmed = s.trim();
            trimmed
                .parse::<u64>()
                .ok()
                .or_else(|| trimmed.parse::<f64>().ok().and_then(integral))
        }
        CellValue::Empty | CellValue::Bool(_) => None,
    }
}

fn integral(value: f64) -> Option<u64> {
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= u64::MAX as f64 {
        Some(value as u64)
    } else {
        None
    }
}

/// One file reduced to per-identifier quantities and row counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileTally {
    /// Summed quantity per identifier within this file
    pub quantities: HashMap<Identifier, u64>,
    /// Rows considered
    pub rows_read: u64,
    /// Rows dropped because no identifier validated
    pub invalid_identifier_rows: u64,
    /// Rows with a valid identifier but unparseable quantity
    pub invalid_quantity_rows: u64,
}

impl FileTally {
    pub fn from_rows<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = NormalizedRow>,
    {
        let mut tally = FileTally::default();

        for row in rows {
            tally.rows_read += 1;

            let Some(identifier) = row.identifier else {
                tally.invalid_identifier_rows += 1;
                continue;
            };

            let Some(quantity) = parse_quantity(&row.quantity) else {
                tally.invalid_quantity_rows += 1;
                continue;
            };

            let total = tally.quantities.entry(identifier).or_insert(0);
            *total = total.saturating_add(quantity);
        }

        tally
    }

    pub fn invalid_rows(&self) -> u64 {
        self.invalid_identifier_rows + self.invalid_quantity_rows
    }

    /// Distinct identifiers in this file
    pub fn distinct_identifiers(&self) -> usize {
        self.quantities.len()
    }
}

/// Accumulated ledger over all absorbed files
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    entries: HashMap<Identifier, LedgerEntry>,
    files_absorbed: u64,
    rows_read: u64,
    invalid_identifier_rows: u64,
    invalid_quantity_rows: u64,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one file's tally
    ///
    /// Every identifier in the tally gains exactly one unit of breadth, however
    /// many rows referenced it inside the file.
    pub fn absorb(&mut self, tally: FileTally) {
        self.files_absorbed += 1;
        self.rows_read += tally.rows_read;
        self.invalid_identifier_rows += tally.invalid_identifier_rows;
        self.invalid_quantity_rows += tally.invalid_quantity_rows;

        for (identifier, quantity) in tally.quantities {
            let entry = self
                .entries
                .entry(identifier)
                .or_insert_with_key(|id| LedgerEntry {
                    identifier: id.clone(),
                    total_quantity: 0,
                    source_breadth: 0,
                });
            entry.total_quantity = entry.total_quantity.saturating_add(quantity);
            entry.source_breadth += 1;
        }
    }

    /// Convenience: tally and absorb one file's rows
    pub fn fold_file<I>(&mut self, rows: I)
    where
        I: IntoIterator<Item = NormalizedRow>,
    {
        self.absorb(FileTally::from_rows(rows));
    }

    pub fn get(&self, identifier: &Identifier) -> Option<&LedgerEntry> {
        self.entries.get(identifier)
    }

    pub fn entries(&self) -> impl Iterator<Item = &LedgerEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn files_absorbed(&self) -> u64 {
        self.files_absorbed
    }

    pub fn rows_read(&self) -> u64 {
        self.rows_read
    }

    pub fn invalid_identifier_rows(&self) -> u64 {
        self.invalid_identifier_rows
    }

    pub fn invalid_quantity_rows(&self) -> u64 {
        self.invalid_quantity_rows
    }

    pub fn invalid_rows(&self) -> u64 {
        self.invalid_identifier_rows + self.invalid_quantity_rows
    }

    /// Freeze the ledger into its entries
    pub fn into_entries(self) -> Vec<LedgerEntry> {
        self.entries.into_values().collect()
    }
}
