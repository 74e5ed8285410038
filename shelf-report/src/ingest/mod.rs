//! Row ingestion
//!
//! Applies header normalization and identifier validation to one source file,
//! producing a stream of [`NormalizedRow`]s. The file extension is the sole
//! format discriminator.

mod csv_decoder;
mod spreadsheet;

pub use csv_decoder::decode_csv;
pub use spreadsheet::{decode_spreadsheet, normalize_grid};

use std::path::Path;
use thiserror::Error;

use crate::cell::CellValue;
use crate::headers::{ColumnMap, HeaderAliases};
use crate::identifier::{self, Identifier};

/// Decode errors (per file, recoverable)
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("CSV decode error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Spreadsheet decode error: {0}")]
    Spreadsheet(String),

    #[error("Workbook has no worksheet")]
    NoWorksheet,

    #[error("Decoder panicked: {0}")]
    Panicked(String),
}

/// Supported source formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    Spreadsheet,
}

impl SourceFormat {
    /// Detect by file extension (`.csv`, `.xlsx`, `.xls`), case-insensitive
    ///
    /// `None` means unsupported: the file is skipped, not errored.
    pub fn from_name(name: &str) -> Option<Self> {
        let ext = Path::new(name).extension()?.to_string_lossy().to_lowercase();
        match ext.as_str() {
            "csv" => Some(SourceFormat::Csv),
            "xlsx" | "xls" => Some(SourceFormat::Spreadsheet),
            _ => None,
        }
    }
}

/// One row after normalization
///
/// `identifier` is `None` when no identifier column validated. `quantity` is the
/// raw quantity cell; it is parsed by the aggregator.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRow {
    pub identifier: Option<Identifier>,
    pub quantity: CellValue,
}

impl NormalizedRow {
    pub fn new(identifier: Option<Identifier>, quantity: impl Into<CellValue>) -> Self {
        Self {
            identifier,
            quantity: quantity.into(),
        }
    }
}

/// Result of decoding one file
#[derive(Debug, Clone, Default)]
pub struct DecodedFile {
    /// Header row after normalization
    pub headers: Vec<String>,
    /// Normalized data rows (entirely blank rows are dropped)
    pub rows: Vec<NormalizedRow>,
}

/// Per-file row normalizer built from the header row
///
/// When several columns map to the same canonical field, the identifier is
/// taken from the first column whose value validates and the quantity from the
/// first non-blank column.
#[derive(Debug, Clone)]
pub struct RowNormalizer {
    headers: Vec<String>,
    columns: ColumnMap,
}

impl RowNormalizer {
    pub fn new<S: AsRef<str>>(aliases: &HeaderAliases, raw_headers: &[S]) -> Self {
        let headers = aliases.normalize(raw_headers);
        let columns = ColumnMap::from_normalized(&headers);
        Self { headers, columns }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn columns(&self) -> &ColumnMap {
        &self.columns
    }

    /// Normalize one positional row. Returns `None` for an entirely blank row.
    pub fn normalize(&self, cells: &[CellValue]) -> Option<NormalizedRow> {
        if cells.iter().all(CellValue::is_empty) {
            return None;
        }

        let identifier = self
            .columns
            .identifier
            .iter()
            .filter_map(|&i| cells.get(i))
            .find_map(identifier::validate);

        let quantity = self
            .columns
            .quantity
            .iter()
            .filter_map(|&i| cells.get(i))
            .find(|c| !c.is_empty())
            .cloned()
            .unwrap_or(CellValue::Empty);

        Some(NormalizedRow {
            identifier,
            quantity,
        })
    }

    pub(crate) fn into_decoded(self, rows: Vec<NormalizedRow>) -> DecodedFile {
        DecodedFile {
            headers: self.headers,
            rows,
        }
    }
}

/// Decode one file's bytes in the given format
pub fn decode(
    format: SourceFormat,
    bytes: &[u8],
    aliases: &HeaderAliases,
) -> Result<DecodedFile, DecodeError> {
    let decoded = match format {
        SourceFormat::Csv => decode_csv(bytes, aliases)?,
        SourceFormat::Spreadsheet => decode_spreadsheet(bytes, aliases)?,
    };

    let columns = ColumnMap::from_normalized(&decoded.headers);
    if !columns.is_complete() {
        tracing::warn!(
            headers = ?decoded.headers,
            "File is missing a canonical column, its rows will be counted as invalid"
        );
    }

    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_detection() {
        assert_eq!(SourceFormat::from_name("store1.csv"), Some(SourceFormat::Csv));
        assert_eq!(SourceFormat::from_name("Store2.XLSX"), Some(SourceFormat::Spreadsheet));
        assert_eq!(SourceFormat::from_name("old.xls"), Some(SourceFormat::Spreadsheet));
        assert_eq!(SourceFormat::from_name("notes.txt"), None);
        assert_eq!(SourceFormat::from_name("README"), None);
    }

    #[test]
    fn test_row_normalizer_picks_first_valid_identifier_column() {
        let aliases = HeaderAliases::builtin();
        let normalizer = RowNormalizer::new(&aliases, &["ISBN", "GTIN", "Qty"]);

        let row = normalizer
            .normalize(&["n/a".into(), "9780306406157".into(), "4".into()])
            .unwrap();
        assert_eq!(row.identifier.unwrap().as_str(), "9780306406157");
        assert_eq!(row.quantity, CellValue::from("4"));
    }

    #[test]
    fn test_row_normalizer_short_row() {
        let aliases = HeaderAliases::builtin();
        let normalizer = RowNormalizer::new(&aliases, &["Title", "ISBN", "Qty"]);

        let row = normalizer.normalize(&["Some title".into()]).unwrap();
        assert!(row.identifier.is_none());
        assert_eq!(row.quantity, CellValue::Empty);
    }

    #[test]
    fn test_row_normalizer_skips_blank_rows() {
        let aliases = HeaderAliases::builtin();
        let normalizer = RowNormalizer::new(&aliases, &["ISBN", "Qty"]);
        assert!(normalizer.normalize(&[CellValue::Empty, "  ".into()]).is_none());
        assert!(normalizer.normalize(&[]).is_none());
    }
}
