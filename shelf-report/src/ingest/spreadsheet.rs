//! Spreadsheet decoder (`.xlsx`, `.xls`)
//!
//! Reads the first worksheet, then runs a header-then-row pass: the first row is
//! the header, every following row is mapped positionally. Cells keep their
//! native type so float-mangled identifiers can be recovered.

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use std::io::Cursor;

use crate::cell::CellValue;
use crate::headers::HeaderAliases;

use super::{DecodeError, DecodedFile, RowNormalizer};

/// Decode a workbook's first worksheet
pub fn decode_spreadsheet(
    bytes: &[u8],
    aliases: &HeaderAliases,
) -> Result<DecodedFile, DecodeError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| DecodeError::Spreadsheet(e.to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or(DecodeError::NoWorksheet)?
        .map_err(|e| DecodeError::Spreadsheet(e.to_string()))?;

    let grid = range
        .rows()
        .map(|row| row.iter().map(cell_from_data).collect::<Vec<_>>());

    let decoded = normalize_grid(grid, aliases);

    tracing::debug!(
        rows = decoded.rows.len(),
        headers = ?decoded.headers,
        "Spreadsheet parsing complete"
    );

    Ok(decoded)
}

/// Header-then-row pass over a grid of cells
///
/// An empty grid yields an empty file.
pub fn normalize_grid<I>(grid: I, aliases: &HeaderAliases) -> DecodedFile
where
    I: IntoIterator<Item = Vec<CellValue>>,
{
    let mut grid = grid.into_iter();

    let Some(header_row) = grid.next() else {
        return DecodedFile::default();
    };

    let raw_headers: Vec<String> = header_row.iter().map(CellValue::to_text).collect();
    let normalizer = RowNormalizer::new(aliases, &raw_headers);

    let rows = grid.filter_map(|cells| normalizer.normalize(&cells)).collect();

    normalizer.into_decoded(rows)
}

fn cell_from_data(data: &Data) -> CellValue {
    match data {
        Data::Empty | Data::Error(_) => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Int(i) => CellValue::Int(*i),
        Data::Float(f) => CellValue::Float(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        other => CellValue::Text(other.to_string()),
    }
}
