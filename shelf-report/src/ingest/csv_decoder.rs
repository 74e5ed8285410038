//! CSV decoder
//!
//! Header normalization runs on the header record, identifier validation on
//! every data record as it is parsed. Records may have uneven lengths and
//! invalid UTF-8 is replaced rather than failing the file.

use crate::cell::CellValue;
use crate::headers::HeaderAliases;

use super::{DecodeError, DecodedFile, RowNormalizer};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Decode a CSV file (first record is the header row)
pub fn decode_csv(bytes: &[u8], aliases: &HeaderAliases) -> Result<DecodedFile, DecodeError> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let raw_headers: Vec<String> = reader
        .byte_headers()?
        .iter()
        .map(|field| String::from_utf8_lossy(field).into_owned())
        .collect();

    let normalizer = RowNormalizer::new(aliases, &raw_headers);
    let mut rows = Vec::new();

    for record in reader.byte_records() {
        let record = record?;
        let cells: Vec<CellValue> = record
            .iter()
            .map(|field| CellValue::Text(String::from_utf8_lossy(field).into_owned()))
            .collect();

        if let Some(row) = normalizer.normalize(&cells) {
            rows.push(row);
        }
    }

    tracing::debug!(
        rows = rows.len(),
        headers = ?normalizer.headers(),
        "CSV parsing complete"
    );

    Ok(normalizer.into_decoded(rows))
}
