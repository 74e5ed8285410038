//! Report serialization
//!
//! Writes FinalRecords as CSV in the fixed column order, header row included
//! even when there are no records.

use std::io::Write;

use crate::merge::FinalRecord;

/// Report columns, in output order
pub const COLUMNS: [&str; 10] = [
    "Identifier",
    "TotalQuantity",
    "SourceBreadth",
    "Title",
    "Authors",
    "Publisher",
    "Category",
    "Description",
    "Binding",
    "Subjects",
];

/// Write records as CSV to any writer
pub fn write_csv<W: Write>(records: &[FinalRecord], writer: W) -> Result<(), csv::Error> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);

    csv_writer.write_record(COLUMNS)?;
    for record in records {
        csv_writer.serialize(record)?;
    }
    csv_writer.flush()?;

    Ok(())
}

/// Render records as a CSV string
pub fn to_csv_string(records: &[FinalRecord]) -> Result<String, csv::Error> {
    let mut buffer = Vec::new();
    write_csv(records, &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}
