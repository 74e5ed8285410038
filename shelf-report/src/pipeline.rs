//! End-to-end report run
//!
//! files → normalized rows → ledger → ranked subset → enriched report
//!
//! Files are fetched one at a time. Decoding and per-file tallying then run in
//! parallel on rayon inside `spawn_blocking`; tallies are absorbed into the
//! ledger sequentially in listing order. Only a failure to list the source
//! folder aborts the run.

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;
use std::panic::{self, AssertUnwindSafe};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::catalog::CatalogLookup;
use crate::headers::HeaderAliases;
use crate::ingest::{self, DecodeError, SourceFormat};
use crate::ledger::{FileTally, Ledger};
use crate::merge::{self, FinalRecord, QualitySummary};
use crate::ranking;
use crate::settings::Settings;
use crate::source::{FileDescriptor, FileSource, SourceError};

/// Run-level errors
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Source folder could not be enumerated
    #[error("Cannot list source files: {0}")]
    Source(#[from] SourceError),

    /// Normalization worker failed
    #[error("Normalization task failed: {0}")]
    Task(String),
}

/// File left out of the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFile {
    pub name: String,
    pub reason: String,
}

/// Ingestion counters for one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    /// Files listed by the source
    pub files_seen: usize,
    /// Files absorbed into the ledger
    pub files_processed: usize,
    pub files_skipped: Vec<SkippedFile>,
    pub rows_read: u64,
    pub invalid_identifier_rows: u64,
    pub invalid_quantity_rows: u64,
    /// Distinct identifiers in the ledger
    pub ledger_size: usize,
}

impl IngestStats {
    fn skip(&mut self, name: &str, reason: impl Into<String>) {
        let reason = reason.into();
        warn!(file = %name, reason = %reason, "Skipping file");
        self.files_skipped.push(SkippedFile {
            name: name.to_string(),
            reason,
        });
    }
}

/// Output of one run
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    /// One record per ranked entry, in rank order
    pub records: Vec<FinalRecord>,
    pub ingest: IngestStats,
    pub quality: QualitySummary,
}

impl PipelineReport {
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            run_id: self.run_id,
            started_at: self.started_at,
            completed_at: self.completed_at,
            records: self.records.len(),
            ingest: self.ingest.clone(),
            quality: self.quality.clone(),
        }
    }
}

/// Serializable run summary (records omitted)
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub records: usize,
    pub ingest: IngestStats,
    pub quality: QualitySummary,
}

struct FetchedFile {
    descriptor: FileDescriptor,
    format: SourceFormat,
    bytes: Vec<u8>,
}

/// Run the pipeline over one source folder
///
/// `lookup` is `None` when no catalog is configured; the report then carries
/// ledger data only.
pub async fn run(
    source: &dyn FileSource,
    folder: &str,
    lookup: Option<&dyn CatalogLookup>,
    settings: &Settings,
) -> Result<PipelineReport, PipelineError> {
    let run_id = Uuid::new_v4();
    let started_at = Utc::now();
    info!(run_id = %run_id, folder = %folder, top_n = settings.top_n, "Starting report run");

    let descriptors = source.list_files(folder).await?;

    let mut stats = IngestStats {
        files_seen: descriptors.len(),
        ..IngestStats::default()
    };

    let mut fetched = Vec::with_capacity(descriptors.len());
    for descriptor in descriptors {
        let Some(format) = SourceFormat::from_name(&descriptor.name) else {
            stats.skip(&descriptor.name, "unsupported file extension");
            continue;
        };

        match source.fetch(&descriptor.id).await {
            Ok(bytes) => fetched.push(FetchedFile {
                descriptor,
                format,
                bytes,
            }),
            Err(e) => stats.skip(&descriptor.name, e.to_string()),
        }
    }

    let tallies = normalize_files(fetched, settings.aliases.clone()).await?;

    let mut ledger = Ledger::new();
    for (descriptor, result) in tallies {
        match result {
            Ok(tally) => {
                info!(
                    file = %descriptor.name,
                    rows = tally.rows_read,
                    identifiers = tally.distinct_identifiers(),
                    invalid_rows = tally.invalid_rows(),
                    "Absorbed file into ledger"
                );
                ledger.absorb(tally);
                stats.files_processed += 1;
            }
            Err(e) => stats.skip(&descriptor.name, e.to_string()),
        }
    }

    stats.rows_read = ledger.rows_read();
    stats.invalid_identifier_rows = ledger.invalid_identifier_rows();
    stats.invalid_quantity_rows = ledger.invalid_quantity_rows();
    stats.ledger_size = ledger.len();

    if ledger.invalid_rows() > 0 {
        warn!(
            invalid_identifier_rows = stats.invalid_identifier_rows,
            invalid_quantity_rows = stats.invalid_quantity_rows,
            "Dropped invalid rows"
        );
    }

    let ranked = ranking::rank(ledger.into_entries(), settings.top_n);
    info!(
        ledger_size = stats.ledger_size,
        ranked = ranked.len(),
        "Ranked ledger"
    );

    let outcome = merge::enrich(&ranked, lookup, &settings.rules).await;

    let completed_at = Utc::now();
    info!(
        run_id = %run_id,
        files_processed = stats.files_processed,
        files_skipped = stats.files_skipped.len(),
        records = outcome.records.len(),
        duration_ms = (completed_at - started_at).num_milliseconds(),
        "Report run complete"
    );

    Ok(PipelineReport {
        run_id,
        started_at,
        completed_at,
        records: outcome.records,
        ingest: stats,
        quality: outcome.quality,
    })
}

/// Decode and tally every fetched file in parallel, preserving input order
async fn normalize_files(
    files: Vec<FetchedFile>,
    aliases: HeaderAliases,
) -> Result<Vec<(FileDescriptor, Result<FileTally, DecodeError>)>, PipelineError> {
    tokio::task::spawn_blocking(move || {
        files
            .into_par_iter()
            .map(|file| {
                let tally = guard_decode(|| {
                    ingest::decode(file.format, &file.bytes, &aliases)
                        .map(|decoded| FileTally::from_rows(decoded.rows))
                });
                (file.descriptor, tally)
            })
            .collect::<Vec<_>>()
    })
    .await
    .map_err(|e| PipelineError::Task(e.to_string()))
}

/// Run one file's decode, turning a panic into a per-file decode error
fn guard_decode<F>(decode: F) -> Result<FileTally, DecodeError>
where
    F: FnOnce() -> Result<FileTally, DecodeError>,
{
    panic::catch_unwind(AssertUnwindSafe(decode)).unwrap_or_else(|payload| {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        Err(DecodeError::Panicked(message))
    })
}
