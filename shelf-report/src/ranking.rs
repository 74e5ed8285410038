//! Ledger ranking
//!
//! Orders entries by descending source breadth, then descending total quantity,
//! then ascending identifier, and keeps the first `limit`. The identifier
//! tiebreak makes the order total, so identical input always ranks identically.

use serde::Serialize;
use std::cmp::Ordering;

use crate::ledger::LedgerEntry;

/// A ledger entry with its 1-based rank position
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedEntry {
    pub rank: usize,
    #[serde(flatten)]
    pub entry: LedgerEntry,
}

fn compare(a: &LedgerEntry, b: &LedgerEntry) -> Ordering {
    b.source_breadth
        .cmp(&a.source_breadth)
        .then_with(|| b.total_quantity.cmp(&a.total_quantity))
        .then_with(|| a.identifier.cmp(&b.identifier))
}

/// Rank and truncate
///
/// Fewer than `limit` entries is not an error: all of them are returned.
pub fn rank(mut entries: Vec<LedgerEntry>, limit: usize) -> Vec<RankedEntry> {
    entries.sort_unstable_by(compare);
    entries.truncate(limit);

    entries
        .into_iter()
        .enumerate()
        .map(|(i, entry)| RankedEntry { rank: i + 1, entry })
        .collect()
}
