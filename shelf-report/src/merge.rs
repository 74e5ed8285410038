//! Metadata merging
//!
//! Joins the ranked subset against one batched catalog lookup and builds the
//! terminal [`FinalRecord`]s.
//!
//! **Fallback rules:**
//! - No metadata for an identifier: every metadata field is [`NOT_FOUND`]
//! - Metadata present, field absent or blank: that field alone is [`UNKNOWN`]
//! - Description: primary description, then synopsis, then [`UNKNOWN`]
//! - Authors/Subjects: comma-joined, [`UNKNOWN`] when the list is empty
//!
//! A failed lookup degrades to ledger-only records for every entry. The
//! output always has exactly one record per ranked entry, in rank order.

use serde::Serialize;
use std::collections::HashMap;

use crate::catalog::{CatalogLookup, CatalogMetadata};
use crate::categorize::{Category, CategoryRules};
use crate::identifier::Identifier;
use crate::ranking::RankedEntry;

/// Field value when metadata exists but the field is absent or empty
pub const UNKNOWN: &str = "Unknown";

/// Field value when the catalog returned no record for the identifier
pub const NOT_FOUND: &str = "Data Missing";

/// One report row, created once per ranked entry and never mutated
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FinalRecord {
    #[serde(rename = "Identifier")]
    pub identifier: Identifier,
    #[serde(rename = "TotalQuantity")]
    pub total_quantity: u64,
    #[serde(rename = "SourceBreadth")]
    pub source_breadth: u32,
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Authors")]
    pub authors: String,
    #[serde(rename = "Publisher")]
    pub publisher: String,
    #[serde(rename = "Category")]
    pub category: String,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Binding")]
    pub binding: String,
    #[serde(rename = "Subjects")]
    pub subjects: String,
    #[serde(skip)]
    matched: bool,
}

impl FinalRecord {
    fn ledger_only(ranked: &RankedEntry) -> Self {
        Self {
            identifier: ranked.entry.identifier.clone(),
            total_quantity: ranked.entry.total_quantity,
            source_breadth: ranked.entry.source_breadth,
            title: NOT_FOUND.to_string(),
            authors: NOT_FOUND.to_string(),
            publisher: NOT_FOUND.to_string(),
            category: NOT_FOUND.to_string(),
            description: NOT_FOUND.to_string(),
            binding: NOT_FOUND.to_string(),
            subjects: NOT_FOUND.to_string(),
            matched: false,
        }
    }

    fn enriched(ranked: &RankedEntry, metadata: &CatalogMetadata, category: Category) -> Self {
        Self {
            identifier: ranked.entry.identifier.clone(),
            total_quantity: ranked.entry.total_quantity,
            source_breadth: ranked.entry.source_breadth,
            title: text_or_unknown(metadata.title.as_deref()),
            authors: list_or_unknown(&metadata.authors),
            publisher: text_or_unknown(metadata.publisher.as_deref()),
            category: category.as_str().to_string(),
            description: description_of(metadata),
            binding: text_or_unknown(metadata.binding.as_deref()),
            subjects: list_or_unknown(&metadata.subjects),
            matched: true,
        }
    }

    /// True when the record was built from catalog metadata
    pub fn has_metadata(&self) -> bool {
        self.matched
    }
}

/// Data-quality counters for one merge, observability only
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QualitySummary {
    pub total_ranked: usize,
    pub found_in_metadata: usize,
    pub missing_from_metadata: usize,
    /// Found records whose description fell back to Unknown
    pub missing_description: usize,
    /// Found records without subject tags
    pub missing_subjects: usize,
    /// Found records the categorizer could not place
    pub uncategorizable: usize,
    /// Lookup failure that forced ledger-only output, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lookup_error: Option<String>,
}

/// Merge output
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub records: Vec<FinalRecord>,
    pub quality: QualitySummary,
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn text_or_unknown(value: Option<&str>) -> String {
    non_blank(value).unwrap_or(UNKNOWN).to_string()
}

fn list_or_unknown(items: &[String]) -> String {
    let joined = items
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(", ");
    if joined.is_empty() {
        UNKNOWN.to_string()
    } else {
        joined
    }
}

fn description_of(metadata: &CatalogMetadata) -> String {
    non_blank(metadata.description.as_deref())
        .or_else(|| non_blank(metadata.synopsis.as_deref()))
        .unwrap_or(UNKNOWN)
        .to_string()
}

/// Merge ranked entries with already-fetched metadata
pub fn merge(
    ranked: &[RankedEntry],
    metadata: Vec<CatalogMetadata>,
    rules: &CategoryRules,
) -> MergeOutcome {
    let mut table: HashMap<Identifier, CatalogMetadata> = HashMap::with_capacity(metadata.len());
    for record in metadata {
        // First record per identifier wins
        table.entry(record.identifier.clone()).or_insert(record);
    }

    let mut quality = QualitySummary {
        total_ranked: ranked.len(),
        ..QualitySummary::default()
    };

    let records = ranked
        .iter()
        .map(|entry| match table.get(&entry.entry.identifier) {
            Some(metadata) => {
                let category = rules.categorize(metadata);
                let record = FinalRecord::enriched(entry, metadata, category);

                quality.found_in_metadata += 1;
                if record.description == UNKNOWN {
                    quality.missing_description += 1;
                }
                if record.subjects == UNKNOWN {
                    quality.missing_subjects += 1;
                }
                if category == Category::Unknown {
                    quality.uncategorizable += 1;
                }
                record
            }
            None => {
                quality.missing_from_metadata += 1;
                FinalRecord::ledger_only(entry)
            }
        })
        .collect();

    MergeOutcome { records, quality }
}

/// Fetch metadata for the ranked subset with one batched call, then merge
///
/// `lookup` is `None` when no catalog is configured. Lookup failures are
/// logged and produce ledger-only records.
pub async fn enrich(
    ranked: &[RankedEntry],
    lookup: Option<&dyn CatalogLookup>,
    rules: &CategoryRules,
) -> MergeOutcome {
    let identifiers: Vec<Identifier> = ranked.iter().map(|r| r.entry.identifier.clone()).collect();

    let (metadata, lookup_error) = match lookup {
        Some(lookup) if !identifiers.is_empty() => match lookup.lookup(&identifiers).await {
            Ok(metadata) => (metadata, None),
            Err(e) => {
                tracing::warn!(
                    lookup = lookup.name(),
                    error = %e,
                    "Catalog lookup failed, falling back to ledger-only records"
                );
                (Vec::new(), Some(e.to_string()))
            }
        },
        Some(_) => (Vec::new(), None),
        None => {
            tracing::warn!("No catalog lookup configured, records carry ledger data only");
            (Vec::new(), None)
        }
    };

    let mut outcome = merge(ranked, metadata, rules);
    outcome.quality.lookup_error = lookup_error;

    let q = &outcome.quality;
    tracing::info!(
        total_ranked = q.total_ranked,
        found = q.found_in_metadata,
        missing = q.missing_from_metadata,
        missing_description = q.missing_description,
        missing_subjects = q.missing_subjects,
        uncategorizable = q.uncategorizable,
        "Metadata merge complete"
    );

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::LookupError;
    use crate::ledger::LedgerEntry;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn id(raw: &str) -> Identifier {
        Identifier::parse(raw).unwrap()
    }

    fn ranked(raw_ids: &[&str]) -> Vec<RankedEntry> {
        raw_ids
            .iter()
            .enumerate()
            .map(|(i, raw)| RankedEntry {
                rank: i + 1,
                entry: LedgerEntry {
                    identifier: id(raw),
                    total_quantity: 10 - i as u64,
                    source_breadth: 2,
                },
            })
            .collect()
    }

    struct FixedLookup {
        records: Vec<CatalogMetadata>,
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl CatalogLookup for FixedLookup {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn lookup(&self, _: &[Identifier]) -> Result<Vec<CatalogMetadata>, LookupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.records.clone())
        }
    }

    struct FailingLookup;

    #[async_trait::async_trait]
    impl CatalogLookup for FailingLookup {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn lookup(&self, _: &[Identifier]) -> Result<Vec<CatalogMetadata>, LookupError> {
            Err(LookupError::NetworkError("timed out".to_string()))
        }
    }

    #[test]
    fn test_missing_metadata_uses_not_found_sentinel() {
        let entries = ranked(&["9780306406157"]);
        let outcome = merge(&entries, Vec::new(), &CategoryRules::builtin());

        let record = &outcome.records[0];
        assert_eq!(record.total_quantity, 10);
        assert_eq!(record.title, NOT_FOUND);
        assert_eq!(record.category, NOT_FOUND);
        assert_eq!(record.subjects, NOT_FOUND);
        assert!(!record.has_metadata());
        assert_eq!(outcome.quality.missing_from_metadata, 1);
    }

    #[test]
    fn test_field_level_fallback() {
        let entries = ranked(&["9780306406157"]);
        let mut meta = CatalogMetadata::new(id("9780306406157"));
        meta.title = Some("Known Title".to_string());
        meta.publisher = Some("   ".to_string());

        let outcome = merge(&entries, vec![meta], &CategoryRules::builtin());
        let record = &outcome.records[0];

        assert_eq!(record.title, "Known Title");
        assert_eq!(record.publisher, UNKNOWN);
        assert_eq!(record.authors, UNKNOWN);
        assert_eq!(record.subjects, UNKNOWN);
        assert_eq!(record.binding, UNKNOWN);
        assert_eq!(record.description, UNKNOWN);
        assert_eq!(record.category, "Non-Fiction");
        assert!(record.has_metadata());

        assert_eq!(outcome.quality.found_in_metadata, 1);
        assert_eq!(outcome.quality.missing_description, 1);
        assert_eq!(outcome.quality.missing_subjects, 1);
    }

    #[test]
    fn test_description_prefers_primary_then_synopsis() {
        let entries = ranked(&["9780306406157", "9791234567896"]);

        let mut with_both = CatalogMetadata::new(id("9780306406157"));
        with_both.description = Some("Overview".to_string());
        with_both.synopsis = Some("Synopsis".to_string());

        let mut synopsis_only = CatalogMetadata::new(id("9791234567896"));
        synopsis_only.description = Some(String::new());
        synopsis_only.synopsis = Some("Synopsis".to_string());

        let outcome = merge(&entries, vec![synopsis_only, with_both], &CategoryRules::builtin());
        assert_eq!(outcome.records[0].description, "Overview");
        assert_eq!(outcome.records[1].description, "Synopsis");
    }

    #[test]
    fn test_lists_are_comma_joined() {
        let entries = ranked(&["9780306406157"]);
        let mut meta = CatalogMetadata::new(id("9780306406157"));
        meta.authors = vec!["Ada".to_string(), "Grace".to_string()];
        meta.subjects = vec!["Juvenile Fiction".to_string(), "Fiction".to_string()];

        let outcome = merge(&entries, vec![meta], &CategoryRules::builtin());
        assert_eq!(outcome.records[0].authors, "Ada, Grace");
        assert_eq!(outcome.records[0].subjects, "Juvenile Fiction, Fiction");
        assert_eq!(outcome.records[0].category, "Children's");
    }

    #[test]
    fn test_uncategorizable_counted() {
        let entries = ranked(&["9780306406157"]);
        let meta = CatalogMetadata::new(id("9780306406157"));

        let outcome = merge(&entries, vec![meta], &CategoryRules::builtin());
        assert_eq!(outcome.records[0].category, "Unknown");
        assert_eq!(outcome.quality.uncategorizable, 1);
    }

    #[test]
    fn test_merge_never_drops_entries_and_keeps_rank_order() {
        let entries = ranked(&["9780000000001", "9780000000002", "9780000000003"]);
        let meta = CatalogMetadata::new(id("9780000000002"));

        let outcome = merge(&entries, vec![meta], &CategoryRules::builtin());
        assert_eq!(outcome.records.len(), entries.len());
        let order: Vec<_> = outcome.records.iter().map(|r| r.identifier.as_str()).collect();
        assert_eq!(order, vec!["9780000000001", "9780000000002", "9780000000003"]);
        assert_eq!(outcome.quality.found_in_metadata, 1);
        assert_eq!(outcome.quality.missing_from_metadata, 2);
    }

    #[tokio::test]
    async fn test_enrich_makes_a_single_lookup() {
        let entries = ranked(&["9780000000001", "9780000000002"]);
        let lookup = FixedLookup {
            records: vec![CatalogMetadata::new(id("9780000000001"))],
            calls: AtomicUsize::new(0),
        };

        let outcome = enrich(&entries, Some(&lookup), &CategoryRules::builtin()).await;
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 1);
        assert_eq!(outcome.records.len(), 2);
        assert!(outcome.quality.lookup_error.is_none());
    }

    #[tokio::test]
    async fn test_enrich_degrades_on_lookup_failure() {
        let entries = ranked(&["9780000000001", "9780000000002"]);

        let outcome = enrich(&entries, Some(&FailingLookup), &CategoryRules::builtin()).await;
        assert_eq!(outcome.records.len(), 2);
        assert!(outcome.records.iter().all(|r| !r.has_metadata()));
        assert_eq!(outcome.quality.missing_from_metadata, 2);
        assert!(outcome.quality.lookup_error.as_deref().unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_enrich_without_lookup() {
        let entries = ranked(&["9780000000001"]);
        let outcome = enrich(&entries, None, &CategoryRules::builtin()).await;
        assert_eq!(outcome.records[0].title, NOT_FOUND);
    }
}
