//! External catalog metadata
//!
//! The metadata lookup is a collaborator behind [`CatalogLookup`]: one batched
//! call per run, returning a possibly partial, unordered set of records keyed
//! by identifier. Absence of a record is not an error.

mod isbndb;

pub use isbndb::IsbndbClient;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::identifier::Identifier;

/// Catalog lookup errors
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Descriptive metadata for one identifier, read-only once fetched
///
/// List fields are empty when the catalog omitted them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogMetadata {
    pub identifier: Identifier,
    pub title: Option<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    pub publisher: Option<String>,
    #[serde(default)]
    pub subjects: Vec<String>,
    /// Primary description text
    pub description: Option<String>,
    /// Secondary, synopsis-style text
    pub synopsis: Option<String>,
    pub binding: Option<String>,
}

impl CatalogMetadata {
    pub fn new(identifier: Identifier) -> Self {
        Self {
            identifier,
            title: None,
            authors: Vec::new(),
            publisher: None,
            subjects: Vec::new(),
            description: None,
            synopsis: None,
            binding: None,
        }
    }
}

/// Batched catalog metadata lookup
#[async_trait::async_trait]
pub trait CatalogLookup: Send + Sync {
    /// Lookup name for logging
    fn name(&self) -> &'static str;

    /// Fetch metadata for up to N identifiers in a single call
    ///
    /// The result never contains identifiers outside `identifiers` and may
    /// be a strict subset of them.
    async fn lookup(
        &self,
        identifiers: &[Identifier],
    ) -> Result<Vec<CatalogMetadata>, LookupError>;
}
