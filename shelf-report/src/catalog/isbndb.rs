//! ISBNdb API client
//!
//! One batched `POST /books` per run. Individual malformed book records are
//! skipped; a response without a `data` array is a parse error.

use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;

use super::{CatalogLookup, CatalogMetadata, LookupError};
use crate::identifier::Identifier;

const USER_AGENT: &str = concat!("shelf-report/", env!("CARGO_PKG_VERSION"));

/// Bulk lookup response envelope
#[derive(Debug, Deserialize)]
struct BulkResponse {
    data: Vec<serde_json::Value>,
}

/// ISBNdb book record (fields used by the report)
#[derive(Debug, Deserialize)]
struct IsbndbBook {
    isbn13: Option<String>,
    isbn: Option<String>,
    title: Option<String>,
    title_long: Option<String>,
    #[serde(default)]
    authors: Vec<String>,
    publisher: Option<String>,
    #[serde(default)]
    subjects: Vec<String>,
    overview: Option<String>,
    synopsis: Option<String>,
    binding: Option<String>,
}

impl IsbndbBook {
    fn identifier(&self) -> Option<Identifier> {
        self.isbn13
            .as_deref()
            .and_then(Identifier::parse)
            .or_else(|| self.isbn.as_deref().and_then(Identifier::parse))
    }

    fn into_metadata(self, identifier: Identifier) -> CatalogMetadata {
        CatalogMetadata {
            identifier,
            title: self
                .title
                .filter(|t| !t.trim().is_empty())
                .or(self.title_long),
            authors: self.authors,
            publisher: self.publisher,
            subjects: self.subjects,
            description: self.overview,
            synopsis: self.synopsis,
            binding: self.binding,
        }
    }
}

/// ISBNdb API client
pub struct IsbndbClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl IsbndbClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, LookupError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| LookupError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait::async_trait]
impl CatalogLookup for IsbndbClient {
    fn name(&self) -> &'static str {
        "ISBNdb"
    }

    async fn lookup(
        &self,
        identifiers: &[Identifier],
    ) -> Result<Vec<CatalogMetadata>, LookupError> {
        if identifiers.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/books", self.base_url);
        let isbns = identifiers
            .iter()
            .map(Identifier::as_str)
            .collect::<Vec<_>>()
            .join(",");

        tracing::debug!(url = %url, count = identifiers.len(), "Querying ISBNdb bulk endpoint");

        let response = self
            .http_client
            .post(&url)
            .header("Authorization", self.api_key.as_str())
            .form(&[("isbns", isbns)])
            .send()
            .await
            .map_err(|e| LookupError::NetworkError(e.to_string()))?;

        let status = response.status();

        // ISBNdb answers 404 when none of the requested books are known
        if status == 404 {
            return Ok(Vec::new());
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(LookupError::ApiError(status.as_u16(), error_text));
        }

        let body = response
            .text()
            .await
            .map_err(|e| LookupError::NetworkError(e.to_string()))?;

        let requested: HashSet<&Identifier> = identifiers.iter().collect();
        let records = parse_bulk_response(&body, &requested)?;

        tracing::info!(
            requested = identifiers.len(),
            returned = records.len(),
            "Retrieved catalog metadata from ISBNdb"
        );

        Ok(records)
    }
}

/// Parse a bulk response body, keeping only requested identifiers
fn parse_bulk_response(
    body: &str,
    requested: &HashSet<&Identifier>,
) -> Result<Vec<CatalogMetadata>, LookupError> {
    let envelope: BulkResponse =
        serde_json::from_str(body).map_err(|e| LookupError::ParseError(e.to_string()))?;

    let mut records = Vec::with_capacity(envelope.data.len());

    for value in envelope.data {
        let book: IsbndbBook = match serde_json::from_value(value) {
            Ok(book) => book,
            Err(e) => {
                tracing::debug!(error = %e, "Skipping malformed ISBNdb book record");
                continue;
            }
        };

        match book.identifier() {
            Some(identifier) if requested.contains(&identifier) => {
                records.push(book.into_metadata(identifier));
            }
            other => {
                tracing::debug!(isbn = ?other, "Skipping ISBNdb record outside the requested set");
            }
        }
    }

    Ok(records)
}
