//! Runtime settings
//!
//! Turns the TOML bootstrap config into the immutable values the pipeline
//! consumes: header alias table, category rules, ranking limit and the
//! catalog lookup.
//!
//! Catalog API key priority: `SHELF_CATALOG_API_KEY` environment variable,
//! then `[catalog] api_key` in TOML. No key means no enrichment, not an error.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use shelf_common::config::{CatalogConfig, TomlConfig};
use shelf_common::{Error, Result};

use crate::catalog::{CatalogLookup, IsbndbClient};
use crate::categorize::CategoryRules;
use crate::headers::HeaderAliases;

/// Environment variable holding the catalog API key
pub const CATALOG_API_KEY_ENV: &str = "SHELF_CATALOG_API_KEY";

/// Resolved catalog connection settings
#[derive(Debug, Clone)]
pub struct CatalogSettings {
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
}

/// Immutable settings for one process
#[derive(Debug, Clone)]
pub struct Settings {
    pub source_folder: Option<PathBuf>,
    pub output_path: Option<PathBuf>,
    pub top_n: usize,
    pub aliases: HeaderAliases,
    pub rules: CategoryRules,
    pub catalog: Option<CatalogSettings>,
    pub bind: String,
}

impl Settings {
    pub fn from_config(config: &TomlConfig) -> Result<Self> {
        if config.top_n == 0 {
            return Err(Error::Config("top_n must be at least 1".to_string()));
        }

        let aliases =
            HeaderAliases::with_extra(&config.headers.identifier, &config.headers.quantity);
        let rules = CategoryRules::from_config(&config.categories).map_err(Error::Config)?;

        let catalog = resolve_catalog_api_key(&config.catalog).map(|api_key| CatalogSettings {
            base_url: config.catalog.base_url.clone(),
            api_key,
            timeout: Duration::from_secs(config.catalog.timeout_secs),
        });

        if catalog.is_none() {
            warn!(
                "Catalog API key not configured, reports will not be enriched. Configure using one of:\n\
                 1. Environment: {}=your-key-here\n\
                 2. TOML config: [catalog] api_key = \"your-key\"",
                CATALOG_API_KEY_ENV
            );
        }

        Ok(Self {
            source_folder: config.source_folder.clone(),
            output_path: config.output_path.clone(),
            top_n: config.top_n,
            aliases,
            rules,
            catalog,
            bind: config.server.bind.clone(),
        })
    }

    /// Build the catalog lookup, `None` when no key is configured or the
    /// client cannot be created
    pub fn catalog_lookup(&self) -> Option<Arc<dyn CatalogLookup>> {
        let catalog = self.catalog.as_ref()?;
        match IsbndbClient::new(&catalog.base_url, &catalog.api_key, catalog.timeout) {
            Ok(client) => Some(Arc::new(client)),
            Err(e) => {
                warn!("Failed to create catalog client: {}", e);
                None
            }
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            source_folder: None,
            output_path: None,
            top_n: shelf_common::config::DEFAULT_TOP_N,
            aliases: HeaderAliases::builtin(),
            rules: CategoryRules::builtin(),
            catalog: None,
            bind: shelf_common::config::ServerConfig::default().bind,
        }
    }
}

/// Resolve the catalog API key from environment and TOML
pub fn resolve_catalog_api_key(toml_config: &CatalogConfig) -> Option<String> {
    let env_key = std::env::var(CATALOG_API_KEY_ENV)
        .ok()
        .filter(|k| is_valid_key(k));
    let toml_key = toml_config.api_key.clone().filter(|k| is_valid_key(k));

    if env_key.is_some() && toml_key.is_some() {
        warn!("Catalog API key found in environment and TOML. Using environment (highest priority).");
    }

    if let Some(key) = env_key {
        info!("Catalog API key loaded from environment variable");
        return Some(key);
    }

    if let Some(key) = toml_key {
        info!("Catalog API key loaded from TOML config");
        return Some(key);
    }

    None
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}
