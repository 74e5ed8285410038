//! Configuration loading and config file resolution
//!
//! Bootstrap configuration comes from a single TOML file. Resolution order:
//! 1. Command-line argument (highest priority)
//! 2. `SHELF_CONFIG` environment variable
//! 3. Per-user config directory (`<config_dir>/shelf/shelf.toml`)
//! 4. Compiled defaults (no file at all)
//!
//! A missing file never terminates startup: a warning is logged and the
//! compiled defaults are used.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "SHELF_CONFIG";

/// Default number of ranked products carried into the report
pub const DEFAULT_TOP_N: usize = 250;

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Folder holding the sales-report files (optional, CLI may supply it)
    #[serde(default)]
    pub source_folder: Option<PathBuf>,

    /// Where `run` writes the CSV report (optional, stdout when absent)
    #[serde(default)]
    pub output_path: Option<PathBuf>,

    /// Size of the ranked subset
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// External catalog lookup settings
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Extra header aliases, unioned with the built-in vendor table
    #[serde(default)]
    pub headers: HeaderAliasConfig,

    /// Ordered category rules. Empty means "use the built-in rules".
    #[serde(default)]
    pub categories: Vec<CategoryRuleConfig>,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            source_folder: None,
            output_path: None,
            top_n: default_top_n(),
            logging: LoggingConfig::default(),
            catalog: CatalogConfig::default(),
            server: ServerConfig::default(),
            headers: HeaderAliasConfig::default(),
            categories: Vec::new(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Catalog (ISBNdb) lookup configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// API base URL
    #[serde(default = "default_catalog_base_url")]
    pub base_url: String,

    /// API key (environment variable takes precedence)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Request timeout for the batched lookup
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: default_catalog_base_url(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address the server binds to
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

/// User-supplied header aliases per canonical field
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HeaderAliasConfig {
    /// Raw column names that carry the product identifier
    #[serde(default)]
    pub identifier: Vec<String>,

    /// Raw column names that carry the sold quantity
    #[serde(default)]
    pub quantity: Vec<String>,
}

/// One category rule as written in TOML
///
/// ```toml
/// [[categories]]
/// category = "Children's"
/// keywords = ["juvenile fiction", "ages 4-8"]
/// bindings = ["board book"]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRuleConfig {
    /// Category name: "Children's", "Young Adult", "Fiction" or "Non-Fiction"
    pub category: String,

    /// Substrings matched against lower-cased subjects and title
    #[serde(default)]
    pub keywords: Vec<String>,

    /// Substrings matched against the lower-cased binding
    #[serde(default)]
    pub bindings: Vec<String>,

    /// Substrings blanked out of the text before keywords are matched
    #[serde(default)]
    pub ignore: Vec<String>,
}

fn default_top_n() -> usize {
    DEFAULT_TOP_N
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_catalog_base_url() -> String {
    "https://api2.isbndb.com".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_bind() -> String {
    "127.0.0.1:5730".to_string()
}

/// Config file resolver
///
/// Picks the TOML file to load following the priority order in the module docs.
pub struct ConfigResolver {
    cli_path: Option<PathBuf>,
}

impl ConfigResolver {
    pub fn new(cli_path: Option<PathBuf>) -> Self {
        Self { cli_path }
    }

    /// Resolve the config file path, `None` when no source names one and the
    /// per-user file does not exist
    pub fn resolve(&self) -> Option<PathBuf> {
        if let Some(path) = &self.cli_path {
            return Some(path.clone());
        }

        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.trim().is_empty() {
                return Some(PathBuf::from(path));
            }
        }

        let user_config = default_config_path()?;
        user_config.exists().then_some(user_config)
    }

    /// Resolve and load, falling back to compiled defaults
    ///
    /// A missing file logs a warning and yields defaults. A file that exists
    /// but fails to parse is an error.
    pub fn load(&self) -> Result<TomlConfig> {
        match self.resolve() {
            Some(path) if path.exists() => {
                let config = load_toml_config(&path)?;
                info!("Configuration loaded from {}", path.display());
                Ok(config)
            }
            Some(path) => {
                warn!(
                    "Config file {} not found, using compiled defaults",
                    path.display()
                );
                Ok(TomlConfig::default())
            }
            None => {
                info!("No config file found, using compiled defaults");
                Ok(TomlConfig::default())
            }
        }
    }
}

/// Per-user config file location
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("shelf").join("shelf.toml"))
}

/// Read and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))
}
