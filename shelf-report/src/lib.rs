//! shelf-report library interface
//!
//! Sales-report ingestion: header normalization, identifier validation,
//! ledger aggregation, ranking and catalog enrichment, plus the HTTP surface
//! that triggers runs.

pub mod api;
pub mod catalog;
pub mod categorize;
pub mod cell;
pub mod error;
pub mod headers;
pub mod identifier;
pub mod ingest;
pub mod ledger;
pub mod merge;
pub mod pipeline;
pub mod ranking;
pub mod report;
pub mod settings;
pub mod source;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tower_http::trace::TraceLayer;

use crate::catalog::CatalogLookup;
use crate::pipeline::RunSummary;
use crate::settings::Settings;
use crate::source::FileSource;

/// Output of the latest completed run
#[derive(Debug, Clone)]
pub struct LatestReport {
    pub csv: String,
    pub summary: RunSummary,
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub source: Arc<dyn FileSource>,
    pub lookup: Option<Arc<dyn CatalogLookup>>,
    /// Held for the duration of a run; one run at a time
    pub run_lock: Arc<Mutex<()>>,
    pub latest_report: Arc<RwLock<Option<LatestReport>>>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(
        settings: Settings,
        source: Arc<dyn FileSource>,
        lookup: Option<Arc<dyn CatalogLookup>>,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            source,
            lookup,
            run_lock: Arc::new(Mutex::new(())),
            latest_report: Arc::new(RwLock::new(None)),
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::process_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
