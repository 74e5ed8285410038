//! Report run API handlers
//!
//! POST /process runs the pipeline against the configured source folder and
//! keeps the CSV of the latest completed run in memory. GET /download serves it.

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::error::{ApiError, ApiResult};
use crate::pipeline::{self, RunSummary};
use crate::{report, AppState, LatestReport};

/// Download file name for the report CSV
pub const REPORT_FILE_NAME: &str = "shelf-report.csv";

/// POST /process response
#[derive(Debug, Serialize)]
pub struct ProcessResponse {
    pub message: String,
    pub download_url: String,
    pub summary: RunSummary,
}

/// POST /process
///
/// Returns 409 while another run holds the run lock.
pub async fn process(State(state): State<AppState>) -> ApiResult<Json<ProcessResponse>> {
    let _guard = state
        .run_lock
        .try_lock()
        .map_err(|_| ApiError::Conflict("A report run is already in progress".to_string()))?;

    let folder = state
        .settings
        .source_folder
        .as_ref()
        .map(|p| p.to_string_lossy().into_owned())
        .ok_or_else(|| {
            ApiError::BadRequest("No source_folder configured for report runs".to_string())
        })?;

    let result = pipeline::run(
        state.source.as_ref(),
        &folder,
        state.lookup.as_deref(),
        &state.settings,
    )
    .await;

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            tracing::error!(error = %e, folder = %folder, "Report run failed");
            *state.last_error.write().await = Some(e.to_string());
            return Err(e.into());
        }
    };

    let csv = report::to_csv_string(&report.records)
        .map_err(|e| ApiError::Internal(format!("Failed to serialize report: {}", e)))?;
    let summary = report.summary();

    *state.latest_report.write().await = Some(LatestReport {
        csv,
        summary: summary.clone(),
    });
    *state.last_error.write().await = summary.quality.lookup_error.clone();

    tracing::info!(
        run_id = %summary.run_id,
        records = summary.records,
        "Report ready for download"
    );

    Ok(Json(ProcessResponse {
        message: "Processing complete".to_string(),
        download_url: "/download".to_string(),
        summary,
    }))
}

/// GET /download
pub async fn download(State(state): State<AppState>) -> ApiResult<Response> {
    let latest = state.latest_report.read().await;
    let latest = latest
        .as_ref()
        .ok_or_else(|| ApiError::NotFound("No report has been generated yet".to_string()))?;

    let disposition = format!("attachment; filename=\"{}\"", REPORT_FILE_NAME);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        latest.csv.clone(),
    )
        .into_response())
}

/// Build report run routes
pub fn process_routes() -> Router<AppState> {
    Router::new()
        .route("/process", post(process))
        .route("/download", get(download))
}
