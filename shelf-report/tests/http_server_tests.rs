//! HTTP server and routing integration tests

use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use shelf_report::settings::Settings;
use shelf_report::source::LocalFolderSource;
use shelf_report::{build_router, AppState};

fn test_app_state(folder: Option<&Path>) -> AppState {
    let settings = Settings {
        source_folder: folder.map(Path::to_path_buf),
        ..Settings::default()
    };
    AppState::new(settings, Arc::new(LocalFolderSource::new()), None)
}

fn sales_folder() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("store_a.csv"),
        "ISBN,Qty\n9780306406157,3\n9780306406157,2\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("store_b.csv"),
        "Item Code,Units Sold\n9780306406157,5\n9791234567896,7\n",
    )
    .unwrap();
    dir
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

async fn body_json(response: axum::response::Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

fn post(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = build_router(test_app_state(None));

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["module"], "shelf-report");
    assert_eq!(json["catalog_configured"], false);
    assert!(json["uptime_seconds"].is_u64());
    assert!(json.get("last_error").is_none());
}

#[tokio::test]
async fn test_download_before_any_run_is_not_found() {
    let app = build_router(test_app_state(None));

    let response = app.oneshot(get("/download")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_process_without_folder_is_bad_request() {
    let app = build_router(test_app_state(None));

    let response = app.oneshot(post("/process")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_process_then_download() {
    let dir = sales_folder();
    let app = build_router(test_app_state(Some(dir.path())));

    let response = app.clone().oneshot(post("/process")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["message"], "Processing complete");
    assert_eq!(json["download_url"], "/download");
    assert_eq!(json["summary"]["records"], 2);
    assert_eq!(json["summary"]["ingest"]["files_processed"], 2);
    assert_eq!(json["summary"]["quality"]["missing_from_metadata"], 2);

    let response = app.oneshot(get("/download")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/csv; charset=utf-8"
    );
    assert!(response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .starts_with("attachment"));

    let csv = String::from_utf8(body_bytes(response).await).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(
        lines[0],
        "Identifier,TotalQuantity,SourceBreadth,Title,Authors,Publisher,Category,Description,Binding,Subjects"
    );
    assert!(lines[1].starts_with("9780306406157,10,2,"));
    assert!(lines[2].starts_with("9791234567896,7,1,"));
}

#[tokio::test]
async fn test_concurrent_process_is_conflict() {
    let dir = sales_folder();
    let state = test_app_state(Some(dir.path()));
    let app = build_router(state.clone());

    let _running = state.run_lock.lock().await;

    let response = app.oneshot(post("/process")).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "CONFLICT");
}

#[tokio::test]
async fn test_missing_folder_records_last_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("not-here");
    let app = build_router(test_app_state(Some(&missing)));

    let response = app.clone().oneshot(post("/process")).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["error"]["code"], "PIPELINE_ERROR");

    let response = app.oneshot(get("/health")).await.unwrap();
    let json = body_json(response).await;
    assert_eq!(json["status"], "degraded");
    assert!(json["last_error"].as_str().unwrap().contains("Folder not found"));
}
