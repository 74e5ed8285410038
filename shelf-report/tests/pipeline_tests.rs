//! End-to-end pipeline tests over a local folder and a mock ISBNdb server

use std::collections::HashMap;
use std::time::Duration;

use axum::{http::HeaderMap, http::StatusCode, routing::post, Form, Json, Router};
use rust_xlsxwriter::Workbook;
use serde_json::{json, Value};

use shelf_report::catalog::{CatalogLookup, IsbndbClient, LookupError};
use shelf_report::cell::CellValue;
use shelf_report::headers::HeaderAliases;
use shelf_report::identifier::Identifier;
use shelf_report::ingest::{decode_csv, normalize_grid};
use shelf_report::ledger::Ledger;
use shelf_report::merge::{NOT_FOUND, UNKNOWN};
use shelf_report::pipeline;
use shelf_report::settings::Settings;
use shelf_report::source::LocalFolderSource;

const API_KEY: &str = "test-key";

/// Minimal stand-in for the ISBNdb bulk endpoint
async fn books(
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    if headers.get("authorization").and_then(|v| v.to_str().ok()) != Some(API_KEY) {
        return (StatusCode::UNAUTHORIZED, Json(json!({"message": "Unauthorized"})));
    }

    let requested = form.get("isbns").cloned().unwrap_or_default();
    let data: Vec<Value> = requested
        .split(',')
        .filter_map(|isbn| match isbn {
            "9780306406157" => Some(json!({
                "isbn13": "9780306406157",
                "title": "Picture Day",
                "authors": ["A. Author"],
                "publisher": "Plenum",
                "subjects": ["Juvenile Fiction", "Fiction"],
                "overview": "",
                "synopsis": "A day at school.",
                "binding": "Hardcover"
            })),
            "9791234567896" => Some(json!({
                "isbn13": "9791234567896",
                "title_long": "Essays on Bread"
            })),
            _ => None,
        })
        .collect();

    if data.is_empty() {
        return (StatusCode::NOT_FOUND, Json(json!({"errorMessage": "Not Found"})));
    }

    (StatusCode::OK, Json(json!({"total": data.len(), "data": data})))
}

async fn spawn_catalog_server() -> String {
    let app = Router::new().route("/books", post(books));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn id(raw: &str) -> Identifier {
    Identifier::parse(raw).unwrap()
}

#[test]
fn test_csv_and_spreadsheet_files_share_one_ledger() {
    let aliases = HeaderAliases::builtin();

    let csv = decode_csv(b"ISBN,Qty\n9780306406157,3\n9780306406157,2\n", &aliases).unwrap();
    let sheet = normalize_grid(
        vec![
            vec![CellValue::from("SKU"), CellValue::from("Units")],
            vec![CellValue::Float(9780306406157.0), CellValue::Float(5.0)],
        ],
        &aliases,
    );

    let mut ledger = Ledger::new();
    ledger.fold_file(csv.rows);
    ledger.fold_file(sheet.rows);

    let entry = ledger.get(&id("9780306406157")).unwrap();
    assert_eq!(entry.total_quantity, 10);
    assert_eq!(entry.source_breadth, 2);
    assert_eq!(ledger.len(), 1);
}

#[tokio::test]
async fn test_run_over_csv_and_xlsx_files() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("store_a.csv"),
        "ISBN,Qty\n9780306406157,3\n9780306406157,2\n",
    )
    .unwrap();

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.write_string(0, 0, "SKU").unwrap();
    sheet.write_string(0, 1, "Units").unwrap();
    sheet.write_number(1, 0, 9780306406157.0).unwrap();
    sheet.write_number(1, 1, 5.0).unwrap();
    workbook.save(dir.path().join("store_b.xlsx")).unwrap();

    let report = pipeline::run(
        &LocalFolderSource::new(),
        &dir.path().to_string_lossy(),
        None,
        &Settings::default(),
    )
    .await
    .unwrap();

    assert_eq!(report.ingest.files_processed, 2);
    assert!(report.ingest.files_skipped.is_empty());
    assert_eq!(report.records.len(), 1);

    let record = &report.records[0];
    assert_eq!(record.identifier.as_str(), "9780306406157");
    assert_eq!(record.total_quantity, 10);
    assert_eq!(record.source_breadth, 2);
}

#[tokio::test]
async fn test_isbndb_client_against_mock_server() {
    let base_url = spawn_catalog_server().await;
    let client = IsbndbClient::new(&base_url, API_KEY, Duration::from_secs(5)).unwrap();

    let records = client
        .lookup(&[id("9780306406157"), id("9780000000002")])
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].title.as_deref(), Some("Picture Day"));

    let none = client.lookup(&[id("9780000000002")]).await.unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn test_isbndb_client_reports_rejected_key() {
    let base_url = spawn_catalog_server().await;
    let client = IsbndbClient::new(&base_url, "wrong", Duration::from_secs(5)).unwrap();

    let result = client.lookup(&[id("9780306406157")]).await;
    assert!(matches!(result, Err(LookupError::ApiError(401, _))));
}

#[tokio::test]
async fn test_full_run_with_enrichment() {
    let base_url = spawn_catalog_server().await;
    let client = IsbndbClient::new(&base_url, API_KEY, Duration::from_secs(5)).unwrap();

    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("a.csv"),
        "ISBN ,Net quantity\n978-0-306-40615-7,3\n9791234567896,40\n9780000000002,1\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("b.csv"),
        "GTIN,Sales\n9.780306406157E+12,4\n123,9\n",
    )
    .unwrap();
    std::fs::write(dir.path().join("readme.txt"), "not a report").unwrap();

    let report = pipeline::run(
        &LocalFolderSource::new(),
        &dir.path().to_string_lossy(),
        Some(&client),
        &Settings::default(),
    )
    .await
    .unwrap();

    assert_eq!(report.ingest.files_seen, 3);
    assert_eq!(report.ingest.files_processed, 2);
    assert_eq!(report.ingest.files_skipped.len(), 1);
    assert_eq!(report.ingest.invalid_identifier_rows, 1);
    assert_eq!(report.records.len(), 3);

    let first = &report.records[0];
    assert_eq!(first.identifier.as_str(), "9780306406157");
    assert_eq!(first.total_quantity, 7);
    assert_eq!(first.source_breadth, 2);
    assert_eq!(first.category, "Children's");
    assert_eq!(first.description, "A day at school.");
    assert_eq!(first.subjects, "Juvenile Fiction, Fiction");

    let second = &report.records[1];
    assert_eq!(second.identifier.as_str(), "9791234567896");
    assert_eq!(second.title, "Essays on Bread");
    assert_eq!(second.authors, UNKNOWN);
    assert_eq!(second.category, "Non-Fiction");

    let third = &report.records[2];
    assert_eq!(third.identifier.as_str(), "9780000000002");
    assert_eq!(third.title, NOT_FOUND);
    assert_eq!(third.category, NOT_FOUND);

    assert_eq!(report.quality.found_in_metadata, 2);
    assert_eq!(report.quality.missing_from_metadata, 1);
    assert_eq!(report.quality.missing_subjects, 1);
    assert!(report.quality.lookup_error.is_none());
}

#[tokio::test]
async fn test_unreachable_catalog_degrades_to_ledger_only() {
    let client =
        IsbndbClient::new("http://127.0.0.1:9", API_KEY, Duration::from_millis(200)).unwrap();

    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.csv"), "ISBN,Qty\n9780306406157,3\n").unwrap();

    let report = pipeline::run(
        &LocalFolderSource::new(),
        &dir.path().to_string_lossy(),
        Some(&client),
        &Settings::default(),
    )
    .await
    .unwrap();

    assert_eq!(report.records.len(), 1);
    assert_eq!(report.records[0].title, NOT_FOUND);
    assert!(report.quality.lookup_error.is_some());
}
