//! HTTP API handlers for shelf-report
//!
//! POST /process, GET /download, GET /health

pub mod health;
pub mod process;

pub use health::health_routes;
pub use process::process_routes;
