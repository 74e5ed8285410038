//! shelf-report - sales report ingestion and ranking
//!
//! `run` processes a folder once and writes the report CSV.
//! `serve` exposes the same run over HTTP (POST /process, GET /download).

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn, Level};

use shelf_common::config::{ConfigResolver, TomlConfig};
use shelf_report::settings::Settings;
use shelf_report::source::LocalFolderSource;
use shelf_report::{build_router, pipeline, report, AppState};

/// Command-line arguments for shelf-report
#[derive(Parser, Debug)]
#[command(name = "shelf-report")]
#[command(about = "Aggregate sales reports into a ranked, catalog-enriched report")]
#[command(version)]
struct Args {
    /// TOML config file (overrides SHELF_CONFIG)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Process a folder once and write the report
    Run {
        /// Folder of sales report files
        #[arg(long, value_name = "DIR")]
        folder: Option<PathBuf>,

        /// Report CSV path (stdout when omitted)
        #[arg(long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Number of ranked entries to keep
        #[arg(long)]
        top_n: Option<usize>,
    },
    /// Serve report runs over HTTP
    Serve {
        /// Listen address
        #[arg(long, value_name = "ADDR")]
        bind: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = ConfigResolver::new(args.config.clone())
        .load()
        .context("Failed to load configuration")?;

    init_tracing(&config);

    info!("Starting shelf-report v{}", env!("CARGO_PKG_VERSION"));

    let settings = Settings::from_config(&config).context("Invalid configuration")?;

    match args.command {
        Command::Run {
            folder,
            output,
            top_n,
        } => run_once(settings, folder, output, top_n).await,
        Command::Serve { bind } => serve(settings, bind).await,
    }
}

fn init_tracing(config: &TomlConfig) {
    let parsed = config.logging.level.parse::<Level>().ok();

    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(parsed.unwrap_or(Level::INFO).into()),
        )
        .init();

    if parsed.is_none() {
        warn!(
            "Unrecognized log level {:?}, using info",
            config.logging.level
        );
    }
}

async fn run_once(
    mut settings: Settings,
    folder: Option<PathBuf>,
    output: Option<PathBuf>,
    top_n: Option<usize>,
) -> Result<()> {
    if let Some(top_n) = top_n {
        anyhow::ensure!(top_n > 0, "--top-n must be at least 1");
        settings.top_n = top_n;
    }

    let folder = folder
        .or_else(|| settings.source_folder.clone())
        .context("No source folder: pass --folder or set source_folder in the config")?;
    let output = output.or_else(|| settings.output_path.clone());

    let source = LocalFolderSource::new();
    let lookup = settings.catalog_lookup();

    let report = pipeline::run(
        &source,
        &folder.to_string_lossy(),
        lookup.as_deref(),
        &settings,
    )
    .await?;

    match &output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            report::write_csv(&report.records, &mut writer)?;
            writer.flush()?;
            info!(path = %path.display(), records = report.records.len(), "Report written");
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            report::write_csv(&report.records, &mut handle)?;
            handle.flush()?;
        }
    }

    let summary = report.summary();
    info!(
        files_seen = summary.ingest.files_seen,
        files_processed = summary.ingest.files_processed,
        files_skipped = summary.ingest.files_skipped.len(),
        ledger_size = summary.ingest.ledger_size,
        found_in_metadata = summary.quality.found_in_metadata,
        missing_from_metadata = summary.quality.missing_from_metadata,
        "Run summary"
    );

    Ok(())
}

async fn serve(mut settings: Settings, bind: Option<String>) -> Result<()> {
    if let Some(bind) = bind {
        settings.bind = bind;
    }

    if settings.source_folder.is_none() {
        warn!("No source_folder configured, POST /process will be rejected");
    }

    let lookup = settings.catalog_lookup();
    let bind = settings.bind.clone();
    let state = AppState::new(settings, Arc::new(LocalFolderSource::new()), lookup);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;
    info!("Listening on http://{}", bind);
    info!("Health check: http://{}/health", bind);

    axum::serve(listener, app).await?;

    Ok(())
}
