//! topfive-server - chart-to-catalog playlist resolution service
//!
//! Resolves a historical chart week across a range of years into a top-five
//! playlist, matching each chart entry to a track in the external music
//! catalog and streaming progress to the caller over SSE.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use topfive_common::config::{self, ConfigOverrides};
use topfive_server::cache::{CacheLayer, CacheStore};
use topfive_server::catalog::CatalogClient;
use topfive_server::chart::ChartSnapshotSource;
use topfive_server::{build_router, AppState};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "topfive-server", version, about = "Cross-year top-five playlist resolution service")]
struct Args {
    /// Path to the TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listen port (overrides config)
    #[arg(long)]
    port: Option<u16>,

    /// Directory holding valid_dates.json and date/<YYYY-MM-DD>.json
    #[arg(long)]
    chart_dir: Option<PathBuf>,

    /// SQLite cache database path; omit to run without a durable cache
    #[arg(long)]
    cache_db: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    info!("Starting topfive-server");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = config::load(&ConfigOverrides {
        config_file: args.config,
        port: args.port,
        chart_dir: args.chart_dir,
        cache_db: args.cache_db,
    })?;

    let valid_dates = ChartSnapshotSource::load_valid_dates(&config.chart_dir)?;
    info!(
        dates = valid_dates.len(),
        chart_dir = %config.chart_dir.display(),
        "chart history loaded"
    );

    let store = match &config.cache_db_path {
        Some(path) => {
            info!(path = %path.display(), "opening cache store");
            Some(CacheStore::open(path).await?)
        }
        None => None,
    };
    let cache = CacheLayer::new(store);

    if config.catalog.client_id.is_empty() || config.catalog.client_secret.is_empty() {
        warn!("catalog credentials not configured; live track resolution will fail");
    }

    let snapshots = Arc::new(ChartSnapshotSource::new(
        config.chart_dir.clone(),
        config.chart_base_url.clone(),
    ));
    let resolver = Arc::new(CatalogClient::new(config.catalog.clone()));

    let addr = format!("{}:{}", config.host, config.port);
    let state = AppState::new(
        Arc::new(config),
        Arc::new(valid_dates),
        snapshots,
        Arc::new(cache),
        resolver,
    );
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
