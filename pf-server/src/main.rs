//! pf-server - photo to 3D-printable model service

use anyhow::Result;
use clap::Parser;
use pf_common::ServiceConfig;
use pf_server::inference::ModelRegistry;
use pf_server::jobs::JobStore;
use pf_server::storage::StorageDirs;
use pf_server::workers::Queues;
use pf_server::AppState;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "pf-server", about = "Photo to 3D-printable model service")]
struct Args {
    /// Path to a TOML configuration file
    #[arg(long, env = "PHOTOFORGE_CONFIG")]
    config: Option<PathBuf>,

    /// Override the configured bind port
    #[arg(long)]
    port: Option<u16>,

    /// Override the configured storage root
    #[arg(long, env = "PHOTOFORGE_STORAGE")]
    storage_root: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let mut config = ServiceConfig::resolve(args.config.as_deref())?;
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(storage_root) = args.storage_root {
        config.storage_root = storage_root;
    }
    let config = Arc::new(config);

    info!("Starting pf-server");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("Storage root: {}", config.storage_root.display());

    let storage = StorageDirs::new(&config.storage_root);
    storage.ensure()?;

    let store = JobStore::connect(&config.database_path(), config.job_ttl_seconds).await?;
    info!("Job database ready: {}", config.database_path().display());
    store.spawn_sweeper(config.sweep_interval_seconds);

    let queues = Queues::start(config.cpu_workers);
    info!(
        cpu_workers = config.cpu_workers,
        "worker queues started (gpu concurrency 1)"
    );

    let models = Arc::new(ModelRegistry::new(
        config.mesh_resolution,
        config.preview_size,
    ));

    let state = AppState::new(Arc::clone(&config), store, storage, queues, models);
    let app = pf_server::build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{addr}");

    axum::serve(listener, app).await?;
    Ok(())
}
