//! MCP Registry Server - REST API over the registry core.

use anyhow::{anyhow, Result};
use clap::Parser;
use mcp_registry::{open_backend, RegistryService};
use mcp_registry_server::auth::auth_from_config;
use mcp_registry_server::{start_server, AppState, Args};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // RUST_LOG wins over the configured level
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(args.log_filter())
            .map_err(|e| anyhow!("Invalid log level {:?}: {}", args.log_filter(), e))?,
    };
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    info!("Starting MCP Registry v{}", env!("CARGO_PKG_VERSION"));

    let settings = args.storage_settings()?;
    let backend = open_backend(&settings)?;

    if let Some(path) = args.seed_path() {
        info!("Importing seed data from {}", path.display());
        match backend.import_seed(&path).await {
            Ok(report) => info!(
                "Seed import completed: {} of {} records imported",
                report.imported, report.total
            ),
            Err(e) => warn!("Failed to import seed data: {}", e),
        }
    }

    let service = RegistryService::new(backend);
    let auth = auth_from_config(
        args.auth_enabled,
        args.auth_method.as_deref(),
        &args.auth_tokens,
    );
    let state = Arc::new(AppState::new(service.clone(), auth, args.auth_enabled));

    let addr = start_server(state, args.bind_address()?).await?;
    println!("MCP Registry listening on http://{}", addr);

    info!(
        "Database: {}, auth enabled: {}",
        settings.kind, args.auth_enabled
    );

    shutdown_signal().await;
    info!("Shutdown signal received, closing database");

    if let Err(e) = service.close().await {
        error!("Error closing database: {}", e);
    }

    Ok(())
}

/// Resolve on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
