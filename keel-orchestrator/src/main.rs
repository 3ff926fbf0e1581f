use anyhow::Context;
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cluster::http::KubeClusterClient;
use crate::config::Config;
use crate::engine::CliImageBuilder;
use crate::service::deploy_service::{DeploySettings, Orchestrator};

pub mod api;
pub mod cluster;
pub mod config;
pub mod engine;
pub mod service;

#[cfg(test)]
mod testing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "keel_orchestrator=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Keel Orchestrator...");

    let config = Config::from_env()?;
    config.validate()?;

    tracing::info!(
        "Using kubeconfig {} (namespace '{}')",
        config.kubeconfig.display(),
        config.namespace
    );

    engine::check_engine_available(&config.build_engine).await?;

    if let Err(e) = service::staging::sweep_stale(&config.staging_root) {
        tracing::warn!(
            "Could not sweep staging root {}: {}",
            config.staging_root.display(),
            e
        );
    }

    let cluster = KubeClusterClient::from_kubeconfig(&config.kubeconfig)
        .await
        .context("Failed to create cluster client")?;

    let builder = CliImageBuilder::new(
        config.build_engine.clone(),
        config.build_log_lines,
        config.ctr_namespace.clone(),
    );

    let orchestrator = Orchestrator::new(
        Arc::new(builder),
        Arc::new(cluster),
        DeploySettings::from_config(&config),
    );

    // Shared handler state
    let state = api::AppState::new(
        orchestrator,
        config.max_upload_bytes,
        config.staging_root.clone(),
    );

    tracing::info!("Listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    api::serve(listener, state, shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Keel Orchestrator stopped");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM; in-flight requests are allowed to finish
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
