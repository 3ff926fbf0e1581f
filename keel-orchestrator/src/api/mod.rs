//! API Module
//!
//! HTTP API layer for the orchestrator.

pub mod deploy;
pub mod error;
pub mod health;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::task::TaskTracker;
use tower_http::trace::TraceLayer;

use crate::service::deploy_service::Orchestrator;

/// Room left in the body limit for multipart boundaries and part headers
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub max_upload_bytes: usize,
    pub staging_root: Arc<PathBuf>,
    /// Owns orchestrator runs so shutdown can wait for them
    pub tracker: TaskTracker,
}

impl AppState {
    pub fn new(
        orchestrator: Orchestrator,
        max_upload_bytes: usize,
        staging_root: PathBuf,
    ) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            max_upload_bytes,
            staging_root: Arc::new(staging_root),
            tracker: TaskTracker::new(),
        }
    }
}

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    let body_limit = state.max_upload_bytes + MULTIPART_OVERHEAD_BYTES;

    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Build-and-deploy
        .route("/build-and-deploy", post(deploy::build_and_deploy))
        // Add state and middleware
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Serves the API until `shutdown` resolves, then waits for in-flight
/// orchestrator runs, including those whose client already went away
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let tracker = state.tracker.clone();

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    tracker.close();
    if !tracker.is_empty() {
        tracing::info!(
            "Waiting for {} in-flight deployment(s) to finish",
            tracker.len()
        );
    }
    tracker.wait().await;

    Ok(())
}
