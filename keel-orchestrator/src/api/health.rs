//! Health Check API Handler
//!
//! Liveness probe. Does not touch the build engine or the cluster.

use axum::{Json, extract::State};
use keel_core::dto::health::HealthResponse;

use crate::api::AppState;

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        namespace: state.orchestrator.settings().namespace.clone(),
    })
}
