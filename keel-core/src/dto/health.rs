//! Health DTOs

use serde::{Deserialize, Serialize};

/// Response body for `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    /// Namespace workloads are deployed into
    pub namespace: String,
}
