use async_trait::async_trait;
use keel_core::domain::workload::{ApplyAction, PodPhase, WorkloadSpec};
use thiserror::Error;

/// Field manager recorded on server-side apply patches.
pub const FIELD_MANAGER: &str = "keel";

/// Errors emitted by the Kubernetes integration.
#[derive(Debug, Error)]
pub enum ClusterError {
    /// The kubeconfig could not be read or resolved.
    #[error("Invalid kubeconfig: {0}")]
    Kubeconfig(#[from] kube::config::KubeconfigError),
    /// An error returned by the [`kube`] client when talking to the API
    /// server.
    #[error("An error occurred with kube when dealing with K8s: {0}")]
    Kube(#[from] kube::Error),
    /// The workload does not exist in the cluster.
    #[error("Pod {0} not found")]
    NotFound(String),
}

impl ClusterError {
    /// Returns the control plane's own rejection message when there is one.
    pub fn reason(&self) -> String {
        match self {
            ClusterError::Kube(kube::Error::Api(response)) => {
                format!("{} ({})", response.message, response.reason)
            }
            other => other.to_string(),
        }
    }
}

/// Observed state of a workload pod.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadStatus {
    pub phase: PodPhase,
    /// True when at least one container is reported and all of them are ready.
    pub containers_ready: bool,
    /// Explicit failure condition such as a crash loop or image pull error.
    pub failure: Option<String>,
}

impl WorkloadStatus {
    pub fn pending() -> Self {
        Self {
            phase: PodPhase::Pending,
            containers_ready: false,
            failure: None,
        }
    }
}

/// Client interface describing the Kubernetes operations used by the
/// orchestrator.
///
/// Implementations must give `apply_workload` create-or-update semantics so
/// that resubmitting a workload with an existing name is not an error.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Creates or updates the pod described by `spec`.
    async fn apply_workload(&self, spec: &WorkloadSpec) -> Result<ApplyAction, ClusterError>;

    /// Returns the current status of the named pod.
    async fn workload_status(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<WorkloadStatus, ClusterError>;
}
