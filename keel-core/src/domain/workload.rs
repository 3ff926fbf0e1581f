//! Workload domain types
//!
//! A [`WorkloadSpec`] is the minimal pod descriptor submitted to the cluster.
//! Once applied, its lifecycle belongs to the control plane.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Prefix of every generated pod name
pub const POD_NAME_PREFIX: &str = "dockerfile-pod-";

/// Name of the single container inside a workload pod
pub const CONTAINER_NAME: &str = "dockerfile-container";

/// Label marking resources submitted by this service
pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";

/// Label carrying the short image id a pod was created from
pub const IMAGE_ID_LABEL: &str = "keel.dev/image-id";

/// Deployable unit referencing a freshly built image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadSpec {
    pub name: String,
    pub namespace: String,
    pub container_name: String,
    pub image: String,
    pub image_pull_policy: PullPolicy,
    pub restart_policy: RestartPolicy,
    pub labels: BTreeMap<String, String>,
}

impl WorkloadSpec {
    /// Builds the spec for an image identified by its short id
    ///
    /// The pod name is derived from the image id, so rebuilding identical
    /// content targets the same pod.
    pub fn for_image(
        image: impl Into<String>,
        short_image_id: &str,
        namespace: impl Into<String>,
    ) -> Self {
        let mut labels = BTreeMap::new();
        labels.insert(MANAGED_BY_LABEL.to_string(), "keel".to_string());
        labels.insert(IMAGE_ID_LABEL.to_string(), short_image_id.to_string());

        Self {
            name: format!("{}{}", POD_NAME_PREFIX, short_image_id),
            namespace: namespace.into(),
            container_name: CONTAINER_NAME.to_string(),
            image: image.into(),
            image_pull_policy: PullPolicy::IfNotPresent,
            restart_policy: RestartPolicy::Always,
            labels,
        }
    }

    pub fn with_pull_policy(mut self, policy: PullPolicy) -> Self {
        self.image_pull_policy = policy;
        self
    }

    pub fn with_restart_policy(mut self, policy: RestartPolicy) -> Self {
        self.restart_policy = policy;
        self
    }
}

/// Container image pull policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PullPolicy {
    Always,
    IfNotPresent,
    Never,
}

impl PullPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            PullPolicy::Always => "Always",
            PullPolicy::IfNotPresent => "IfNotPresent",
            PullPolicy::Never => "Never",
        }
    }
}

impl FromStr for PullPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Always" => Ok(PullPolicy::Always),
            "IfNotPresent" => Ok(PullPolicy::IfNotPresent),
            "Never" => Ok(PullPolicy::Never),
            other => Err(format!("unknown image pull policy '{}'", other)),
        }
    }
}

/// Pod restart policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RestartPolicy {
    Always,
    OnFailure,
    Never,
}

impl RestartPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RestartPolicy::Always => "Always",
            RestartPolicy::OnFailure => "OnFailure",
            RestartPolicy::Never => "Never",
        }
    }
}

impl FromStr for RestartPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Always" => Ok(RestartPolicy::Always),
            "OnFailure" => Ok(RestartPolicy::OnFailure),
            "Never" => Ok(RestartPolicy::Never),
            other => Err(format!("unknown restart policy '{}'", other)),
        }
    }
}

/// Simplified pod phase
///
/// Mirrors the phase strings reported by Kubernetes. Unrecognized values map
/// to [`PodPhase::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PodPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    Unknown,
}

impl From<&str> for PodPhase {
    fn from(value: &str) -> Self {
        match value {
            "Pending" => PodPhase::Pending,
            "Running" => PodPhase::Running,
            "Succeeded" => PodPhase::Succeeded,
            "Failed" => PodPhase::Failed,
            _ => PodPhase::Unknown,
        }
    }
}

impl std::fmt::Display for PodPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PodPhase::Pending => "Pending",
            PodPhase::Running => "Running",
            PodPhase::Succeeded => "Succeeded",
            PodPhase::Failed => "Failed",
            PodPhase::Unknown => "Unknown",
        };
        write!(f, "{}", s)
    }
}

/// Whether an apply created a new workload or updated an existing one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyAction {
    Created,
    Updated,
}
