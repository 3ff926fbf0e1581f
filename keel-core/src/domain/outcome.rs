//! Deployment outcome types

use serde::{Deserialize, Serialize};

use crate::domain::workload::PodPhase;

/// Terminal result of one build-and-deploy request
///
/// Exactly one outcome is produced per request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DeploymentOutcome {
    Succeeded { pod_name: String, phase: PodPhase },
    Failed { stage: FailureStage, reason: String },
    /// No terminal state was observed before the deadline. The workload may still converge.
    TimedOut { pod_name: String, last_phase: Option<PodPhase> },
}

impl DeploymentOutcome {
    pub fn failed(stage: FailureStage, reason: impl Into<String>) -> Self {
        DeploymentOutcome::Failed {
            stage,
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, DeploymentOutcome::Succeeded { .. })
    }

    /// Name of the pod this outcome refers to, if the deploy step was reached
    pub fn pod_name(&self) -> Option<&str> {
        match self {
            DeploymentOutcome::Succeeded { pod_name, .. }
            | DeploymentOutcome::TimedOut { pod_name, .. } => Some(pod_name),
            DeploymentOutcome::Failed { .. } => None,
        }
    }

    /// Human readable one-line summary
    pub fn summary(&self) -> String {
        match self {
            DeploymentOutcome::Succeeded { pod_name, phase } => {
                format!("Pod '{}' is {}", pod_name, phase)
            }
            DeploymentOutcome::Failed { stage, reason } => {
                format!("{} failed: {}", stage, reason)
            }
            DeploymentOutcome::TimedOut {
                pod_name,
                last_phase,
            } => match last_phase {
                Some(phase) => format!(
                    "Pod '{}' still {} at deadline; it may still become ready",
                    pod_name, phase
                ),
                None => format!(
                    "Pod '{}' not observed before deadline; it may still become ready",
                    pod_name
                ),
            },
        }
    }
}

/// Stage at which a request failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    /// The build engine rejected the build file or a build step failed
    Build,
    /// The built image could not be handed to the cluster runtime
    Import,
    /// The control plane rejected the workload submission
    Deploy,
    /// The workload reached an explicit failure state
    Workload,
}

impl std::fmt::Display for FailureStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Build => write!(f, "build"),
            Self::Import => write!(f, "import"),
            Self::Deploy => write!(f, "deploy"),
            Self::Workload => write!(f, "workload"),
        }
    }
}
