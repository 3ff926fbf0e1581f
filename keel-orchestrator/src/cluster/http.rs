use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Container, Pod, PodSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use keel_core::domain::workload::{ApplyAction, PodPhase, WorkloadSpec};
use kube::api::{Patch, PatchParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client};
use std::path::Path;
use tracing::{debug, info};

use super::{ClusterClient, ClusterError, FIELD_MANAGER, WorkloadStatus};

/// Container waiting reasons that will not resolve without intervention.
const FATAL_WAITING_REASONS: &[&str] = &[
    "CrashLoopBackOff",
    "ErrImagePull",
    "ImagePullBackOff",
    "ErrImageNeverPull",
    "InvalidImageName",
    "CreateContainerError",
    "CreateContainerConfigError",
];

/// [`ClusterClient`] backed by the [`kube`] crate.
pub struct KubeClusterClient {
    client: Client,
}

impl KubeClusterClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Connects using the credentials in the kubeconfig at `path`.
    pub async fn from_kubeconfig(path: &Path) -> Result<Self, ClusterError> {
        let kubeconfig = Kubeconfig::read_from(path)?;
        let config =
            kube::Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await?;
        let client = Client::try_from(config)?;

        info!("Kubernetes client created from {}", path.display());

        Ok(Self::new(client))
    }

    fn pods(&self, namespace: &str) -> Api<Pod> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    async fn apply_workload(&self, spec: &WorkloadSpec) -> Result<ApplyAction, ClusterError> {
        let pods = self.pods(&spec.namespace);

        let existing = pods.get_opt(&spec.name).await?;
        let pod = pod_from_spec(spec);

        let params = PatchParams::apply(FIELD_MANAGER).force();
        pods.patch(&spec.name, &params, &Patch::Apply(&pod)).await?;

        let action = if existing.is_some() {
            ApplyAction::Updated
        } else {
            ApplyAction::Created
        };

        info!(
            "Applied pod {}/{} with image {} ({:?})",
            spec.namespace, spec.name, spec.image, action
        );

        Ok(action)
    }

    async fn workload_status(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<WorkloadStatus, ClusterError> {
        let pod = self
            .pods(namespace)
            .get_opt(name)
            .await?
            .ok_or_else(|| ClusterError::NotFound(name.to_string()))?;

        let status = status_from_pod(&pod);
        debug!("Pod {}/{} status: {:?}", namespace, name, status);

        Ok(status)
    }
}

/// Converts a [`WorkloadSpec`] into the [`Pod`] submitted to the API server.
pub fn pod_from_spec(spec: &WorkloadSpec) -> Pod {
    Pod {
        metadata: ObjectMeta {
            name: Some(spec.name.clone()),
            namespace: Some(spec.namespace.clone()),
            labels: Some(spec.labels.clone()),
            ..ObjectMeta::default()
        },
        spec: Some(PodSpec {
            containers: vec![Container {
                name: spec.container_name.clone(),
                image: Some(spec.image.clone()),
                image_pull_policy: Some(spec.image_pull_policy.as_str().to_string()),
                ..Container::default()
            }],
            restart_policy: Some(spec.restart_policy.as_str().to_string()),
            ..PodSpec::default()
        }),
        ..Pod::default()
    }
}

/// Reduces a pod's reported status to what the readiness wait needs.
pub fn status_from_pod(pod: &Pod) -> WorkloadStatus {
    let Some(status) = pod.status.as_ref() else {
        return WorkloadStatus::pending();
    };

    let phase = status
        .phase
        .as_deref()
        .map(PodPhase::from)
        .unwrap_or(PodPhase::Pending);

    let containers = status.container_statuses.as_deref().unwrap_or_default();
    let containers_ready = !containers.is_empty() && containers.iter().all(|c| c.ready);

    let waiting_failure = containers.iter().find_map(|c| {
        let waiting = c.state.as_ref()?.waiting.as_ref()?;
        let reason = waiting.reason.as_deref()?;
        if !FATAL_WAITING_REASONS.contains(&reason) {
            return None;
        }
        Some(match waiting.message.as_deref() {
            Some(message) => format!("container {} is {}: {}", c.name, reason, message),
            None => format!("container {} is {}", c.name, reason),
        })
    });

    let failure = waiting_failure.or_else(|| {
        (phase == PodPhase::Failed).then(|| {
            let reason = status.reason.as_deref().unwrap_or("Failed");
            match status.message.as_deref() {
                Some(message) => format!("pod failed ({}): {}", reason, message),
                None => format!("pod failed ({})", reason),
            }
        })
    });

    WorkloadStatus {
        phase,
        containers_ready,
        failure,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{
        ContainerState, ContainerStateWaiting, ContainerStatus, PodStatus,
    };
    use keel_core::domain::workload::{PullPolicy, RestartPolicy};

    fn pod_with_status(phase: &str, containers: Vec<ContainerStatus>) -> Pod {
        Pod {
            status: Some(PodStatus {
                phase: Some(phase.to_string()),
                container_statuses: Some(containers),
                ..PodStatus::default()
            }),
            ..Pod::default()
        }
    }

    fn container(ready: bool, waiting_reason: Option<&str>) -> ContainerStatus {
        ContainerStatus {
            name: "dockerfile-container".to_string(),
            ready,
            state: waiting_reason.map(|reason| ContainerState {
                waiting: Some(ContainerStateWaiting {
                    reason: Some(reason.to_string()),
                    message: None,
                }),
                ..ContainerState::default()
            }),
            ..ContainerStatus::default()
        }
    }

    #[test]
    fn test_pod_from_spec() {
        let spec = WorkloadSpec::for_image("dockerfile-app:abc", "0123456789ab", "apps")
            .with_pull_policy(PullPolicy::Never)
            .with_restart_policy(RestartPolicy::OnFailure);

        let pod = pod_from_spec(&spec);
        assert_eq!(pod.metadata.name.as_deref(), Some("dockerfile-pod-0123456789ab"));
        assert_eq!(pod.metadata.namespace.as_deref(), Some("apps"));

        let pod_spec = pod.spec.unwrap();
        assert_eq!(pod_spec.restart_policy.as_deref(), Some("OnFailure"));
        assert_eq!(pod_spec.containers.len(), 1);
        assert_eq!(pod_spec.containers[0].name, "dockerfile-container");
        assert_eq!(pod_spec.containers[0].image.as_deref(), Some("dockerfile-app:abc"));
        assert_eq!(pod_spec.containers[0].image_pull_policy.as_deref(), Some("Never"));
    }

    #[test]
    fn test_apply_body_carries_type_meta() {
        let spec = WorkloadSpec::for_image("dockerfile-app:abc", "0123456789ab", "default");
        let json = serde_json::to_value(pod_from_spec(&spec)).unwrap();

        assert_eq!(json["apiVersion"], "v1");
        assert_eq!(json["kind"], "Pod");
    }

    #[test]
    fn test_status_without_status_is_pending() {
        assert_eq!(status_from_pod(&Pod::default()), WorkloadStatus::pending());
    }

    #[test]
    fn test_running_and_ready() {
        let status = status_from_pod(&pod_with_status("Running", vec![container(true, None)]));
        assert_eq!(status.phase, PodPhase::Running);
        assert!(status.containers_ready);
        assert!(status.failure.is_none());
    }

    #[test]
    fn test_no_containers_is_not_ready() {
        let status = status_from_pod(&pod_with_status("Running", vec![]));
        assert!(!status.containers_ready);
    }

    #[test]
    fn test_image_pull_error_is_failure() {
        let status = status_from_pod(&pod_with_status(
            "Pending",
            vec![container(false, Some("ErrImagePull"))],
        ));
        assert_eq!(status.phase, PodPhase::Pending);
        assert_eq!(
            status.failure.as_deref(),
            Some("container dockerfile-container is ErrImagePull")
        );
    }

    #[test]
    fn test_container_creating_is_not_failure() {
        let status = status_from_pod(&pod_with_status(
            "Pending",
            vec![container(false, Some("ContainerCreating"))],
        ));
        assert!(status.failure.is_none());
    }

    #[test]
    fn test_failed_phase_is_failure() {
        let status = status_from_pod(&pod_with_status("Failed", vec![container(false, None)]));
        assert_eq!(status.failure.as_deref(), Some("pod failed (Failed)"));
    }
}
