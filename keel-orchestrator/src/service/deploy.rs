//! Deploy Service
//!
//! The build-and-deploy orchestrator. Turns a staged build file into a
//! running cluster workload and produces exactly one [`DeploymentOutcome`]:
//! build, optional containerd import, apply, then a bounded readiness wait.
//! No stage is retried.

use keel_core::domain::build::{BuildRequest, ImageArtifact};
use keel_core::domain::outcome::{DeploymentOutcome, FailureStage};
use keel_core::domain::workload::{ApplyAction, PullPolicy, RestartPolicy, WorkloadSpec};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use tokio::time;
use tracing::{error, info, warn};

use crate::cluster::ClusterClient;
use crate::config::Config;
use crate::engine::ImageBuilder;
use crate::service::readiness::wait_for_ready;
use crate::service::staging::StagedBuild;

/// Orchestrator settings derived from [`Config`]
#[derive(Debug, Clone)]
pub struct DeploySettings {
    pub namespace: String,
    pub image_repository: String,
    pub import_to_containerd: bool,
    pub build_timeout: Duration,
    pub readiness_timeout: Duration,
    pub poll_interval: Duration,
    pub image_pull_policy: PullPolicy,
    pub restart_policy: RestartPolicy,
}

impl DeploySettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            namespace: config.namespace.clone(),
            image_repository: config.image_repository.clone(),
            import_to_containerd: config.import_to_containerd,
            build_timeout: config.build_timeout,
            readiness_timeout: config.readiness_timeout,
            poll_interval: config.poll_interval,
            image_pull_policy: config.image_pull_policy,
            restart_policy: config.restart_policy,
        }
    }
}

/// Everything learned while handling one request
#[derive(Debug, Clone)]
pub struct DeployReport {
    /// Present whenever the build succeeded, even if a later stage failed
    pub image: Option<ImageArtifact>,
    pub import_message: Option<String>,
    pub action: Option<ApplyAction>,
    pub outcome: DeploymentOutcome,
}

impl DeployReport {
    fn failed(image: Option<ImageArtifact>, stage: FailureStage, reason: String) -> Self {
        Self {
            image,
            import_message: None,
            action: None,
            outcome: DeploymentOutcome::failed(stage, reason),
        }
    }
}

/// Build-and-deploy orchestrator
///
/// The build engine and cluster are injected so tests can substitute fakes.
pub struct Orchestrator {
    builder: Arc<dyn ImageBuilder>,
    cluster: Arc<dyn ClusterClient>,
    settings: DeploySettings,
}

impl Orchestrator {
    pub fn new(
        builder: Arc<dyn ImageBuilder>,
        cluster: Arc<dyn ClusterClient>,
        settings: DeploySettings,
    ) -> Self {
        Self {
            builder,
            cluster,
            settings,
        }
    }

    pub fn settings(&self) -> &DeploySettings {
        &self.settings
    }

    /// Image reference for a request
    ///
    /// The declared image wins; otherwise the tag is derived from the build
    /// file content so identical uploads map to the same reference.
    pub fn image_reference(&self, request: &BuildRequest) -> String {
        match &request.image {
            Some(image) => image.clone(),
            None => {
                let digest = hex::encode(Sha256::digest(&request.dockerfile));
                format!("{}:{}", self.settings.image_repository, &digest[..12])
            }
        }
    }

    /// Runs every stage for one request
    pub async fn run(&self, request: &BuildRequest, staged: &StagedBuild) -> DeployReport {
        let reference = self.image_reference(request);

        // Build
        let build = self.builder.build(staged.path(), &reference);
        let image = match time::timeout(self.settings.build_timeout, build).await {
            Ok(Ok(image)) => image,
            Ok(Err(e)) => {
                error!("Build failed for request {}: {}", request.request_id, e);
                return DeployReport::failed(None, FailureStage::Build, e.to_string());
            }
            Err(_) => {
                error!(
                    "Build of {} for request {} exceeded {:?}",
                    reference, request.request_id, self.settings.build_timeout
                );
                return DeployReport::failed(
                    None,
                    FailureStage::Build,
                    format!("build timed out after {:?}", self.settings.build_timeout),
                );
            }
        };

        // Import
        let import_message = if self.settings.import_to_containerd {
            match self.builder.import_to_cluster(&image, staged.path()).await {
                Ok(message) => Some(message),
                Err(e) => {
                    error!("Import failed for request {}: {}", request.request_id, e);
                    return DeployReport::failed(
                        Some(image),
                        FailureStage::Import,
                        e.to_string(),
                    );
                }
            }
        } else {
            None
        };

        // Deploy
        let spec =
            WorkloadSpec::for_image(&image.reference, image.short_id(), &self.settings.namespace)
                .with_pull_policy(self.settings.image_pull_policy)
                .with_restart_policy(self.settings.restart_policy);

        let action = match self.cluster.apply_workload(&spec).await {
            Ok(action) => action,
            Err(e) => {
                error!(
                    "Submitting pod {} failed for request {}: {}",
                    spec.name, request.request_id, e
                );
                // The built image stays in place.
                return DeployReport {
                    import_message,
                    ..DeployReport::failed(Some(image), FailureStage::Deploy, e.reason())
                };
            }
        };

        info!(
            "Pod {} {:?} for request {}, waiting up to {:?} for readiness",
            spec.name, action, request.request_id, self.settings.readiness_timeout
        );

        // Readiness wait
        let outcome = wait_for_ready(
            self.cluster.as_ref(),
            &spec.namespace,
            &spec.name,
            self.settings.readiness_timeout,
            self.settings.poll_interval,
        )
        .await;

        if let DeploymentOutcome::TimedOut { .. } = outcome {
            warn!(
                "Request {} timed out waiting for pod {}",
                request.request_id, spec.name
            );
        }

        DeployReport {
            image: Some(image),
            import_message,
            action: Some(action),
            outcome,
        }
    }
}
