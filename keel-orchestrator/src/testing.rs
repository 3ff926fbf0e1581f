//! Test doubles for the build engine and cluster
//!
//! Both fakes count their calls so tests can assert which stages ran.

use async_trait::async_trait;
use chrono::Utc;
use keel_core::domain::build::ImageArtifact;
use keel_core::domain::workload::{ApplyAction, PodPhase, WorkloadSpec};
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

use crate::cluster::{ClusterClient, ClusterError, WorkloadStatus};
use crate::engine::{BuildError, DOCKERFILE_NAME, ImageBuilder};

pub const IMAGE_ID: &str =
    "sha256:4f2a9c1be0d3a7f6e5d4c3b2a1f0e9d8c7b6a5f4e3d2c1b0a9f8e7d6c5b4a3f2";

pub struct FakeBuilder {
    pub fail_build: bool,
    pub fail_import: bool,
    /// Never finish a build
    pub hang: bool,
    /// Signalled when a build starts
    pub started: Arc<Notify>,
    /// When set, builds block until notified
    pub release: Option<Arc<Notify>>,
    pub builds: AtomicUsize,
    pub imports: AtomicUsize,
}

impl FakeBuilder {
    pub fn ok() -> Self {
        Self {
            fail_build: false,
            fail_import: false,
            hang: false,
            started: Arc::new(Notify::new()),
            release: None,
            builds: AtomicUsize::new(0),
            imports: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_build: true,
            ..Self::ok()
        }
    }

    pub fn hanging() -> Self {
        Self {
            hang: true,
            ..Self::ok()
        }
    }

    pub fn gated() -> Self {
        Self {
            release: Some(Arc::new(Notify::new())),
            ..Self::ok()
        }
    }

    pub fn build_count(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageBuilder for FakeBuilder {
    async fn build(
        &self,
        context_dir: &Path,
        reference: &str,
    ) -> Result<ImageArtifact, BuildError> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        assert!(context_dir.join(DOCKERFILE_NAME).is_file());
        self.started.notify_one();

        if self.hang {
            std::future::pending::<()>().await;
        }
        if let Some(release) = &self.release {
            release.notified().await;
        }

        if self.fail_build {
            return Err(BuildError::Failed {
                exit_code: 1,
                diagnostics: "pull access denied for nonexistent-base".to_string(),
            });
        }

        Ok(ImageArtifact {
            reference: reference.to_string(),
            image_id: IMAGE_ID.to_string(),
            build_duration: Duration::from_millis(10),
            log_excerpt: "Successfully built".to_string(),
            built_at: Utc::now(),
        })
    }

    async fn import_to_cluster(
        &self,
        image: &ImageArtifact,
        _work_dir: &Path,
    ) -> Result<String, BuildError> {
        self.imports.fetch_add(1, Ordering::SeqCst);
        if self.fail_import {
            return Err(BuildError::Import("ctr: not found".to_string()));
        }
        Ok(format!("imported {}", image.reference))
    }
}

/// In-memory cluster with apply semantics
pub struct FakeCluster {
    pub unreachable: bool,
    pub status: WorkloadStatus,
    pub pods: Mutex<HashSet<String>>,
    pub applies: AtomicUsize,
}

impl FakeCluster {
    pub fn with_status(status: WorkloadStatus) -> Self {
        Self {
            unreachable: false,
            status,
            pods: Mutex::new(HashSet::new()),
            applies: AtomicUsize::new(0),
        }
    }

    pub fn ready() -> Self {
        Self::with_status(WorkloadStatus {
            phase: PodPhase::Running,
            containers_ready: true,
            failure: None,
        })
    }

    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::ready()
        }
    }

    pub fn apply_count(&self) -> usize {
        self.applies.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClusterClient for FakeCluster {
    async fn apply_workload(&self, spec: &WorkloadSpec) -> Result<ApplyAction, ClusterError> {
        self.applies.fetch_add(1, Ordering::SeqCst);
        if self.unreachable {
            return Err(ClusterError::Kube(kube::Error::Api(
                kube::core::ErrorResponse {
                    status: "Failure".to_string(),
                    message: "connection refused".to_string(),
                    reason: "ServiceUnavailable".to_string(),
                    code: 503,
                },
            )));
        }
        let mut pods = self.pods.lock().unwrap();
        if pods.insert(spec.name.clone()) {
            Ok(ApplyAction::Created)
        } else {
            Ok(ApplyAction::Updated)
        }
    }

    async fn workload_status(
        &self,
        _namespace: &str,
        name: &str,
    ) -> Result<WorkloadStatus, ClusterError> {
        if self.pods.lock().unwrap().contains(name) {
            Ok(self.status.clone())
        } else {
            Err(ClusterError::NotFound(name.to_string()))
        }
    }
}
