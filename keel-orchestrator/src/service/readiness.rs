//! Readiness wait
//!
//! Bounded polling of a submitted workload until it is ready, explicitly
//! failed, or the deadline passes.

use keel_core::domain::outcome::{DeploymentOutcome, FailureStage};
use keel_core::domain::workload::PodPhase;
use std::time::Duration;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::cluster::{ClusterClient, WorkloadStatus};

/// What a single status observation means for the wait
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    Ready(PodPhase),
    Failed(String),
    Pending(PodPhase),
}

/// Classify one observed status
pub fn classify(status: &WorkloadStatus) -> Readiness {
    if let Some(reason) = &status.failure {
        return Readiness::Failed(reason.clone());
    }

    match status.phase {
        PodPhase::Succeeded => Readiness::Ready(PodPhase::Succeeded),
        PodPhase::Running if status.containers_ready => Readiness::Ready(PodPhase::Running),
        PodPhase::Failed => Readiness::Failed("pod failed".to_string()),
        phase => Readiness::Pending(phase),
    }
}

/// Polls the named pod every `interval` until a terminal state or `timeout`
///
/// Status query errors are logged and polling continues. Reaching the
/// deadline yields [`DeploymentOutcome::TimedOut`].
pub async fn wait_for_ready(
    cluster: &dyn ClusterClient,
    namespace: &str,
    name: &str,
    timeout: Duration,
    interval: Duration,
) -> DeploymentOutcome {
    let deadline = Instant::now() + timeout;
    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut last_phase = None;

    loop {
        tokio::select! {
            _ = time::sleep_until(deadline) => break,
            _ = ticker.tick() => {}
        }

        let status = match time::timeout_at(deadline, cluster.workload_status(namespace, name))
            .await
        {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => {
                warn!("Failed to query pod {}/{}: {}", namespace, name, e);
                continue;
            }
            Err(_) => break,
        };

        last_phase = Some(status.phase);

        match classify(&status) {
            Readiness::Ready(phase) => {
                info!("Pod {}/{} is ready ({})", namespace, name, phase);
                return DeploymentOutcome::Succeeded {
                    pod_name: name.to_string(),
                    phase,
                };
            }
            Readiness::Failed(reason) => {
                warn!("Pod {}/{} failed: {}", namespace, name, reason);
                return DeploymentOutcome::failed(FailureStage::Workload, reason);
            }
            Readiness::Pending(phase) => {
                debug!("Pod {}/{} not ready yet ({})", namespace, name, phase);
            }
        }
    }

    warn!(
        "Pod {}/{} did not become ready within {:?}",
        namespace, name, timeout
    );

    DeploymentOutcome::TimedOut {
        pod_name: name.to_string(),
        last_phase,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::ClusterError;
    use async_trait::async_trait;
    use keel_core::domain::workload::{ApplyAction, WorkloadSpec};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replays a scripted sequence of statuses, repeating the last one
    struct ScriptedCluster {
        script: Mutex<Vec<Result<WorkloadStatus, ClusterError>>>,
        queries: AtomicUsize,
    }

    impl ScriptedCluster {
        fn new(script: Vec<Result<WorkloadStatus, ClusterError>>) -> Self {
            Self {
                script: Mutex::new(script),
                queries: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ClusterClient for ScriptedCluster {
        async fn apply_workload(&self, _spec: &WorkloadSpec) -> Result<ApplyAction, ClusterError> {
            Ok(ApplyAction::Created)
        }

        async fn workload_status(
            &self,
            _namespace: &str,
            name: &str,
        ) -> Result<WorkloadStatus, ClusterError> {
            self.queries.fetch_add(1, Ordering::SeqCst);
            let mut script = self.script.lock().unwrap();
            if script.len() > 1 {
                script.remove(0)
            } else {
                match script.first() {
                    Some(Ok(status)) => Ok(status.clone()),
                    _ => Err(ClusterError::NotFound(name.to_string())),
                }
            }
        }
    }

    fn status(phase: PodPhase, ready: bool) -> WorkloadStatus {
        WorkloadStatus {
            phase,
            containers_ready: ready,
            failure: None,
        }
    }

    const TIMEOUT: Duration = Duration::from_millis(300);
    const INTERVAL: Duration = Duration::from_millis(5);

    #[test]
    fn test_classify() {
        assert_eq!(
            classify(&status(PodPhase::Running, true)),
            Readiness::Ready(PodPhase::Running)
        );
        assert_eq!(
            classify(&status(PodPhase::Running, false)),
            Readiness::Pending(PodPhase::Running)
        );
        assert_eq!(
            classify(&status(PodPhase::Succeeded, false)),
            Readiness::Ready(PodPhase::Succeeded)
        );
        assert!(matches!(
            classify(&status(PodPhase::Failed, false)),
            Readiness::Failed(_)
        ));

        let mut crash = status(PodPhase::Running, false);
        crash.failure = Some("container is CrashLoopBackOff".to_string());
        assert_eq!(
            classify(&crash),
            Readiness::Failed("container is CrashLoopBackOff".to_string())
        );
    }

    #[tokio::test]
    async fn test_becomes_ready_after_pending() {
        let cluster = ScriptedCluster::new(vec![
            Ok(status(PodPhase::Pending, false)),
            Ok(status(PodPhase::Running, false)),
            Ok(status(PodPhase::Running, true)),
        ]);

        let outcome =
            wait_for_ready(&cluster, "default", "dockerfile-pod-a", TIMEOUT, INTERVAL).await;

        assert_eq!(
            outcome,
            DeploymentOutcome::Succeeded {
                pod_name: "dockerfile-pod-a".to_string(),
                phase: PodPhase::Running,
            }
        );
        assert_eq!(cluster.queries.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_query_errors_are_retried() {
        let cluster = ScriptedCluster::new(vec![
            Err(ClusterError::NotFound("dockerfile-pod-a".to_string())),
            Ok(status(PodPhase::Succeeded, false)),
        ]);

        let outcome =
            wait_for_ready(&cluster, "default", "dockerfile-pod-a", TIMEOUT, INTERVAL).await;
        assert!(outcome.is_success());
    }

    #[tokio::test]
    async fn test_slow_start_times_out() {
        let cluster = ScriptedCluster::new(vec![Ok(status(PodPhase::Pending, false))]);

        let started = std::time::Instant::now();
        let outcome = wait_for_ready(
            &cluster,
            "default",
            "dockerfile-pod-a",
            Duration::from_millis(50),
            INTERVAL,
        )
        .await;

        assert_eq!(
            outcome,
            DeploymentOutcome::TimedOut {
                pod_name: "dockerfile-pod-a".to_string(),
                last_phase: Some(PodPhase::Pending),
            }
        );
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_crash_loop_fails() {
        let mut crash = status(PodPhase::Running, false);
        crash.failure = Some("container dockerfile-container is CrashLoopBackOff".to_string());
        let cluster = ScriptedCluster::new(vec![Ok(crash)]);

        let outcome =
            wait_for_ready(&cluster, "default", "dockerfile-pod-a", TIMEOUT, INTERVAL).await;

        assert_eq!(
            outcome,
            DeploymentOutcome::failed(
                FailureStage::Workload,
                "container dockerfile-container is CrashLoopBackOff"
            )
        );
    }
}
