//! Orchestrator configuration
//!
//! Defines all configurable parameters for the service including the listen
//! address, build engine, cluster placement and readiness polling.

use anyhow::{Context, Result};
use keel_core::domain::workload::{PullPolicy, RestartPolicy};
use std::path::PathBuf;
use std::time::Duration;

/// Orchestrator configuration
///
/// Cluster credentials and the build engine are process-wide prerequisites.
/// They are resolved once here and handed to the clients at construction time.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP server binds to (e.g., "0.0.0.0:5000")
    pub bind_addr: String,

    /// Path to the kubeconfig file holding cluster credentials
    pub kubeconfig: PathBuf,

    /// Namespace workloads are applied into
    pub namespace: String,

    /// Build engine binary (docker or podman)
    pub build_engine: String,

    /// Repository used for generated image references
    pub image_repository: String,

    /// Maximum accepted size of an uploaded build file
    pub max_upload_bytes: usize,

    /// Upper bound on a single image build
    pub build_timeout: Duration,

    /// How long to wait for a workload to reach a terminal state
    pub readiness_timeout: Duration,

    /// How often to query the workload while waiting
    pub poll_interval: Duration,

    /// Number of trailing build output lines kept in the artifact
    pub build_log_lines: usize,

    /// Export built images into containerd so the cluster runtime can see them
    pub import_to_containerd: bool,

    /// containerd namespace used by the cluster runtime
    pub ctr_namespace: String,

    pub image_pull_policy: PullPolicy,
    pub restart_policy: RestartPolicy,

    /// Root directory for per-request staging directories
    pub staging_root: PathBuf,
}

impl Config {
    /// Creates a new configuration with defaults
    pub fn new(kubeconfig: PathBuf) -> Self {
        Self {
            bind_addr: "0.0.0.0:5000".to_string(),
            kubeconfig,
            namespace: "default".to_string(),
            build_engine: "docker".to_string(),
            image_repository: "dockerfile-app".to_string(),
            max_upload_bytes: 1024 * 1024,
            build_timeout: Duration::from_secs(600),
            readiness_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(1000),
            build_log_lines: 20,
            import_to_containerd: true,
            ctr_namespace: "k8s.io".to_string(),
            image_pull_policy: PullPolicy::IfNotPresent,
            restart_policy: RestartPolicy::Always,
            staging_root: std::env::temp_dir(),
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - KUBECONFIG (required)
    /// - KEEL_BIND_ADDR (optional, default: 0.0.0.0:5000)
    /// - KEEL_NAMESPACE (optional, default: default)
    /// - KEEL_BUILD_ENGINE (optional, default: docker)
    /// - KEEL_IMAGE_REPOSITORY (optional, default: dockerfile-app)
    /// - KEEL_MAX_UPLOAD_BYTES (optional, default: 1048576)
    /// - KEEL_BUILD_TIMEOUT (optional, seconds, default: 600)
    /// - KEEL_READINESS_TIMEOUT (optional, seconds, default: 30)
    /// - KEEL_POLL_INTERVAL_MS (optional, default: 1000)
    /// - KEEL_BUILD_LOG_LINES (optional, default: 20)
    /// - KEEL_IMPORT_TO_CONTAINERD (optional, default: true)
    /// - KEEL_CTR_NAMESPACE (optional, default: k8s.io)
    /// - KEEL_IMAGE_PULL_POLICY (optional, default: IfNotPresent)
    /// - KEEL_RESTART_POLICY (optional, default: Always)
    /// - KEEL_STAGING_DIR (optional, default: system temp dir)
    pub fn from_env() -> Result<Self> {
        let kubeconfig = std::env::var("KUBECONFIG")
            .map_err(|_| anyhow::anyhow!("KUBECONFIG environment variable not set"))?;

        let mut config = Self::new(PathBuf::from(kubeconfig));

        if let Ok(addr) = std::env::var("KEEL_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Ok(namespace) = std::env::var("KEEL_NAMESPACE") {
            config.namespace = namespace;
        }
        if let Ok(engine) = std::env::var("KEEL_BUILD_ENGINE") {
            config.build_engine = engine;
        }
        if let Ok(repository) = std::env::var("KEEL_IMAGE_REPOSITORY") {
            config.image_repository = repository;
        }
        if let Ok(namespace) = std::env::var("KEEL_CTR_NAMESPACE") {
            config.ctr_namespace = namespace;
        }
        if let Ok(dir) = std::env::var("KEEL_STAGING_DIR") {
            config.staging_root = PathBuf::from(dir);
        }

        config.max_upload_bytes = std::env::var("KEEL_MAX_UPLOAD_BYTES")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(config.max_upload_bytes);

        config.build_timeout = std::env::var("KEEL_BUILD_TIMEOUT")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(config.build_timeout);

        config.readiness_timeout = std::env::var("KEEL_READINESS_TIMEOUT")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(config.readiness_timeout);

        config.poll_interval = std::env::var("KEEL_POLL_INTERVAL_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(config.poll_interval);

        config.build_log_lines = std::env::var("KEEL_BUILD_LOG_LINES")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(config.build_log_lines);

        config.import_to_containerd = std::env::var("KEEL_IMPORT_TO_CONTAINERD")
            .ok()
            .map(|s| parse_flag(&s))
            .unwrap_or(config.import_to_containerd);

        if let Ok(policy) = std::env::var("KEEL_IMAGE_PULL_POLICY") {
            config.image_pull_policy = policy
                .parse()
                .map_err(|e: String| anyhow::anyhow!(e))
                .context("Invalid KEEL_IMAGE_PULL_POLICY")?;
        }
        if let Ok(policy) = std::env::var("KEEL_RESTART_POLICY") {
            config.restart_policy = policy
                .parse()
                .map_err(|e: String| anyhow::anyhow!(e))
                .context("Invalid KEEL_RESTART_POLICY")?;
        }

        Ok(config)
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        if !self.kubeconfig.is_file() {
            anyhow::bail!(
                "KUBECONFIG does not point to a readable file: {}",
                self.kubeconfig.display()
            );
        }

        if self.build_engine.trim().is_empty() {
            anyhow::bail!("build_engine cannot be empty");
        }

        if self.namespace.trim().is_empty() {
            anyhow::bail!("namespace cannot be empty");
        }

        if self.image_repository.trim().is_empty() || self.image_repository.contains(':') {
            anyhow::bail!("image_repository must be a non-empty name without a tag");
        }

        if self.max_upload_bytes == 0 {
            anyhow::bail!("max_upload_bytes must be greater than 0");
        }

        if self.build_timeout.is_zero() {
            anyhow::bail!("build_timeout must be greater than 0");
        }

        if self.readiness_timeout.is_zero() {
            anyhow::bail!("readiness_timeout must be greater than 0");
        }

        if self.poll_interval.is_zero() {
            anyhow::bail!("poll_interval must be greater than 0");
        }

        if self.poll_interval > self.readiness_timeout {
            anyhow::bail!("poll_interval must not exceed readiness_timeout");
        }

        if !self.staging_root.is_dir() {
            anyhow::bail!(
                "Staging directory does not exist: {}",
                self.staging_root.display()
            );
        }

        tempfile::Builder::new()
            .prefix(".keel-check-")
            .tempdir_in(&self.staging_root)
            .with_context(|| {
                format!(
                    "Staging directory is not writable: {}",
                    self.staging_root.display()
                )
            })?;

        Ok(())
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
