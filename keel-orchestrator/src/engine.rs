//! Container build engine
//!
//! Drives the local build engine CLI (docker or podman) for a staged build file:
//! - Checking the engine is available at startup
//! - Building and tagging an image from a staging directory
//! - Exporting the image into containerd so the cluster runtime can run it

use async_trait::async_trait;
use chrono::Utc;
use keel_core::domain::build::ImageArtifact;
use std::path::Path;
use std::time::Instant;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, error, info};

/// File name of the build file inside a staging directory
pub const DOCKERFILE_NAME: &str = "Dockerfile";

const IID_FILE_NAME: &str = "image.id";
const IMAGE_TAR_NAME: &str = "image.tar";

/// Errors reported by the build engine
#[derive(Debug, Error)]
pub enum BuildError {
    /// The engine binary could not be started
    #[error("failed to run '{program}': {source}")]
    EngineUnavailable {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The build ran and exited non-zero
    #[error("build exited with code {exit_code}: {diagnostics}")]
    Failed { exit_code: i32, diagnostics: String },

    /// The build succeeded but the engine reported no image id
    #[error("build completed but no image id was reported for {0}")]
    MissingImageId(String),

    /// Saving the image to a tarball failed
    #[error("failed to export image {reference}: {diagnostics}")]
    Export {
        reference: String,
        diagnostics: String,
    },

    /// containerd rejected the image tarball
    #[error("failed to import image into containerd: {0}")]
    Import(String),
}

/// Build engine seam used by the orchestrator
#[async_trait]
pub trait ImageBuilder: Send + Sync {
    /// Builds the `Dockerfile` in `context_dir` and tags it as `reference`
    async fn build(&self, context_dir: &Path, reference: &str)
    -> Result<ImageArtifact, BuildError>;

    /// Makes a built image visible to the cluster's container runtime
    ///
    /// # Returns
    /// A short message describing what was imported
    async fn import_to_cluster(
        &self,
        image: &ImageArtifact,
        work_dir: &Path,
    ) -> Result<String, BuildError>;
}

/// Checks that the build engine is installed and answering
pub async fn check_engine_available(engine: &str) -> anyhow::Result<()> {
    let output = run(Command::new(engine).arg("--version"), engine)
        .await
        .map_err(|e| anyhow::anyhow!("{}. Is {} installed?", e, engine))?;

    if !output.success {
        anyhow::bail!("{} is not working correctly: {}", engine, output.stderr.trim());
    }

    info!("Build engine is available: {}", output.stdout.trim());
    Ok(())
}

/// [`ImageBuilder`] backed by the engine's command line
pub struct CliImageBuilder {
    engine: String,
    log_lines: usize,
    ctr_namespace: String,
}

impl CliImageBuilder {
    /// Creates a new CLI builder
    ///
    /// # Arguments
    /// * `engine` - Engine binary (e.g., "docker" or "podman")
    /// * `log_lines` - Number of trailing output lines kept as the build log excerpt
    /// * `ctr_namespace` - containerd namespace images are imported into
    pub fn new(
        engine: impl Into<String>,
        log_lines: usize,
        ctr_namespace: impl Into<String>,
    ) -> Self {
        Self {
            engine: engine.into(),
            log_lines,
            ctr_namespace: ctr_namespace.into(),
        }
    }

    /// Resolves the id of a tagged image when no iid file was written
    async fn inspect_image_id(&self, reference: &str) -> Option<String> {
        let output = run(
            Command::new(&self.engine)
                .arg("image")
                .arg("inspect")
                .arg("--format")
                .arg("{{.Id}}")
                .arg(reference),
            &self.engine,
        )
        .await
        .ok()?;

        if !output.success {
            return None;
        }
        parse_image_id(&output.stdout)
    }
}

#[async_trait]
impl ImageBuilder for CliImageBuilder {
    async fn build(
        &self,
        context_dir: &Path,
        reference: &str,
    ) -> Result<ImageArtifact, BuildError> {
        let iid_file = context_dir.join(IID_FILE_NAME);
        let started = Instant::now();

        info!("Building image {} with {}", reference, self.engine);

        let output = run(
            Command::new(&self.engine)
                .arg("build")
                .arg("--tag")
                .arg(reference)
                .arg("--iidfile")
                .arg(&iid_file)
                .arg("--file")
                .arg(context_dir.join(DOCKERFILE_NAME))
                .arg(context_dir),
            &self.engine,
        )
        .await?;

        let build_duration = started.elapsed();
        let combined = format!("{}{}", output.stdout, output.stderr);

        if !output.success {
            let diagnostics = if output.stderr.trim().is_empty() {
                tail_lines(&output.stdout, self.log_lines * 2)
            } else {
                tail_lines(&output.stderr, self.log_lines * 2)
            };
            error!(
                "Build of {} failed with exit_code={}: {}",
                reference, output.exit_code, diagnostics
            );
            return Err(BuildError::Failed {
                exit_code: output.exit_code,
                diagnostics,
            });
        }

        let from_iid_file = tokio::fs::read_to_string(&iid_file)
            .await
            .ok()
            .and_then(|contents| parse_image_id(&contents));

        let image_id = match from_iid_file {
            Some(id) => id,
            None => self
                .inspect_image_id(reference)
                .await
                .ok_or_else(|| BuildError::MissingImageId(reference.to_string()))?,
        };

        info!(
            "Built image {} ({}) in {:?}",
            reference, image_id, build_duration
        );

        Ok(ImageArtifact {
            reference: reference.to_string(),
            image_id,
            build_duration,
            log_excerpt: tail_lines(&combined, self.log_lines),
            built_at: Utc::now(),
        })
    }

    async fn import_to_cluster(
        &self,
        image: &ImageArtifact,
        work_dir: &Path,
    ) -> Result<String, BuildError> {
        let tarball = work_dir.join(IMAGE_TAR_NAME);

        debug!("Exporting image {} to {}", image.reference, tarball.display());

        let saved = run(
            Command::new(&self.engine)
                .arg("save")
                .arg("--output")
                .arg(&tarball)
                .arg(&image.reference),
            &self.engine,
        )
        .await?;

        if !saved.success {
            return Err(BuildError::Export {
                reference: image.reference.clone(),
                diagnostics: tail_lines(&saved.stderr, self.log_lines),
            });
        }

        let imported = run(
            Command::new("ctr")
                .arg("-n")
                .arg(&self.ctr_namespace)
                .arg("images")
                .arg("import")
                .arg(&tarball),
            "ctr",
        )
        .await
        .map_err(|e| BuildError::Import(e.to_string()))?;

        if !imported.success {
            return Err(BuildError::Import(tail_lines(
                &imported.stderr,
                self.log_lines,
            )));
        }

        info!(
            "Imported image {} into containerd namespace {}",
            image.reference, self.ctr_namespace
        );

        Ok(format!(
            "Image {} imported into containerd namespace {}",
            image.reference, self.ctr_namespace
        ))
    }
}

/// Captured result of one engine invocation
struct CommandOutput {
    stdout: String,
    stderr: String,
    exit_code: i32,
    success: bool,
}

/// Runs `command` to completion; the child is killed if the future is dropped
async fn run(command: &mut Command, program: &str) -> Result<CommandOutput, BuildError> {
    let output = command
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|source| BuildError::EngineUnavailable {
            program: program.to_string(),
            source,
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    if !stdout.trim().is_empty() {
        debug!("{} stdout: {}", program, stdout.trim());
    }
    if !stderr.trim().is_empty() {
        debug!("{} stderr: {}", program, stderr.trim());
    }

    Ok(CommandOutput {
        stdout,
        stderr,
        exit_code: output.status.code().unwrap_or(-1),
        success: output.status.success(),
    })
}

/// Extracts an image id from iid file contents or `inspect` output
fn parse_image_id(raw: &str) -> Option<String> {
    let id = raw.lines().map(str::trim).rfind(|line| !line.is_empty())?;
    let digest = id.strip_prefix("sha256:").unwrap_or(id);

    if digest.len() < 12 || !digest.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    Some(format!("sha256:{}", digest))
}

/// Returns the last `count` non-empty lines of `text`
fn tail_lines(text: &str, count: usize) -> String {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(count);
    lines[start..].join("\n")
}
