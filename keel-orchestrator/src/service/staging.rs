//! Staging Service
//!
//! Per-request working directories for uploaded build files.
//!
//! Each request gets its own directory under the staging root so concurrent
//! builds never share files. The directory is removed when the
//! [`StagedBuild`] is dropped, on every exit path. Directories left behind by
//! a killed process are swept at startup with [`sweep_stale`].

use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::engine::DOCKERFILE_NAME;

const STAGING_PREFIX: &str = "keel-";

/// A build file written to its own temporary directory
#[derive(Debug)]
pub struct StagedBuild {
    request_id: Uuid,
    dir: TempDir,
}

impl StagedBuild {
    /// Writes `dockerfile` into a fresh directory under `root`
    pub async fn stage(root: &Path, request_id: Uuid, dockerfile: &[u8]) -> io::Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(&format!("{}{}-", STAGING_PREFIX, request_id))
            .tempdir_in(root)?;

        tokio::fs::write(dir.path().join(DOCKERFILE_NAME), dockerfile).await?;

        debug!(
            "Staged build file for request {} at {}",
            request_id,
            dir.path().display()
        );

        Ok(Self { request_id, dir })
    }

    /// Directory used as the build context
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn dockerfile_path(&self) -> PathBuf {
        self.dir.path().join(DOCKERFILE_NAME)
    }
}

impl Drop for StagedBuild {
    fn drop(&mut self) {
        debug!(
            "Removing staging directory for request {}: {}",
            self.request_id,
            self.dir.path().display()
        );
    }
}

/// Removes staging directories left behind by a previous process
///
/// Only directories whose names carry a request id are touched. Must run
/// before the server accepts requests.
///
/// # Returns
/// Number of directories removed
pub fn sweep_stale(root: &Path) -> io::Result<usize> {
    let mut removed = 0;

    for entry in std::fs::read_dir(root)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };

        if !is_staging_dir_name(name) || !entry.file_type()?.is_dir() {
            continue;
        }

        match std::fs::remove_dir_all(entry.path()) {
            Ok(()) => removed += 1,
            Err(e) => warn!("Failed to remove stale staging directory {}: {}", name, e),
        }
    }

    if removed > 0 {
        info!("Removed {} stale staging director(ies)", removed);
    }

    Ok(removed)
}

fn is_staging_dir_name(name: &str) -> bool {
    name.strip_prefix(STAGING_PREFIX)
        .and_then(|rest| rest.get(..36))
        .is_some_and(|id| Uuid::parse_str(id).is_ok())
}
