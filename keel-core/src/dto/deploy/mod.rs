//! Build-and-deploy DTOs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::build::ImageArtifact;
use crate::domain::outcome::DeploymentOutcome;
use crate::domain::workload::ApplyAction;

/// Multipart field carrying the build file
pub const DOCKERFILE_FIELD: &str = "dockerfile";

/// Response body for `POST /build-and-deploy`
///
/// `image` is present whenever the build succeeded, including when a later
/// stage failed, so callers can tell which stage broke.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployResponse {
    pub request_id: Uuid,
    pub image: Option<ImageSummary>,
    pub action: Option<ApplyAction>,
    #[serde(flatten)]
    pub outcome: DeploymentOutcome,
    pub message: String,
}

/// Image details reported back to the caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageSummary {
    pub reference: String,
    pub image_id: String,
    pub build_duration_ms: u64,
    pub log_excerpt: String,
}

impl From<&ImageArtifact> for ImageSummary {
    fn from(image: &ImageArtifact) -> Self {
        ImageSummary {
            reference: image.reference.clone(),
            image_id: image.image_id.clone(),
            build_duration_ms: image.build_duration.as_millis() as u64,
            log_excerpt: image.log_excerpt.clone(),
        }
    }
}

/// Error body returned for rejected requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
