//! Build domain types

use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// One inbound build-and-deploy request
///
/// Lives for the duration of a single HTTP request and is never persisted.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub request_id: Uuid,
    pub dockerfile: Vec<u8>,
    /// Declared image reference. A content-derived reference is generated when absent.
    pub image: Option<String>,
}

impl BuildRequest {
    /// Creates a request with a fresh correlation id and no declared image
    pub fn new(dockerfile: Vec<u8>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            dockerfile,
            image: None,
        }
    }

    /// Sets the declared image reference
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }
}

/// Result of a successful image build
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageArtifact {
    /// Image reference in `name:tag` form
    pub reference: String,
    /// Content id reported by the build engine (`sha256:...`)
    pub image_id: String,
    #[serde(with = "duration_millis")]
    pub build_duration: Duration,
    /// Tail of the build output
    pub log_excerpt: String,
    pub built_at: chrono::DateTime<chrono::Utc>,
}

impl ImageArtifact {
    /// Returns the image id without its digest algorithm prefix
    pub fn short_id(&self) -> &str {
        let digest = self
            .image_id
            .split_once(':')
            .map(|(_, digest)| digest)
            .unwrap_or(&self.image_id);
        digest.get(..12).unwrap_or(digest)
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
