//! Keel HTTP Client
//!
//! A small, typed client for the Keel build-and-deploy API, used by the CLI.
//!
//! # Example
//!
//! ```no_run
//! use keel_client::KeelClient;
//! use keel_core::domain::outcome::DeploymentOutcome;
//!
//! #[tokio::main]
//! async fn main() -> keel_client::Result<()> {
//!     let client = KeelClient::new("http://localhost:5000");
//!
//!     let dockerfile = std::fs::read("Dockerfile").unwrap_or_default();
//!     let report = client.build_and_deploy(dockerfile, "Dockerfile").await?;
//!
//!     if let DeploymentOutcome::Succeeded { pod_name, .. } = &report.outcome {
//!         println!("Running as {}", pod_name);
//!     }
//!     Ok(())
//! }
//! ```

mod deploy;
pub mod error;

// Re-export commonly used types
pub use error::{ClientError, Result};
pub use keel_core::dto::deploy::DeployResponse;

use reqwest::Client;
use serde::de::DeserializeOwned;

/// HTTP client for the Keel orchestrator API
#[derive(Debug, Clone)]
pub struct KeelClient {
    /// Base URL of the orchestrator (e.g., "http://localhost:5000")
    base_url: String,
    client: Client,
}

impl KeelClient {
    /// Create a new client
    ///
    /// # Example
    /// ```
    /// use keel_client::KeelClient;
    ///
    /// let client = KeelClient::new("http://localhost:5000");
    /// ```
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a client around a configured reqwest Client
    ///
    /// Builds can run for minutes, so keep any request timeout generous.
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check the status code and deserialize a JSON body
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }
}
