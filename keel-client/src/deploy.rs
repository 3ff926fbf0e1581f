//! Build-and-deploy endpoints

use keel_core::dto::deploy::{DOCKERFILE_FIELD, DeployResponse};
use keel_core::dto::health::HealthResponse;
use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};

use crate::KeelClient;
use crate::error::{ClientError, Result};

/// Statuses whose body is a [`DeployResponse`]
///
/// 202 means the pod was submitted but not ready by the deadline; 422 and 502
/// carry a failed outcome naming the stage that broke.
const REPORT_STATUSES: [StatusCode; 4] = [
    StatusCode::OK,
    StatusCode::ACCEPTED,
    StatusCode::UNPROCESSABLE_ENTITY,
    StatusCode::BAD_GATEWAY,
];

impl KeelClient {
    /// Upload a Dockerfile, build it and run it on the cluster
    ///
    /// Blocks until the orchestrator reports an outcome, which takes at
    /// least as long as the image build.
    ///
    /// # Arguments
    /// * `dockerfile` - Raw build file content
    /// * `filename` - File name sent with the multipart part
    ///
    /// # Example
    /// ```no_run
    /// # use keel_client::KeelClient;
    /// # async fn example() -> keel_client::Result<()> {
    /// let client = KeelClient::new("http://localhost:5000");
    /// let report = client
    ///     .build_and_deploy(b"FROM alpine\nCMD [\"sleep\", \"3600\"]\n".to_vec(), "Dockerfile")
    ///     .await?;
    /// println!("{}", report.message);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn build_and_deploy(
        &self,
        dockerfile: Vec<u8>,
        filename: &str,
    ) -> Result<DeployResponse> {
        if dockerfile.is_empty() {
            return Err(ClientError::InvalidRequest(
                "Dockerfile is empty".to_string(),
            ));
        }

        let url = format!("{}/build-and-deploy", self.base_url);
        let part = Part::bytes(dockerfile).file_name(filename.to_string());
        let form = Form::new().part(DOCKERFILE_FIELD, part);

        tracing::debug!("Uploading {} to {}", filename, url);
        let response = self.client.post(&url).multipart(form).send().await?;

        let status = response.status();
        if !REPORT_STATUSES.contains(&status) {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), body));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse deploy report: {}", e)))
    }

    /// Check that the orchestrator is up
    pub async fn health(&self) -> Result<HealthResponse> {
        let url = format!("{}/health", self.base_url);
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }
}
