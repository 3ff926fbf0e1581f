//! Build-and-Deploy API Handler
//!
//! The upload handler: accepts one Dockerfile per request, validates it,
//! stages it and hands it to the orchestrator.

use axum::{
    Json,
    extract::{
        Multipart, State,
        multipart::{MultipartError, MultipartRejection},
    },
    http::StatusCode,
};
use keel_core::domain::build::BuildRequest;
use keel_core::domain::outcome::{DeploymentOutcome, FailureStage};
use keel_core::dto::deploy::{DOCKERFILE_FIELD, DeployResponse, ImageSummary};
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

use crate::api::AppState;
use crate::api::error::{ApiError, ApiResult};
use crate::service::deploy_service::DeployReport;
use crate::service::staging::StagedBuild;
use crate::service::upload_service::{self, ValidationError};

/// POST /build-and-deploy
/// Build the uploaded Dockerfile and run it as a pod
///
/// The orchestrator runs on a task owned by the server's task tracker. If
/// the client disconnects, the build and deploy already under way still run
/// to completion, and shutdown waits for them.
pub async fn build_and_deploy(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<(StatusCode, Json<DeployResponse>)> {
    let multipart = multipart.map_err(|e| ValidationError::Malformed(e.body_text()))?;

    let dockerfile = read_dockerfile(multipart, state.max_upload_bytes).await?;
    upload_service::validate_dockerfile(&dockerfile, state.max_upload_bytes)?;

    let request = BuildRequest::new(dockerfile);
    let request_id = request.request_id;

    tracing::info!(
        "Accepted build-and-deploy request {} ({} bytes)",
        request_id,
        request.dockerfile.len()
    );

    let staged = StagedBuild::stage(&state.staging_root, request_id, &request.dockerfile)
        .await
        .map_err(|e| ApiError::InternalError(format!("Failed to stage Dockerfile: {}", e)))?;

    let orchestrator = Arc::clone(&state.orchestrator);
    let span = tracing::info_span!("build_and_deploy", request_id = %request_id);

    let task = state.tracker.spawn(
        async move {
            let report = orchestrator.run(&request, &staged).await;
            drop(staged);
            report
        }
        .instrument(span),
    );

    let report = task
        .await
        .map_err(|e| ApiError::InternalError(format!("Deployment task failed: {}", e)))?;

    tracing::info!(
        "Request {} finished: {}",
        request_id,
        report.outcome.summary()
    );

    Ok(respond(request_id, report))
}

/// Reads the single `dockerfile` file field, enforcing the size limit while streaming
///
/// Text parts are ignored, including one named `dockerfile`.
async fn read_dockerfile(
    mut multipart: Multipart,
    max_bytes: usize,
) -> Result<Vec<u8>, ValidationError> {
    let mut dockerfile: Option<Vec<u8>> = None;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max_bytes))?
    {
        if field.name() != Some(DOCKERFILE_FIELD) || field.file_name().is_none() {
            tracing::debug!("Ignoring multipart field {:?}", field.name());
            continue;
        }

        if dockerfile.is_some() {
            return Err(ValidationError::DuplicateField);
        }

        let mut content = Vec::new();
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| multipart_error(e, max_bytes))?
        {
            if content.len() + chunk.len() > max_bytes {
                return Err(ValidationError::TooLarge { limit: max_bytes });
            }
            content.extend_from_slice(&chunk);
        }

        dockerfile = Some(content);
    }

    dockerfile.ok_or(ValidationError::MissingField)
}

fn multipart_error(err: MultipartError, max_bytes: usize) -> ValidationError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ValidationError::TooLarge { limit: max_bytes }
    } else {
        ValidationError::Malformed(err.body_text())
    }
}

/// HTTP status reported for an orchestrator outcome
pub fn status_for(outcome: &DeploymentOutcome) -> StatusCode {
    match outcome {
        DeploymentOutcome::Succeeded { .. } => StatusCode::OK,
        DeploymentOutcome::TimedOut { .. } => StatusCode::ACCEPTED,
        DeploymentOutcome::Failed {
            stage: FailureStage::Build,
            ..
        } => StatusCode::UNPROCESSABLE_ENTITY,
        DeploymentOutcome::Failed { .. } => StatusCode::BAD_GATEWAY,
    }
}

fn respond(request_id: Uuid, report: DeployReport) -> (StatusCode, Json<DeployResponse>) {
    let status = status_for(&report.outcome);

    let message = match &report.import_message {
        Some(imported) => format!("{}. {}", imported, report.outcome.summary()),
        None => report.outcome.summary(),
    };

    let response = DeployResponse {
        request_id,
        image: report.image.as_ref().map(ImageSummary::from),
        action: report.action,
        outcome: report.outcome,
        message,
    };

    (status, Json(response))
}
