//! Deploy command handler
//!
//! Uploads a Dockerfile and prints the deployment report.

use anyhow::{Context, Result};
use colored::*;
use keel_client::{ClientError, DeployResponse, KeelClient};
use keel_core::domain::outcome::DeploymentOutcome;
use std::path::Path;

/// Exit code when the pod was submitted but not ready by the deadline
const EXIT_TIMED_OUT: i32 = 2;

pub async fn handle_deploy(client: &KeelClient, path: &Path) -> Result<i32> {
    let dockerfile = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("Dockerfile");

    println!(
        "{} {} ({} bytes)",
        "Uploading".bold(),
        path.display(),
        dockerfile.len()
    );

    match client.build_and_deploy(dockerfile, filename).await {
        Ok(report) => {
            print_report(&report);
            Ok(exit_code(&report.outcome))
        }
        Err(ClientError::ApiError { status, message }) => {
            println!("{} {} ({})", "Rejected:".red().bold(), message, status);
            Ok(1)
        }
        Err(e) => Err(e.into()),
    }
}

fn exit_code(outcome: &DeploymentOutcome) -> i32 {
    match outcome {
        DeploymentOutcome::Succeeded { .. } => 0,
        DeploymentOutcome::TimedOut { .. } => EXIT_TIMED_OUT,
        DeploymentOutcome::Failed { .. } => 1,
    }
}

fn print_report(report: &DeployResponse) {
    println!("{}: {}", "Request".bold(), report.request_id);

    if let Some(image) = &report.image {
        println!(
            "{}: {} ({}, built in {}ms)",
            "Image".bold(),
            image.reference.cyan(),
            image.image_id,
            image.build_duration_ms
        );
    }

    if let Some(action) = &report.action {
        println!("{}: {:?}", "Pod".bold(), action);
    }

    let status = match &report.outcome {
        DeploymentOutcome::Succeeded { .. } => "SUCCEEDED".green(),
        DeploymentOutcome::TimedOut { .. } => "TIMED OUT".yellow(),
        DeploymentOutcome::Failed { .. } => "FAILED".red(),
    };
    println!("{}: {}", "Outcome".bold(), status.bold());
    println!("{}", report.message);
}
