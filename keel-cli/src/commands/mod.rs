//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod deploy;
mod health;

use anyhow::Result;
use clap::Subcommand;
use std::path::PathBuf;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Upload a Dockerfile, build it and run it as a pod
    Deploy {
        /// Path to the Dockerfile
        #[arg(default_value = "Dockerfile")]
        path: PathBuf,
    },
    /// Check that the service is up
    Health,
}

/// Handle a CLI command
///
/// Returns the process exit code.
pub async fn handle_command(command: Commands, config: &Config) -> Result<i32> {
    let client = config.client();

    match command {
        Commands::Deploy { path } => deploy::handle_deploy(&client, &path).await,
        Commands::Health => health::handle_health(&client).await,
    }
}
