//! Keel CLI
//!
//! Command-line interface for the Keel build-and-deploy service.

mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;

#[derive(Parser)]
#[command(name = "keel")]
#[command(about = "Build a Dockerfile and run it on k3s", long_about = None)]
struct Cli {
    /// Keel service URL
    #[arg(long, env = "KEEL_URL", default_value = "http://localhost:5000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config { url: cli.url };

    let code = handle_command(cli.command, &config).await?;
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
