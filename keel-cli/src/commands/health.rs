//! Health command handler

use anyhow::Result;
use colored::*;
use keel_client::KeelClient;

pub async fn handle_health(client: &KeelClient) -> Result<i32> {
    match client.health().await {
        Ok(health) => {
            println!(
                "{} {} (namespace {})",
                "●".green(),
                client.base_url(),
                health.namespace.cyan()
            );
            Ok(0)
        }
        Err(e) => {
            println!("{} {}: {}", "●".red(), client.base_url(), e);
            Ok(1)
        }
    }
}
