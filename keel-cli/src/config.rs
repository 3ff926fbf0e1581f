//! Configuration module
//!
//! CLI configuration shared by every command.

use keel_client::KeelClient;

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// URL of the Keel service
    pub url: String,
}

impl Config {
    pub fn client(&self) -> KeelClient {
        KeelClient::new(&self.url)
    }
}
