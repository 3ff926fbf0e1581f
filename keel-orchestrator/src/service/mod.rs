//! Service Module
//!
//! Business logic layer for the orchestrator.
//! Services sit between the HTTP handlers and the build engine and cluster clients.

pub mod deploy;
pub mod readiness;
pub mod staging;
pub mod upload;

// Re-export for convenience
pub use deploy as deploy_service;
pub use upload as upload_service;
