//! Data Transfer Objects for the HTTP API
//!
//! DTOs are the JSON shapes exchanged between the orchestrator and its
//! clients.

pub mod deploy;
pub mod health;
