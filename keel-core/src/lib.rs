//! Keel Core
//!
//! Core types for the Keel build-and-deploy service.
//!
//! This crate contains:
//! - Domain types: Core entities (BuildRequest, ImageArtifact, WorkloadSpec, DeploymentOutcome)
//! - DTOs: Data transfer objects for the HTTP API

pub mod domain;
pub mod dto;
