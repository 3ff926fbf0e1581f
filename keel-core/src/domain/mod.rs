//! Core domain types
//!
//! This module contains the structures that flow through a single
//! build-and-deploy request. They are shared between the orchestrator
//! (which produces them) and the client (which reads them back off the wire).

pub mod build;
pub mod outcome;
pub mod workload;
