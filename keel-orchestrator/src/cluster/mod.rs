//! Kubernetes integration.
//!
//! The orchestrator depends on the [`ClusterClient`] trait and never on a
//! specific transport. The default implementation, [`http::KubeClusterClient`],
//! is backed by the [`kube`] crate and talks to the control plane using the
//! kubeconfig resolved at startup. Tests substitute their own client.

mod base;
pub mod http;

pub use base::*;
