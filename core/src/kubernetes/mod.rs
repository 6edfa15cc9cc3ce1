//! Kubernetes adapter for pod discovery and port forwarding.
//!
//! This module provides:
//! - kubectl location and pod listing
//! - Supervision of `kubectl port-forward` relays
//! - `KubectlCluster`, the production `ClusterHandle`

pub mod cluster;
pub mod discovery;
pub mod errors;
pub mod models;
pub mod port_forward;

// Re-export commonly used types
pub use cluster::KubectlCluster;
pub use discovery::Kubectl;
pub use errors::{KubectlError, Result};
pub use port_forward::{classify_line, ForwardLine};
