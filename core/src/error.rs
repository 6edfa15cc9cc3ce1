//! Error types for the brokerctl-core library.

use std::time::Duration;

use thiserror::Error;

use crate::domain::PodTarget;
use crate::kubernetes::errors::KubectlError;

/// Result type alias for bridging operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while bridging to the cluster.
#[derive(Error, Debug)]
pub enum Error {
    /// No Running pod matched the workload.
    #[error("no running pods available in {namespace}/{workload}")]
    NoRunningPod { namespace: String, workload: String },

    /// Binding a local socket failed while picking free ports.
    #[error("failed to allocate local ports: {0}")]
    PortAllocation(#[source] std::io::Error),

    /// The tunnel was rejected or failed before becoming ready.
    #[error("failed to establish transport to {target}: {message}")]
    TunnelEstablish { target: PodTarget, message: String },

    /// The tunnel produced no outcome within the startup bound.
    #[error("timeout after {after:?} while establishing transport to {target}")]
    TunnelTimeout { target: PodTarget, after: Duration },

    /// A port number outside 1..=65535 or a malformed port set.
    #[error("invalid port: {0}")]
    InvalidPort(String),

    /// Kubernetes/kubectl error.
    #[error("Kubernetes error: {0}")]
    Kubernetes(#[from] KubectlError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// True for the "too slow" outcome, as opposed to an explicit rejection.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::TunnelTimeout { .. })
    }
}
