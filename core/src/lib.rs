//! brokerctl Core Library
//!
//! Bridges a message broker running inside a Kubernetes cluster to the local
//! machine. Provides functionality to:
//! - Pick a Running replica of a stateful workload
//! - Allocate free local ports and open a port-forward tunnel to that replica
//! - Bound tunnel startup and report failures that happen after readiness
//! - Manage user configuration (cluster selection, broker ports, tunables)
//!
//! # Architecture
//! This library follows hexagonal architecture (ports & adapters):
//! - `domain`: Pure data models (pods, port pairs, transports)
//! - `ports`: Trait definitions (the cluster seam)
//! - `kubernetes`: kubectl-backed implementation of the cluster seam
//! - `transport`: Establishment of transports on top of the cluster seam

pub mod config;
pub mod domain;
pub mod error;
pub mod kubernetes;
pub mod ports;
pub mod transport;

// Re-export domain types (primary API)
pub use domain::{
    Establishment, PodCandidate, PodPhase, PodTarget, PortPair, TransportPort, TransportResult,
    TransportSpec,
};

// Re-export other commonly used types
pub use config::{BrokerEndpoints, Config, ConfigStore, ConnectionType};
pub use error::{Error, Result};
pub use kubernetes::KubectlCluster;
pub use ports::{ClusterHandle, ForwardChannels};
pub use transport::{
    FailureReporter, TransportCoordinator, TransportFailure, TransportSettings, TunnelSession,
};
