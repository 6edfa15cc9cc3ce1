//! Domain layer - Pure data models.
//!
//! This module contains the entities the bridging layer passes around.
//! These types have no I/O dependencies and can be tested in isolation.

mod pod;
mod port_pair;
mod transport;

// Re-export all domain types
pub use pod::{PodCandidate, PodPhase, PodTarget};
pub use port_pair::PortPair;
pub use transport::{
    Establishment, PortBinding, TransportPort, TransportResult, TransportSpec, DASHBOARD_TSDB_PORT,
    DASHBOARD_UI_PORT, DEFAULT_API_PORT, DEFAULT_GRPC_PORT, DEFAULT_REST_PORT,
};
