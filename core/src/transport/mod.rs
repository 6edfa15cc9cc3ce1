//! Transport bridging.
//!
//! Locates a Running replica of a workload, allocates free local ports and
//! supervises a port-forward tunnel to it:
//! - `allocator`: free local port allocation
//! - `selector`: uniform random choice among Running replicas
//! - `session`: one tunnel, its readiness and its post-ready monitor
//! - `coordinator`: the establish flow with its startup timeout
//! - `failure`: the path late failures take to the top-level command

mod allocator;
mod coordinator;
mod failure;
mod selector;
mod session;

#[cfg(test)]
pub(crate) mod mock;

pub use allocator::allocate_free_ports;
pub use coordinator::{TransportCoordinator, TransportSettings, DEFAULT_STARTUP_TIMEOUT};
pub use failure::{FailureReporter, TransportFailure};
pub use selector::{PodSelector, DEFAULT_MAX_ORDINALS};
pub use session::{SessionEvent, SessionState, TunnelSession};
