//! Cluster port (interface).

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::domain::{PodCandidate, PortPair};
use crate::error::Result;

/// Signals produced by one forwarding relay.
///
/// `ready` fires at most once, when every local port is accepting
/// connections. `errors` carries failure descriptions for the lifetime of
/// the relay; it closes when the relay exits.
#[derive(Debug)]
pub struct ForwardChannels {
    pub ready: oneshot::Receiver<()>,
    pub errors: mpsc::Receiver<String>,
}

/// Port for the cluster API.
///
/// The handle is shared read-only between concurrent establish calls, so
/// implementations must not keep per-call state.
pub trait ClusterHandle: Send + Sync {
    /// List pods of `namespace` matching `query` (a workload name).
    ///
    /// Implementations may return a superset; callers filter further.
    fn list_pods(
        &self,
        namespace: &str,
        query: &str,
    ) -> impl std::future::Future<Output = Result<Vec<PodCandidate>>> + Send;

    /// Start relaying each `local` port to `remote` on the given pod.
    ///
    /// The relay runs until `stop` is cancelled or it fails. An `Err` here
    /// means the relay never started.
    fn forward_ports(
        &self,
        namespace: &str,
        pod: &str,
        ports: &[PortPair],
        stop: CancellationToken,
    ) -> impl std::future::Future<Output = Result<ForwardChannels>> + Send;
}
