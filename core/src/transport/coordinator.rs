//! Establishing logical transports through the cluster.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::allocator::allocate_free_ports;
use super::failure::FailureReporter;
use super::selector::{PodSelector, DEFAULT_MAX_ORDINALS};
use super::session::{SessionEvent, TunnelSession};
use crate::domain::{Establishment, PortPair, TransportResult, TransportSpec};
use crate::error::{Error, Result};
use crate::ports::ClusterHandle;

/// Default bound on initial tunnel establishment.
pub const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(30);

/// Tunables for establishment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TransportSettings {
    /// How long a tunnel may take to become ready.
    #[serde(with = "duration_secs", rename = "startupTimeoutSecs")]
    pub startup_timeout: Duration,
    /// How many `{workload}-{ordinal}` names are probed.
    pub max_ordinals: usize,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            startup_timeout: DEFAULT_STARTUP_TIMEOUT,
            max_ordinals: DEFAULT_MAX_ORDINALS,
        }
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

/// Turns a `TransportSpec` into usable local endpoints.
///
/// Each `establish` call owns its own pod selection, port allocation and
/// tunnel; only the cluster handle is shared.
pub struct TransportCoordinator<C: ClusterHandle> {
    cluster: Arc<C>,
    selector: PodSelector,
    startup_timeout: Duration,
    reporter: FailureReporter,
}

impl<C: ClusterHandle> TransportCoordinator<C> {
    pub fn new(cluster: Arc<C>, settings: TransportSettings, reporter: FailureReporter) -> Self {
        Self {
            cluster,
            selector: PodSelector::new(settings.max_ordinals),
            startup_timeout: settings.startup_timeout,
            reporter,
        }
    }

    pub fn cluster(&self) -> &Arc<C> {
        &self.cluster
    }

    /// Bridges `spec` and waits for it to come up.
    ///
    /// `cancel` is the enclosing command's lifetime: cancelling it tears the
    /// tunnel down, and a failure after readiness cancels it.
    pub async fn establish(
        &self,
        spec: &TransportSpec,
        cancel: &CancellationToken,
    ) -> Result<Establishment> {
        if spec.direct {
            info!(transport = %spec.name, "Using configured ports without bridging");
            return Ok(Establishment::Ready(TransportResult::direct(spec)));
        }

        info!(transport = %spec.name, target = %spec.id(), "Connecting to kubernetes cluster");
        let target = self
            .selector
            .select_running_pod(self.cluster.as_ref(), &spec.namespace, &spec.workload)
            .await?;

        let remote_ports = spec.remote_ports();
        let local_ports = allocate_free_ports(remote_ports.len())?;
        let pairs = PortPair::zip(&local_ports, &remote_ports)?;

        let mut session = TunnelSession::new(&spec.name, target.clone(), pairs, cancel);
        session.open(self.cluster.as_ref()).await?;

        let event = tokio::select! {
            biased;
            _ = cancel.cancelled() => SessionEvent::Stopped,
            event = session.wait_ready() => event,
            _ = tokio::time::sleep(self.startup_timeout) => {
                warn!(
                    transport = %spec.name,
                    target_pod = %target,
                    timeout = ?self.startup_timeout,
                    "Timed out waiting for tunnel"
                );
                session.stop();
                return Err(Error::TunnelTimeout {
                    target,
                    after: self.startup_timeout,
                });
            }
        };

        match event {
            SessionEvent::Ready => {
                let result = TransportResult::bridged(spec, target, local_ports);
                info!(
                    transport = %spec.name,
                    target_pod = %session.target(),
                    ports = %describe_pairs(session.pairs()),
                    "Connected"
                );
                tokio::spawn(session.monitor(self.reporter.clone(), cancel.clone()));
                Ok(Establishment::Ready(result))
            }
            SessionEvent::Failed(message) => {
                session.stop();
                Err(Error::TunnelEstablish { target, message })
            }
            SessionEvent::Stopped => {
                session.stop();
                Ok(Establishment::Cancelled)
            }
        }
    }
}

fn describe_pairs(pairs: &[PortPair]) -> String {
    pairs
        .iter()
        .map(PortPair::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
