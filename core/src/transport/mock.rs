//! Scripted cluster handle for tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::domain::{PodCandidate, PodPhase, PortPair};
use crate::error::{Error, Result};
use crate::kubernetes::KubectlError;
use crate::ports::{ClusterHandle, ForwardChannels};

/// What the mock relay does once asked to forward.
#[derive(Debug, Clone)]
pub(crate) enum ForwardBehavior {
    /// Signals readiness immediately and stays up.
    Ready,
    /// Reports an error before readiness.
    Fail(String),
    /// Closes both channels without a word.
    Exit,
    /// Stays silent forever.
    Never,
    /// `forward_ports` itself returns an error.
    Reject(String),
}

pub(crate) struct MockCluster {
    pods: Vec<PodCandidate>,
    behavior: ForwardBehavior,
    list_calls: AtomicUsize,
    forward_calls: AtomicUsize,
    last_ports: Mutex<Vec<PortPair>>,
    ready_tx: Mutex<Option<oneshot::Sender<()>>>,
    error_tx: Mutex<Option<mpsc::Sender<String>>>,
    stop: Mutex<Option<CancellationToken>>,
}

impl MockCluster {
    pub(crate) fn new(pods: Vec<PodCandidate>, behavior: ForwardBehavior) -> Self {
        Self {
            pods,
            behavior,
            list_calls: AtomicUsize::new(0),
            forward_calls: AtomicUsize::new(0),
            last_ports: Mutex::new(Vec::new()),
            ready_tx: Mutex::new(None),
            error_tx: Mutex::new(None),
            stop: Mutex::new(None),
        }
    }

    pub(crate) fn with_pods(pods: Vec<PodCandidate>) -> Self {
        Self::new(pods, ForwardBehavior::Ready)
    }

    /// One running replica, `broker-2` in `default`.
    pub(crate) fn with_behavior(behavior: ForwardBehavior) -> Self {
        Self::new(
            vec![PodCandidate::new("default", "broker-2", PodPhase::Running)],
            behavior,
        )
    }

    pub(crate) fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn forward_calls(&self) -> usize {
        self.forward_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn last_ports(&self) -> Vec<PortPair> {
        self.last_ports.lock().clone()
    }

    /// Whether the stop token handed to the relay has fired.
    pub(crate) fn relay_stopped(&self) -> bool {
        self.stop
            .lock()
            .as_ref()
            .map(|t| t.is_cancelled())
            .unwrap_or(false)
    }

    /// Pushes a failure onto the live relay's error channel.
    pub(crate) async fn push_error(&self, message: &str) {
        let tx = self.error_tx.lock().clone();
        if let Some(tx) = tx {
            tx.send(message.to_string()).await.unwrap();
        }
    }
}

impl ClusterHandle for MockCluster {
    async fn list_pods(&self, namespace: &str, query: &str) -> Result<Vec<PodCandidate>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .pods
            .iter()
            .filter(|p| p.namespace == namespace && p.name.starts_with(query))
            .cloned()
            .collect())
    }

    async fn forward_ports(
        &self,
        _namespace: &str,
        _pod: &str,
        ports: &[PortPair],
        stop: CancellationToken,
    ) -> Result<ForwardChannels> {
        self.forward_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_ports.lock() = ports.to_vec();
        *self.stop.lock() = Some(stop);

        let (ready_tx, ready_rx) = oneshot::channel();
        let (error_tx, error_rx) = mpsc::channel(4);

        match &self.behavior {
            ForwardBehavior::Ready => {
                let _ = ready_tx.send(());
                *self.error_tx.lock() = Some(error_tx);
            }
            ForwardBehavior::Fail(message) => {
                let _ = error_tx.try_send(message.clone());
                *self.ready_tx.lock() = Some(ready_tx);
                *self.error_tx.lock() = Some(error_tx);
            }
            ForwardBehavior::Exit => {}
            ForwardBehavior::Never => {
                *self.ready_tx.lock() = Some(ready_tx);
                *self.error_tx.lock() = Some(error_tx);
            }
            ForwardBehavior::Reject(message) => {
                return Err(Error::Kubernetes(KubectlError::ProcessError(
                    message.clone(),
                )));
            }
        }

        Ok(ForwardChannels {
            ready: ready_rx,
            errors: error_rx,
        })
    }
}
