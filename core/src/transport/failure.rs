//! Reporting of failures that happen after a transport became ready.

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{error, warn};

use crate::domain::PodTarget;

/// A bridged transport died after its establish call had returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransportFailure {
    pub transport: String,
    pub pod: PodTarget,
    pub message: String,
}

impl std::fmt::Display for TransportFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} transport to {} failed: {}",
            self.transport, self.pod, self.message
        )
    }
}

impl std::error::Error for TransportFailure {}

/// Sending half of the process-wide failure path.
///
/// Cloned into every background monitor; the receiving half belongs to the
/// top-level command loop.
#[derive(Debug, Clone)]
pub struct FailureReporter {
    tx: mpsc::UnboundedSender<TransportFailure>,
}

impl FailureReporter {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<TransportFailure>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn report(&self, failure: TransportFailure) {
        error!(
            transport = %failure.transport,
            pod = %failure.pod,
            error = %failure.message,
            "Transport failed after becoming ready"
        );
        if self.tx.send(failure).is_err() {
            warn!("Failure receiver is gone; failure was only logged");
        }
    }
}
