//! One port-forward tunnel and its lifecycle.
//!
//! A session moves Idle -> Connecting -> {Ready | Failed} -> Stopped. Exactly
//! one Ready-or-Failed transition happens per session, and `stop` reaches
//! Stopped from any state.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use super::failure::{FailureReporter, TransportFailure};
use crate::domain::{PodTarget, PortPair};
use crate::error::{Error, Result};
use crate::ports::{ClusterHandle, ForwardChannels};

/// Lifecycle state of a tunnel session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Connecting,
    Ready,
    Failed(String),
    Stopped,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Ready => "ready",
            Self::Failed(_) => "failed",
            Self::Stopped => "stopped",
        }
    }

    /// Ready or Failed has already happened.
    fn is_settled(&self) -> bool {
        matches!(self, Self::Ready | Self::Failed(_) | Self::Stopped)
    }
}

/// Outcome of waiting for a session to come up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Ready,
    Failed(String),
    Stopped,
}

/// A tunnel to one pod, exclusively owned by the establish call that made it.
pub struct TunnelSession {
    id: Uuid,
    transport: String,
    target: PodTarget,
    pairs: Vec<PortPair>,
    stop: CancellationToken,
    state: SessionState,
    channels: Option<ForwardChannels>,
}

impl TunnelSession {
    /// Creates an idle session. Cancelling `parent` stops it.
    pub fn new(
        transport: impl Into<String>,
        target: PodTarget,
        pairs: Vec<PortPair>,
        parent: &CancellationToken,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            transport: transport.into(),
            target,
            pairs,
            stop: parent.child_token(),
            state: SessionState::Idle,
            channels: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn target(&self) -> &PodTarget {
        &self.target
    }

    pub fn pairs(&self) -> &[PortPair] {
        &self.pairs
    }

    pub fn state(&self) -> SessionState {
        self.state.clone()
    }

    /// Asks the cluster to start relaying.
    pub async fn open<C: ClusterHandle>(&mut self, cluster: &C) -> Result<()> {
        if self.state != SessionState::Idle {
            return Err(self.establish_error("session was already opened"));
        }
        self.state = SessionState::Connecting;
        debug!(
            session = %self.id,
            target_pod = %self.target,
            pairs = ?self.pairs,
            "Opening tunnel"
        );

        let forwarded = cluster
            .forward_ports(
                &self.target.namespace,
                &self.target.name,
                &self.pairs,
                self.stop.clone(),
            )
            .await;

        match forwarded {
            Ok(channels) => {
                self.channels = Some(channels);
                Ok(())
            }
            Err(e) => {
                let message = e.to_string();
                self.settle(&SessionEvent::Failed(message.clone()));
                Err(self.establish_error(message))
            }
        }
    }

    /// Waits for the relay to report readiness, a failure, or a stop.
    pub async fn wait_ready(&mut self) -> SessionEvent {
        match self.state() {
            SessionState::Ready => return SessionEvent::Ready,
            SessionState::Failed(message) => return SessionEvent::Failed(message),
            SessionState::Stopped => return SessionEvent::Stopped,
            SessionState::Idle | SessionState::Connecting => {}
        }

        let event = match self.channels.as_mut() {
            None => SessionEvent::Failed("session was not opened".to_string()),
            Some(channels) => {
                tokio::select! {
                    biased;
                    _ = self.stop.cancelled() => SessionEvent::Stopped,
                    ready = &mut channels.ready => match ready {
                        Ok(()) => SessionEvent::Ready,
                        // Relay ended without signaling; prefer its own explanation.
                        Err(_) => SessionEvent::Failed(
                            channels
                                .errors
                                .try_recv()
                                .unwrap_or_else(|_| "port-forward exited before becoming ready".to_string()),
                        ),
                    },
                    message = channels.errors.recv() => SessionEvent::Failed(
                        message.unwrap_or_else(|| "port-forward closed before becoming ready".to_string()),
                    ),
                }
            }
        };

        self.settle(&event);
        event
    }

    /// Releases the tunnel. Idempotent; never blocks.
    pub fn stop(&mut self) {
        self.stop.cancel();
        if self.state != SessionState::Stopped {
            debug!(session = %self.id, from = self.state.as_str(), "Tunnel stopped");
            self.state = SessionState::Stopped;
        }
    }

    /// Watches a ready session until it fails or is stopped.
    ///
    /// A failure is reported through `reporter` and cancels `abort` so the
    /// operation relying on the tunnel is torn down. Returns the failure, if any.
    pub async fn monitor(
        mut self,
        reporter: FailureReporter,
        abort: CancellationToken,
    ) -> Option<TransportFailure> {
        let Some(mut channels) = self.channels.take() else {
            self.stop();
            return None;
        };

        let failure = tokio::select! {
            biased;
            _ = self.stop.cancelled() => None,
            message = channels.errors.recv() => Some(
                message.unwrap_or_else(|| "tunnel closed unexpectedly".to_string()),
            ),
        };

        match failure {
            None => {
                info!(session = %self.id, target_pod = %self.target, "Tunnel closed");
                self.stop();
                None
            }
            Some(message) => {
                self.state = SessionState::Failed(message.clone());
                let failure = TransportFailure {
                    transport: self.transport.clone(),
                    pod: self.target.clone(),
                    message,
                };
                reporter.report(failure.clone());
                abort.cancel();
                self.stop();
                Some(failure)
            }
        }
    }

    fn settle(&mut self, event: &SessionEvent) {
        if self.state.is_settled() {
            return;
        }
        self.state = match event {
            SessionEvent::Ready => SessionState::Ready,
            SessionEvent::Failed(message) => SessionState::Failed(message.clone()),
            SessionEvent::Stopped => SessionState::Stopped,
        };
    }

    fn establish_error(&self, message: impl Into<String>) -> Error {
        Error::TunnelEstablish {
            target: self.target.clone(),
            message: message.into(),
        }
    }
}

impl Drop for TunnelSession {
    fn drop(&mut self) {
        // No relay outlives its session.
        self.stop.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::transport::mock::{ForwardBehavior, MockCluster};

    fn session(parent: &CancellationToken) -> TunnelSession {
        TunnelSession::new(
            "broker",
            PodTarget::new("default", "broker-0"),
            vec![PortPair::new(41000, 50000).unwrap()],
            parent,
        )
    }

    #[tokio::test]
    async fn test_ready_transition() {
        let cluster = MockCluster::with_behavior(ForwardBehavior::Ready);
        let parent = CancellationToken::new();
        let mut session = session(&parent);
        assert_eq!(session.state(), SessionState::Idle);

        session.open(&cluster).await.unwrap();
        assert_eq!(session.state(), SessionState::Connecting);
        assert_eq!(session.wait_ready().await, SessionEvent::Ready);
        assert_eq!(session.state(), SessionState::Ready);

        // Ready is never re-signaled; asking again reports the settled state.
        assert_eq!(session.wait_ready().await, SessionEvent::Ready);
        assert_eq!(cluster.forward_calls(), 1);
    }

    #[tokio::test]
    async fn test_failed_transition() {
        let cluster = MockCluster::with_behavior(ForwardBehavior::Fail("pod is not running".into()));
        let parent = CancellationToken::new();
        let mut session = session(&parent);

        session.open(&cluster).await.unwrap();
        assert_eq!(
            session.wait_ready().await,
            SessionEvent::Failed("pod is not running".to_string())
        );
        assert!(matches!(session.state(), SessionState::Failed(_)));
    }

    #[tokio::test]
    async fn test_relay_exit_without_signal_is_failure() {
        let cluster = MockCluster::with_behavior(ForwardBehavior::Exit);
        let parent = CancellationToken::new();
        let mut session = session(&parent);

        session.open(&cluster).await.unwrap();
        assert!(matches!(session.wait_ready().await, SessionEvent::Failed(_)));
    }

    #[tokio::test]
    async fn test_open_rejected() {
        let cluster = MockCluster::with_behavior(ForwardBehavior::Reject("kubectl missing".into()));
        let parent = CancellationToken::new();
        let mut session = session(&parent);

        let result = session.open(&cluster).await;
        assert!(matches!(result, Err(Error::TunnelEstablish { .. })));
        assert!(matches!(session.state(), SessionState::Failed(_)));

        // A second open is refused.
        assert!(session.open(&cluster).await.is_err());
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let cluster = MockCluster::with_behavior(ForwardBehavior::Fail("rejected".into()));
        let parent = CancellationToken::new();
        let mut session = session(&parent);
        session.open(&cluster).await.unwrap();
        session.wait_ready().await;

        // Stop on a Failed session, then again on a Stopped one.
        session.stop();
        assert_eq!(session.state(), SessionState::Stopped);
        session.stop();
        assert_eq!(session.state(), SessionState::Stopped);
        assert_eq!(session.wait_ready().await, SessionEvent::Stopped);

        // Parent is unaffected by stopping the child.
        assert!(!parent.is_cancelled());
    }

    #[tokio::test]
    async fn test_parent_cancellation_stops_session() {
        let cluster = MockCluster::with_behavior(ForwardBehavior::Never);
        let parent = CancellationToken::new();
        let mut session = session(&parent);
        session.open(&cluster).await.unwrap();

        parent.cancel();
        assert_eq!(session.wait_ready().await, SessionEvent::Stopped);
        assert_eq!(session.state(), SessionState::Stopped);
        assert!(cluster.relay_stopped());
    }

    #[tokio::test]
    async fn test_monitor_reports_late_failure() {
        let cluster = MockCluster::with_behavior(ForwardBehavior::Ready);
        let parent = CancellationToken::new();
        let mut session = session(&parent);
        session.open(&cluster).await.unwrap();
        assert_eq!(session.wait_ready().await, SessionEvent::Ready);

        let (reporter, mut failures) = FailureReporter::channel();
        let abort = CancellationToken::new();
        let monitor = tokio::spawn(session.monitor(reporter, abort.clone()));

        cluster.push_error("lost connection to pod").await;

        let failure = tokio::time::timeout(Duration::from_secs(1), failures.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(failure.message, "lost connection to pod");
        assert_eq!(failure.transport, "broker");
        assert!(abort.is_cancelled());
        assert_eq!(monitor.await.unwrap(), Some(failure));
        assert!(cluster.relay_stopped());
    }

    #[tokio::test]
    async fn test_monitor_clean_shutdown() {
        let cluster = MockCluster::with_behavior(ForwardBehavior::Ready);
        let parent = CancellationToken::new();
        let mut session = session(&parent);
        session.open(&cluster).await.unwrap();
        session.wait_ready().await;

        let (reporter, mut failures) = FailureReporter::channel();
        let abort = CancellationToken::new();
        let monitor = tokio::spawn(session.monitor(reporter, abort.clone()));

        parent.cancel();
        assert_eq!(monitor.await.unwrap(), None);
        assert!(!abort.is_cancelled());
        assert!(failures.try_recv().is_err());
    }
}
