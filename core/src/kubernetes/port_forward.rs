//! Supervision of `kubectl port-forward` relays.

use std::collections::HashSet;
use std::io;
use std::process::{ExitStatus, Stdio};
use std::sync::OnceLock;

use regex::Regex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdout};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::discovery::Kubectl;
use super::errors::{KubectlError, Result};
use crate::domain::PortPair;
use crate::ports::ForwardChannels;

/// Only the first fatal error is ever sent; the slack covers exit reporting.
const ERROR_CHANNEL_CAPACITY: usize = 4;

/// Starts `kubectl port-forward` and a task supervising it.
///
/// The task turns kubectl output into the readiness and error signals of the
/// returned channels and kills the child when `stop` is cancelled.
pub(crate) fn spawn_port_forward(
    kubectl: &Kubectl,
    namespace: &str,
    pod: &str,
    ports: &[PortPair],
    stop: CancellationToken,
) -> Result<ForwardChannels> {
    let mut command = kubectl.command()?;
    command
        .arg("port-forward")
        .args(["-n", namespace])
        .arg(format!("pod/{}", pod))
        .args(ports.iter().map(PortPair::spec))
        .arg("--address=127.0.0.1")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command
        .spawn()
        .map_err(|e| KubectlError::ProcessError(format!("Failed to start kubectl: {}", e)))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| KubectlError::ProcessError("kubectl stdout not captured".to_string()))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| KubectlError::ProcessError("kubectl stderr not captured".to_string()))?;

    let (ready_tx, ready_rx) = oneshot::channel();
    let (error_tx, error_rx) = mpsc::channel(ERROR_CHANNEL_CAPACITY);

    let relay = Relay {
        target: format!("{}/{}", namespace, pod),
        child,
        pending: ports.iter().map(|p| p.local).collect(),
        ready: Some(ready_tx),
        errors: error_tx,
        stop,
    };
    tokio::spawn(relay.run(stdout, stderr));

    Ok(ForwardChannels {
        ready: ready_rx,
        errors: error_rx,
    })
}

// ============================================================================
// Relay supervisor
// ============================================================================

struct Relay {
    target: String,
    child: Child,
    /// Local ports not yet reported as listening.
    pending: HashSet<u16>,
    ready: Option<oneshot::Sender<()>>,
    errors: mpsc::Sender<String>,
    stop: CancellationToken,
}

enum RelayEvent {
    Stop,
    Stdout(io::Result<Option<String>>),
    Stderr(io::Result<Option<String>>),
    Exited(io::Result<ExitStatus>),
}

impl Relay {
    async fn run(mut self, stdout: ChildStdout, stderr: ChildStderr) {
        let mut stdout = BufReader::new(stdout).lines();
        let mut stderr = BufReader::new(stderr).lines();
        let mut stdout_open = true;
        let mut stderr_open = true;

        loop {
            // Output is drained before the exit status so the final error line wins.
            let event = tokio::select! {
                biased;
                _ = self.stop.cancelled() => RelayEvent::Stop,
                line = stdout.next_line(), if stdout_open => RelayEvent::Stdout(line),
                line = stderr.next_line(), if stderr_open => RelayEvent::Stderr(line),
                status = self.child.wait() => RelayEvent::Exited(status),
            };

            match event {
                RelayEvent::Stop => {
                    debug!(target_pod = %self.target, "Stopping port-forward");
                    self.kill().await;
                    return;
                }
                RelayEvent::Stdout(Ok(Some(line))) | RelayEvent::Stderr(Ok(Some(line))) => {
                    if let Some(message) = self.handle_line(&line) {
                        self.fail(message).await;
                        self.kill().await;
                        return;
                    }
                }
                RelayEvent::Stdout(_) => stdout_open = false,
                RelayEvent::Stderr(_) => stderr_open = false,
                RelayEvent::Exited(status) => {
                    let message = match status {
                        Ok(status) => format!("kubectl port-forward exited with {}", status),
                        Err(e) => format!("kubectl port-forward could not be awaited: {}", e),
                    };
                    self.fail(message).await;
                    return;
                }
            }
        }
    }

    /// Applies one output line. Returns a message when the line is fatal.
    fn handle_line(&mut self, line: &str) -> Option<String> {
        match classify_line(line) {
            ForwardLine::Forwarding { local, remote } => {
                debug!(target_pod = %self.target, local, remote, "Port forwarding");
                self.pending.remove(&local);
                if self.pending.is_empty() {
                    if let Some(ready) = self.ready.take() {
                        info!(target_pod = %self.target, "Port-forward ready");
                        let _ = ready.send(());
                    }
                }
                None
            }
            ForwardLine::Fatal(message) => Some(message),
            ForwardLine::Warning(message) => {
                warn!(target_pod = %self.target, "{}", message);
                None
            }
            ForwardLine::Other => {
                debug!(target_pod = %self.target, "{}", line);
                None
            }
        }
    }

    async fn fail(&mut self, message: String) {
        warn!(target_pod = %self.target, error = %message, "Port-forward failed");
        // The receiver may already be gone if the session stopped.
        let _ = self.errors.send(message).await;
    }

    async fn kill(&mut self) {
        if let Err(e) = self.child.kill().await {
            debug!(target_pod = %self.target, error = %e, "kubectl already exited");
        }
    }
}

// ============================================================================
// Output Parsing
// ============================================================================

/// Meaning of one line printed by `kubectl port-forward`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForwardLine {
    /// A local port is listening and relays to `remote`.
    Forwarding { local: u16, remote: u16 },
    /// The relay cannot continue.
    Fatal(String),
    /// A single relayed connection failed; the relay keeps running.
    Warning(String),
    Other,
}

fn forwarding_regex() -> &'static Regex {
    static FORWARDING: OnceLock<Regex> = OnceLock::new();
    FORWARDING.get_or_init(|| {
        Regex::new(r"Forwarding from (?:\[[^\]]*\]|[^\s\[\]]+):(\d+) -> (\d+)")
            .expect("forwarding pattern is valid")
    })
}

/// Classifies a kubectl port-forward output line.
pub fn classify_line(line: &str) -> ForwardLine {
    if let Some(caps) = forwarding_regex().captures(line) {
        if let (Ok(local), Ok(remote)) = (caps[1].parse::<u16>(), caps[2].parse::<u16>()) {
            return ForwardLine::Forwarding { local, remote };
        }
    }

    if let Some(port) = detect_port_conflict(line) {
        return ForwardLine::Fatal(format!("local port {} is already in use", port));
    }

    let line_lower = line.trim().to_lowercase();
    if line_lower.starts_with("error:")
        || line_lower.contains("unable to listen")
        || line_lower.contains("lost connection to pod")
        || line_lower.contains("error upgrading connection")
    {
        return ForwardLine::Fatal(line.trim().to_string());
    }

    if line_lower.starts_with("handling connection for") {
        return ForwardLine::Other;
    }

    if is_error_line(line) {
        return ForwardLine::Warning(line.trim().to_string());
    }

    ForwardLine::Other
}

/// Checks if a line indicates an error.
pub fn is_error_line(line: &str) -> bool {
    let line_lower = line.to_lowercase();
    line_lower.contains("error")
        || line_lower.contains("failed")
        || line_lower.contains("unable to")
        || line_lower.contains("connection refused")
        || line_lower.contains("lost connection")
        || line_lower.contains("an error occurred")
}

/// Detects port conflict from output line.
/// Returns the conflicting port if detected.
pub fn detect_port_conflict(line: &str) -> Option<u16> {
    // kubectl format: "listen tcp4 127.0.0.1:8080: bind: address already in use"
    if !line.to_lowercase().contains("address already in use") {
        return None;
    }

    // Look for patterns like ":8080" followed by non-digit
    for (i, part) in line.split(':').enumerate() {
        if i == 0 {
            continue;
        }

        let digits: String = part.chars().take_while(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() {
            continue;
        }

        if let Ok(port) = digits.parse::<u16>() {
            // Skip IP octets
            if port > 255 {
                return Some(port);
            }
        }
    }

    None
}
