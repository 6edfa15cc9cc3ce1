//! Errors raised by the kubectl adapter.

use thiserror::Error;

/// Result type alias for kubectl operations.
pub type Result<T> = std::result::Result<T, KubectlError>;

/// Errors from invoking kubectl or interpreting its output.
#[derive(Error, Debug)]
pub enum KubectlError {
    /// kubectl binary was not found.
    #[error("kubectl not found; install it or set its path explicitly")]
    KubectlNotFound,

    /// The cluster API could not be reached.
    #[error("cluster not connected: {0}")]
    ClusterNotConnected(String),

    /// The current credentials may not perform the request.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The requested namespace or object does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// kubectl exited with an error not covered above.
    #[error("kubectl failed: {0}")]
    CommandFailed(String),

    /// kubectl output could not be parsed.
    #[error("failed to parse kubectl output: {0}")]
    ParsingFailed(String),

    /// A kubectl child process could not be managed.
    #[error("process error: {0}")]
    ProcessError(String),

    /// kubectl did not answer in time.
    #[error("kubectl command timed out")]
    Timeout,

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl KubectlError {
    /// Classifies kubectl stderr output.
    pub fn from_kubectl_error(stderr: &str) -> Self {
        let message = stderr.trim().to_string();
        let lower = message.to_lowercase();

        if lower.contains("connection refused")
            || lower.contains("no configuration has been provided")
            || lower.contains("dial tcp")
            || lower.contains("unable to connect to the server")
            || lower.contains("i/o timeout")
        {
            Self::ClusterNotConnected(message)
        } else if lower.contains("forbidden") || lower.contains("unauthorized") {
            Self::Forbidden(message)
        } else if lower.contains("notfound") || lower.contains("not found") {
            Self::NotFound(message)
        } else {
            Self::CommandFailed(message)
        }
    }

    pub fn is_cluster_not_connected(&self) -> bool {
        matches!(self, Self::ClusterNotConnected(_))
    }
}
