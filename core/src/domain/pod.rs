//! Pod domain models.

use serde::{Deserialize, Serialize};

// ============================================================================
// PodPhase
// ============================================================================

/// Lifecycle phase of a pod as reported by the cluster API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PodPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    #[default]
    Unknown,
}

impl PodPhase {
    /// Parses a phase string from the API. Anything unrecognised is `Unknown`.
    pub fn parse(phase: &str) -> Self {
        match phase {
            "Pending" => Self::Pending,
            "Running" => Self::Running,
            "Succeeded" => Self::Succeeded,
            "Failed" => Self::Failed,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Running => "Running",
            Self::Succeeded => "Succeeded",
            Self::Failed => "Failed",
            Self::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for PodPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// PodCandidate
// ============================================================================

/// A pod returned by a discovery call.
///
/// Candidates are enumerated fresh on every call and never cached.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PodCandidate {
    pub namespace: String,
    pub name: String,
    pub phase: PodPhase,
}

impl PodCandidate {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>, phase: PodPhase) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            phase,
        }
    }

    /// Only running pods can carry a tunnel.
    pub fn is_running(&self) -> bool {
        self.phase == PodPhase::Running
    }

    pub fn target(&self) -> PodTarget {
        PodTarget {
            namespace: self.namespace.clone(),
            name: self.name.clone(),
        }
    }
}

// ============================================================================
// PodTarget
// ============================================================================

/// The pod a tunnel is opened against.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PodTarget {
    pub namespace: String,
    pub name: String,
}

impl PodTarget {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for PodTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}
