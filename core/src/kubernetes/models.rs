//! kubectl JSON response models.

use serde::Deserialize;

use crate::domain::{PodCandidate, PodPhase};

// ============================================================================
// kubectl JSON Response Parsing
// ============================================================================

/// Response structure for `kubectl get pods -o json`.
#[derive(Debug, Deserialize)]
pub struct PodListResponse {
    #[serde(default)]
    pub items: Vec<PodItem>,
}

#[derive(Debug, Deserialize)]
pub struct PodItem {
    pub metadata: PodMetadata,
    #[serde(default)]
    pub status: Option<PodStatus>,
}

#[derive(Debug, Deserialize)]
pub struct PodMetadata {
    pub name: String,
    #[serde(default)]
    pub namespace: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PodStatus {
    #[serde(default)]
    pub phase: Option<String>,
}

impl PodListResponse {
    /// Converts the kubectl response to pod candidates.
    ///
    /// Items without a namespace inherit `namespace`; items without a phase
    /// are `Unknown`.
    pub fn into_candidates(self, namespace: &str) -> Vec<PodCandidate> {
        self.items
            .into_iter()
            .map(|item| {
                let phase = item
                    .status
                    .and_then(|s| s.phase)
                    .map(|p| PodPhase::parse(&p))
                    .unwrap_or_default();
                PodCandidate {
                    namespace: item
                        .metadata
                        .namespace
                        .unwrap_or_else(|| namespace.to_string()),
                    name: item.metadata.name,
                    phase,
                }
            })
            .collect()
    }
}
