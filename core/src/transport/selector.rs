//! Running pod selection.

use std::collections::HashSet;

use rand::Rng;
use tracing::debug;

use crate::domain::{PodCandidate, PodTarget};
use crate::error::{Error, Result};
use crate::ports::ClusterHandle;

/// Default number of ordinals probed per workload.
pub const DEFAULT_MAX_ORDINALS: usize = 16;

/// Picks one Running replica of a workload, uniformly at random.
///
/// Replicas are recognised by the stateful naming scheme `{workload}-{ordinal}`
/// for ordinals below `max_ordinals`. There is no affinity between calls.
#[derive(Debug, Clone, Copy)]
pub struct PodSelector {
    max_ordinals: usize,
}

impl PodSelector {
    pub fn new(max_ordinals: usize) -> Self {
        Self { max_ordinals }
    }

    pub fn max_ordinals(&self) -> usize {
        self.max_ordinals
    }

    /// The pod names a replica of `workload` can have.
    pub fn candidate_names(&self, workload: &str) -> HashSet<String> {
        (0..self.max_ordinals)
            .map(|i| format!("{}-{}", workload, i))
            .collect()
    }

    /// Lists pods through `cluster` and picks a Running replica.
    pub async fn select_running_pod<C: ClusterHandle>(
        &self,
        cluster: &C,
        namespace: &str,
        workload: &str,
    ) -> Result<PodTarget> {
        let pods = cluster.list_pods(namespace, workload).await?;
        self.choose(&pods, namespace, workload)
    }

    /// Picks a Running replica from an already listed pod set.
    pub fn choose(
        &self,
        pods: &[PodCandidate],
        namespace: &str,
        workload: &str,
    ) -> Result<PodTarget> {
        let names = self.candidate_names(workload);
        let eligible: Vec<&PodCandidate> = pods
            .iter()
            .filter(|pod| pod.is_running() && names.contains(&pod.name))
            .collect();

        if eligible.is_empty() {
            return Err(Error::NoRunningPod {
                namespace: namespace.to_string(),
                workload: workload.to_string(),
            });
        }

        let index = rand::rng().random_range(0..eligible.len());
        let chosen = eligible[index];
        debug!(
            namespace,
            workload,
            pod = %chosen.name,
            eligible = eligible.len(),
            "Selected pod"
        );

        Ok(PodTarget::new(namespace, chosen.name.clone()))
    }
}

impl Default for PodSelector {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ORDINALS)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::domain::PodPhase;
    use crate::transport::mock::MockCluster;

    fn pod(name: &str, phase: PodPhase) -> PodCandidate {
        PodCandidate::new("default", name, phase)
    }

    #[test]
    fn test_candidate_names() {
        let names = PodSelector::default().candidate_names("broker");
        assert_eq!(names.len(), 16);
        assert!(names.contains("broker-0"));
        assert!(names.contains("broker-15"));
        assert!(!names.contains("broker-16"));
    }

    #[test]
    fn test_no_running_pod() {
        let selector = PodSelector::default();
        let pods = vec![
            pod("broker-0", PodPhase::Pending),
            pod("broker-1", PodPhase::Failed),
            pod("other-0", PodPhase::Running),
        ];

        let result = selector.choose(&pods, "default", "broker");
        assert!(matches!(result, Err(Error::NoRunningPod { .. })));

        let result = selector.choose(&[], "default", "broker");
        assert!(matches!(result, Err(Error::NoRunningPod { .. })));
    }

    #[test]
    fn test_single_eligible_pod_is_always_chosen() {
        let selector = PodSelector::default();
        let pods = vec![
            pod("broker-0", PodPhase::Pending),
            pod("broker-2", PodPhase::Running),
            pod("broker-operator-7d9f", PodPhase::Running),
            pod("broker-16", PodPhase::Running),
        ];

        for _ in 0..50 {
            let target = selector.choose(&pods, "default", "broker").unwrap();
            assert_eq!(target, PodTarget::new("default", "broker-2"));
        }
    }

    #[test]
    fn test_selection_spreads_across_replicas() {
        let selector = PodSelector::default();
        let pods = vec![
            pod("broker-0", PodPhase::Running),
            pod("broker-1", PodPhase::Running),
            pod("broker-2", PodPhase::Running),
            pod("broker-3", PodPhase::Pending),
        ];

        let mut counts: HashMap<String, usize> = HashMap::new();
        for _ in 0..600 {
            let target = selector.choose(&pods, "default", "broker").unwrap();
            *counts.entry(target.name).or_default() += 1;
        }

        assert_eq!(counts.len(), 3);
        assert!(!counts.contains_key("broker-3"));
        // Expected 200 each; 100 is far outside any plausible deviation.
        assert!(counts.values().all(|&c| c > 100));
    }

    #[test]
    fn test_custom_ordinal_bound() {
        let selector = PodSelector::new(2);
        let pods = vec![pod("broker-5", PodPhase::Running)];
        assert!(selector.choose(&pods, "default", "broker").is_err());
    }

    #[test]
    fn test_select_through_cluster() {
        let cluster = MockCluster::with_pods(vec![
            pod("broker-0", PodPhase::Succeeded),
            pod("broker-1", PodPhase::Running),
        ]);

        let target = tokio_test::block_on(PodSelector::default().select_running_pod(
            &cluster,
            "default",
            "broker",
        ))
        .unwrap();
        assert_eq!(target.name, "broker-1");
        assert_eq!(cluster.list_calls(), 1);
    }
}
