//! kubectl-backed implementation of the cluster port.

use std::path::PathBuf;

use tokio_util::sync::CancellationToken;

use super::discovery::Kubectl;
use super::port_forward::spawn_port_forward;
use crate::domain::{PodCandidate, PortPair};
use crate::error::Result;
use crate::ports::{ClusterHandle, ForwardChannels};

/// Cluster handle that shells out to kubectl.
#[derive(Debug, Clone, Default)]
pub struct KubectlCluster {
    kubectl: Kubectl,
}

impl KubectlCluster {
    /// Creates a handle, searching for kubectl.
    pub fn new() -> Self {
        Self {
            kubectl: Kubectl::new(),
        }
    }

    /// Creates a handle around a prepared kubectl invocation.
    pub fn with_kubectl(kubectl: Kubectl) -> Self {
        Self { kubectl }
    }

    /// Creates a handle using an explicit kubeconfig and context.
    pub fn with_config(kubeconfig: Option<PathBuf>, context: Option<String>) -> Self {
        Self {
            kubectl: Kubectl::new()
                .with_kubeconfig(kubeconfig)
                .with_context(context),
        }
    }

    pub fn kubectl(&self) -> &Kubectl {
        &self.kubectl
    }
}

impl ClusterHandle for KubectlCluster {
    async fn list_pods(&self, namespace: &str, query: &str) -> Result<Vec<PodCandidate>> {
        Ok(self.kubectl.fetch_pods(namespace, query).await?)
    }

    async fn forward_ports(
        &self,
        namespace: &str,
        pod: &str,
        ports: &[PortPair],
        stop: CancellationToken,
    ) -> Result<ForwardChannels> {
        Ok(spawn_port_forward(
            &self.kubectl,
            namespace,
            pod,
            ports,
            stop,
        )?)
    }
}
