//! Command implementations and the state they share.

pub mod config;
pub mod connect;
pub mod dashboard;
pub mod pods;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context as _, Result};
use brokerctl_core::{
    Config, ConfigStore, FailureReporter, KubectlCluster, TransportCoordinator, TransportFailure,
};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;

/// Command-line values that take precedence over the stored configuration.
#[derive(Debug, Default)]
pub struct Overrides {
    pub kubeconfig: Option<PathBuf>,
    pub context: Option<String>,
    pub namespace: Option<String>,
    pub workload: Option<String>,
    pub direct: bool,
}

pub struct Context {
    pub json: bool,
    pub store: ConfigStore,
    /// Stored configuration with the overrides applied. Never written back.
    pub config: Config,
    cluster: KubectlCluster,
}

impl Context {
    pub async fn load(json: bool, overrides: Overrides) -> Result<Self> {
        let store = ConfigStore::new()?;
        let mut config = store.load().await.context("failed to load configuration")?;

        if overrides.kubeconfig.is_some() {
            config.kube_config_path = overrides.kubeconfig;
        }
        if overrides.context.is_some() {
            config.kube_context = overrides.context;
        }
        if let Some(namespace) = overrides.namespace {
            config.namespace = namespace;
        }
        if let Some(workload) = overrides.workload {
            config.workload = workload;
        }
        if overrides.direct {
            config.auto_integrated = false;
        }
        config.validate().context("invalid configuration")?;

        let cluster = KubectlCluster::with_config(
            config.kube_config_path.clone(),
            config.kube_context.clone(),
        );

        Ok(Self {
            json,
            store,
            config,
            cluster,
        })
    }

    /// The cluster handle, for commands that always talk to the cluster.
    pub fn cluster(&self) -> Result<&KubectlCluster> {
        if !self.cluster.kubectl().is_available() {
            bail!("kubectl not found; install it or add it to PATH");
        }
        Ok(&self.cluster)
    }

    /// A coordinator plus the receiving end of its late-failure path.
    ///
    /// kubectl is only required once a transport is actually bridged, so
    /// direct access works without it.
    pub fn coordinator(
        &self,
    ) -> (
        TransportCoordinator<KubectlCluster>,
        UnboundedReceiver<TransportFailure>,
    ) {
        let (reporter, failures) = FailureReporter::channel();
        let coordinator = TransportCoordinator::new(
            Arc::new(self.cluster.clone()),
            self.config.transport,
            reporter,
        );
        (coordinator, failures)
    }
}

/// Keeps established transports alive until Ctrl-C or a transport failure.
pub async fn hold(
    cancel: &CancellationToken,
    failures: &mut UnboundedReceiver<TransportFailure>,
) -> Result<()> {
    tokio::select! {
        _ = cancel.cancelled() => {}
        failure = failures.recv() => {
            if let Some(failure) = failure {
                return Err(failure).context("transport lost");
            }
        }
    }

    // A failing monitor reports before it cancels.
    if let Ok(failure) = failures.try_recv() {
        return Err(failure).context("transport lost");
    }
    Ok(())
}

pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
