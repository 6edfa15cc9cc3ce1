//! kubectl invocation and pod discovery.

use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

use super::errors::{KubectlError, Result};
use super::models::PodListResponse;
use crate::domain::PodCandidate;

/// Default paths to search for kubectl.
const KUBECTL_PATHS: &[&str] = &[
    "/opt/homebrew/bin/kubectl", // Apple Silicon
    "/usr/local/bin/kubectl",    // Intel Mac / Homebrew
    "/usr/bin/kubectl",          // System
];

/// Timeout for kubectl discovery commands.
const KUBECTL_TIMEOUT: Duration = Duration::from_secs(15);

/// A located kubectl binary plus the cluster selection flags passed to every call.
#[derive(Debug, Clone)]
pub struct Kubectl {
    path: Option<PathBuf>,
    kubeconfig: Option<PathBuf>,
    context: Option<String>,
}

impl Kubectl {
    /// Searches the well-known locations, then `$PATH`.
    pub fn new() -> Self {
        Self {
            path: find_executable(KUBECTL_PATHS).or_else(|| find_in_path("kubectl")),
            kubeconfig: None,
            context: None,
        }
    }

    /// Uses the given binary instead of searching.
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            path: Some(path),
            kubeconfig: None,
            context: None,
        }
    }

    pub fn with_kubeconfig(mut self, kubeconfig: Option<PathBuf>) -> Self {
        self.kubeconfig = kubeconfig;
        self
    }

    pub fn with_context(mut self, context: Option<String>) -> Self {
        self.context = context;
        self
    }

    /// Returns the kubectl path if found.
    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }

    /// Returns true if kubectl is available.
    pub fn is_available(&self) -> bool {
        self.path.as_ref().is_some_and(|path| path.is_file())
    }

    /// Builds a command with the cluster selection flags already applied.
    pub(crate) fn command(&self) -> Result<Command> {
        let path = self.path.as_ref().ok_or(KubectlError::KubectlNotFound)?;

        let mut command = Command::new(path);
        command.args(self.global_args());
        Ok(command)
    }

    fn global_args(&self) -> Vec<OsString> {
        let mut args = Vec::new();
        if let Some(kubeconfig) = &self.kubeconfig {
            args.push(OsString::from("--kubeconfig"));
            args.push(kubeconfig.clone().into_os_string());
        }
        if let Some(context) = &self.context {
            args.push(OsString::from("--context"));
            args.push(OsString::from(context));
        }
        args
    }

    /// Fetches pods of a namespace whose name starts with `prefix`.
    pub async fn fetch_pods(&self, namespace: &str, prefix: &str) -> Result<Vec<PodCandidate>> {
        let output = self
            .execute(&[
                "get",
                "pods",
                "-n",
                namespace,
                "-o",
                "json",
                "--request-timeout=10s",
            ])
            .await?;

        let response: PodListResponse = serde_json::from_str(&output)
            .map_err(|e| KubectlError::ParsingFailed(e.to_string()))?;

        let mut pods: Vec<PodCandidate> = response
            .into_candidates(namespace)
            .into_iter()
            .filter(|pod| pod.name.starts_with(prefix))
            .collect();
        pods.sort_by(|a, b| a.name.cmp(&b.name));

        debug!(namespace, prefix, count = pods.len(), "Listed pods");
        Ok(pods)
    }

    /// Executes a kubectl command and returns its stdout.
    async fn execute(&self, args: &[&str]) -> Result<String> {
        let mut command = self.command()?;
        command.args(args);

        let result = timeout(KUBECTL_TIMEOUT, async {
            let output = command.output().await?;

            Ok::<_, std::io::Error>((output.status, output.stdout, output.stderr))
        })
        .await;

        match result {
            Ok(Ok((status, stdout, stderr))) => {
                if status.success() {
                    String::from_utf8(stdout)
                        .map_err(|e| KubectlError::ParsingFailed(e.to_string()))
                } else {
                    let stderr_str = String::from_utf8_lossy(&stderr);
                    Err(KubectlError::from_kubectl_error(&stderr_str))
                }
            }
            Ok(Err(e)) => Err(KubectlError::Io(e)),
            Err(_) => Err(KubectlError::Timeout),
        }
    }
}

impl Default for Kubectl {
    fn default() -> Self {
        Self::new()
    }
}

/// Finds an executable in the given paths.
fn find_executable(paths: &[&str]) -> Option<PathBuf> {
    paths.iter().map(PathBuf::from).find(|path| path.exists())
}

/// Finds `name` in the directories listed by `$PATH`.
fn find_in_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}
