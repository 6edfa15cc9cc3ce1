//! Local-to-remote port mapping.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Traffic sent to `local` is relayed to `remote` on the selected pod.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortPair {
    pub local: u16,
    pub remote: u16,
}

impl PortPair {
    /// Creates a pair. Port zero is not a valid endpoint on either side.
    pub fn new(local: u16, remote: u16) -> Result<Self> {
        if local == 0 {
            return Err(Error::InvalidPort("local port must be in 1..=65535".to_string()));
        }
        if remote == 0 {
            return Err(Error::InvalidPort("remote port must be in 1..=65535".to_string()));
        }
        Ok(Self { local, remote })
    }

    /// Zips allocated local ports with requested remote ports, keeping order.
    pub fn zip(locals: &[u16], remotes: &[u16]) -> Result<Vec<Self>> {
        if locals.len() != remotes.len() {
            return Err(Error::InvalidPort(format!(
                "{} local ports for {} remote ports",
                locals.len(),
                remotes.len()
            )));
        }

        let pairs = locals
            .iter()
            .zip(remotes)
            .map(|(&local, &remote)| Self::new(local, remote))
            .collect::<Result<Vec<_>>>()?;

        let mut seen = std::collections::HashSet::with_capacity(pairs.len());
        if let Some(dup) = pairs.iter().find(|p| !seen.insert(p.local)) {
            return Err(Error::InvalidPort(format!(
                "local port {} used twice in one session",
                dup.local
            )));
        }

        Ok(pairs)
    }

    /// The `local:remote` argument form used by port-forward tooling.
    pub fn spec(&self) -> String {
        format!("{}:{}", self.local, self.remote)
    }
}

impl std::fmt::Display for PortPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.local, self.remote)
    }
}
