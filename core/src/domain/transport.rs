//! Logical transports and their bridged outcome.

use serde::{Deserialize, Serialize};

use super::PodTarget;

/// Default broker gRPC port.
pub const DEFAULT_GRPC_PORT: u16 = 50000;
/// Default broker REST port.
pub const DEFAULT_REST_PORT: u16 = 9090;
/// Default broker API port.
pub const DEFAULT_API_PORT: u16 = 8080;
/// Dashboard metrics UI port.
pub const DASHBOARD_UI_PORT: u16 = 3000;
/// Dashboard time-series DB port.
pub const DASHBOARD_TSDB_PORT: u16 = 8080;

// ============================================================================
// TransportSpec
// ============================================================================

/// A named remote port of a transport.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransportPort {
    pub name: String,
    pub port: u16,
}

impl TransportPort {
    pub fn new(name: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            port,
        }
    }
}

/// What the caller wants reachable: a workload in a namespace and an ordered set of ports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportSpec {
    /// Logical name used in logs and failure reports (e.g. "broker").
    pub name: String,
    pub namespace: String,
    pub workload: String,
    pub ports: Vec<TransportPort>,
    /// The ports are already reachable; skip bridging entirely.
    pub direct: bool,
}

impl TransportSpec {
    pub fn new(
        name: impl Into<String>,
        namespace: impl Into<String>,
        workload: impl Into<String>,
        ports: Vec<TransportPort>,
    ) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            workload: workload.into(),
            ports,
            direct: false,
        }
    }

    /// The broker's gRPC, REST and API ports.
    pub fn broker(
        namespace: impl Into<String>,
        workload: impl Into<String>,
        grpc: u16,
        rest: u16,
        api: u16,
    ) -> Self {
        Self::new(
            "broker",
            namespace,
            workload,
            vec![
                TransportPort::new("grpc", grpc),
                TransportPort::new("rest", rest),
                TransportPort::new("api", api),
            ],
        )
    }

    /// The dashboard's metrics UI and time-series DB ports.
    pub fn dashboard(namespace: impl Into<String>, workload: impl Into<String>) -> Self {
        Self::new(
            "dashboard",
            namespace,
            workload,
            vec![
                TransportPort::new("metrics-ui", DASHBOARD_UI_PORT),
                TransportPort::new("tsdb", DASHBOARD_TSDB_PORT),
            ],
        )
    }

    pub fn with_direct(mut self, direct: bool) -> Self {
        self.direct = direct;
        self
    }

    pub fn remote_ports(&self) -> Vec<u16> {
        self.ports.iter().map(|p| p.port).collect()
    }

    /// Returns the transport ID in the format "namespace/workload".
    pub fn id(&self) -> String {
        format!("{}/{}", self.namespace, self.workload)
    }
}

// ============================================================================
// TransportResult
// ============================================================================

/// One usable local endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PortBinding<'a> {
    pub name: &'a str,
    pub local: u16,
    pub remote: u16,
}

/// Outcome of a successful establishment. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportResult {
    name: String,
    pod: Option<PodTarget>,
    ports: Vec<TransportPort>,
    local_ports: Vec<u16>,
}

impl TransportResult {
    /// The configured ports, unchanged, for a transport that needs no bridging.
    pub fn direct(spec: &TransportSpec) -> Self {
        Self {
            name: spec.name.clone(),
            pod: None,
            ports: spec.ports.clone(),
            local_ports: spec.remote_ports(),
        }
    }

    /// A bridged transport. `local_ports` is aligned with `spec.ports`.
    pub fn bridged(spec: &TransportSpec, pod: PodTarget, local_ports: Vec<u16>) -> Self {
        debug_assert_eq!(spec.ports.len(), local_ports.len());
        Self {
            name: spec.name.clone(),
            pod: Some(pod),
            ports: spec.ports.clone(),
            local_ports,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The pod carrying the tunnel, `None` for direct transports.
    pub fn pod(&self) -> Option<&PodTarget> {
        self.pod.as_ref()
    }

    pub fn is_bridged(&self) -> bool {
        self.pod.is_some()
    }

    /// Local ports in the order the remote ports were requested.
    pub fn local_ports(&self) -> &[u16] {
        &self.local_ports
    }

    /// Local port for a named remote port.
    pub fn local_port(&self, name: &str) -> Option<u16> {
        self.ports
            .iter()
            .position(|p| p.name == name)
            .and_then(|i| self.local_ports.get(i).copied())
    }

    pub fn bindings(&self) -> impl Iterator<Item = PortBinding<'_>> {
        self.ports
            .iter()
            .zip(&self.local_ports)
            .map(|(port, &local)| PortBinding {
                name: &port.name,
                local,
                remote: port.port,
            })
    }
}

/// How an establish call ended without error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Establishment {
    /// The transport is usable.
    Ready(TransportResult),
    /// The ambient cancellation fired first; the caller is shutting down.
    Cancelled,
}

impl Establishment {
    pub fn ready(self) -> Option<TransportResult> {
        match self {
            Self::Ready(result) => Some(result),
            Self::Cancelled => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broker_spec_port_order() {
        let spec = TransportSpec::broker("default", "broker", 50000, 9090, 8080);
        assert_eq!(spec.remote_ports(), vec![50000, 9090, 8080]);
        assert_eq!(spec.id(), "default/broker");
        assert!(!spec.direct);
    }

    #[test]
    fn test_direct_result_keeps_configured_ports() {
        let spec = TransportSpec::dashboard("monitoring", "dash").with_direct(true);
        let result = TransportResult::direct(&spec);

        assert!(!result.is_bridged());
        assert_eq!(result.local_ports(), &[3000, 8080]);
        assert_eq!(result.local_port("tsdb"), Some(8080));
    }

    #[test]
    fn test_bridged_bindings_are_aligned() {
        let spec = TransportSpec::broker("default", "broker", 50000, 9090, 8080);
        let result = TransportResult::bridged(
            &spec,
            PodTarget::new("default", "broker-2"),
            vec![41000, 41001, 41002],
        );

        let bindings: Vec<_> = result.bindings().collect();
        assert_eq!(bindings[0].name, "grpc");
        assert_eq!(bindings[0].local, 41000);
        assert_eq!(bindings[0].remote, 50000);
        assert_eq!(bindings[2].remote, 8080);
        assert_eq!(result.local_port("rest"), Some(41001));
        assert_eq!(result.local_port("missing"), None);
        assert_eq!(result.pod().unwrap().name, "broker-2");
    }

    #[test]
    fn test_misaligned_result_has_no_local_port() {
        let result: TransportResult = serde_json::from_str(
            r#"{"name":"broker","pod":null,"ports":[{"name":"grpc","port":50000},{"name":"rest","port":9090}],"localPorts":[41000]}"#,
        )
        .unwrap();

        assert_eq!(result.local_port("grpc"), Some(41000));
        assert_eq!(result.local_port("rest"), None);
    }

    #[test]
    fn test_establishment_ready() {
        let spec = TransportSpec::broker("default", "broker", 1, 2, 3).with_direct(true);
        let result = TransportResult::direct(&spec);
        assert_eq!(Establishment::Ready(result.clone()).ready(), Some(result));
        assert_eq!(Establishment::Cancelled.ready(), None);
    }
}
