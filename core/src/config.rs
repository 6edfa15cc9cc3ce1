//! Configuration storage for brokerctl.
//!
//! Handles persistent storage of cluster selection, broker ports and
//! transport tunables in `~/.brokerctl/config.json`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::domain::{
    TransportResult, TransportSpec, DEFAULT_API_PORT, DEFAULT_GRPC_PORT, DEFAULT_REST_PORT,
};
use crate::error::{Error, Result};
use crate::transport::TransportSettings;

/// Protocol clients use to reach the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
    #[default]
    Grpc,
    Rest,
}

impl ConnectionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Grpc => "grpc",
            Self::Rest => "rest",
        }
    }
}

impl std::str::FromStr for ConnectionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "grpc" => Ok(Self::Grpc),
            "rest" => Ok(Self::Rest),
            other => Err(Error::Config(format!(
                "unknown connection type '{}', expected grpc or rest",
                other
            ))),
        }
    }
}

/// Configuration file structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Reach the broker through the cluster; false means its ports are already reachable.
    pub auto_integrated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kube_config_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kube_context: Option<String>,
    pub namespace: String,
    /// Stateful set name; pods are `{workload}-{ordinal}`.
    pub workload: String,
    pub grpc_port: u16,
    pub rest_port: u16,
    pub api_port: u16,
    pub connection_type: ConnectionType,
    pub transport: TransportSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            auto_integrated: true,
            kube_config_path: None,
            kube_context: None,
            namespace: "default".to_string(),
            workload: "broker".to_string(),
            grpc_port: DEFAULT_GRPC_PORT,
            rest_port: DEFAULT_REST_PORT,
            api_port: DEFAULT_API_PORT,
            connection_type: ConnectionType::default(),
            transport: TransportSettings::default(),
        }
    }
}

impl Config {
    /// The broker transport described by this configuration.
    pub fn broker_spec(&self) -> TransportSpec {
        TransportSpec::broker(
            self.namespace.clone(),
            self.workload.clone(),
            self.grpc_port,
            self.rest_port,
            self.api_port,
        )
        .with_direct(!self.auto_integrated)
    }

    /// The dashboard transport for a monitoring workload.
    pub fn dashboard_spec(&self, namespace: &str, workload: &str) -> TransportSpec {
        TransportSpec::dashboard(namespace, workload).with_direct(!self.auto_integrated)
    }

    /// Applies a `key=value` style update, as used by `brokerctl config set`.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "autoIntegrated" => self.auto_integrated = parse_value(key, value)?,
            "kubeConfigPath" => self.kube_config_path = non_empty(value).map(PathBuf::from),
            "kubeContext" => self.kube_context = non_empty(value).map(str::to_string),
            "namespace" => self.namespace = value.to_string(),
            "workload" => self.workload = value.to_string(),
            "grpcPort" => self.grpc_port = parse_value(key, value)?,
            "restPort" => self.rest_port = parse_value(key, value)?,
            "apiPort" => self.api_port = parse_value(key, value)?,
            "connectionType" => self.connection_type = value.parse()?,
            "transport.startupTimeoutSecs" => {
                self.transport.startup_timeout =
                    std::time::Duration::from_secs(parse_value(key, value)?);
            }
            "transport.maxOrdinals" => self.transport.max_ordinals = parse_value(key, value)?,
            other => return Err(Error::Config(format!("unknown config key '{}'", other))),
        }
        self.validate()
    }

    /// Rejects values no establish call can work with.
    pub fn validate(&self) -> Result<()> {
        for (key, port) in [
            ("grpcPort", self.grpc_port),
            ("restPort", self.rest_port),
            ("apiPort", self.api_port),
        ] {
            if port == 0 {
                return Err(Error::InvalidPort(format!("{} cannot be 0", key)));
            }
        }
        if self.transport.startup_timeout.is_zero() {
            return Err(Error::Config(
                "transport.startupTimeoutSecs must be positive".to_string(),
            ));
        }
        if self.transport.max_ordinals == 0 {
            return Err(Error::Config(
                "transport.maxOrdinals must be positive".to_string(),
            ));
        }
        if self.namespace.trim().is_empty() || self.workload.trim().is_empty() {
            return Err(Error::Config(
                "namespace and workload cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn non_empty(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("invalid value '{}' for {}", value, key)))
}

// ============================================================================
// Endpoints
// ============================================================================

/// Addresses clients should use after the broker transport is established.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BrokerEndpoints {
    pub grpc_address: String,
    pub rest_uri: String,
    pub api_http_uri: String,
    pub api_ws_uri: String,
}

impl BrokerEndpoints {
    /// Derives endpoints from an established broker transport.
    ///
    /// Returns `None` when the result lacks one of the broker's ports.
    pub fn from_result(result: &TransportResult) -> Option<Self> {
        let grpc = result.local_port("grpc")?;
        let rest = result.local_port("rest")?;
        let api = result.local_port("api")?;

        Some(Self {
            grpc_address: format!("localhost:{}", grpc),
            rest_uri: format!("http://localhost:{}", rest),
            api_http_uri: format!("http://localhost:{}", api),
            api_ws_uri: format!("ws://localhost:{}", api),
        })
    }
}

// ============================================================================
// ConfigStore
// ============================================================================

/// Configuration store for managing CLI settings.
///
/// Handles reading and writing configuration to `~/.brokerctl/config.json`.
pub struct ConfigStore {
    /// Path to the configuration file.
    config_path: PathBuf,
}

impl ConfigStore {
    /// Create a new config store with the default path.
    ///
    /// Default path: `~/.brokerctl/config.json`
    pub fn new() -> Result<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| Error::Config("Could not determine home directory".to_string()))?;

        let config_path = home.join(".brokerctl").join("config.json");

        Ok(Self { config_path })
    }

    /// Create a config store with a custom path.
    pub fn with_path(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    pub fn config_path(&self) -> &PathBuf {
        &self.config_path
    }

    /// Load configuration from disk.
    ///
    /// Returns default config if the file doesn't exist.
    pub async fn load(&self) -> Result<Config> {
        if !self.config_path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(&self.config_path)
            .await
            .map_err(|e| Error::Config(format!("Failed to read config: {}", e)))?;

        let config: Config = serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to disk.
    ///
    /// Creates the config directory if it doesn't exist.
    pub async fn save(&self, config: &Config) -> Result<()> {
        if let Some(config_dir) = self.config_path.parent() {
            if !config_dir.exists() {
                fs::create_dir_all(config_dir).await.map_err(|e| {
                    Error::Config(format!("Failed to create config directory: {}", e))
                })?;
            }
        }

        let content = serde_json::to_string_pretty(config)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        // Write atomically by writing to temp file then renaming
        let temp_path = self.config_path.with_extension("json.tmp");

        let mut file = fs::File::create(&temp_path)
            .await
            .map_err(|e| Error::Config(format!("Failed to create temp config file: {}", e)))?;

        file.write_all(content.as_bytes())
            .await
            .map_err(|e| Error::Config(format!("Failed to write config: {}", e)))?;

        file.sync_all()
            .await
            .map_err(|e| Error::Config(format!("Failed to sync config: {}", e)))?;

        fs::rename(&temp_path, &self.config_path)
            .await
            .map_err(|e| Error::Config(format!("Failed to rename config file: {}", e)))?;

        Ok(())
    }

    /// Loads, applies one `key=value` update and saves.
    pub async fn update(&self, key: &str, value: &str) -> Result<Config> {
        let mut config = self.load().await?;
        config.set(key, value)?;
        self.save(&config).await?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::domain::PodTarget;
    use tempfile::tempdir;

    fn test_store() -> (ConfigStore, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        (ConfigStore::with_path(path), dir)
    }

    #[tokio::test]
    async fn test_load_nonexistent() {
        let (store, _dir) = test_store();
        let config = store.load().await.unwrap();
        assert_eq!(config, Config::default());
        assert!(config.auto_integrated);
        assert_eq!(config.transport.startup_timeout, Duration::from_secs(30));
        assert_eq!(config.transport.max_ordinals, 16);
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let (store, _dir) = test_store();

        let config = Config {
            namespace: "messaging".to_string(),
            workload: "queue".to_string(),
            kube_context: Some("staging".to_string()),
            connection_type: ConnectionType::Rest,
            ..Config::default()
        };
        store.save(&config).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded, config);
    }

    #[tokio::test]
    async fn test_partial_file_uses_defaults() {
        let (store, _dir) = test_store();
        std::fs::create_dir_all(store.config_path().parent().unwrap()).unwrap();
        std::fs::write(
            store.config_path(),
            r#"{"namespace":"kube","transport":{"startupTimeoutSecs":5}}"#,
        )
        .unwrap();

        let config = store.load().await.unwrap();
        assert_eq!(config.namespace, "kube");
        assert_eq!(config.workload, "broker");
        assert_eq!(config.transport.startup_timeout, Duration::from_secs(5));
        assert_eq!(config.transport.max_ordinals, 16);
    }

    #[tokio::test]
    async fn test_load_rejects_zero_values() {
        let (store, _dir) = test_store();
        std::fs::create_dir_all(store.config_path().parent().unwrap()).unwrap();

        for content in [
            r#"{"transport":{"startupTimeoutSecs":0}}"#,
            r#"{"transport":{"maxOrdinals":0}}"#,
            r#"{"grpcPort":0}"#,
            r#"{"workload":""}"#,
        ] {
            std::fs::write(store.config_path(), content).unwrap();
            assert!(store.load().await.is_err(), "{}", content);
        }
    }

    #[tokio::test]
    async fn test_update() {
        let (store, _dir) = test_store();

        store.update("grpcPort", "50001").await.unwrap();
        store.update("transport.maxOrdinals", "3").await.unwrap();
        let config = store.load().await.unwrap();
        assert_eq!(config.grpc_port, 50001);
        assert_eq!(config.transport.max_ordinals, 3);

        assert!(store.update("grpcPort", "0").await.is_err());
        assert!(store.update("transport.startupTimeoutSecs", "0").await.is_err());
        assert!(store.update("transport.maxOrdinals", "0").await.is_err());
        assert_eq!(store.load().await.unwrap().transport.max_ordinals, 3);
        assert!(store.update("nope", "1").await.is_err());
        assert!(store.update("connectionType", "udp").await.is_err());
    }

    #[test]
    fn test_broker_spec_follows_auto_integrated() {
        let mut config = Config::default();
        let spec = config.broker_spec();
        assert!(!spec.direct);
        assert_eq!(spec.remote_ports(), vec![50000, 9090, 8080]);
        assert_eq!(spec.id(), "default/broker");

        config.auto_integrated = false;
        assert!(config.broker_spec().direct);
        assert!(config.dashboard_spec("monitoring", "dash").direct);
    }

    #[test]
    fn test_endpoints_from_result() {
        let spec = Config::default().broker_spec();
        let result =
            TransportResult::bridged(&spec, PodTarget::new("default", "broker-1"), vec![41000, 41001, 41002]);

        let endpoints = BrokerEndpoints::from_result(&result).unwrap();
        assert_eq!(endpoints.grpc_address, "localhost:41000");
        assert_eq!(endpoints.rest_uri, "http://localhost:41001");
        assert_eq!(endpoints.api_http_uri, "http://localhost:41002");
        assert_eq!(endpoints.api_ws_uri, "ws://localhost:41002");

        let dashboard = TransportResult::direct(&TransportSpec::dashboard("default", "dash"));
        assert!(BrokerEndpoints::from_result(&dashboard).is_none());
    }
}
