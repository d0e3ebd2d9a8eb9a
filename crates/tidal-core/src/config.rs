//! Daemon configuration file parser.
//!
//! The file is YAML by default (`config.yaml`); a `.toml` extension selects
//! the TOML parser instead. Both map onto the same [`TidalConfig`] shape.
//! [`TidalConfig::scaling_config`] validates the loaded values and produces
//! the immutable [`ScalingConfig`] the control loop runs with.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{DeploymentRef, VirtualPort};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid TOML config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
    #[error("{0} must not be empty")]
    Empty(&'static str),
    #[error("{field} must not exceed {max_secs} seconds")]
    TooLong { field: &'static str, max_secs: u64 },
    #[error("min_pods ({min}) must not exceed max_pods ({max})")]
    Bounds { min: u32, max: u32 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TidalConfig {
    /// Verbosity level; values above 8 log every sample.
    #[serde(default)]
    pub debug: u8,
    /// Seconds between ticks.
    pub check_interval: u64,
    /// Seconds to wait for a scaling action to be observed.
    pub cmd_timeout: u64,
    /// Skip TLS certificate verification for both endpoints.
    #[serde(default)]
    pub insecure_tls: bool,
    /// Per-request HTTP timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
    pub cluster: ClusterConfig,
    pub thunder: ThunderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    pub ip: String,
    pub port: u16,
    pub auth_token: String,
    pub deployment: String,
    pub namespace: String,
    #[serde(default)]
    pub min_pods: u32,
    pub max_pods: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThunderConfig {
    pub ip: String,
    pub port: u16,
    /// Kubernetes secret holding the device username and password.
    pub secret: String,
    pub secret_namespace: String,
    pub slb: String,
    pub slb_port: String,
    /// Kilobits per second one replica is expected to carry.
    pub rate: u64,
}

fn default_request_timeout() -> u64 {
    10
}

/// Connection settings shared by the device and cluster HTTP clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpSettings {
    pub insecure_tls: bool,
    pub request_timeout: Duration,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            insecure_tls: false,
            request_timeout: Duration::from_secs(default_request_timeout()),
        }
    }
}

/// Upper bound for `check_interval` and `cmd_timeout`.
pub const MAX_DURATION: Duration = Duration::from_secs(86_400);

/// Validated settings the control loop runs with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScalingConfig {
    pub check_interval: Duration,
    pub adjustment_timeout: Duration,
    pub min_replicas: u32,
    pub max_replicas: u32,
    /// Kbps per replica.
    pub rate_per_replica: u64,
    pub endpoint: VirtualPort,
    pub deployment: DeploymentRef,
}

impl ScalingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.check_interval.is_zero() {
            return Err(ConfigError::Zero("check_interval"));
        }
        if self.adjustment_timeout.is_zero() {
            return Err(ConfigError::Zero("cmd_timeout"));
        }
        if self.rate_per_replica == 0 {
            return Err(ConfigError::Zero("rate"));
        }
        for (field, value) in [
            ("check_interval", self.check_interval),
            ("cmd_timeout", self.adjustment_timeout),
        ] {
            if value > MAX_DURATION {
                return Err(ConfigError::TooLong {
                    field,
                    max_secs: MAX_DURATION.as_secs(),
                });
            }
        }
        if self.min_replicas > self.max_replicas {
            return Err(ConfigError::Bounds {
                min: self.min_replicas,
                max: self.max_replicas,
            });
        }
        if self.deployment.name.is_empty() {
            return Err(ConfigError::Empty("cluster.deployment"));
        }
        if self.deployment.namespace.is_empty() {
            return Err(ConfigError::Empty("cluster.namespace"));
        }
        if self.endpoint.server.is_empty() {
            return Err(ConfigError::Empty("thunder.slb"));
        }
        if self.endpoint.port.is_empty() {
            return Err(ConfigError::Empty("thunder.slb_port"));
        }
        Ok(())
    }
}

impl TidalConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_str(&content),
            _ => Self::from_yaml_str(&content),
        }
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Validate the file and extract the control-loop settings.
    pub fn scaling_config(&self) -> Result<ScalingConfig, ConfigError> {
        let cfg = ScalingConfig {
            check_interval: Duration::from_secs(self.check_interval),
            adjustment_timeout: Duration::from_secs(self.cmd_timeout),
            min_replicas: self.cluster.min_pods,
            max_replicas: self.cluster.max_pods,
            rate_per_replica: self.thunder.rate,
            endpoint: VirtualPort::new(&self.thunder.slb, &self.thunder.slb_port),
            deployment: DeploymentRef::new(&self.cluster.deployment, &self.cluster.namespace),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Base URL of the Kubernetes API server.
    pub fn cluster_url(&self) -> String {
        base_url(&self.cluster.ip, self.cluster.port)
    }

    /// Base URL of the Thunder device.
    pub fn thunder_url(&self) -> String {
        base_url(&self.thunder.ip, self.thunder.port)
    }

    pub fn http_settings(&self) -> HttpSettings {
        HttpSettings {
            insecure_tls: self.insecure_tls,
            request_timeout: Duration::from_secs(self.request_timeout),
        }
    }
}

/// `ip` may already carry a scheme; plain hosts default to HTTPS.
fn base_url(ip: &str, port: u16) -> String {
    if ip.starts_with("http://") || ip.starts_with("https://") {
        format!("{}:{port}", ip.trim_end_matches('/'))
    } else {
        format!("https://{ip}:{port}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE_YAML: &str = r#"
debug: 0
check_interval: 30
cmd_timeout: 20
cluster:
  ip: 10.0.0.1
  port: 6443
  auth_token: token
  deployment: web
  namespace: default
  min_pods: 2
  max_pods: 10
thunder:
  ip: 10.0.0.2
  port: 443
  secret: thunder-creds
  secret_namespace: kube-system
  slb: ws-vip
  slb_port: "80+http"
  rate: 50
"#;

    #[test]
    fn parses_yaml_and_extracts_scaling_config() {
        let config = TidalConfig::from_yaml_str(SAMPLE_YAML).unwrap();
        assert_eq!(config.http_settings(), HttpSettings::default());

        let scaling = config.scaling_config().unwrap();
        assert_eq!(scaling.check_interval, Duration::from_secs(30));
        assert_eq!(scaling.adjustment_timeout, Duration::from_secs(20));
        assert_eq!(scaling.min_replicas, 2);
        assert_eq!(scaling.max_replicas, 10);
        assert_eq!(scaling.rate_per_replica, 50);
        assert_eq!(scaling.endpoint, VirtualPort::new("ws-vip", "80+http"));
        assert_eq!(scaling.deployment, DeploymentRef::new("web", "default"));
    }

    #[test]
    fn parses_toml() {
        let toml_str = r#"
check_interval = 15
cmd_timeout = 5
insecure_tls = true

[cluster]
ip = "10.0.0.1"
port = 6443
auth_token = "token"
deployment = "web"
namespace = "default"
min_pods = 1
max_pods = 4

[thunder]
ip = "10.0.0.2"
port = 443
secret = "creds"
secret_namespace = "default"
slb = "ws-vip"
slb_port = "443+https"
rate = 100
"#;
        let config = TidalConfig::from_toml_str(toml_str).unwrap();
        assert!(config.insecure_tls);
        assert_eq!(config.debug, 0);
        assert_eq!(config.scaling_config().unwrap().max_replicas, 4);
    }

    #[test]
    fn from_file_picks_parser_by_extension() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(SAMPLE_YAML.as_bytes()).unwrap();
        let config = TidalConfig::from_file(file.path()).unwrap();
        assert_eq!(config.thunder.slb, "ws-vip");

        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(SAMPLE_YAML.as_bytes()).unwrap();
        assert!(matches!(
            TidalConfig::from_file(file.path()),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = TidalConfig::from_file(Path::new("/nonexistent/tidal.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn rejects_inverted_bounds() {
        let mut config = TidalConfig::from_yaml_str(SAMPLE_YAML).unwrap();
        config.cluster.min_pods = 11;
        assert!(matches!(
            config.scaling_config(),
            Err(ConfigError::Bounds { min: 11, max: 10 })
        ));
    }

    #[test]
    fn rejects_zero_values() {
        let mut config = TidalConfig::from_yaml_str(SAMPLE_YAML).unwrap();
        config.thunder.rate = 0;
        assert!(matches!(config.scaling_config(), Err(ConfigError::Zero("rate"))));

        let mut config = TidalConfig::from_yaml_str(SAMPLE_YAML).unwrap();
        config.check_interval = 0;
        assert!(matches!(
            config.scaling_config(),
            Err(ConfigError::Zero("check_interval"))
        ));

        let mut config = TidalConfig::from_yaml_str(SAMPLE_YAML).unwrap();
        config.cmd_timeout = 0;
        assert!(matches!(config.scaling_config(), Err(ConfigError::Zero("cmd_timeout"))));
    }

    #[test]
    fn rejects_durations_over_a_day() {
        let mut config = TidalConfig::from_yaml_str(SAMPLE_YAML).unwrap();
        config.check_interval = u64::MAX;
        assert!(matches!(
            config.scaling_config(),
            Err(ConfigError::TooLong { field: "check_interval", max_secs: 86_400 })
        ));

        let mut config = TidalConfig::from_yaml_str(SAMPLE_YAML).unwrap();
        config.cmd_timeout = 86_401;
        assert!(matches!(
            config.scaling_config(),
            Err(ConfigError::TooLong { field: "cmd_timeout", .. })
        ));

        let mut config = TidalConfig::from_yaml_str(SAMPLE_YAML).unwrap();
        config.check_interval = 86_400;
        config.cmd_timeout = 86_400;
        assert!(config.scaling_config().is_ok());
    }

    #[test]
    fn rejects_blank_deployment() {
        let mut config = TidalConfig::from_yaml_str(SAMPLE_YAML).unwrap();
        config.cluster.namespace.clear();
        assert!(matches!(
            config.scaling_config(),
            Err(ConfigError::Empty("cluster.namespace"))
        ));
    }

    #[test]
    fn base_urls() {
        let mut config = TidalConfig::from_yaml_str(SAMPLE_YAML).unwrap();
        assert_eq!(config.cluster_url(), "https://10.0.0.1:6443");
        assert_eq!(config.thunder_url(), "https://10.0.0.2:443");

        config.thunder.ip = "http://127.0.0.1/".to_string();
        assert_eq!(config.thunder_url(), "http://127.0.0.1:443");
    }
}
