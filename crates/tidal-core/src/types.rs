//! Shared types used across tidal crates.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A load-balancer virtual-server port whose throughput drives scaling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualPort {
    /// Virtual server name, e.g. `ws-vip`.
    pub server: String,
    /// Port key in aXAPI form, e.g. `80+http`.
    pub port: String,
}

impl VirtualPort {
    pub fn new(server: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            port: port.into(),
        }
    }
}

impl fmt::Display for VirtualPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.server, self.port)
    }
}

/// Identifies the workload whose replica count is managed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeploymentRef {
    pub name: String,
    pub namespace: String,
}

impl DeploymentRef {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
        }
    }
}

impl fmt::Display for DeploymentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// One throughput reading taken from a virtual port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThroughputSample {
    pub endpoint: VirtualPort,
    pub bits_per_second: u64,
}

impl ThroughputSample {
    pub fn new(endpoint: VirtualPort, bits_per_second: u64) -> Self {
        Self {
            endpoint,
            bits_per_second,
        }
    }

    /// Throughput in kilobits per second (integer division by 1000).
    pub fn kbps(&self) -> u64 {
        self.bits_per_second / 1000
    }
}

/// Last known replica state of the managed deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentState {
    pub name: String,
    pub namespace: String,
    pub current_replicas: u32,
}

impl DeploymentState {
    pub fn new(target: &DeploymentRef, current_replicas: u32) -> Self {
        Self {
            name: target.name.clone(),
            namespace: target.namespace.clone(),
            current_replicas,
        }
    }

    pub fn reference(&self) -> DeploymentRef {
        DeploymentRef::new(&self.name, &self.namespace)
    }
}
