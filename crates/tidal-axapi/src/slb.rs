//! SLB objects as returned by aXAPI v3.
//!
//! Field names follow the device's kebab-case JSON. Every field is optional
//! on the wire; missing values decode to their defaults.

use serde::{Deserialize, Serialize};

/// Real server (`/slb/server`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Server {
    pub name: String,
    pub host: String,
    /// `enable` or `disable`.
    pub action: String,
    pub template_server: String,
    pub conn_limit: u64,
    pub weight: u32,
}

/// Service group member.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Member {
    pub name: String,
    pub port: u16,
    pub member_state: String,
    pub member_priority: u32,
}

/// Service group (`/slb/service-group`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ServiceGroup {
    pub name: String,
    pub protocol: String,
    pub lb_method: String,
    pub health_check: String,
    pub member_list: Vec<Member>,
}

/// Port of a virtual server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct VirtualServerPort {
    pub port_number: u16,
    pub protocol: String,
    pub conn_limit: u64,
    pub action: String,
    /// Source NAT auto mode flag.
    pub auto: u8,
    pub service_group: String,
}

impl VirtualServerPort {
    /// Port key used in stats URLs, e.g. `80+http`.
    pub fn key(&self) -> String {
        format!("{}+{}", self.port_number, self.protocol)
    }
}

/// Virtual server (`/slb/virtual-server`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct VirtualServer {
    pub name: String,
    pub ip_address: String,
    pub enable_disable_action: String,
    pub port_list: Vec<VirtualServerPort>,
}

/// Statistics of one virtual port.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortStats {
    pub port_number: u16,
    pub protocol: String,
    pub throughput_bps: u64,
    pub current_connections: u64,
    pub total_connections: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ServerList {
    #[serde(rename = "server-list", default)]
    pub servers: Vec<Server>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ServiceGroupList {
    #[serde(rename = "service-group-list", default)]
    pub groups: Vec<ServiceGroup>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct VirtualServerList {
    #[serde(rename = "virtual-server-list", default)]
    pub servers: Vec<VirtualServer>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PortStatsEnvelope {
    pub port: PortStatsBody,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) struct PortStatsBody {
    #[serde(default)]
    pub port_number: u16,
    #[serde(default)]
    pub protocol: String,
    #[serde(default)]
    pub stats: StatsCounters,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct StatsCounters {
    #[serde(rename = "throughput-bits-per-sec")]
    pub throughput_bits_per_sec: u64,
    pub curr_conn: u64,
    pub total_conn: u64,
}

impl PortStatsBody {
    pub(crate) fn into_stats(self) -> PortStats {
        PortStats {
            port_number: self.port_number,
            protocol: self.protocol,
            throughput_bps: self.stats.throughput_bits_per_sec,
            current_connections: self.stats.curr_conn,
            total_connections: self.stats.total_conn,
        }
    }
}
