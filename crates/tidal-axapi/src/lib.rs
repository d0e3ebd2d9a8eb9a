//! tidal-axapi: A10 Thunder aXAPI v3 client.
//!
//! Logs in with device credentials, keeps the session signature, and reads
//! SLB objects and virtual-port statistics. [`ThunderClient`] implements
//! [`tidal_core::TelemetrySource`] by reporting the
//! `throughput-bits-per-sec` counter of the configured virtual port.

pub mod client;
pub mod error;
pub mod slb;

pub use client::ThunderClient;
pub use error::{AxapiError, AxapiResult};
pub use slb::{Member, PortStats, Server, ServiceGroup, VirtualServer, VirtualServerPort};
