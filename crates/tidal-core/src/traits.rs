//! Narrow interfaces to the load balancer and the workload controller.
//!
//! The autoscaler core only talks to the outside world through these two
//! traits. The aXAPI and Kubernetes clients implement them; tests use
//! in-memory fakes.

use async_trait::async_trait;

use crate::types::{DeploymentRef, DeploymentState, ThroughputSample, VirtualPort};

/// Source of throughput readings for a load-balancer endpoint.
#[async_trait]
pub trait TelemetrySource: Send + Sync {
    /// Read the current throughput of `endpoint`.
    async fn throughput(&self, endpoint: &VirtualPort) -> anyhow::Result<ThroughputSample>;
}

/// Controller that owns the replica count of a workload.
#[async_trait]
pub trait WorkloadController: Send + Sync {
    /// Read the current replica count of `target`.
    async fn status(&self, target: &DeploymentRef) -> anyhow::Result<DeploymentState>;

    /// Request `replicas` for `target`.
    ///
    /// Returns once the request has been accepted. Whether the workload
    /// actually converges is confirmed separately by polling `status`.
    async fn set_replicas(&self, target: &DeploymentRef, replicas: u32) -> anyhow::Result<()>;
}
