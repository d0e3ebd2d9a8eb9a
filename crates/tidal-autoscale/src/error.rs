//! Autoscaler error types.

use thiserror::Error;

use tidal_core::{ConfigError, DeploymentRef, VirtualPort};

/// Errors that abort a tick or prevent the loop from starting.
#[derive(Debug, Error)]
pub enum AutoscaleError {
    #[error("throughput read failed for {endpoint}: {source}")]
    Telemetry {
        endpoint: VirtualPort,
        source: anyhow::Error,
    },

    #[error("status read failed for {deployment}: {source}")]
    Status {
        deployment: DeploymentRef,
        source: anyhow::Error,
    },

    #[error("adjusting {deployment} to {target} replicas failed: {source}")]
    Adjustment {
        deployment: DeploymentRef,
        target: u32,
        source: anyhow::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

pub type AutoscaleResult<T> = Result<T, AutoscaleError>;
