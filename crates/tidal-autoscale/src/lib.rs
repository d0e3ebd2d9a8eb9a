//! tidal-autoscale: throughput-driven replica scaling.
//!
//! Samples the throughput of a load-balancer port, converts it to a replica
//! count, asks the workload controller for that count, and confirms the
//! change in the background while the next tick proceeds.
//!
//! # Scaling Algorithm
//!
//! ```text
//! rate_kbps = bits_per_second / 1000
//! raw       = floor(rate_kbps / rate_per_replica)
//!
//! if raw == 0:       raw = min_replicas     // no traffic floor
//! if raw < min:      raw = min  (warn)
//! if raw > max:      raw = max  (warn)
//!
//! if raw != current and no reconciliation pending:
//!     set_replicas(raw); start ReconcileMonitor(raw)
//! ```
//!
//! # Architecture
//!
//! ```text
//! ControlLoop
//!   ├── TelemetrySource   (throughput per tick)
//!   ├── WorkloadController (status per tick, set_replicas on change)
//!   ├── decide()          (pure decision)
//!   └── MonitorHandle     (at most one in flight)
//!       └── ReconcileMonitor task: poll status every 500ms until
//!           Confirmed | TimedOut | Failed | Cancelled
//! ```
//!
//! The tracked `DeploymentState` is shared with the in-flight monitor, which
//! only writes it on confirmation. The loop only refreshes it while no
//! monitor is pending.

pub mod control_loop;
pub mod decision;
pub mod error;
pub mod reconcile;

#[cfg(test)]
pub(crate) mod testing;

pub use control_loop::{ControlLoop, ControlLoopHandle, TickAction, TickCallback, TickReport};
pub use decision::{Clamp, ScalingDecision, decide};
pub use error::{AutoscaleError, AutoscaleResult};
pub use reconcile::{
    CANCEL_GRACE, MonitorHandle, POLL_INTERVAL, ReconcileMonitor, ReconcileOutcome, ReconcileState,
};
