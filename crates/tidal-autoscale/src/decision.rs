//! Scaling decision: throughput sample to target replica count.

use tidal_core::{DeploymentState, ScalingConfig, ThroughputSample};

/// Which bound the computed replica count was clamped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clamp {
    /// Computed count was below `min_replicas`.
    Low { computed: u64 },
    /// Computed count was above `max_replicas`.
    High { computed: u64 },
}

/// Outcome of evaluating one sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScalingDecision {
    pub target_replicas: u32,
    /// Replica count the decision was compared against.
    pub current_replicas: u32,
    pub clamp: Option<Clamp>,
}

impl ScalingDecision {
    /// Whether acting on this decision would change the replica count.
    pub fn is_change(&self) -> bool {
        self.target_replicas != self.current_replicas
    }
}

/// Compute the target replica count for `sample`.
///
/// `rate = bits_per_second / 1000` (kbps), `raw = floor(rate / rate_per_replica)`.
/// A zero result means no traffic and maps to `min_replicas` without a
/// bounds signal; anything else outside `[min, max]` is clamped and flagged.
///
/// Pure: the same inputs always give the same decision.
///
/// # Panics
///
/// `cfg` must have passed [`ScalingConfig::validate`]; a zero
/// `rate_per_replica` divides by zero.
pub fn decide(
    sample: &ThroughputSample,
    current: &DeploymentState,
    cfg: &ScalingConfig,
) -> ScalingDecision {
    debug_assert!(cfg.rate_per_replica > 0, "rate_per_replica must be validated");
    let raw = sample.kbps() / cfg.rate_per_replica;
    let min = u64::from(cfg.min_replicas);
    let max = u64::from(cfg.max_replicas);

    let (target, clamp) = if raw == 0 {
        (cfg.min_replicas, None)
    } else if raw < min {
        (cfg.min_replicas, Some(Clamp::Low { computed: raw }))
    } else if raw > max {
        (cfg.max_replicas, Some(Clamp::High { computed: raw }))
    } else {
        // raw <= max, which fits in u32.
        (raw as u32, None)
    };

    ScalingDecision {
        target_replicas: target,
        current_replicas: current.current_replicas,
        clamp,
    }
}
