//! Control loop: periodic sample, decide, adjust.
//!
//! `ControlLoop` owns the tracked `DeploymentState` and the single in-flight
//! reconciliation. Each tick reads throughput and the current replica count,
//! runs [`decide`], and requests a new count only when the target differs
//! and no reconciliation is pending. Read failures abort the tick, never the
//! loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{RwLock, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, trace, warn};

use tidal_core::{DeploymentState, ScalingConfig, TelemetrySource, WorkloadController};

use crate::decision::{Clamp, decide};
use crate::error::{AutoscaleError, AutoscaleResult};
use crate::reconcile::{MonitorHandle, ReconcileMonitor, ReconcileOutcome, instant_after};

/// Callback invoked with the report of every completed tick.
pub type TickCallback = Arc<dyn Fn(&TickReport) + Send + Sync>;

/// What a tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickAction {
    /// A read failed; no decision was made.
    Skipped { reason: String },
    /// Target equals the current replica count.
    Unchanged,
    /// Target differs but a reconciliation is still pending.
    Deferred { pending_target: u32 },
    /// A new replica count was requested and a monitor started.
    Adjusted { from: u32, to: u32 },
    /// The replica request itself failed.
    AdjustFailed { target: u32, reason: String },
}

/// Summary of one tick, delivered to the tick callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub tick: u64,
    pub bits_per_second: Option<u64>,
    pub observed_replicas: Option<u32>,
    pub target_replicas: Option<u32>,
    pub action: TickAction,
}

impl TickReport {
    fn new(tick: u64) -> Self {
        Self {
            tick,
            bits_per_second: None,
            observed_replicas: None,
            target_replicas: None,
            action: TickAction::Unchanged,
        }
    }
}

/// Drives ticks for one deployment.
pub struct ControlLoop {
    config: Arc<ScalingConfig>,
    telemetry: Arc<dyn TelemetrySource>,
    workload: Arc<dyn WorkloadController>,
    monitor: ReconcileMonitor,
    /// Shared with the in-flight monitor, which writes it on confirmation.
    state: Arc<RwLock<DeploymentState>>,
    in_flight: Option<MonitorHandle>,
    ticks: u64,
    on_tick: Option<TickCallback>,
}

impl ControlLoop {
    /// Create a control loop. Fails if `config` violates its invariants.
    pub fn new(
        config: ScalingConfig,
        telemetry: Arc<dyn TelemetrySource>,
        workload: Arc<dyn WorkloadController>,
    ) -> AutoscaleResult<Self> {
        config.validate()?;
        let state = DeploymentState::new(&config.deployment, 0);

        Ok(Self {
            monitor: ReconcileMonitor::new(Arc::clone(&workload)),
            config: Arc::new(config),
            telemetry,
            workload,
            state: Arc::new(RwLock::new(state)),
            in_flight: None,
            ticks: 0,
            on_tick: None,
        })
    }

    /// Set a callback invoked after every tick.
    pub fn with_callback(mut self, callback: TickCallback) -> Self {
        self.on_tick = Some(callback);
        self
    }

    /// Override the reconciliation poll period.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.monitor = self.monitor.with_poll_interval(poll_interval);
        self
    }

    pub fn config(&self) -> &ScalingConfig {
        &self.config
    }

    /// Shared handle to the tracked deployment state.
    pub fn state(&self) -> Arc<RwLock<DeploymentState>> {
        Arc::clone(&self.state)
    }

    /// Whether a reconciliation is still polling.
    pub fn reconciliation_pending(&self) -> bool {
        self.in_flight.as_ref().is_some_and(MonitorHandle::is_pending)
    }

    /// Fetch the deployment's current replica count as the starting state.
    pub async fn initialize(&mut self) -> AutoscaleResult<DeploymentState> {
        let status = self
            .workload
            .status(&self.config.deployment)
            .await
            .map_err(|source| AutoscaleError::Status {
                deployment: self.config.deployment.clone(),
                source,
            })?;

        *self.state.write().await = status.clone();
        info!(
            deployment = %self.config.deployment,
            replicas = status.current_replicas,
            "initial deployment state loaded"
        );
        Ok(status)
    }

    /// Run one tick and return its report.
    pub async fn run_tick(&mut self) -> TickReport {
        let mut report = TickReport::new(self.ticks);
        self.ticks += 1;

        self.reap_finished().await;

        if let Err(e) = self.tick(&mut report).await {
            error!(tick = report.tick, error = %e, "tick aborted");
            report.action = TickAction::Skipped {
                reason: e.to_string(),
            };
        }

        if let Some(ref cb) = self.on_tick {
            cb(&report);
        }
        report
    }

    async fn tick(&mut self, report: &mut TickReport) -> AutoscaleResult<()> {
        let cfg = Arc::clone(&self.config);

        let sample = self
            .telemetry
            .throughput(&cfg.endpoint)
            .await
            .map_err(|source| AutoscaleError::Telemetry {
                endpoint: cfg.endpoint.clone(),
                source,
            })?;
        report.bits_per_second = Some(sample.bits_per_second);

        let observed = self
            .workload
            .status(&cfg.deployment)
            .await
            .map_err(|source| AutoscaleError::Status {
                deployment: cfg.deployment.clone(),
                source,
            })?;
        report.observed_replicas = Some(observed.current_replicas);

        trace!(
            replicas = observed.current_replicas,
            throughput = sample.bits_per_second,
            "sample"
        );

        let pending = self.reconciliation_pending();
        if !pending {
            *self.state.write().await = observed;
        }
        let current = self.state.read().await.clone();

        let decision = decide(&sample, &current, &cfg);
        report.target_replicas = Some(decision.target_replicas);
        debug!(
            deployment = %cfg.deployment,
            kbps = sample.kbps(),
            current = decision.current_replicas,
            target = decision.target_replicas,
            "replicas needed"
        );

        match decision.clamp {
            Some(Clamp::Low { computed }) => warn!(
                computed,
                min = cfg.min_replicas,
                "tried to adjust replicas below minimum, adjusting to minimum"
            ),
            Some(Clamp::High { computed }) => warn!(
                computed,
                max = cfg.max_replicas,
                "tried to adjust replicas above maximum, adjusting to maximum"
            ),
            None => {}
        }

        if !decision.is_change() {
            report.action = TickAction::Unchanged;
            return Ok(());
        }

        if pending {
            let pending_target = self
                .in_flight
                .as_ref()
                .map(MonitorHandle::target)
                .unwrap_or(decision.target_replicas);
            debug!(
                deployment = %cfg.deployment,
                pending_target,
                wanted = decision.target_replicas,
                "reconciliation pending, deferring adjustment"
            );
            report.action = TickAction::Deferred { pending_target };
            return Ok(());
        }

        let target = decision.target_replicas;
        info!(
            deployment = %cfg.deployment,
            from = current.current_replicas,
            to = target,
            "adjusting deployment replicas"
        );

        if let Err(source) = self.workload.set_replicas(&cfg.deployment, target).await {
            let e = AutoscaleError::Adjustment {
                deployment: cfg.deployment.clone(),
                target,
                source,
            };
            error!(error = %e, "replica adjustment request failed");
            report.action = TickAction::AdjustFailed {
                target,
                reason: e.to_string(),
            };
            return Ok(());
        }

        let handle = self
            .monitor
            .start(target, Arc::clone(&self.state), cfg.adjustment_timeout);
        self.in_flight = Some(handle);
        report.action = TickAction::Adjusted {
            from: current.current_replicas,
            to: target,
        };
        Ok(())
    }

    /// Drop the in-flight handle once its task has finished.
    async fn reap_finished(&mut self) {
        if self.in_flight.as_ref().is_some_and(|m| !m.is_pending())
            && let Some(handle) = self.in_flight.take()
        {
            let outcome = handle.wait().await;
            debug!(state = ?outcome.state, target = outcome.target, "reconciliation reaped");
        }
    }

    /// Wait for the in-flight reconciliation, if any, to finish.
    pub async fn wait_for_reconciliation(&mut self) -> Option<ReconcileOutcome> {
        match self.in_flight.take() {
            Some(handle) => Some(handle.wait().await),
            None => None,
        }
    }

    /// Cancel the in-flight reconciliation, if any.
    pub async fn cancel_reconciliation(&mut self) -> Option<ReconcileOutcome> {
        match self.in_flight.take() {
            Some(handle) => Some(handle.cancel().await),
            None => None,
        }
    }

    /// Tick every `check_interval` until `shutdown` fires, then cancel any
    /// pending reconciliation.
    ///
    /// The first tick happens one interval after the call; [`start`] runs
    /// tick 0 before handing off to this loop.
    ///
    /// [`start`]: ControlLoop::start
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let period = self.config.check_interval;
        let first = instant_after(tokio::time::Instant::now(), period);
        let mut interval = tokio::time::interval_at(first, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            interval_secs = period.as_secs(),
            deployment = %self.config.deployment,
            "control loop started"
        );

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.run_tick().await;
                }
                _ = shutdown.changed() => {
                    info!("control loop shutting down");
                    break;
                }
            }
        }

        if let Some(outcome) = self.cancel_reconciliation().await {
            debug!(
                state = ?outcome.state,
                target = outcome.target,
                "pending reconciliation stopped"
            );
        }
    }

    /// Load the initial state, run tick 0, then spawn the periodic loop.
    ///
    /// Fails only if the initial state cannot be read.
    pub async fn start(mut self) -> AutoscaleResult<ControlLoopHandle> {
        self.initialize().await?;
        self.run_tick().await;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(self.run(shutdown_rx));

        Ok(ControlLoopHandle {
            shutdown_tx,
            handle,
        })
    }
}

/// Owner's handle to a running control loop.
pub struct ControlLoopHandle {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl ControlLoopHandle {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stop the timer and any pending reconciliation, and wait for both.
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.handle.await {
            error!(error = %e, "control loop task failed");
        }
        info!("control loop stopped");
    }
}
