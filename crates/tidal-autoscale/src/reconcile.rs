//! Reconciliation monitor: confirms a requested replica count took effect.
//!
//! After the control loop asks the workload controller for a new replica
//! count, it hands the target to a `ReconcileMonitor`. The monitor spawns a
//! background task that polls the controller every [`POLL_INTERVAL`] until
//! the observed count matches, the timeout elapses, a poll fails, or the
//! task is cancelled. The returned [`MonitorHandle`] is the only way to
//! observe or stop the task; dropping it cancels the task.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{RwLock, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use tidal_core::{DeploymentState, WorkloadController};

/// Period between status polls while a reconciliation is pending.
pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// How long [`MonitorHandle::cancel`] waits before aborting the task.
pub const CANCEL_GRACE: Duration = Duration::from_secs(5);

/// Shortest accepted poll period.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// `start + after`, or roughly thirty years out when that overflows.
pub(crate) fn instant_after(start: Instant, after: Duration) -> Instant {
    start
        .checked_add(after)
        .unwrap_or_else(|| start + Duration::from_secs(86_400 * 365 * 30))
}

/// Lifecycle of a single reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileState {
    /// Polling for the target replica count.
    Pending,
    /// The controller reported the target count.
    Confirmed,
    /// The timeout elapsed before the target was observed.
    TimedOut,
    /// A status poll failed.
    Failed,
    /// Stopped by the owner before reaching another terminal state.
    Cancelled,
}

impl ReconcileState {
    pub fn is_terminal(self) -> bool {
        self != ReconcileState::Pending
    }
}

/// Final report of a finished reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub state: ReconcileState,
    pub target: u32,
    /// Number of status polls that completed.
    pub polls: u32,
    /// Replica count seen on the last successful poll.
    pub last_observed: Option<u32>,
    pub elapsed: Duration,
    pub error: Option<String>,
}

/// Starts reconciliation tasks against a workload controller.
#[derive(Clone)]
pub struct ReconcileMonitor {
    workload: Arc<dyn WorkloadController>,
    poll_interval: Duration,
}

impl ReconcileMonitor {
    pub fn new(workload: Arc<dyn WorkloadController>) -> Self {
        Self {
            workload,
            poll_interval: POLL_INTERVAL,
        }
    }

    /// Override the poll period (tests use a short one). Periods below 1 ms
    /// are raised to 1 ms.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval.max(MIN_POLL_INTERVAL);
        self
    }

    /// Spawn a task confirming that `deployment` reaches `target` replicas
    /// within `timeout`.
    ///
    /// On confirmation the task writes `target` into `deployment`; on any
    /// other outcome it leaves `deployment` untouched.
    pub fn start(
        &self,
        target: u32,
        deployment: Arc<RwLock<DeploymentState>>,
        timeout: Duration,
    ) -> MonitorHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (state_tx, state_rx) = watch::channel(ReconcileState::Pending);

        let workload = Arc::clone(&self.workload);
        let poll_interval = self.poll_interval;

        let handle = tokio::spawn(async move {
            run_reconcile(
                target,
                deployment,
                workload,
                timeout,
                poll_interval,
                state_tx,
                shutdown_rx,
            )
            .await
        });

        MonitorHandle {
            target,
            state_rx,
            shutdown_tx,
            handle,
        }
    }
}

/// Owner's handle to an in-flight reconciliation task.
pub struct MonitorHandle {
    target: u32,
    state_rx: watch::Receiver<ReconcileState>,
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<ReconcileOutcome>,
}

impl MonitorHandle {
    /// Replica count being confirmed.
    pub fn target(&self) -> u32 {
        self.target
    }

    /// Latest state published by the task.
    pub fn state(&self) -> ReconcileState {
        *self.state_rx.borrow()
    }

    /// Whether the task is still polling.
    pub fn is_pending(&self) -> bool {
        self.state() == ReconcileState::Pending && !self.handle.is_finished()
    }

    /// Wait for the task to reach a terminal state.
    pub async fn wait(self) -> ReconcileOutcome {
        let target = self.target;
        // Keep the sender alive so the task is not cancelled by the drop.
        let _shutdown_tx = self.shutdown_tx;
        join_outcome(self.handle, target).await
    }

    /// Signal the task to stop and wait for it to exit.
    ///
    /// The task is aborted if it has not exited within [`CANCEL_GRACE`].
    pub async fn cancel(self) -> ReconcileOutcome {
        let _ = self.shutdown_tx.send(true);
        let abort = self.handle.abort_handle();
        match tokio::time::timeout(CANCEL_GRACE, join_outcome(self.handle, self.target)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                abort.abort();
                warn!(target = self.target, "reconciliation task aborted");
                aborted_outcome(self.target, ReconcileState::Cancelled, "aborted".to_string())
            }
        }
    }
}

async fn join_outcome(handle: JoinHandle<ReconcileOutcome>, target: u32) -> ReconcileOutcome {
    match handle.await {
        Ok(outcome) => outcome,
        Err(e) => {
            let state = if e.is_cancelled() {
                ReconcileState::Cancelled
            } else {
                ReconcileState::Failed
            };
            aborted_outcome(target, state, e.to_string())
        }
    }
}

fn aborted_outcome(target: u32, state: ReconcileState, error: String) -> ReconcileOutcome {
    ReconcileOutcome {
        state,
        target,
        polls: 0,
        last_observed: None,
        elapsed: Duration::ZERO,
        error: Some(error),
    }
}

/// Poll loop for one reconciliation.
async fn run_reconcile(
    target: u32,
    deployment: Arc<RwLock<DeploymentState>>,
    workload: Arc<dyn WorkloadController>,
    timeout: Duration,
    poll_interval: Duration,
    state_tx: watch::Sender<ReconcileState>,
    mut shutdown: watch::Receiver<bool>,
) -> ReconcileOutcome {
    let started = Instant::now();
    let reference = deployment.read().await.reference();

    let deadline = tokio::time::sleep_until(instant_after(started, timeout));
    tokio::pin!(deadline);

    // First poll happens one interval after the request, not immediately.
    let mut ticker =
        tokio::time::interval_at(instant_after(started, poll_interval), poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut polls = 0u32;
    let mut last_observed = None;
    let mut error = None;

    debug!(deployment = %reference, target, ?timeout, "reconciliation started");

    let state = loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => break ReconcileState::Cancelled,
            _ = &mut deadline => break ReconcileState::TimedOut,
            _ = ticker.tick() => {
                let result = tokio::select! {
                    biased;
                    _ = shutdown.changed() => break ReconcileState::Cancelled,
                    _ = &mut deadline => break ReconcileState::TimedOut,
                    result = workload.status(&reference) => result,
                };
                polls += 1;

                match result {
                    Ok(status) => {
                        last_observed = Some(status.current_replicas);
                        if status.current_replicas == target {
                            deployment.write().await.current_replicas = target;
                            break ReconcileState::Confirmed;
                        }
                        debug!(
                            deployment = %reference,
                            observed = status.current_replicas,
                            target,
                            "waiting for replicas"
                        );
                    }
                    Err(e) => {
                        error = Some(e.to_string());
                        break ReconcileState::Failed;
                    }
                }
            }
        }
    };

    let elapsed = started.elapsed();
    match state {
        ReconcileState::Confirmed => {
            info!(
                deployment = %reference,
                replicas = target,
                polls,
                "adjustment of deployment finished"
            );
        }
        ReconcileState::TimedOut => {
            warn!(
                deployment = %reference,
                target,
                observed = ?last_observed,
                ?timeout,
                "adjustment of replicas timed out"
            );
        }
        ReconcileState::Failed => {
            error!(
                deployment = %reference,
                target,
                error = error.as_deref().unwrap_or_default(),
                "status poll failed during reconciliation"
            );
        }
        ReconcileState::Cancelled => {
            debug!(deployment = %reference, target, "reconciliation cancelled");
        }
        ReconcileState::Pending => {}
    }

    let _ = state_tx.send(state);

    ReconcileOutcome {
        state,
        target,
        polls,
        last_observed,
        elapsed,
        error,
    }
}
