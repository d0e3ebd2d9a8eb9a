//! In-memory collaborators for unit tests.

use std::sync::Mutex;

use async_trait::async_trait;

use tidal_core::{
    DeploymentRef, DeploymentState, TelemetrySource, ThroughputSample, VirtualPort,
    WorkloadController,
};

/// Telemetry that returns a settable reading, or an error when unset.
pub(crate) struct FakeTelemetry {
    bps: Mutex<Option<u64>>,
}

impl FakeTelemetry {
    pub(crate) fn new(bps: u64) -> Self {
        Self {
            bps: Mutex::new(Some(bps)),
        }
    }

    pub(crate) fn set(&self, bps: Option<u64>) {
        *self.bps.lock().unwrap() = bps;
    }
}

#[async_trait]
impl TelemetrySource for FakeTelemetry {
    async fn throughput(&self, endpoint: &VirtualPort) -> anyhow::Result<ThroughputSample> {
        match *self.bps.lock().unwrap() {
            Some(bps) => Ok(ThroughputSample::new(endpoint.clone(), bps)),
            None => anyhow::bail!("device unreachable"),
        }
    }
}

#[derive(Default)]
struct WorkloadInner {
    current: u32,
    desired: Option<u32>,
    /// Status reads after a set before `desired` becomes current.
    converge_after: Option<u32>,
    polls_since_set: u32,
    status_calls: u32,
    set_calls: Vec<u32>,
    fail_status: bool,
    fail_set: bool,
}

/// Workload controller that converges after a fixed number of status reads.
pub(crate) struct FakeWorkload {
    inner: Mutex<WorkloadInner>,
}

impl FakeWorkload {
    /// `converge_after = None` never converges.
    pub(crate) fn new(current: u32, converge_after: Option<u32>) -> Self {
        Self {
            inner: Mutex::new(WorkloadInner {
                current,
                converge_after,
                ..Default::default()
            }),
        }
    }

    pub(crate) fn fail_status(&self, fail: bool) {
        self.inner.lock().unwrap().fail_status = fail;
    }

    pub(crate) fn fail_set(&self, fail: bool) {
        self.inner.lock().unwrap().fail_set = fail;
    }

    /// Pretend a pending request was applied out of band.
    pub(crate) fn set_current(&self, current: u32) {
        let mut inner = self.inner.lock().unwrap();
        inner.current = current;
        inner.desired = None;
    }

    pub(crate) fn set_calls(&self) -> Vec<u32> {
        self.inner.lock().unwrap().set_calls.clone()
    }

    pub(crate) fn status_calls(&self) -> u32 {
        self.inner.lock().unwrap().status_calls
    }
}

#[async_trait]
impl WorkloadController for FakeWorkload {
    async fn status(&self, target: &DeploymentRef) -> anyhow::Result<DeploymentState> {
        let mut inner = self.inner.lock().unwrap();
        inner.status_calls += 1;
        if inner.fail_status {
            anyhow::bail!("api server unavailable");
        }
        if let Some(desired) = inner.desired {
            inner.polls_since_set += 1;
            if inner
                .converge_after
                .is_some_and(|n| inner.polls_since_set >= n)
            {
                inner.current = desired;
                inner.desired = None;
            }
        }
        Ok(DeploymentState::new(target, inner.current))
    }

    async fn set_replicas(&self, _target: &DeploymentRef, replicas: u32) -> anyhow::Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_set {
            anyhow::bail!("scale request rejected");
        }
        inner.set_calls.push(replicas);
        inner.desired = Some(replicas);
        inner.polls_since_set = 0;
        Ok(())
    }
}
