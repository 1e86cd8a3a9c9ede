//! Link-health worker.
//!
//! Runs beside the cycle thread at a slow period. It takes the same bus
//! lock as the cycle, counts the axes still exchanging process data and
//! asks the cycle for an audit when one is missing.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use tracing::{debug, warn};

use gantry_common::axis::AxisId;
use gantry_common::bus::{BusHandle, BusState};

use super::CycleError;
use super::handle::Shared;
use crate::error::Fault;
use crate::report::Reporter;

/// One look at the bus.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkHealth {
    /// Axes at SafeOp or above.
    pub healthy: usize,
    pub expected: usize,
    /// Axes that did not answer at all.
    pub offline: Vec<AxisId>,
}

impl LinkHealth {
    #[inline]
    pub fn is_degraded(&self) -> bool {
        self.healthy < self.expected
    }
}

/// Read every axis' bus state under one lock.
pub fn check_link(bus: &BusHandle, axis_count: usize) -> LinkHealth {
    let mut health = LinkHealth {
        expected: axis_count,
        ..LinkHealth::default()
    };
    let mut bus = bus.lock();
    for axis in 0..axis_count {
        match bus.axis_state(axis) {
            Ok(state) if state >= BusState::SafeOp => health.healthy += 1,
            Ok(BusState::Offline) => health.offline.push(axis),
            Ok(_) => {}
            Err(e) => debug!(axis, "state read failed: {e}"),
        }
    }
    health
}

/// Running link monitor; dropping `shutdown` ends it.
pub(crate) struct LinkMonitor {
    shutdown: Sender<()>,
    thread: JoinHandle<()>,
}

impl LinkMonitor {
    pub(crate) fn spawn(
        bus: BusHandle,
        axis_count: usize,
        interval: Duration,
        reporter: Reporter,
        shared: Arc<Shared>,
    ) -> Result<Self, CycleError> {
        let (shutdown, shutdown_rx) = bounded::<()>(1);
        let thread = thread::Builder::new()
            .name("gantry-link".into())
            .spawn(move || watch(bus, axis_count, interval, reporter, shared, shutdown_rx))
            .map_err(|e| CycleError::Spawn(format!("link monitor: {e}")))?;
        Ok(Self { shutdown, thread })
    }

    pub(crate) fn stop(self) {
        drop(self.shutdown);
        if self.thread.join().is_err() {
            warn!("Link monitor panicked");
        }
    }
}

fn watch(
    bus: BusHandle,
    axis_count: usize,
    interval: Duration,
    reporter: Reporter,
    shared: Arc<Shared>,
    shutdown: Receiver<()>,
) {
    debug!("Link monitor running every {interval:?}");
    loop {
        match shutdown.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
        let health = check_link(&bus, axis_count);
        for axis in &health.offline {
            warn!(axis, "Axis offline");
        }
        if health.is_degraded() {
            reporter.fault(&Fault::LinkDegraded {
                reason: format!("{}/{} axes responding", health.healthy, health.expected),
            });
            shared.request_audit();
        }
    }
    debug!("Link monitor stopped");
}
