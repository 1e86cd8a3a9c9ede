//! Shared rig for the integration tests.

use std::sync::Arc;

use parking_lot::Mutex;

use gantry_common::bus::BusHandle;
use gantry_common::command::Command;
use gantry_common::event::{Event, Severity};
use gantry_control_unit::config::CoordinatorConfig;
use gantry_control_unit::cycle::{Coordinator, CoordinatorHandle};
use gantry_control_unit::session::Session;
use gantry_hal::SimulatedBus;

pub struct Rig {
    pub sim: Arc<Mutex<SimulatedBus>>,
    pub coordinator: Coordinator,
    pub handle: CoordinatorHandle,
}

impl Rig {
    pub fn new(config: &CoordinatorConfig) -> Self {
        let sim = Arc::new(Mutex::new(SimulatedBus::from_config(&config.bus)));
        let session = Session::open(BusHandle::from_shared(sim.clone()), config).unwrap();
        let (coordinator, handle) = Coordinator::new(session, config);
        Self {
            sim,
            coordinator,
            handle,
        }
    }

    /// Teleport axes [m] and let one tick read them back.
    pub fn place(&mut self, positions: &[f64]) {
        let scale = self.coordinator.session().scale();
        {
            let mut sim = self.sim.lock();
            for (axis, &p) in positions.iter().enumerate() {
                sim.set_position(axis, scale.to_counts(p));
            }
        }
        self.coordinator.tick_once();
    }

    /// Submit a command and run the tick that dispatches it.
    pub fn command(&mut self, command: Command) -> Vec<(Severity, String)> {
        self.handle.submit(command).unwrap();
        self.coordinator.tick_once();
        logs(&self.handle)
    }

    /// Tick until `pred` matches a log entry or `max_ticks` run out.
    pub fn tick_until(
        &mut self,
        max_ticks: usize,
        pred: impl Fn(Severity, &str) -> bool,
    ) -> Option<(Severity, String)> {
        for _ in 0..max_ticks {
            self.coordinator.tick_once();
            let hit = logs(&self.handle)
                .into_iter()
                .find(|(s, m)| pred(*s, m));
            if hit.is_some() {
                return hit;
            }
        }
        None
    }
}

/// Drain the log events, skipping position snapshots.
pub fn logs(handle: &CoordinatorHandle) -> Vec<(Severity, String)> {
    handle
        .events()
        .try_iter()
        .filter_map(|e| match e {
            Event::Log { severity, message } => Some((severity, message)),
            Event::Positions(_) => None,
        })
        .collect()
}

pub fn mentions(entries: &[(Severity, String)], severity: Severity, needle: &str) -> bool {
    entries
        .iter()
        .any(|(s, m)| *s == severity && m.contains(needle))
}
