//! Bus session: discovered axes, their readback and their staged outputs.
//!
//! The [`Session`] is the single owner of per-axis state. The drive state
//! machine, the scheduler and the safety supervisor borrow it; control
//! surfaces only ever see copies (see [`Session::snapshot`]).

use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use gantry_common::axis::{AxisId, DriveState, PositionScale};
use gantry_common::bus::cia402::ControlWord;
use gantry_common::bus::{
    AxisInput, AxisOutput, BusError, BusHandle, BusState, OperationMode, ParameterKey, Setpoint,
};
use gantry_common::consts::CYCLE_TIME_MS;
use gantry_common::event::{AxisSnapshot, PositionSnapshot};
use gantry_common::topology::Topology;

use crate::config::CoordinatorConfig;
use crate::error::SessionError;

/// Checks of the bus state while waiting for Operational at start-up.
const OPERATIONAL_CHECKS: u32 = 40;

/// One discovered axis.
#[derive(Debug, Clone)]
pub struct Axis {
    pub id: AxisId,
    /// Last readback.
    pub input: AxisInput,
    /// Position from the last readback [m].
    pub position: f64,
    pub drive_state: DriveState,
    /// Bus state as of the last audit.
    pub bus_state: BusState,
    /// Outputs staged for the next transaction.
    pub output: AxisOutput,
}

impl Axis {
    fn new(id: AxisId) -> Self {
        Self {
            id,
            input: AxisInput::default(),
            position: 0.0,
            drive_state: DriveState::Unknown,
            bus_state: BusState::Offline,
            output: AxisOutput::halted(ControlWord::DISABLE),
        }
    }
}

/// Axes of one bus plus the topology they are arranged in.
#[derive(Debug)]
pub struct Session {
    bus: BusHandle,
    topology: Topology,
    scale: PositionScale,
    axes: Vec<Axis>,
    cycle: Duration,
}

impl Session {
    /// Session over an already discovered bus, without bring-up.
    ///
    /// The axis count is taken from `topology`.
    pub fn new(bus: BusHandle, topology: Topology, scale: PositionScale) -> Self {
        let axes = (0..topology.axis_count()).map(Axis::new).collect();
        let mut session = Self {
            bus,
            topology,
            scale,
            axes,
            cycle: Duration::from_millis(CYCLE_TIME_MS),
        };
        session.refresh();
        session
    }

    /// Period used to pace transactions during [`dwell`](Self::dwell).
    pub fn with_cycle(mut self, cycle: Duration) -> Self {
        self.cycle = cycle;
        self
    }

    /// Discover the bus and bring every axis to Operational.
    ///
    /// 1. Discover; zero axes or more than `bus.max_axes` is fatal
    /// 2. Neutral outputs: control word 0, velocity 0
    /// 3. Start-up parameters: mode, velocities, acceleration, deceleration
    /// 4. Request Operational and poll the states
    /// 5. Settle; axes still not Operational are warned about
    pub fn open(bus: BusHandle, config: &CoordinatorConfig) -> Result<Self, SessionError> {
        let found = bus.lock().discover()?;
        if found == 0 {
            return Err(SessionError::NoAxes);
        }
        if found > config.bus.max_axes {
            return Err(SessionError::TooManyAxes {
                found,
                max: config.bus.max_axes,
            });
        }
        if config.bus.axis_count != 0 && config.bus.axis_count != found {
            warn!(
                "Discovered {found} axes, configuration expects {}",
                config.bus.axis_count
            );
        }
        info!("Discovered {found} axes");

        let topology = Topology::new(config.topology.layout_mode(), found);
        let scale = PositionScale::new(config.bus.counts_per_meter);
        let mut session = Self::new(bus, topology, scale)
            .with_cycle(Duration::from_millis(config.timing.cycle_ms));

        for axis in 0..found {
            session.stage(axis, AxisOutput::halted(ControlWord::DISABLE));
        }
        session.write_startup_parameters(config)?;
        session.request_operational()?;

        thread::sleep(Duration::from_millis(config.timing.startup_settle_ms));
        session.transact();
        for axis in session.refresh_bus_states()? {
            warn!("Axis {axis} not Operational after start-up");
        }
        info!(
            "Session open: {} axes, layout {}",
            found,
            config.topology.layout_mode().name()
        );
        Ok(session)
    }

    fn write_startup_parameters(&mut self, config: &CoordinatorConfig) -> Result<(), BusError> {
        let velocity = i64::from(config.bus.startup_velocity);
        let acceleration = i64::from(config.bus.startup_acceleration);
        let params = [
            (ParameterKey::ModeOfOperation, config.bus.operation_mode.code()),
            (ParameterKey::ProfileVelocity, velocity),
            (ParameterKey::MaxProfileVelocity, velocity),
            (ParameterKey::ProfileAcceleration, acceleration),
            (ParameterKey::ProfileDeceleration, acceleration),
        ];
        let mut bus = self.bus.lock();
        for axis in 0..self.axes.len() {
            for (key, value) in params {
                bus.write_parameter(axis, key, value)?;
            }
        }
        debug!("Start-up parameters written to {} axes", self.axes.len());
        Ok(())
    }

    fn request_operational(&mut self) -> Result<(), BusError> {
        {
            let mut bus = self.bus.lock();
            for axis in 0..self.axes.len() {
                bus.set_axis_state(axis, BusState::Operational)?;
            }
        }
        for check in 1..=OPERATIONAL_CHECKS {
            self.transact();
            if self.refresh_bus_states()?.is_empty() {
                debug!("All axes Operational after {check} checks");
                break;
            }
            thread::sleep(self.cycle);
        }
        Ok(())
    }

    /// Write Init to every axis and release the master.
    pub fn close(&mut self) -> Result<(), BusError> {
        let mut bus = self.bus.lock();
        for axis in 0..self.axes.len() {
            bus.set_axis_state(axis, BusState::Init)?;
        }
        bus.shutdown()?;
        info!("Session closed");
        Ok(())
    }

    // ─── Accessors ──────────────────────────────────────────────────

    pub fn bus(&self) -> &BusHandle {
        &self.bus
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn scale(&self) -> PositionScale {
        self.scale
    }

    #[inline]
    pub fn axis_count(&self) -> usize {
        self.axes.len()
    }

    #[inline]
    pub fn contains(&self, axis: AxisId) -> bool {
        axis < self.axes.len()
    }

    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    pub fn axis(&self, axis: AxisId) -> Option<&Axis> {
        self.axes.get(axis)
    }

    /// Readback position [m].
    pub fn position(&self, axis: AxisId) -> Option<f64> {
        self.axes.get(axis).map(|a| a.position)
    }

    /// Readback positions of every axis, indexed by id [m].
    pub fn positions(&self) -> Vec<f64> {
        self.axes.iter().map(|a| a.position).collect()
    }

    pub fn status_word(&self, axis: AxisId) -> Option<u16> {
        self.axes.get(axis).map(|a| a.input.status_word)
    }

    // ─── Process Data ───────────────────────────────────────────────

    /// One bus transaction followed by a readback refresh.
    ///
    /// Returns the working counter.
    pub fn transact(&mut self) -> u16 {
        let wkc = {
            let mut bus = self.bus.lock();
            for axis in &self.axes {
                if let Err(e) = bus.write_axis_output(axis.id, axis.output) {
                    debug!("axis {}: output not staged: {e}", axis.id);
                }
            }
            bus.transact()
        };
        self.refresh();
        wkc
    }

    /// Copy the latest inputs into the axes.
    pub fn refresh(&mut self) {
        let bus = self.bus.lock();
        for axis in &mut self.axes {
            if let Ok(input) = bus.read_axis_input(axis.id) {
                axis.input = input;
                axis.position = self.scale.to_meters(input.position);
                axis.drive_state = DriveState::from_status(input.status_word);
            }
        }
    }

    /// Read every axis' bus state; returns the axes not Operational.
    pub fn refresh_bus_states(&mut self) -> Result<Vec<AxisId>, BusError> {
        let mut bus = self.bus.lock();
        let mut dropped = Vec::new();
        for axis in &mut self.axes {
            axis.bus_state = bus.axis_state(axis.id)?;
            if axis.bus_state != BusState::Operational {
                dropped.push(axis.id);
            }
        }
        Ok(dropped)
    }

    /// Keep transacting for `duration`; always at least once.
    pub fn dwell(&mut self, duration: Duration) {
        let deadline = Instant::now() + duration;
        loop {
            self.transact();
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            thread::sleep((deadline - now).min(self.cycle));
        }
    }

    fn stage(&mut self, axis: AxisId, output: AxisOutput) {
        if let Some(a) = self.axes.get_mut(axis) {
            a.output = output;
        }
    }

    /// Change only the control word of the staged output.
    pub fn write_control(&mut self, axis: AxisId, control_word: u16) {
        if let Some(a) = self.axes.get_mut(axis) {
            a.output.control_word = control_word;
        }
    }

    /// Stage a velocity setpoint in profile-velocity mode.
    pub fn write_velocity(&mut self, axis: AxisId, velocity: i32) {
        if let Some(a) = self.axes.get_mut(axis) {
            a.output.setpoint = Setpoint::Velocity(velocity);
            a.output.mode = OperationMode::ProfileVelocity;
        }
    }

    /// Stage a profile-position target [m] with the given control word.
    pub fn write_target(&mut self, axis: AxisId, target: f64, control_word: u16) {
        let counts = self.scale.to_counts(target);
        self.stage(
            axis,
            AxisOutput {
                control_word,
                setpoint: Setpoint::Position(counts),
                mode: OperationMode::ProfilePosition,
            },
        );
    }

    // ─── Mailbox ────────────────────────────────────────────────────

    pub fn write_parameter(
        &self,
        axis: AxisId,
        key: ParameterKey,
        value: i64,
    ) -> Result<(), BusError> {
        self.bus.lock().write_parameter(axis, key, value)
    }

    pub fn read_parameter(&self, axis: AxisId, key: ParameterKey) -> Result<i64, BusError> {
        self.bus.lock().read_parameter(axis, key)
    }

    pub fn axis_state(&self, axis: AxisId) -> Result<BusState, BusError> {
        self.bus.lock().axis_state(axis)
    }

    pub fn set_axis_state(&self, axis: AxisId, state: BusState) -> Result<(), BusError> {
        self.bus.lock().set_axis_state(axis, state)
    }

    /// Copy of every axis for the control surface.
    pub fn snapshot(&self, cycle: u64) -> PositionSnapshot {
        PositionSnapshot {
            cycle,
            axes: self
                .axes
                .iter()
                .map(|a| AxisSnapshot {
                    axis: a.id,
                    position: a.position,
                    status_word: a.input.status_word,
                    drive_state: a.drive_state,
                    bus_state: a.bus_state,
                })
                .collect(),
        }
    }
}
