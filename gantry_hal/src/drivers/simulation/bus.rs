//! Simulated bus master.
//!
//! The `SimulatedBus` implements [`FieldBus`] over a set of
//! [`SimulatedDrive`]s. Time only advances inside `transact()`, by a fixed
//! step, so tests are deterministic regardless of wall-clock settle delays.

use std::time::Duration;

use gantry_common::axis::AxisId;
use gantry_common::bus::{
    AxisInput, AxisOutput, BusConfig, BusError, BusState, FieldBus, ParameterKey,
};
use tracing::{debug, info, warn};

use super::drive::SimulatedDrive;

/// Default simulated time per transaction.
pub const DEFAULT_STEP: Duration = Duration::from_millis(5);

/// Software bus with CiA-402 drives on every axis.
#[derive(Debug)]
pub struct SimulatedBus {
    drives: Vec<SimulatedDrive>,
    inputs: Vec<AxisInput>,
    discovered: bool,
    step: Duration,
    transactions: u64,
    latches: Vec<(u64, AxisId)>,
}

impl SimulatedBus {
    /// Bus with `axis_count` drives at position 0.
    pub fn new(axis_count: usize) -> Self {
        Self::from_config(&BusConfig {
            axis_count,
            ..BusConfig::default()
        })
    }

    pub fn from_config(config: &BusConfig) -> Self {
        let drives = (0..config.axis_count)
            .map(|_| SimulatedDrive::new(config.startup_velocity, config.startup_acceleration))
            .collect::<Vec<_>>();
        Self {
            inputs: drives.iter().map(SimulatedDrive::input).collect(),
            drives,
            discovered: false,
            step: DEFAULT_STEP,
            transactions: 0,
            latches: Vec::new(),
        }
    }

    /// Override the simulated time per transaction.
    pub fn with_step(mut self, step: Duration) -> Self {
        self.step = step;
        self
    }

    /// Start with drives at these positions [counts].
    pub fn with_positions(mut self, positions: &[i32]) -> Self {
        for (drive, &counts) in self.drives.iter_mut().zip(positions) {
            drive.set_position(f64::from(counts));
        }
        self.refresh_inputs();
        self
    }

    fn drive(&self, axis: AxisId) -> Result<&SimulatedDrive, BusError> {
        let count = self.drives.len();
        self.drives
            .get(axis)
            .ok_or(BusError::InvalidAxis { axis, count })
    }

    fn drive_mut(&mut self, axis: AxisId) -> Result<&mut SimulatedDrive, BusError> {
        let count = self.drives.len();
        self.drives
            .get_mut(axis)
            .ok_or(BusError::InvalidAxis { axis, count })
    }

    fn refresh_inputs(&mut self) {
        self.inputs = self.drives.iter().map(SimulatedDrive::input).collect();
    }

    // ─── Test Hooks ─────────────────────────────────────────────────

    /// Inspect one drive. Panics on an unknown axis.
    pub fn device(&self, axis: AxisId) -> &SimulatedDrive {
        &self.drives[axis]
    }

    /// Mutable access to one drive. Panics on an unknown axis.
    pub fn device_mut(&mut self, axis: AxisId) -> &mut SimulatedDrive {
        &mut self.drives[axis]
    }

    /// Put a drive into fault.
    pub fn inject_fault(&mut self, axis: AxisId) {
        self.drives[axis].inject_fault();
        self.refresh_inputs();
    }

    /// Drop a drive to `state`; it follows later state requests again.
    pub fn drop_axis(&mut self, axis: AxisId, state: BusState) {
        warn!("sim: axis {axis} dropped to {state:?}");
        self.drives[axis].drop_link(state, false);
    }

    /// Take a drive offline and keep it there.
    pub fn hold_offline(&mut self, axis: AxisId) {
        warn!("sim: axis {axis} held offline");
        self.drives[axis].drop_link(BusState::Offline, true);
    }

    pub fn set_refuse_enable(&mut self, axis: AxisId, refuse: bool) {
        self.drives[axis].set_refuse_enable(refuse);
    }

    /// Teleport an axis [counts].
    pub fn set_position(&mut self, axis: AxisId, counts: i32) {
        self.drives[axis].set_position(f64::from(counts));
        self.refresh_inputs();
    }

    /// Distinct control words written to an axis, in order.
    pub fn control_log(&self, axis: AxisId) -> Vec<u16> {
        self.drives[axis].control_log().to_vec()
    }

    pub fn clear_logs(&mut self) {
        self.drives
            .iter_mut()
            .for_each(SimulatedDrive::clear_control_log);
        self.latches.clear();
    }

    /// Transactions since creation.
    pub fn transactions(&self) -> u64 {
        self.transactions
    }

    /// `(transaction, axis)` of every latched position setpoint, in order.
    pub fn setpoint_latches(&self) -> &[(u64, AxisId)] {
        &self.latches
    }

    pub fn axis_count(&self) -> usize {
        self.drives.len()
    }
}

impl FieldBus for SimulatedBus {
    fn name(&self) -> &'static str {
        "simulation"
    }

    fn version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    fn discover(&mut self) -> Result<usize, BusError> {
        if self.discovered {
            return Ok(self.drives.len());
        }
        for drive in &mut self.drives {
            drive.request_bus_state(BusState::PreOp);
        }
        self.discovered = true;
        self.refresh_inputs();
        info!("sim: discovered {} axes", self.drives.len());
        Ok(self.drives.len())
    }

    fn transact(&mut self) -> u16 {
        let dt = self.step.as_secs_f64();
        let mut wkc = 0u16;
        for (axis, drive) in self.drives.iter_mut().enumerate() {
            if drive.cycle(dt) {
                self.latches.push((self.transactions, axis));
            }
            if drive.bus_state() >= BusState::SafeOp {
                wkc += 1;
            }
        }
        self.refresh_inputs();
        self.transactions += 1;
        wkc
    }

    fn read_axis_input(&self, axis: AxisId) -> Result<AxisInput, BusError> {
        let count = self.inputs.len();
        self.inputs
            .get(axis)
            .copied()
            .ok_or(BusError::InvalidAxis { axis, count })
    }

    fn write_axis_output(&mut self, axis: AxisId, output: AxisOutput) -> Result<(), BusError> {
        self.drive_mut(axis)?.stage_output(output);
        Ok(())
    }

    fn read_parameter(&mut self, axis: AxisId, key: ParameterKey) -> Result<i64, BusError> {
        let drive = self.drive(axis)?;
        if drive.bus_state() < BusState::PreOp {
            return Err(BusError::Communication(format!(
                "axis {axis} mailbox unavailable in {:?}",
                drive.bus_state()
            )));
        }
        Ok(drive.read_parameter(key))
    }

    fn write_parameter(
        &mut self,
        axis: AxisId,
        key: ParameterKey,
        value: i64,
    ) -> Result<(), BusError> {
        let drive = self.drive_mut(axis)?;
        if drive.bus_state() < BusState::PreOp {
            return Err(BusError::Communication(format!(
                "axis {axis} mailbox unavailable in {:?}",
                drive.bus_state()
            )));
        }
        debug!("sim: axis {axis} {key} <- {value}");
        drive.write_parameter(key, value);
        Ok(())
    }

    fn axis_state(&mut self, axis: AxisId) -> Result<BusState, BusError> {
        Ok(self.drive(axis)?.bus_state())
    }

    fn set_axis_state(&mut self, axis: AxisId, state: BusState) -> Result<(), BusError> {
        self.drive_mut(axis)?.request_bus_state(state);
        Ok(())
    }

    fn shutdown(&mut self) -> Result<(), BusError> {
        for drive in &mut self.drives {
            drive.request_bus_state(BusState::Init);
        }
        info!("sim: bus shut down");
        Ok(())
    }
}
