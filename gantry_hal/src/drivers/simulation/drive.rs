//! Simulated CiA-402 drive.
//!
//! Reacts to control words the way a servo drive does, one transition per
//! bus cycle, and moves its axis in profile-position or profile-velocity
//! mode while operation is enabled and the device is `Operational`.

use std::collections::HashMap;

use gantry_common::bus::cia402::ControlWord;
use gantry_common::bus::{AxisInput, AxisOutput, BusState, OperationMode, ParameterKey, Setpoint};

use super::physics::{AxisPhysics, MotionLimits};

/// Internal CiA-402 state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CiaState {
    SwitchOnDisabled,
    ReadyToSwitchOn,
    SwitchedOn,
    OperationEnabled,
    Fault,
}

impl CiaState {
    /// Status word reported for this state (remote + voltage bits set).
    pub const fn status_word(self) -> u16 {
        match self {
            Self::SwitchOnDisabled => 0x0250,
            Self::ReadyToSwitchOn => 0x0231,
            Self::SwitchedOn => 0x0233,
            Self::OperationEnabled => 0x0237,
            Self::Fault => 0x0218,
        }
    }
}

const TARGET_REACHED: u16 = 0x0400;

/// One simulated drive on the bus.
#[derive(Debug, Clone)]
pub struct SimulatedDrive {
    state: CiaState,
    bus_state: BusState,
    output: AxisOutput,
    last_control: u16,
    physics: AxisPhysics,
    target_position: f64,
    target_velocity: f64,
    params: HashMap<ParameterKey, i64>,
    control_log: Vec<u16>,
    refuse_enable: bool,
    hold_offline: bool,
}

impl SimulatedDrive {
    pub fn new(startup_velocity: u32, startup_acceleration: u32) -> Self {
        let mut params = HashMap::new();
        params.insert(ParameterKey::ModeOfOperation, OperationMode::ProfilePosition.code());
        params.insert(ParameterKey::ProfileVelocity, i64::from(startup_velocity));
        params.insert(ParameterKey::MaxProfileVelocity, i64::from(startup_velocity));
        params.insert(ParameterKey::ProfileAcceleration, i64::from(startup_acceleration));
        params.insert(ParameterKey::ProfileDeceleration, i64::from(startup_acceleration));
        Self {
            state: CiaState::SwitchOnDisabled,
            bus_state: BusState::Init,
            output: AxisOutput::halted(ControlWord::DISABLE),
            last_control: ControlWord::DISABLE,
            physics: AxisPhysics::default(),
            target_position: 0.0,
            target_velocity: 0.0,
            params,
            control_log: Vec::new(),
            refuse_enable: false,
            hold_offline: false,
        }
    }

    // ─── Process data ───────────────────────────────────────────────

    pub fn stage_output(&mut self, output: AxisOutput) {
        if self.control_log.last() != Some(&output.control_word) {
            self.control_log.push(output.control_word);
        }
        self.output = output;
    }

    pub fn input(&self) -> AxisInput {
        let mut status_word = self.state.status_word();
        if self.state == CiaState::OperationEnabled
            && self.physics.velocity == 0.0
            && (self.physics.position - self.target_position).abs() < 1.0
        {
            status_word |= TARGET_REACHED;
        }
        AxisInput {
            status_word,
            position: self.physics.position.round() as i32,
            velocity: self.physics.velocity.round() as i32,
            torque: 0,
        }
    }

    /// Apply staged outputs and advance the physics by `dt` seconds.
    ///
    /// Returns true when a new position setpoint was latched this cycle.
    pub fn cycle(&mut self, dt: f64) -> bool {
        if self.bus_state < BusState::SafeOp {
            self.physics.halt();
            return false;
        }
        let control = self.output.control_word;
        self.apply_control_word(control);
        let latched = self.latch_setpoint(control);
        self.last_control = control;

        if self.state != CiaState::OperationEnabled || self.bus_state != BusState::Operational {
            self.physics.halt();
            return latched;
        }
        let limits = self.limits();
        match self.output.mode {
            OperationMode::ProfilePosition => {
                self.physics.step_position(self.target_position, limits, dt);
            }
            OperationMode::ProfileVelocity => {
                self.physics.step_velocity(self.target_velocity, limits, dt);
            }
        }
        latched
    }

    fn apply_control_word(&mut self, control: u16) {
        use CiaState::*;

        let rising_reset = control & ControlWord::FAULT_RESET != 0
            && self.last_control & ControlWord::FAULT_RESET == 0;
        self.state = match (self.state, control & 0x008F) {
            (Fault, _) if rising_reset => SwitchOnDisabled,
            (Fault, _) => Fault,
            (_, cw) if cw & 0x0002 == 0 => SwitchOnDisabled,
            (SwitchOnDisabled | SwitchedOn | OperationEnabled, cw) if cw & 0x0087 == 0x0006 => {
                ReadyToSwitchOn
            }
            (ReadyToSwitchOn | OperationEnabled, 0x0007) => SwitchedOn,
            (SwitchedOn, 0x000F) if self.refuse_enable => SwitchedOn,
            (SwitchedOn, 0x000F) => OperationEnabled,
            (state, _) => state,
        };
    }

    fn latch_setpoint(&mut self, control: u16) -> bool {
        match self.output.setpoint {
            Setpoint::Position(target) => {
                let rising = control & ControlWord::NEW_SETPOINT != 0
                    && self.last_control & ControlWord::NEW_SETPOINT == 0;
                if rising {
                    self.target_position = f64::from(target);
                }
                rising
            }
            Setpoint::Velocity(v) => {
                self.target_velocity = f64::from(v);
                self.target_position = self.physics.position;
                false
            }
        }
    }

    fn limits(&self) -> MotionLimits {
        let param = |key| self.params.get(&key).copied().unwrap_or(0) as f64;
        let profile = param(ParameterKey::ProfileVelocity);
        let max = param(ParameterKey::MaxProfileVelocity);
        let max_velocity = match (profile > 0.0, max > 0.0) {
            (true, true) => profile.min(max),
            (true, false) => profile,
            (false, _) => max,
        };
        MotionLimits {
            max_velocity: match self.output.mode {
                OperationMode::ProfilePosition => max_velocity,
                OperationMode::ProfileVelocity if max > 0.0 => max,
                OperationMode::ProfileVelocity => f64::MAX,
            },
            acceleration: param(ParameterKey::ProfileAcceleration),
            deceleration: param(ParameterKey::ProfileDeceleration),
        }
    }

    // ─── Mailbox ────────────────────────────────────────────────────

    pub fn read_parameter(&self, key: ParameterKey) -> i64 {
        match key {
            ParameterKey::StatusWord => i64::from(self.input().status_word),
            ParameterKey::ActualVelocity => self.physics.velocity.round() as i64,
            ParameterKey::TargetVelocity => self.target_velocity as i64,
            _ => self.params.get(&key).copied().unwrap_or(0),
        }
    }

    pub fn write_parameter(&mut self, key: ParameterKey, value: i64) {
        if key == ParameterKey::TargetVelocity {
            self.target_velocity = value as f64;
        }
        self.params.insert(key, value);
    }

    // ─── Bus state ──────────────────────────────────────────────────

    pub fn bus_state(&self) -> BusState {
        self.bus_state
    }

    pub fn request_bus_state(&mut self, state: BusState) {
        if !self.hold_offline {
            self.bus_state = state;
        }
    }

    // ─── Inspection & fault injection ───────────────────────────────

    pub fn cia_state(&self) -> CiaState {
        self.state
    }

    /// Distinct control words seen, in order of arrival.
    pub fn control_log(&self) -> &[u16] {
        &self.control_log
    }

    pub fn clear_control_log(&mut self) {
        self.control_log.clear();
    }

    /// Position [counts].
    pub fn position(&self) -> f64 {
        self.physics.position
    }

    pub fn set_position(&mut self, counts: f64) {
        self.physics.position = counts;
        self.physics.velocity = 0.0;
        self.target_position = counts;
    }

    pub fn velocity(&self) -> f64 {
        self.physics.velocity
    }

    pub fn parameter(&self, key: ParameterKey) -> Option<i64> {
        self.params.get(&key).copied()
    }

    pub fn inject_fault(&mut self) {
        self.state = CiaState::Fault;
        self.physics.halt();
    }

    /// Keep the drive from ever reaching OperationEnabled.
    pub fn set_refuse_enable(&mut self, refuse: bool) {
        self.refuse_enable = refuse;
    }

    /// Drop to `state` and ignore state requests while `hold` is set.
    pub fn drop_link(&mut self, state: BusState, hold: bool) {
        self.bus_state = state;
        self.hold_offline = hold;
    }
}
