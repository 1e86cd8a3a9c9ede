//! Process-data and parameter types exchanged with a field bus.

use serde::{Deserialize, Serialize};

use crate::consts::{COUNTS_PER_METER, MAX_AXES};

/// Bus-level device state, distinct from the drive's motion-control state.
///
/// Ordered so that `state >= BusState::SafeOp` reads naturally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusState {
    /// Device does not answer.
    Offline,
    Init,
    PreOp,
    SafeOp,
    Operational,
}

impl BusState {
    /// States walked, in order, to bring a device back to `Operational`.
    pub const RECOVERY_PATH: [BusState; 4] = [
        BusState::Init,
        BusState::PreOp,
        BusState::SafeOp,
        BusState::Operational,
    ];
}

/// Mode of operation (object 0x6060).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationMode {
    #[default]
    ProfilePosition,
    ProfileVelocity,
}

impl OperationMode {
    /// Value written to object 0x6060.
    pub const fn code(self) -> i64 {
        match self {
            Self::ProfilePosition => 1,
            Self::ProfileVelocity => 3,
        }
    }
}

/// Cyclic inputs of one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AxisInput {
    pub status_word: u16,
    /// Actual position [counts].
    pub position: i32,
    /// Actual velocity [counts/s].
    pub velocity: i32,
    /// Actual torque [per mille of rated].
    pub torque: i16,
}

/// Setpoint carried by an [`AxisOutput`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Setpoint {
    /// Target position [counts].
    Position(i32),
    /// Target velocity [counts/s].
    Velocity(i32),
}

/// Cyclic outputs of one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisOutput {
    pub control_word: u16,
    pub setpoint: Setpoint,
    pub mode: OperationMode,
}

impl AxisOutput {
    /// Control word with a zero velocity setpoint.
    pub const fn halted(control_word: u16) -> Self {
        Self {
            control_word,
            setpoint: Setpoint::Velocity(0),
            mode: OperationMode::ProfileVelocity,
        }
    }
}

/// Acyclic (mailbox) parameters the coordinator reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterKey {
    ModeOfOperation,
    ProfileVelocity,
    MaxProfileVelocity,
    ProfileAcceleration,
    ProfileDeceleration,
    TargetVelocity,
    ActualVelocity,
    StatusWord,
}

impl ParameterKey {
    /// Object dictionary index.
    pub const fn index(self) -> u16 {
        match self {
            Self::ModeOfOperation => 0x6060,
            Self::ProfileVelocity => 0x6081,
            Self::MaxProfileVelocity => 0x607F,
            Self::ProfileAcceleration => 0x6083,
            Self::ProfileDeceleration => 0x6084,
            Self::TargetVelocity => 0x60FF,
            Self::ActualVelocity => 0x606C,
            Self::StatusWord => 0x6041,
        }
    }
}

impl std::fmt::Display for ParameterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}(0x{:04X})", self, self.index())
    }
}

/// Bus selection and sizing.
///
/// # TOML Example
///
/// ```toml
/// [bus]
/// driver = "simulation"
/// axis_count = 4
/// counts_per_meter = 792628.75
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Registered driver name.
    pub driver: String,
    /// Axes the simulation driver creates; for real buses, the count the
    /// session expects to discover (0 accepts whatever is found).
    pub axis_count: usize,
    /// Discovery fails above this many axes.
    pub max_axes: usize,
    pub counts_per_meter: f64,
    /// Mode written to every drive at session start.
    pub operation_mode: OperationMode,
    /// Start-up profile velocity [counts/s].
    pub startup_velocity: u32,
    /// Start-up acceleration/deceleration [counts/s²].
    pub startup_acceleration: u32,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            driver: "simulation".to_string(),
            axis_count: 4,
            max_axes: MAX_AXES,
            counts_per_meter: COUNTS_PER_METER,
            operation_mode: OperationMode::default(),
            startup_velocity: 80_000,
            startup_acceleration: 6_000,
        }
    }
}
