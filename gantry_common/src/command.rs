//! Commands accepted by the coordinator and the move requests they carry.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::axis::AxisId;

/// Speed/acceleration/deceleration triple, in device units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotionProfile {
    /// Profile velocity [counts/s].
    pub speed: u32,
    /// [counts/s²]
    pub acceleration: u32,
    /// [counts/s²]
    pub deceleration: u32,
}

impl MotionProfile {
    pub const fn new(speed: u32, acceleration: u32, deceleration: u32) -> Self {
        Self {
            speed,
            acceleration,
            deceleration,
        }
    }

    /// Every component divided by `divisor`; 0 is treated as 1.
    pub const fn divided(self, divisor: u32) -> Self {
        let d = if divisor == 0 { 1 } else { divisor };
        Self {
            speed: self.speed / d,
            acceleration: self.acceleration / d,
            deceleration: self.deceleration / d,
        }
    }
}

impl Default for MotionProfile {
    fn default() -> Self {
        Self::new(125_000, 62_500, 62_500)
    }
}

/// How an execution plan is started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Start all axes level by level, then wait for all of them.
    #[default]
    Phased,
    /// Start and wait for one axis at a time.
    Sequential,
}

/// Multi-axis absolute move.
///
/// Targets are in meters; axes absent from `targets` are not touched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveRequest {
    pub targets: BTreeMap<AxisId, f64>,
    #[serde(default)]
    pub profile: MotionProfile,
    /// Slows interior formation members; 0 and 1 mean "no slowdown".
    #[serde(default = "default_divisor")]
    pub divisor: u32,
    #[serde(default)]
    pub mode: ExecutionMode,
    /// Shown in logs and events.
    #[serde(default)]
    pub label: String,
}

fn default_divisor() -> u32 {
    1
}

impl MoveRequest {
    pub fn new(targets: BTreeMap<AxisId, f64>, profile: MotionProfile) -> Self {
        Self {
            targets,
            profile,
            divisor: 1,
            mode: ExecutionMode::Phased,
            label: String::new(),
        }
    }

    /// Request from a dense target vector (index = axis id).
    pub fn from_positions(positions: &[f64], profile: MotionProfile) -> Self {
        Self::new(positions.iter().copied().enumerate().collect(), profile)
    }

    pub fn with_divisor(mut self, divisor: u32) -> Self {
        self.divisor = divisor;
        self
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

/// Work item submitted to the coordinator.
///
/// Velocities are device units [counts/s]; the sign is implied by the
/// variant.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    EnableAll,
    DisableAll,
    ResetFaults,
    CheckStatus,
    MoveForward { axis: AxisId, velocity: i32 },
    MoveBackward { axis: AxisId, velocity: i32 },
    StopVelocity { axis: AxisId },
    /// Scheduled multi-axis absolute move.
    Move(MoveRequest),
}

impl Command {
    /// Short name for logs.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::EnableAll => "enable_all",
            Self::DisableAll => "disable_all",
            Self::ResetFaults => "reset_faults",
            Self::CheckStatus => "check_status",
            Self::MoveForward { .. } => "move_forward",
            Self::MoveBackward { .. } => "move_backward",
            Self::StopVelocity { .. } => "stop_velocity",
            Self::Move(_) => "move",
        }
    }
}
