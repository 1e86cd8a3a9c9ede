//! Axis identity, travel direction, drive state and position scaling.

use serde::{Deserialize, Serialize};

use crate::bus::cia402::StatusWord;

/// Dense, 0-based axis index, fixed for the lifetime of a session.
pub type AxisId = usize;

/// Direction of travel for one axis.
///
/// `Positive` is "forward" on the control surface, `Negative` is "backward".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Toward lower positions.
    Negative,
    /// Not moving.
    None,
    /// Toward higher positions.
    Positive,
}

impl Direction {
    /// Direction of travel from `current` to `target`.
    ///
    /// Deltas smaller than `epsilon` count as no movement.
    pub fn between(current: f64, target: f64, epsilon: f64) -> Self {
        let delta = target - current;
        if delta.abs() < epsilon {
            Self::None
        } else if delta > 0.0 {
            Self::Positive
        } else {
            Self::Negative
        }
    }

    /// Direction implied by a signed velocity command.
    pub const fn of_velocity(velocity: i32) -> Self {
        if velocity > 0 {
            Self::Positive
        } else if velocity < 0 {
            Self::Negative
        } else {
            Self::None
        }
    }

    #[inline]
    pub const fn is_moving(self) -> bool {
        !matches!(self, Self::None)
    }

    /// Control-surface label.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Negative => "backward",
            Self::None => "stopped",
            Self::Positive => "forward",
        }
    }
}

/// Motion-control state of a drive, decoded from its status word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriveState {
    /// No valid status seen yet.
    #[default]
    Unknown,
    /// Drive reports a fault.
    Fault,
    /// Power stage off; needs Shutdown to proceed.
    SwitchOnDisabled,
    /// Switched on, operation not yet enabled.
    SwitchedOn,
    /// Drive follows setpoints.
    OperationEnabled,
}

impl DriveState {
    /// Decode the state from a raw status word.
    ///
    /// "Ready to switch on" folds into `SwitchOnDisabled`: both need the
    /// full Shutdown → SwitchOn → EnableOperation sequence.
    pub fn from_status(status: u16) -> Self {
        let sw = StatusWord::from_bits_retain(status);
        if sw.contains(StatusWord::FAULT) {
            Self::Fault
        } else if sw.is_operation_enabled() {
            Self::OperationEnabled
        } else if sw.is_switched_on() {
            Self::SwitchedOn
        } else if sw.is_switch_on_disabled() || sw.is_ready_to_switch_on() {
            Self::SwitchOnDisabled
        } else {
            Self::Unknown
        }
    }
}

/// Conversion between device counts and meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionScale {
    /// Encoder counts per meter of travel.
    pub counts_per_meter: f64,
}

impl PositionScale {
    pub const fn new(counts_per_meter: f64) -> Self {
        Self { counts_per_meter }
    }

    #[inline]
    pub fn to_meters(&self, counts: i32) -> f64 {
        f64::from(counts) / self.counts_per_meter
    }

    /// Meters to counts, rounded and saturated to the i32 range.
    #[inline]
    pub fn to_counts(&self, meters: f64) -> i32 {
        let counts = (meters * self.counts_per_meter).round();
        counts.clamp(f64::from(i32::MIN), f64::from(i32::MAX)) as i32
    }
}

impl Default for PositionScale {
    fn default() -> Self {
        Self::new(crate::consts::COUNTS_PER_METER)
    }
}
