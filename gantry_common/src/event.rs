//! Events published from the coordinator to control surfaces.

use serde::{Deserialize, Serialize};

use crate::axis::{AxisId, DriveState};
use crate::bus::BusState;

/// Category of a log line on the control surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Success,
    /// Highlighted progress messages (plan start/finish).
    Primary,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Success => "success",
            Self::Primary => "primary",
        };
        f.write_str(s)
    }
}

/// Copy of one axis' state at publish time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisSnapshot {
    pub axis: AxisId,
    /// [m]
    pub position: f64,
    pub status_word: u16,
    pub drive_state: DriveState,
    pub bus_state: BusState,
}

/// Positions and states of every axis, as of `cycle`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PositionSnapshot {
    pub cycle: u64,
    pub axes: Vec<AxisSnapshot>,
}

impl PositionSnapshot {
    pub fn position(&self, axis: AxisId) -> Option<f64> {
        self.axes.get(axis).map(|a| a.position)
    }
}

/// Item on the coordinator's event channel.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Log { severity: Severity, message: String },
    Positions(PositionSnapshot),
}

impl Event {
    pub fn log(severity: Severity, message: impl Into<String>) -> Self {
        Self::Log {
            severity,
            message: message.into(),
        }
    }

    /// Severity for log events, `None` for snapshots.
    pub fn severity(&self) -> Option<Severity> {
        match self {
            Self::Log { severity, .. } => Some(*severity),
            Self::Positions(_) => None,
        }
    }
}
