//! Fault taxonomy of the coordinator.
//!
//! Everything in [`Fault`] is recoverable: it is reported on the control
//! surface and the loop keeps running. [`SessionError`] is the only fatal
//! error and ends the process.

use thiserror::Error;

use gantry_common::axis::AxisId;
use gantry_common::bus::BusError;
use gantry_common::config::ConfigError;
use gantry_common::event::Severity;

/// Drive did not reach "operation enabled" within the attempt budget.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("axis {axis}: enable failed after {attempts} attempts (status 0x{last_status:04X})")]
pub struct EnableFailure {
    pub axis: AxisId,
    pub attempts: u32,
    pub last_status: u16,
}

/// Pre-check refused a velocity move.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("axis {axis}: move rejected, {clearance_mm:.1} mm to axis {neighbor}")]
pub struct MoveRejected {
    pub axis: AxisId,
    pub neighbor: AxisId,
    pub clearance_mm: f64,
}

/// Errors of a drive state machine operation.
#[derive(Debug, Clone, Error)]
pub enum DriveError {
    #[error(transparent)]
    Enable(#[from] EnableFailure),

    #[error("axis {axis}: {source}")]
    Bus {
        axis: AxisId,
        #[source]
        source: BusError,
    },
}

/// Recoverable faults reported on the control surface.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Fault {
    #[error(transparent)]
    EnableFailure(#[from] EnableFailure),

    #[error(transparent)]
    MoveRejected(#[from] MoveRejected),

    #[error("EMERGENCY STOP: axis {axis} within {clearance_mm:.1} mm of axis {neighbor}")]
    EmergencyStop {
        axis: AxisId,
        neighbor: AxisId,
        clearance_mm: f64,
    },

    #[error("dependency cycle, executing in index order {order:?}")]
    SchedulingDegraded { order: Vec<AxisId> },

    #[error("axis {axis}: timed out waiting for {target:.4} m")]
    WaitTimeout { axis: AxisId, target: f64 },

    #[error("link degraded: {reason}")]
    LinkDegraded { reason: String },

    #[error("axis {axis}: bus error: {message}")]
    Bus { axis: AxisId, message: String },
}

impl Fault {
    pub const fn severity(&self) -> Severity {
        match self {
            Self::EnableFailure(_) | Self::EmergencyStop { .. } | Self::Bus { .. } => {
                Severity::Error
            }
            Self::MoveRejected(_)
            | Self::SchedulingDegraded { .. }
            | Self::WaitTimeout { .. }
            | Self::LinkDegraded { .. } => Severity::Warning,
        }
    }
}

impl From<DriveError> for Fault {
    fn from(e: DriveError) -> Self {
        match e {
            DriveError::Enable(failure) => Self::EnableFailure(failure),
            DriveError::Bus { axis, source } => Self::Bus {
                axis,
                message: source.to_string(),
            },
        }
    }
}

/// Fatal errors: the session cannot be opened or configured.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("bus: {0}")]
    Bus(#[from] BusError),

    #[error("no axes discovered")]
    NoAxes,

    #[error("discovered {found} axes, at most {max} supported")]
    TooManyAxes { found: usize, max: usize },
}
