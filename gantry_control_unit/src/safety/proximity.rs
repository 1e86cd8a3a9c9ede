//! Proximity supervision of a single jogging axis.
//!
//! ```text
//!   Idle ──start_monitor──► Active(axis, neighbor, dir)
//!    ▲                            │
//!    └── stop_monitor / E-stop / start on another axis
//! ```
//!
//! Clearance is the readback distance between the moving axis and its
//! conflict neighbor. At or below `min_clearance` the moving axis is stopped
//! and the monitor returns to Idle.

use tracing::{debug, error, warn};

use gantry_common::axis::{AxisId, Direction};
use gantry_common::consts::{MIN_CLEARANCE_MM, WARNING_MARGIN_MM};
use gantry_common::topology::{Topology, conflict_neighbor};

use crate::error::MoveRejected;
use crate::session::Session;

/// Clearance thresholds [mm].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SafetyLimits {
    pub min_clearance_mm: f64,
    /// Band above `min_clearance_mm` that only warns.
    pub warning_margin_mm: f64,
}

impl Default for SafetyLimits {
    fn default() -> Self {
        Self {
            min_clearance_mm: MIN_CLEARANCE_MM,
            warning_margin_mm: WARNING_MARGIN_MM,
        }
    }
}

/// Distance between two positions [m], in mm.
#[inline]
pub fn clearance_mm(a: f64, b: f64) -> f64 {
    (a - b).abs() * 1000.0
}

/// What the monitor is watching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SafetyContext {
    pub moving_axis: AxisId,
    pub conflict_axis: AxisId,
    pub direction: Direction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MonitorState {
    #[default]
    Idle,
    Active(SafetyContext),
}

/// Result of one supervision tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SafetyVerdict {
    /// Nothing is being watched.
    Idle,
    Clear {
        context: SafetyContext,
        clearance_mm: f64,
    },
    Warning {
        context: SafetyContext,
        clearance_mm: f64,
    },
    /// The moving axis has been stopped and the monitor is Idle again.
    EmergencyStop {
        context: SafetyContext,
        clearance_mm: f64,
    },
}

impl SafetyVerdict {
    /// Pure classification of a clearance against `limits`.
    pub fn classify(context: SafetyContext, clearance_mm: f64, limits: &SafetyLimits) -> Self {
        if clearance_mm <= limits.min_clearance_mm {
            Self::EmergencyStop {
                context,
                clearance_mm,
            }
        } else if clearance_mm <= limits.min_clearance_mm + limits.warning_margin_mm {
            Self::Warning {
                context,
                clearance_mm,
            }
        } else {
            Self::Clear {
                context,
                clearance_mm,
            }
        }
    }

    #[inline]
    pub const fn is_emergency(&self) -> bool {
        matches!(self, Self::EmergencyStop { .. })
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProximitySupervisor {
    limits: SafetyLimits,
    state: MonitorState,
}

impl ProximitySupervisor {
    pub fn new(limits: SafetyLimits) -> Self {
        Self {
            limits,
            state: MonitorState::Idle,
        }
    }

    pub const fn limits(&self) -> &SafetyLimits {
        &self.limits
    }

    pub const fn state(&self) -> MonitorState {
        self.state
    }

    #[inline]
    pub const fn is_active(&self) -> bool {
        matches!(self.state, MonitorState::Active(_))
    }

    /// Whether `axis` is the axis currently being watched.
    pub fn watches(&self, axis: AxisId) -> bool {
        matches!(self.state, MonitorState::Active(ctx) if ctx.moving_axis == axis)
    }

    /// Watch `axis` travelling in `direction`, replacing any active context.
    ///
    /// Returns the neighbor being watched; `None` leaves the monitor Idle.
    pub fn start_monitor(
        &mut self,
        axis: AxisId,
        direction: Direction,
        topology: &Topology,
    ) -> Option<AxisId> {
        match conflict_neighbor(axis, direction, topology) {
            Some(neighbor) => {
                self.state = MonitorState::Active(SafetyContext {
                    moving_axis: axis,
                    conflict_axis: neighbor,
                    direction,
                });
                debug!(axis, neighbor, ?direction, "Proximity monitor started");
                Some(neighbor)
            }
            None => {
                self.state = MonitorState::Idle;
                debug!(axis, ?direction, "No conflict neighbor, nothing to watch");
                None
            }
        }
    }

    pub fn stop_monitor(&mut self) {
        if let MonitorState::Active(ctx) = self.state {
            debug!(axis = ctx.moving_axis, "Proximity monitor stopped");
        }
        self.state = MonitorState::Idle;
    }

    /// Check the watched pair once.
    ///
    /// On `EmergencyStop` the moving axis' velocity is zeroed and pushed out
    /// with one forced transaction.
    pub fn tick(&mut self, session: &mut Session) -> SafetyVerdict {
        let MonitorState::Active(context) = self.state else {
            return SafetyVerdict::Idle;
        };
        let (Some(moving), Some(neighbor)) = (
            session.position(context.moving_axis),
            session.position(context.conflict_axis),
        ) else {
            self.state = MonitorState::Idle;
            return SafetyVerdict::Idle;
        };

        let verdict = SafetyVerdict::classify(context, clearance_mm(moving, neighbor), &self.limits);
        match verdict {
            SafetyVerdict::EmergencyStop { clearance_mm, .. } => {
                error!(
                    axis = context.moving_axis,
                    neighbor = context.conflict_axis,
                    "Emergency stop at {clearance_mm:.1} mm clearance"
                );
                session.write_velocity(context.moving_axis, 0);
                session.transact();
                self.state = MonitorState::Idle;
            }
            SafetyVerdict::Warning { clearance_mm, .. } => {
                warn!(
                    axis = context.moving_axis,
                    neighbor = context.conflict_axis,
                    "Approaching neighbor: {clearance_mm:.1} mm"
                );
            }
            SafetyVerdict::Clear { .. } | SafetyVerdict::Idle => {}
        }
        verdict
    }

    /// Pre-check before a jog: rejects when the neighbor in `direction` is
    /// already closer than `min_clearance`.
    pub fn is_movement_safe(
        &self,
        session: &Session,
        axis: AxisId,
        direction: Direction,
    ) -> Result<(), MoveRejected> {
        let Some(neighbor) = conflict_neighbor(axis, direction, session.topology()) else {
            return Ok(());
        };
        let (Some(a), Some(b)) = (session.position(axis), session.position(neighbor)) else {
            return Ok(());
        };
        let clearance = clearance_mm(a, b);
        if clearance < self.limits.min_clearance_mm {
            return Err(MoveRejected {
                axis,
                neighbor,
                clearance_mm: clearance,
            });
        }
        Ok(())
    }
}
