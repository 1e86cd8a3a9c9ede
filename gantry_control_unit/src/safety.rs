//! Safety module root.
//!
//! Proximity supervision of jogging axes and bus-state recovery of axes
//! that fell out of Operational.

pub mod proximity;
pub mod recovery;

pub use proximity::{
    MonitorState, ProximitySupervisor, SafetyContext, SafetyLimits, SafetyVerdict, clearance_mm,
};
pub use recovery::{BusRecovery, RecoveryOutcome, RecoveryStep, RecoveryTiming};
