//! Bus-state recovery of axes that dropped out of Operational.
//!
//! Each dropped axis is walked Init → PreOp → SafeOp → Operational with a
//! settle after every request, then its state is read back. The settles are
//! plain sleeps without process data, matching how the bus expects a state
//! ladder to be climbed.

use std::thread;
use std::time::Duration;

use tracing::{info, warn};

use gantry_common::axis::AxisId;
use gantry_common::bus::{BusError, BusState};

use crate::session::Session;

/// Rungs of the recovery ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryStep {
    Init,
    PreOp,
    SafeOp,
    Operational,
}

impl RecoveryStep {
    pub const FIRST: Self = Self::Init;

    pub const fn target(self) -> BusState {
        match self {
            Self::Init => BusState::Init,
            Self::PreOp => BusState::PreOp,
            Self::SafeOp => BusState::SafeOp,
            Self::Operational => BusState::Operational,
        }
    }

    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Init => Some(Self::PreOp),
            Self::PreOp => Some(Self::SafeOp),
            Self::SafeOp => Some(Self::Operational),
            Self::Operational => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryTiming {
    /// After Init, PreOp and SafeOp.
    pub step_settle: Duration,
    /// After Operational, before reading back.
    pub final_settle: Duration,
}

impl RecoveryTiming {
    pub const fn immediate() -> Self {
        Self {
            step_settle: Duration::ZERO,
            final_settle: Duration::ZERO,
        }
    }
}

impl Default for RecoveryTiming {
    fn default() -> Self {
        Self {
            step_settle: Duration::from_millis(50),
            final_settle: Duration::from_millis(100),
        }
    }
}

/// Result of one axis' recovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryOutcome {
    pub axis: AxisId,
    /// State read back after the ladder.
    pub state: BusState,
}

impl RecoveryOutcome {
    #[inline]
    pub fn recovered(&self) -> bool {
        self.state == BusState::Operational
    }
}

#[derive(Debug, Clone, Default)]
pub struct BusRecovery {
    timing: RecoveryTiming,
}

impl BusRecovery {
    pub const fn new(timing: RecoveryTiming) -> Self {
        Self { timing }
    }

    /// Climb the state ladder for `axis` and read the state back.
    pub fn recover(&self, session: &mut Session, axis: AxisId) -> Result<RecoveryOutcome, BusError> {
        info!(axis, "Recovering bus state");
        let mut step = Some(RecoveryStep::FIRST);
        while let Some(s) = step {
            session.set_axis_state(axis, s.target())?;
            thread::sleep(match s {
                RecoveryStep::Operational => self.timing.final_settle,
                _ => self.timing.step_settle,
            });
            step = s.next();
        }

        session.transact();
        let state = session.axis_state(axis)?;
        let outcome = RecoveryOutcome { axis, state };
        if outcome.recovered() {
            info!(axis, "Axis back in Operational");
        } else {
            warn!(axis, ?state, "Axis did not return to Operational");
        }
        Ok(outcome)
    }

    /// Recover every axis in `axes`; a bus error on one axis does not stop
    /// the others.
    pub fn recover_all(
        &self,
        session: &mut Session,
        axes: &[AxisId],
    ) -> Vec<(AxisId, Result<RecoveryOutcome, BusError>)> {
        let outcomes = axes
            .iter()
            .map(|&axis| (axis, self.recover(session, axis)))
            .collect();
        if let Err(e) = session.refresh_bus_states() {
            warn!("Bus state refresh after recovery failed: {e}");
        }
        outcomes
    }
}
