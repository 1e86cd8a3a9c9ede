//! Per-axis CiA-402 drive state machine.
//!
//! Enable walks Shutdown → SwitchOn → EnableOperation, one control word per
//! transaction, and never skips a state. A faulted drive is reset exactly
//! once before the first attempt. Every operation transacts at least once.
//!
//! All operations block for their settle delays; the caller's tick stalls
//! for the duration.

use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use gantry_common::axis::AxisId;
use gantry_common::bus::cia402::{ControlWord, StatusWord};
use gantry_common::bus::{BusError, BusState, ParameterKey};

use crate::error::{DriveError, EnableFailure};
use crate::session::Session;

// ─── Enable Sequence ────────────────────────────────────────────────

/// Steps of one enable attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnableStep {
    Shutdown,
    SwitchOn,
    EnableOperation,
}

impl EnableStep {
    pub const FIRST: Self = Self::Shutdown;

    pub const fn control_word(self) -> u16 {
        match self {
            Self::Shutdown => ControlWord::SHUTDOWN,
            Self::SwitchOn => ControlWord::SWITCH_ON,
            Self::EnableOperation => ControlWord::ENABLE_OPERATION,
        }
    }

    /// Advance to the next step.
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Shutdown => Some(Self::SwitchOn),
            Self::SwitchOn => Some(Self::EnableOperation),
            Self::EnableOperation => None,
        }
    }
}

/// Delays and limits of the drive state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriveTiming {
    /// After each control word transaction.
    pub settle: Duration,
    /// After a fault reset, before enabling.
    pub fault_settle: Duration,
    pub enable_attempts: u32,
}

impl DriveTiming {
    /// No delays; for tests over the simulated bus.
    pub const fn immediate() -> Self {
        Self {
            settle: Duration::ZERO,
            fault_settle: Duration::ZERO,
            enable_attempts: 3,
        }
    }
}

impl Default for DriveTiming {
    fn default() -> Self {
        Self {
            settle: Duration::from_millis(10),
            fault_settle: Duration::from_millis(50),
            enable_attempts: 3,
        }
    }
}

// ─── State Machine ──────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct DriveStateMachine {
    timing: DriveTiming,
}

impl DriveStateMachine {
    pub const fn new(timing: DriveTiming) -> Self {
        Self { timing }
    }

    pub const fn timing(&self) -> DriveTiming {
        self.timing
    }

    fn status(session: &Session, axis: AxisId) -> StatusWord {
        StatusWord::from_bits_retain(session.status_word(axis).unwrap_or(0))
    }

    fn send(&self, session: &mut Session, axis: AxisId, control_word: u16) {
        session.write_control(axis, control_word);
        session.transact();
        thread::sleep(self.timing.settle);
    }

    /// Bring the axis to "operation enabled".
    ///
    /// # Errors
    /// `DriveError::Enable` once `enable_attempts` attempts have failed.
    /// No further attempt is made; the axis keeps its observed state.
    pub fn enable(&self, session: &mut Session, axis: AxisId) -> Result<(), DriveError> {
        if !session.contains(axis) {
            return Err(DriveError::Bus {
                axis,
                source: BusError::InvalidAxis {
                    axis,
                    count: session.axis_count(),
                },
            });
        }

        session.write_velocity(axis, 0);
        session.transact();
        thread::sleep(self.timing.settle);

        if Self::status(session, axis).is_fault() {
            warn!(axis, "Drive in fault, resetting before enable");
            self.reset_fault(session, axis);
            thread::sleep(self.timing.fault_settle);
        }

        let mut status = Self::status(session, axis);
        for attempt in 1..=self.timing.enable_attempts {
            let mut step = Some(EnableStep::FIRST);
            while let Some(s) = step {
                self.send(session, axis, s.control_word());
                step = s.next();
            }
            session.transact();

            status = Self::status(session, axis);
            if status.is_operation_enabled() {
                info!(axis, attempt, "Drive enabled (status 0x{:04X})", status.bits());
                return Ok(());
            }
            debug!(
                axis,
                attempt,
                "Enable attempt failed (status 0x{:04X})",
                status.bits()
            );
            if status.is_fault() && attempt < self.timing.enable_attempts {
                self.reset_fault(session, axis);
            }
        }

        Err(EnableFailure {
            axis,
            attempts: self.timing.enable_attempts,
            last_status: status.bits(),
        }
        .into())
    }

    /// Control word 0 and a single transaction; no retry.
    pub fn disable(&self, session: &mut Session, axis: AxisId) {
        session.write_control(axis, ControlWord::DISABLE);
        session.transact();
        debug!(axis, "Drive disabled");
    }

    /// Pulse the fault-reset bit, then return to the neutral control word.
    pub fn reset_fault(&self, session: &mut Session, axis: AxisId) {
        session.write_control(axis, ControlWord::FAULT_RESET);
        session.transact();
        thread::sleep(self.timing.settle);
        session.write_control(axis, ControlWord::DISABLE);
        session.transact();
        debug!(axis, "Fault reset issued");
    }

    /// Operational on the bus and "operation enabled" in the status word
    /// read over the mailbox.
    pub fn is_enabled(&self, session: &mut Session, axis: AxisId) -> Result<bool, DriveError> {
        let wrap = |source| DriveError::Bus { axis, source };
        session.transact();
        if session.axis_state(axis).map_err(wrap)? != BusState::Operational {
            return Ok(false);
        }
        let status = session
            .read_parameter(axis, ParameterKey::StatusWord)
            .map_err(wrap)?;
        Ok(status & i64::from(StatusWord::OPERATION_ENABLED.bits()) != 0)
    }
}

impl Default for DriveStateMachine {
    fn default() -> Self {
        Self::new(DriveTiming::default())
    }
}
