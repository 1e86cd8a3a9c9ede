//! Control-surface side of the coordinator.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use arc_swap::ArcSwap;
use crossbeam_channel::{Receiver, Sender, TrySendError};
use thiserror::Error;

use gantry_common::command::Command;
use gantry_common::event::{Event, PositionSnapshot};

use super::LoopState;
use crate::report::Reporter;

/// State shared between the cycle thread, the link monitor and handles.
#[derive(Debug)]
pub(crate) struct Shared {
    pub(crate) stop: AtomicBool,
    pub(crate) audit_requested: AtomicBool,
    state: AtomicU8,
    pub(crate) latest: ArcSwap<PositionSnapshot>,
}

impl Shared {
    pub(crate) fn new(initial: PositionSnapshot) -> Self {
        Self {
            stop: AtomicBool::new(false),
            audit_requested: AtomicBool::new(false),
            state: AtomicU8::new(LoopState::Idle as u8),
            latest: ArcSwap::from_pointee(initial),
        }
    }

    pub(crate) fn state(&self) -> LoopState {
        LoopState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn set_state(&self, state: LoopState) {
        self.state.store(state as u8, Ordering::Release);
    }

    pub(crate) fn request_audit(&self) {
        self.audit_requested.store(true, Ordering::Release);
    }

    pub(crate) fn take_audit_request(&self) -> bool {
        self.audit_requested.swap(false, Ordering::AcqRel)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("command queue full")]
    QueueFull,
    #[error("coordinator has stopped")]
    Disconnected,
}

/// Cloneable handle for control surfaces.
///
/// Never touches the bus: commands go in through a bounded channel, state
/// comes out as events and the latest published snapshot.
#[derive(Debug, Clone)]
pub struct CoordinatorHandle {
    commands: Sender<Command>,
    events: Receiver<Event>,
    reporter: Reporter,
    shared: Arc<Shared>,
}

impl CoordinatorHandle {
    pub(crate) fn new(
        commands: Sender<Command>,
        events: Receiver<Event>,
        reporter: Reporter,
        shared: Arc<Shared>,
    ) -> Self {
        Self {
            commands,
            events,
            reporter,
            shared,
        }
    }

    /// Queue a command without blocking.
    pub fn submit(&self, command: Command) -> Result<(), SubmitError> {
        self.commands.try_send(command).map_err(|e| match e {
            TrySendError::Full(_) => SubmitError::QueueFull,
            TrySendError::Disconnected(_) => SubmitError::Disconnected,
        })
    }

    pub fn events(&self) -> &Receiver<Event> {
        &self.events
    }

    /// Most recently published snapshot.
    pub fn latest(&self) -> Arc<PositionSnapshot> {
        self.shared.latest.load_full()
    }

    /// Ask the loop to drain and stop after the current tick.
    pub fn request_stop(&self) {
        self.shared.stop.store(true, Ordering::Release);
    }

    pub fn state(&self) -> LoopState {
        self.shared.state()
    }

    /// Events lost to a full channel.
    pub fn dropped_events(&self) -> u64 {
        self.reporter.dropped()
    }
}
