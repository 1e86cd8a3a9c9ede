//! # Gantry Control Unit Library
//!
//! Motion coordination and safety supervision for CiA-402 drives sharing
//! linear tracks.
//!
//! ```text
//!  control surface ──submit──► [ command queue ] ──► Coordinator (cycle thread)
//!        ▲                                            │  Session ── BusHandle ── FieldBus
//!        └──── events / latest snapshot ◄─────────────┤  DriveStateMachine
//!                                                     │  schedule() + PlanExecutor
//!                                                     │  ProximitySupervisor
//!                                                     └  BusRecovery
//! ```
//!
//! ## Layers
//!
//! 1. **Session**: discovered axes, readback, staged outputs
//! 2. **Drive**: CiA-402 enable/disable/fault-reset per axis
//! 3. **Schedule**: dependency graph, start order and phasing of a move
//! 4. **Safety**: neighbor clearance while jogging, bus-state recovery
//! 5. **Cycle**: the tick loop tying the above together

pub mod config;
pub mod cycle;
pub mod drive;
pub mod error;
pub mod report;
pub mod safety;
pub mod schedule;
pub mod session;

pub use config::CoordinatorConfig;
pub use cycle::{Coordinator, CoordinatorHandle, LoopState, SubmitError};
pub use error::{Fault, SessionError};
pub use session::Session;
