//! Prelude module for common re-exports.
//!
//! ```rust
//! use gantry_common::prelude::*;
//! ```

// ─── Axes & Topology ────────────────────────────────────────────────
pub use crate::axis::{AxisId, Direction, DriveState, PositionScale};
pub use crate::topology::{conflict_neighbor, LayoutMode, Topology};

// ─── Bus ────────────────────────────────────────────────────────────
pub use crate::bus::cia402::{ControlWord, StatusWord};
pub use crate::bus::{
    AxisInput, AxisOutput, BusConfig, BusError, BusHandle, BusState, FieldBus, OperationMode,
    ParameterKey, Setpoint,
};

// ─── Commands & Events ──────────────────────────────────────────────
pub use crate::command::{Command, ExecutionMode, MotionProfile, MoveRequest};
pub use crate::event::{AxisSnapshot, Event, PositionSnapshot, Severity};

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, LogLevel, SharedConfig};
