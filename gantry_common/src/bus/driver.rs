//! Field-bus driver trait and error types.
//!
//! This module defines:
//! - `FieldBus` trait - Interface for pluggable bus masters
//! - `BusError` enum - Error types for bus operations
//! - `DriverFactory` type alias - Factory function type

use thiserror::Error;

use crate::axis::AxisId;
use crate::bus::types::{AxisInput, AxisOutput, BusConfig, BusState, ParameterKey};

/// Error types for bus operations.
#[derive(Debug, Clone, Error)]
pub enum BusError {
    /// Bus master could not be opened.
    #[error("Bus initialization failed: {0}")]
    InitFailed(String),

    /// Discovery found no devices.
    #[error("No axes discovered on the bus")]
    NoAxes,

    /// Axis index outside the discovered range.
    #[error("Invalid axis index {axis} (discovered {count})")]
    InvalidAxis { axis: AxisId, count: usize },

    /// Mailbox or process-data exchange failed.
    #[error("Bus communication error: {0}")]
    Communication(String),

    /// Driver not registered.
    #[error("Driver not found: {0}")]
    DriverNotFound(String),

    /// Operation not supported by this driver.
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

/// Factory function type for creating bus driver instances.
pub type DriverFactory = fn(&BusConfig) -> Result<Box<dyn FieldBus>, BusError>;

/// Interface to a cyclic field-bus master.
///
/// The coordinator owns exactly one `FieldBus` behind a [`BusHandle`]
/// and never talks to devices any other way.
///
/// # Lifecycle
///
/// 1. `discover()` - Called once; the returned count is fixed for the session
/// 2. `transact()` - Called every coordinator tick and during settle waits
/// 3. `shutdown()` - Called once when the session closes
///
/// # Timing Contracts
///
/// | Operation | Max Duration | Constraint |
/// |-----------|--------------|------------|
/// | `discover()` | seconds | None (before the loop) |
/// | `transact()` | bus round trip | Inside the tick budget |
/// | `read_parameter()` / `write_parameter()` | mailbox timeout | Stalls the tick |
///
/// [`BusHandle`]: crate::bus::BusHandle
pub trait FieldBus: Send {
    /// Driver identifier (e.g. "simulation", "ethercat").
    fn name(&self) -> &'static str;

    /// Driver semantic version.
    fn version(&self) -> &'static str;

    /// Scan the bus and map process data.
    ///
    /// # Errors
    /// `BusError::InitFailed` if the master cannot be opened.
    fn discover(&mut self) -> Result<usize, BusError>;

    /// One send + receive of process data. Returns the working counter.
    fn transact(&mut self) -> u16;

    /// Latest inputs of one axis, as received by the last `transact()`.
    fn read_axis_input(&self, axis: AxisId) -> Result<AxisInput, BusError>;

    /// Stage outputs for one axis; they go out on the next `transact()`.
    fn write_axis_output(&mut self, axis: AxisId, output: AxisOutput) -> Result<(), BusError>;

    /// Read one acyclic parameter.
    fn read_parameter(&mut self, axis: AxisId, key: ParameterKey) -> Result<i64, BusError>;

    /// Write one acyclic parameter.
    fn write_parameter(&mut self, axis: AxisId, key: ParameterKey, value: i64)
    -> Result<(), BusError>;

    /// Current bus-level state of one device.
    fn axis_state(&mut self, axis: AxisId) -> Result<BusState, BusError>;

    /// Request a bus-level state change for one device.
    fn set_axis_state(&mut self, axis: AxisId, state: BusState) -> Result<(), BusError>;

    /// Release the master.
    fn shutdown(&mut self) -> Result<(), BusError>;
}

impl<B: FieldBus + ?Sized> FieldBus for Box<B> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn version(&self) -> &'static str {
        (**self).version()
    }

    fn discover(&mut self) -> Result<usize, BusError> {
        (**self).discover()
    }

    fn transact(&mut self) -> u16 {
        (**self).transact()
    }

    fn read_axis_input(&self, axis: AxisId) -> Result<AxisInput, BusError> {
        (**self).read_axis_input(axis)
    }

    fn write_axis_output(&mut self, axis: AxisId, output: AxisOutput) -> Result<(), BusError> {
        (**self).write_axis_output(axis, output)
    }

    fn read_parameter(&mut self, axis: AxisId, key: ParameterKey) -> Result<i64, BusError> {
        (**self).read_parameter(axis, key)
    }

    fn write_parameter(
        &mut self,
        axis: AxisId,
        key: ParameterKey,
        value: i64,
    ) -> Result<(), BusError> {
        (**self).write_parameter(axis, key, value)
    }

    fn axis_state(&mut self, axis: AxisId) -> Result<BusState, BusError> {
        (**self).axis_state(axis)
    }

    fn set_axis_state(&mut self, axis: AxisId, state: BusState) -> Result<(), BusError> {
        (**self).set_axis_state(axis, state)
    }

    fn shutdown(&mut self) -> Result<(), BusError> {
        (**self).shutdown()
    }
}
