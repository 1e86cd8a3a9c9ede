//! Field-bus boundary: driver trait, process-data types, CiA-402 words.

pub mod cia402;
pub mod driver;
pub mod handle;
pub mod types;

pub use driver::{BusError, DriverFactory, FieldBus};
pub use handle::BusHandle;
pub use types::{AxisInput, AxisOutput, BusConfig, BusState, OperationMode, ParameterKey, Setpoint};
