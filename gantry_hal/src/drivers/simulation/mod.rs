//! Simulation driver module.
//!
//! Software CiA-402 drives on a software bus, for development and testing
//! without physical hardware.

mod bus;
mod drive;
mod physics;

pub use bus::{DEFAULT_STEP, SimulatedBus};
pub use drive::{CiaState, SimulatedDrive};
pub use physics::{AxisPhysics, MotionLimits};

use gantry_common::bus::{BusConfig, BusError, FieldBus};

/// Factory function to create a simulation driver instance.
pub fn create_driver(config: &BusConfig) -> Result<Box<dyn FieldBus>, BusError> {
    if config.axis_count == 0 {
        return Err(BusError::InitFailed(
            "simulation needs bus.axis_count > 0".to_string(),
        ));
    }
    Ok(Box::new(SimulatedBus::from_config(config)))
}
