//! # Gantry HAL Library
//!
//! Bus driver implementations behind the `FieldBus` trait defined in
//! `gantry_common::bus`.
//!
//! # Module Structure
//!
//! - [`driver_registry`] - Driver factory registration
//! - [`drivers`] - Driver implementations
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                      gantry_hal                          │
//! │  ┌──────────────────┐        ┌────────────────────────┐  │
//! │  │ Driver Registry  │──────► │ FieldBus (trait object)│  │
//! │  │  name → factory  │        │  simulation, ...       │  │
//! │  └──────────────────┘        └────────────────────────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod driver_registry;
pub mod drivers;

pub use driver_registry::DriverRegistry;
pub use drivers::simulation::SimulatedBus;
