//! Driver registry for bus drivers.
//!
//! Provides a `DriverRegistry` struct for registering and retrieving bus
//! driver factories. Constructed by the caller and passed by reference; there
//! is no global registry.

use gantry_common::bus::{BusConfig, BusError, DriverFactory, FieldBus};
use std::collections::HashMap;

/// Registry of available bus drivers.
pub struct DriverRegistry {
    factories: HashMap<&'static str, DriverFactory>,
}

impl DriverRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry with every built-in driver.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        crate::drivers::register_all_drivers(&mut registry);
        registry
    }

    /// Register a driver factory.
    ///
    /// # Panics
    /// Panics if a driver with the same name is already registered.
    pub fn register(&mut self, name: &'static str, factory: DriverFactory) {
        if self.factories.contains_key(name) {
            panic!("Driver '{name}' is already registered");
        }
        self.factories.insert(name, factory);
    }

    /// Get a driver factory by name.
    pub fn get_factory(&self, name: &str) -> Option<DriverFactory> {
        self.factories.get(name).copied()
    }

    /// Create the driver named in `config`.
    ///
    /// # Errors
    /// `BusError::DriverNotFound` if no such driver is registered, or
    /// whatever the factory reports.
    pub fn create_driver(&self, config: &BusConfig) -> Result<Box<dyn FieldBus>, BusError> {
        let factory = self
            .get_factory(&config.driver)
            .ok_or_else(|| BusError::DriverNotFound(config.driver.clone()))?;
        factory(config)
    }

    /// List all registered driver names.
    pub fn list_drivers(&self) -> Vec<&'static str> {
        self.factories.keys().copied().collect()
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::new()
    }
}
