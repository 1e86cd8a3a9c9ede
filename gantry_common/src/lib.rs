//! Gantry Common Library
//!
//! Shared types for every crate in the gantry workspace: axes and their
//! topology, the field-bus boundary, commands, events and configuration
//! loading.
//!
//! # Module Structure
//!
//! - [`axis`] - Axis ids, travel direction, drive state, position scaling
//! - [`topology`] - Layouts and the conflict-neighbor lookup
//! - [`bus`] - `FieldBus` trait, process data, CiA-402 words, `BusHandle`
//! - [`command`] - Commands and move requests
//! - [`event`] - Events published to control surfaces
//! - [`template`] - Movement templates resolving into move requests
//! - [`config`] - Configuration loading traits and types
//! - [`consts`] - System-wide defaults
//! - [`prelude`] - Common re-exports for convenience

pub mod axis;
pub mod bus;
pub mod command;
pub mod config;
pub mod consts;
pub mod event;
pub mod prelude;
pub mod template;
pub mod topology;
