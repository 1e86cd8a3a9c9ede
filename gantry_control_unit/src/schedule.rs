//! Collision-aware multi-axis move scheduling.
//!
//! A [`MoveRequest`](gantry_common::command::MoveRequest) is turned into a
//! dependency graph between the moving axes of each track, ordered with
//! Kahn's algorithm and executed level by level.

pub mod executor;
pub mod graph;
pub mod plan;

pub use executor::{ExecutionReport, ExecutionSettings, PlanExecutor};
pub use graph::{DependencyGraph, MoveClass, MovingAxis};
pub use plan::{CycleFallback, ExecutionPlan, PlanStep, ScheduleError, ScheduleSettings, schedule};
