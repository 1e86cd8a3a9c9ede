//! Turning a move request into an ordered, phased execution plan.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use gantry_common::axis::{AxisId, Direction};
use gantry_common::command::{ExecutionMode, MotionProfile, MoveRequest};
use gantry_common::consts::{SAME_POSITION_EPSILON_M, SPREADING_THRESHOLD_M};
use gantry_common::topology::Topology;

use super::graph::{DependencyGraph, MoveClass, MovingAxis};

/// What to do when the dependency graph has a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleFallback {
    /// Execute in ascending axis order and flag the plan as degraded.
    #[default]
    Execute,
    /// Refuse the move.
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduleSettings {
    /// [m]
    pub same_position_epsilon: f64,
    /// [m]
    pub spreading_threshold: f64,
    pub cycle_fallback: CycleFallback,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            same_position_epsilon: SAME_POSITION_EPSILON_M,
            spreading_threshold: SPREADING_THRESHOLD_M,
            cycle_fallback: CycleFallback::Execute,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScheduleError {
    #[error("axis {axis} is not part of the session ({axis_count} axes)")]
    UnknownAxis { axis: AxisId, axis_count: usize },

    #[error("axis {axis}: target {target} is not a finite position")]
    InvalidTarget { axis: AxisId, target: f64 },

    #[error("dependency cycle among axes {axes:?}")]
    CyclicDependency { axes: Vec<AxisId> },
}

/// One axis of a plan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanStep {
    pub axis: AxisId,
    /// [m]
    pub target: f64,
    pub direction: Direction,
    /// Longest-path depth in the dependency graph.
    pub level: usize,
    pub profile: MotionProfile,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionPlan {
    /// In start order.
    pub steps: Vec<PlanStep>,
    pub edges: Vec<(AxisId, AxisId)>,
    pub classification: MoveClass,
    /// Order fell back to ascending index because of a cycle.
    pub degraded: bool,
    pub mode: ExecutionMode,
    pub label: String,
}

impl ExecutionPlan {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn order(&self) -> Vec<AxisId> {
        self.steps.iter().map(|s| s.axis).collect()
    }

    pub fn step(&self, axis: AxisId) -> Option<&PlanStep> {
        self.steps.iter().find(|s| s.axis == axis)
    }

    /// Position of `axis` in the start order.
    pub fn rank(&self, axis: AxisId) -> Option<usize> {
        self.steps.iter().position(|s| s.axis == axis)
    }
}

/// Order and phase a multi-axis move.
///
/// `current` holds the readback position of every session axis [m],
/// indexed by id. Axes already within `same_position_epsilon` of their
/// target (1 mm by default) are left out of the plan, so a requested move
/// shorter than that is dropped rather than executed.
///
/// Steps come out grouped by level: all level-0 axes, then level 1, and
/// so on. Within a level they keep queue order.
///
/// # Errors
/// - `UnknownAxis` for a target outside the session
/// - `CyclicDependency` for a cycle under [`CycleFallback::Reject`]
pub fn schedule(
    request: &MoveRequest,
    current: &[f64],
    topology: &Topology,
    settings: &ScheduleSettings,
) -> Result<ExecutionPlan, ScheduleError> {
    let axis_count = current.len().min(topology.axis_count());
    for (&axis, &target) in &request.targets {
        if axis >= axis_count {
            return Err(ScheduleError::UnknownAxis { axis, axis_count });
        }
        if !target.is_finite() {
            return Err(ScheduleError::InvalidTarget { axis, target });
        }
    }

    let classification = MoveClass::classify(
        request.targets.values().copied(),
        settings.spreading_threshold,
    );

    let moving: Vec<MovingAxis> = request
        .targets
        .iter()
        .filter_map(|(&axis, &target)| {
            let current = current[axis];
            let direction = Direction::between(current, target, settings.same_position_epsilon);
            direction.is_moving().then_some(MovingAxis {
                axis,
                current,
                target,
                direction,
            })
        })
        .collect();

    let graph = DependencyGraph::build(
        &moving,
        classification,
        topology,
        settings.same_position_epsilon,
    );

    let (order, levels, degraded) = match graph.topological_order() {
        Some(order) => {
            let levels = graph.levels(&order);
            (order, levels, false)
        }
        None => {
            let order: Vec<AxisId> = graph.nodes().collect();
            if settings.cycle_fallback == CycleFallback::Reject {
                return Err(ScheduleError::CyclicDependency { axes: order });
            }
            warn!("Dependency cycle, falling back to index order {order:?}");
            let levels = order.iter().map(|&a| (a, 0)).collect::<BTreeMap<_, _>>();
            (order, levels, true)
        }
    };

    let interior = interior_axes(request);
    let steps = order
        .iter()
        .filter_map(|axis| moving.iter().find(|m| m.axis == *axis))
        .map(|m| PlanStep {
            axis: m.axis,
            target: m.target,
            direction: m.direction,
            level: levels.get(&m.axis).copied().unwrap_or(0),
            profile: if interior.contains(&m.axis) {
                request.profile.divided(request.divisor)
            } else {
                request.profile
            },
        })
        .collect::<Vec<_>>();

    debug!(
        ?classification,
        degraded,
        "Scheduled {} of {} axes, order {:?}",
        steps.len(),
        request.targets.len(),
        order
    );

    Ok(ExecutionPlan {
        steps,
        edges: graph.edges().collect(),
        classification,
        degraded,
        mode: request.mode,
        label: request.label.clone(),
    })
}

/// Every requested axis except the lowest and highest id.
fn interior_axes(request: &MoveRequest) -> Vec<AxisId> {
    let ids: Vec<AxisId> = request.targets.keys().copied().collect();
    if ids.len() < 3 {
        return Vec::new();
    }
    ids[1..ids.len() - 1].to_vec()
}
