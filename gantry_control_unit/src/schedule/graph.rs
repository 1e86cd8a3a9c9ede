//! Start-order dependency graph between moving axes.
//!
//! An edge `u → v` means "u must start before v". Edges only ever connect
//! axes on the same track; axes on different tracks are unordered.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};

use gantry_common::axis::{AxisId, Direction};
use gantry_common::topology::Topology;

/// Whether a formation opens up or closes in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveClass {
    Spreading,
    Converging,
}

impl MoveClass {
    /// Spreading when the summed |target| exceeds `threshold` [m].
    pub fn classify(targets: impl IntoIterator<Item = f64>, threshold: f64) -> Self {
        let total: f64 = targets.into_iter().map(f64::abs).sum();
        if total > threshold {
            Self::Spreading
        } else {
            Self::Converging
        }
    }
}

/// Axis that actually has to travel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovingAxis {
    pub axis: AxisId,
    /// [m]
    pub current: f64,
    /// [m]
    pub target: f64,
    pub direction: Direction,
}

impl MovingAxis {
    /// Whether this axis' path passes over `position` on its way.
    fn crosses(&self, position: f64) -> bool {
        match self.direction {
            Direction::Positive => self.current < position && position <= self.target,
            Direction::Negative => self.target <= position && position < self.current,
            Direction::None => false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    nodes: BTreeSet<AxisId>,
    edges: BTreeSet<(AxisId, AxisId)>,
}

impl DependencyGraph {
    pub fn build(
        moving: &[MovingAxis],
        class: MoveClass,
        topology: &Topology,
        epsilon: f64,
    ) -> Self {
        let mut graph = Self {
            nodes: moving.iter().map(|m| m.axis).collect(),
            edges: BTreeSet::new(),
        };
        for a in moving {
            for b in moving {
                if a.axis == b.axis || !topology.shares_track(a.axis, b.axis) {
                    continue;
                }
                let edge = if (a.current - b.current).abs() < epsilon {
                    same_position_edge(a, b, class)
                } else {
                    crossing_edge(a, b, class)
                };
                if let Some(edge) = edge {
                    graph.edges.insert(edge);
                }
            }
        }
        graph
    }

    pub fn nodes(&self) -> impl Iterator<Item = AxisId> + '_ {
        self.nodes.iter().copied()
    }

    pub fn edges(&self) -> impl Iterator<Item = (AxisId, AxisId)> + '_ {
        self.edges.iter().copied()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn has_edge(&self, from: AxisId, to: AxisId) -> bool {
        self.edges.contains(&(from, to))
    }

    fn successors(&self, node: AxisId) -> impl Iterator<Item = AxisId> + '_ {
        self.edges
            .range((node, AxisId::MIN)..=(node, AxisId::MAX))
            .map(|&(_, to)| to)
    }

    /// Kahn's algorithm over a FIFO queue seeded in ascending index.
    ///
    /// First-in first-out keeps the order grouped by [`levels`](Self::levels):
    /// every node of depth `k` is emitted before any node of depth `k + 1`.
    /// `None` when the graph has a cycle.
    pub fn topological_order(&self) -> Option<Vec<AxisId>> {
        let mut indegree: BTreeMap<AxisId, usize> = self.nodes.iter().map(|&n| (n, 0)).collect();
        for &(_, to) in &self.edges {
            if let Some(d) = indegree.get_mut(&to) {
                *d += 1;
            }
        }
        let mut ready: VecDeque<AxisId> = indegree
            .iter()
            .filter(|&(_, &d)| d == 0)
            .map(|(&n, _)| n)
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(node) = ready.pop_front() {
            order.push(node);
            for next in self.successors(node) {
                if let Some(d) = indegree.get_mut(&next) {
                    *d -= 1;
                    if *d == 0 {
                        ready.push_back(next);
                    }
                }
            }
        }
        (order.len() == self.nodes.len()).then_some(order)
    }

    /// Longest-path depth of every node, given a topological order.
    pub fn levels(&self, order: &[AxisId]) -> BTreeMap<AxisId, usize> {
        let mut levels: BTreeMap<AxisId, usize> = order.iter().map(|&n| (n, 0)).collect();
        for &node in order {
            let level = levels.get(&node).copied().unwrap_or(0);
            for next in self.successors(node) {
                if let Some(l) = levels.get_mut(&next) {
                    *l = (*l).max(level + 1);
                }
            }
        }
        levels
    }
}

/// Both axes start at the same spot: distance to travel decides.
fn same_position_edge(a: &MovingAxis, b: &MovingAxis, class: MoveClass) -> Option<(AxisId, AxisId)> {
    let (da, db) = (a.target.abs(), b.target.abs());
    let (i, j) = (a.axis, b.axis);
    let a_first = match class {
        MoveClass::Spreading => da > db,
        MoveClass::Converging => da < db,
    };
    let b_first = match class {
        MoveClass::Spreading => db > da,
        MoveClass::Converging => db < da,
    };
    if a_first {
        return Some((i, j));
    }
    if b_first {
        return Some((j, i));
    }

    use Direction::{Negative, Positive};
    let tie = match (class, a.direction, b.direction) {
        (MoveClass::Spreading, Positive, Positive) => i > j,
        (MoveClass::Spreading, Negative, Negative) => i < j,
        (MoveClass::Converging, Positive, Positive) => i < j,
        (MoveClass::Converging, Negative, Negative) => i > j,
        _ => false,
    };
    tie.then_some((i, j))
}

/// `a` passes over `b`'s start position.
fn crossing_edge(a: &MovingAxis, b: &MovingAxis, class: MoveClass) -> Option<(AxisId, AxisId)> {
    if !a.crosses(b.current) {
        return None;
    }
    Some(match class {
        MoveClass::Spreading => (a.axis, b.axis),
        MoveClass::Converging => (b.axis, a.axis),
    })
}
