//! Axis topology: which neighbor an axis can collide with.
//!
//! Layouts are described as data ([`AdjacencyTable`]): a repeating set of
//! per-slot offsets plus a rule for grouping axes onto shared tracks. The
//! scheduler and the safety supervisor only ever ask two questions:
//!
//! - [`conflict_neighbor`]: which axis must be watched when `axis` moves
//!   in `direction`?
//! - [`Topology::shares_track`]: can these two axes physically meet?
//!
//! ## Built-in Layouts
//!
//! | Layout | Slot | Forward | Backward | Tracks |
//! |--------|------|---------|----------|--------|
//! | `GroupedRows{n}` | first | - | `+1` | `id / n` |
//! | | middle | `-1` | `+1` | |
//! | | last | `-1` | - | |
//! | `PairedZone` | even | - | - | `id % 2` |
//! | | odd | `+2` | `-2` | |
//! | `SharedTrack` | any | `+1` | `-1` | one |

use serde::{Deserialize, Serialize};

use crate::axis::{AxisId, Direction};

/// Enumerated physical arrangement of a rig.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "layout")]
pub enum LayoutMode {
    /// Axes numbered down fixed-size groups (rows of a column), then across.
    GroupedRows { row_size: usize },
    /// Interleaved even/odd pairs; only the odd line is monitored.
    PairedZone,
    /// Every axis on one track, id order equals position order.
    SharedTrack,
}

impl LayoutMode {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::GroupedRows { .. } => "grouped_rows",
            Self::PairedZone => "paired_zone",
            Self::SharedTrack => "shared_track",
        }
    }
}

/// Neighbor offsets for one slot of the repeating pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SlotRule {
    /// Offset checked when moving in the positive direction.
    pub forward: Option<isize>,
    /// Offset checked when moving in the negative direction.
    pub backward: Option<isize>,
}

impl SlotRule {
    const NONE: Self = Self {
        forward: None,
        backward: None,
    };

    const fn new(forward: Option<isize>, backward: Option<isize>) -> Self {
        Self { forward, backward }
    }
}

/// How axes are partitioned onto shared tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackGrouping {
    /// Consecutive blocks of `n` axes: track = `id / n`.
    Blocks(usize),
    /// Interleaved: track = `id % n`.
    Interleaved(usize),
    /// All axes share one track.
    Single,
}

impl TrackGrouping {
    #[inline]
    pub const fn track_of(self, axis: AxisId) -> usize {
        match self {
            Self::Blocks(n) if n > 0 => axis / n,
            Self::Interleaved(n) if n > 0 => axis % n,
            _ => 0,
        }
    }
}

/// Adjacency rules of a layout, keyed by `axis % slots.len()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjacencyTable {
    pub slots: Vec<SlotRule>,
    pub grouping: TrackGrouping,
}

impl AdjacencyTable {
    /// Table for one of the built-in layouts.
    pub fn for_layout(layout: LayoutMode) -> Self {
        match layout {
            LayoutMode::GroupedRows { row_size } => {
                let n = row_size.max(1);
                let slots = (0..n)
                    .map(|slot| {
                        let forward = (slot > 0).then_some(-1);
                        let backward = (slot + 1 < n).then_some(1);
                        SlotRule::new(forward, backward)
                    })
                    .collect();
                Self {
                    slots,
                    grouping: TrackGrouping::Blocks(n),
                }
            }
            LayoutMode::PairedZone => Self {
                slots: vec![SlotRule::NONE, SlotRule::new(Some(2), Some(-2))],
                grouping: TrackGrouping::Interleaved(2),
            },
            LayoutMode::SharedTrack => Self {
                slots: vec![SlotRule::new(Some(1), Some(-1))],
                grouping: TrackGrouping::Single,
            },
        }
    }

    fn rule(&self, axis: AxisId) -> SlotRule {
        if self.slots.is_empty() {
            return SlotRule::NONE;
        }
        self.slots[axis % self.slots.len()]
    }
}

/// Immutable per-session topology.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    layout: Option<LayoutMode>,
    axis_count: usize,
    table: AdjacencyTable,
}

impl Topology {
    /// Topology for a built-in layout.
    pub fn new(layout: LayoutMode, axis_count: usize) -> Self {
        Self {
            layout: Some(layout),
            axis_count,
            table: AdjacencyTable::for_layout(layout),
        }
    }

    /// Topology for a layout described only by its table.
    pub fn from_table(table: AdjacencyTable, axis_count: usize) -> Self {
        Self {
            layout: None,
            axis_count,
            table,
        }
    }

    /// Built-in layout, `None` for table-only topologies.
    #[inline]
    pub const fn layout(&self) -> Option<LayoutMode> {
        self.layout
    }

    #[inline]
    pub const fn axis_count(&self) -> usize {
        self.axis_count
    }

    #[inline]
    pub fn contains(&self, axis: AxisId) -> bool {
        axis < self.axis_count
    }

    /// Whether two axes ride the same track and can therefore meet.
    pub fn shares_track(&self, a: AxisId, b: AxisId) -> bool {
        self.table.grouping.track_of(a) == self.table.grouping.track_of(b)
    }
}

/// Axis that must be checked when `axis` travels in `direction`.
///
/// Returns `None` when no collision is structurally possible; that is a
/// safe answer, not an error.
pub fn conflict_neighbor(axis: AxisId, direction: Direction, topology: &Topology) -> Option<AxisId> {
    if !topology.contains(axis) {
        return None;
    }
    let rule = topology.table.rule(axis);
    let offset = match direction {
        Direction::Positive => rule.forward?,
        Direction::Negative => rule.backward?,
        Direction::None => return None,
    };
    let neighbor = axis.checked_add_signed(offset)?;
    topology.contains(neighbor).then_some(neighbor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use Direction::{Negative as B, None as Still, Positive as F};

    #[test]
    fn grouped_rows_table() {
        let topo = Topology::new(LayoutMode::GroupedRows { row_size: 3 }, 9);
        let cases = [
            // (axis, direction, expected)
            (0, F, None),
            (0, B, Some(1)),
            (1, F, Some(0)),
            (1, B, Some(2)),
            (2, F, Some(1)),
            (2, B, None),
            (3, B, Some(4)),
            (4, F, Some(3)),
            (5, F, Some(4)),
            (6, F, None),
            (7, B, Some(8)),
            (8, B, None),
        ];
        for (axis, dir, expected) in cases {
            assert_eq!(
                conflict_neighbor(axis, dir, &topo),
                expected,
                "axis {axis} {dir:?}"
            );
        }
    }

    #[test]
    fn grouped_rows_bounded_by_axis_count() {
        // Partial last group: axis 6 (first slot) has no axis 7.
        let topo = Topology::new(LayoutMode::GroupedRows { row_size: 3 }, 7);
        assert_eq!(conflict_neighbor(6, B, &topo), None);
        assert_eq!(conflict_neighbor(5, F, &topo), Some(4));
    }

    #[test]
    fn paired_zone_table() {
        let topo = Topology::new(LayoutMode::PairedZone, 8);
        let cases = [
            (0, F, None),
            (0, B, None),
            (2, F, None),
            (1, F, Some(3)),
            (1, B, None),
            (3, F, Some(5)),
            (3, B, Some(1)),
            (5, B, Some(3)),
            (7, F, None),
            (7, B, Some(5)),
        ];
        for (axis, dir, expected) in cases {
            assert_eq!(
                conflict_neighbor(axis, dir, &topo),
                expected,
                "axis {axis} {dir:?}"
            );
        }
    }

    #[test]
    fn paired_zone_missing_next_odd_axis() {
        let topo = Topology::new(LayoutMode::PairedZone, 4);
        assert_eq!(conflict_neighbor(3, F, &topo), None);
        assert_eq!(conflict_neighbor(3, B, &topo), Some(1));
    }

    #[test]
    fn shared_track_table() {
        let topo = Topology::new(LayoutMode::SharedTrack, 4);
        assert_eq!(conflict_neighbor(0, B, &topo), None);
        assert_eq!(conflict_neighbor(0, F, &topo), Some(1));
        assert_eq!(conflict_neighbor(3, F, &topo), None);
        assert_eq!(conflict_neighbor(2, B, &topo), Some(1));
    }

    #[test]
    fn no_direction_or_unknown_axis_has_no_neighbor() {
        let topo = Topology::new(LayoutMode::SharedTrack, 4);
        assert_eq!(conflict_neighbor(1, Still, &topo), None);
        assert_eq!(conflict_neighbor(9, F, &topo), None);
    }

    #[test]
    fn lookup_is_deterministic() {
        let topo = Topology::new(LayoutMode::GroupedRows { row_size: 3 }, 18);
        for axis in 0..18 {
            for dir in [F, B, Still] {
                assert_eq!(
                    conflict_neighbor(axis, dir, &topo),
                    conflict_neighbor(axis, dir, &topo)
                );
            }
        }
    }

    #[test]
    fn tracks() {
        let rows = Topology::new(LayoutMode::GroupedRows { row_size: 3 }, 9);
        assert!(rows.shares_track(0, 2));
        assert!(!rows.shares_track(2, 3));

        let paired = Topology::new(LayoutMode::PairedZone, 8);
        assert!(paired.shares_track(1, 7));
        assert!(!paired.shares_track(0, 1));

        let shared = Topology::new(LayoutMode::SharedTrack, 4);
        assert!(shared.shares_track(0, 3));
    }

    #[test]
    fn custom_table_layout() {
        // Pairs facing each other: even checks +1 forward, odd checks -1 backward.
        let table = AdjacencyTable {
            slots: vec![
                SlotRule {
                    forward: Some(1),
                    backward: None,
                },
                SlotRule {
                    forward: None,
                    backward: Some(-1),
                },
            ],
            grouping: TrackGrouping::Blocks(2),
        };
        let topo = Topology::from_table(table, 4);
        assert_eq!(topo.layout(), None);
        assert_eq!(conflict_neighbor(2, F, &topo), Some(3));
        assert_eq!(conflict_neighbor(3, B, &topo), Some(2));
        assert_eq!(conflict_neighbor(3, F, &topo), None);
    }
}
