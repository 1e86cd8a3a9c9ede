//! Integration test: neighbor selection on the grouped-rows and paired-zone
//! layouts, seen through the jog pre-check.

use gantry_common::command::Command;
use gantry_common::event::Severity;
use gantry_common::topology::LayoutMode;
use gantry_control_unit::config::{CoordinatorConfig, LayoutKind};

use super::support::{Rig, mentions};

fn jog(rig: &mut Rig, axis: usize, forward: bool) -> Vec<(Severity, String)> {
    let velocity = 10_000;
    rig.command(if forward {
        Command::MoveForward { axis, velocity }
    } else {
        Command::MoveBackward { axis, velocity }
    })
}

#[test]
fn grouped_rows_nine_axes() {
    let mut config = CoordinatorConfig::immediate();
    config.bus.axis_count = 9;
    config.topology.layout = LayoutKind::GroupedRows;
    config.topology.row_size = 3;

    let mut rig = Rig::new(&config);
    assert_eq!(rig.coordinator.session().axis_count(), 9);
    assert_eq!(
        rig.coordinator.session().topology().layout(),
        Some(LayoutMode::GroupedRows { row_size: 3 })
    );

    // Row 1 crowded at its front, rows 0 and 2 spread out.
    rig.place(&[0.0, 0.5, 1.0, 0.0, 0.05, 1.0, 0.0, 0.5, 1.0]);
    let enabled = rig.command(Command::EnableAll);
    assert_eq!(enabled.len(), 9);

    // Middle of row 1 forward checks axis 3: 50 mm.
    let events = jog(&mut rig, 4, true);
    assert!(mentions(&events, Severity::Warning, "axis 4: move rejected"));
    assert!(mentions(&events, Severity::Warning, "to axis 3"));

    // Backward checks axis 5: 950 mm.
    let events = jog(&mut rig, 4, false);
    assert!(mentions(&events, Severity::Primary, "Axis 4 moving backward"));
    assert!(rig.coordinator.supervisor().watches(4));
    rig.command(Command::StopVelocity { axis: 4 });

    // Row boundaries: axis 6 forward and axis 5 backward have no neighbor,
    // axis 5 is never checked against axis 6 even when they coincide.
    rig.place(&[0.0, 0.5, 1.0, 0.0, 0.05, 1.0, 1.0, 1.5, 2.0]);
    let events = jog(&mut rig, 6, true);
    assert!(mentions(&events, Severity::Primary, "Axis 6 moving"));
    assert!(!rig.coordinator.supervisor().is_active());
    rig.command(Command::StopVelocity { axis: 6 });

    let events = jog(&mut rig, 5, false);
    assert!(mentions(&events, Severity::Primary, "Axis 5 moving"));
    assert!(!rig.coordinator.supervisor().is_active());
}

#[test]
fn paired_zone_checks_only_odd_axes() {
    let mut config = CoordinatorConfig::immediate();
    config.topology.layout = LayoutKind::PairedZone;

    let mut rig = Rig::new(&config);
    rig.place(&[0.0, 0.0, 0.02, 0.05]);
    rig.command(Command::EnableAll);

    // Axis 1 forward is checked against axis 3.
    let events = jog(&mut rig, 1, true);
    assert!(mentions(&events, Severity::Warning, "axis 1: move rejected"));

    // Axis 1 backward has no partner below it.
    let events = jog(&mut rig, 1, false);
    assert!(mentions(&events, Severity::Primary, "Axis 1 moving"));
    rig.command(Command::StopVelocity { axis: 1 });

    // Axis 3 backward is checked against axis 1.
    let events = jog(&mut rig, 3, false);
    assert!(mentions(&events, Severity::Warning, "axis 3: move rejected"));

    // Even axes are never checked, however close.
    let events = jog(&mut rig, 0, true);
    assert!(mentions(&events, Severity::Primary, "Axis 0 moving"));
    assert!(!rig.coordinator.supervisor().is_active());
}
