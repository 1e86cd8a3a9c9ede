//! Integration test: enabling, disabling and fault handling across all axes.

use gantry_common::bus::cia402::ControlWord;
use gantry_common::command::Command;
use gantry_common::event::Severity;
use gantry_control_unit::config::CoordinatorConfig;

use super::support::{Rig, mentions};

#[test]
fn enable_disable_and_status() {
    let mut rig = Rig::new(&CoordinatorConfig::immediate());

    let enabled = rig.command(Command::EnableAll);
    assert_eq!(enabled.len(), 4);
    assert!(enabled.iter().all(|(s, _)| *s == Severity::Success));

    let status = rig.command(Command::CheckStatus);
    assert_eq!(status.len(), 4);
    assert!(status.iter().all(|(s, m)| *s == Severity::Success && m.contains("enabled")));

    rig.command(Command::DisableAll);
    let status = rig.command(Command::CheckStatus);
    assert_eq!(status.len(), 4);
    assert!(status.iter().all(|(s, m)| *s == Severity::Warning && m.contains("not enabled")));
}

#[test]
fn refusing_drive_fails_after_three_attempts() {
    let mut rig = Rig::new(&CoordinatorConfig::immediate());
    rig.sim.lock().set_refuse_enable(1, true);

    let events = rig.command(Command::EnableAll);
    assert!(mentions(&events, Severity::Error, "axis 1: enable failed after 3 attempts"));
    for axis in [0, 2, 3] {
        assert!(mentions(&events, Severity::Success, &format!("Axis {axis} enabled")));
    }

    let log = rig.sim.lock().control_log(1);
    let shutdowns = log.iter().filter(|&&cw| cw == ControlWord::SHUTDOWN).count();
    assert_eq!(shutdowns, 3, "control words: {log:02X?}");
    assert_eq!(log.last(), Some(&ControlWord::ENABLE_OPERATION));
}

#[test]
fn faulted_drive_gets_one_reset_before_shutdown() {
    let mut rig = Rig::new(&CoordinatorConfig::immediate());
    rig.sim.lock().inject_fault(2);

    let events = rig.command(Command::EnableAll);
    assert!(mentions(&events, Severity::Success, "Axis 2 enabled"));

    let log = rig.sim.lock().control_log(2);
    let resets: Vec<usize> = log
        .iter()
        .enumerate()
        .filter(|(_, cw)| **cw == ControlWord::FAULT_RESET)
        .map(|(i, _)| i)
        .collect();
    assert_eq!(resets.len(), 1, "control words: {log:02X?}");
    let first_shutdown = log
        .iter()
        .position(|&cw| cw == ControlWord::SHUTDOWN)
        .unwrap();
    assert!(resets[0] < first_shutdown);
}

#[test]
fn reset_faults_clears_every_axis() {
    let mut rig = Rig::new(&CoordinatorConfig::immediate());
    rig.sim.lock().inject_fault(0);
    rig.sim.lock().inject_fault(3);

    let events = rig.command(Command::ResetFaults);
    assert!(mentions(&events, Severity::Info, "Fault reset sent"));
    rig.coordinator.tick_once();

    let session = rig.coordinator.session();
    for axis in [0, 3] {
        let status = session.status_word(axis).unwrap();
        assert_eq!(status & 0x0008, 0, "axis {axis} status 0x{status:04X}");
    }
}
