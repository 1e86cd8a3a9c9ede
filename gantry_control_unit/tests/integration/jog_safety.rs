//! Integration test: jogging under the proximity supervisor.
//!
//! 1. Pre-check refuses a jog toward a neighbor that is already too close
//! 2. An accepted jog is watched until the clearance collapses
//! 3. The emergency stop zeroes the velocity and idles the monitor
//! 4. A scheduled move halts any jog before it blocks the loop

use gantry_common::bus::ParameterKey;
use gantry_common::command::{Command, MotionProfile, MoveRequest};
use gantry_common::event::Severity;
use gantry_control_unit::config::CoordinatorConfig;

use super::support::{Rig, mentions};

fn fast_jog_config() -> CoordinatorConfig {
    let mut config = CoordinatorConfig::immediate();
    config.bus.startup_acceleration = 400_000;
    config
}

#[test]
fn jog_toward_neighbor_ends_in_emergency_stop() {
    let mut rig = Rig::new(&fast_jog_config());
    rig.place(&[0.0, 0.3, 1.0, 2.0]);
    rig.command(Command::EnableAll);

    let events = rig.command(Command::MoveForward {
        axis: 0,
        velocity: 80_000,
    });
    assert!(mentions(&events, Severity::Primary, "Axis 0 moving"));
    assert!(rig.coordinator.supervisor().watches(0));
    assert_eq!(rig.coordinator.jogging().collect::<Vec<_>>(), vec![0]);

    let (severity, message) = rig
        .tick_until(5_000, |s, m| s == Severity::Error && m.contains("EMERGENCY STOP"))
        .expect("no emergency stop");
    assert_eq!(severity, Severity::Error);
    assert!(message.contains("axis 0"));
    assert!(message.contains("axis 1"));

    assert!(!rig.coordinator.supervisor().is_active());
    assert_eq!(rig.coordinator.jogging().count(), 0);
    let commanded = rig
        .sim
        .lock()
        .device(0)
        .read_parameter(ParameterKey::TargetVelocity);
    assert_eq!(commanded, 0);

    // The axis never reached the clearance threshold before the verdict.
    let positions = rig.coordinator.session().positions();
    assert!(positions[0] < positions[1]);
}

#[test]
fn move_halts_running_jog() {
    let mut rig = Rig::new(&fast_jog_config());
    rig.place(&[0.0, 0.3, 1.0, 2.0]);
    rig.command(Command::EnableAll);

    let events = rig.command(Command::MoveForward {
        axis: 0,
        velocity: 80_000,
    });
    assert!(mentions(&events, Severity::Primary, "Axis 0 moving"));

    let request = MoveRequest::new([(3, 3.0)].into_iter().collect(), MotionProfile::default())
        .with_label("park");
    let events = rig.command(Command::Move(request));
    assert!(
        mentions(&events, Severity::Warning, "Jog on axes [0] stopped for move 'park'"),
        "{events:?}"
    );
    assert!(mentions(&events, Severity::Success, "Move 'park' complete: 1 axes"));

    assert!(!rig.coordinator.supervisor().is_active());
    assert_eq!(rig.coordinator.jogging().count(), 0);
    assert_eq!(
        rig.sim.lock().device(0).read_parameter(ParameterKey::TargetVelocity),
        0
    );

    // Axis 0 stopped within a few cycles, far short of axis 1.
    let positions = rig.coordinator.session().positions();
    assert!(positions[0] < 0.05, "axis 0 drifted to {:.4}", positions[0]);
    assert!((positions[1] - 0.3).abs() < 0.001);
    assert!((positions[3] - 3.0).abs() < 0.001_25);
}

#[test]
fn rejected_jog_writes_nothing() {
    let mut rig = Rig::new(&CoordinatorConfig::immediate());
    rig.place(&[0.0, 0.05, 1.0, 2.0]);
    rig.command(Command::EnableAll);

    let before = rig.sim.lock().transactions();
    let events = rig.command(Command::MoveForward {
        axis: 0,
        velocity: 20_000,
    });
    let after = rig.sim.lock().transactions();

    assert!(mentions(&events, Severity::Warning, "axis 0: move rejected"));
    assert_eq!(after - before, 1, "only the tick's own transaction");
    assert!(!rig.coordinator.supervisor().is_active());
    assert_eq!(rig.coordinator.jogging().count(), 0);
    assert_eq!(
        rig.sim.lock().device(0).parameter(ParameterKey::TargetVelocity),
        None
    );
}

#[test]
fn jog_away_from_neighbor_is_accepted() {
    let mut rig = Rig::new(&CoordinatorConfig::immediate());
    rig.place(&[0.0, 0.05, 1.0, 2.0]);
    rig.command(Command::EnableAll);

    // Axis 1 backward watches axis 0, which is too close as well.
    let events = rig.command(Command::MoveBackward {
        axis: 1,
        velocity: 20_000,
    });
    assert!(mentions(&events, Severity::Warning, "axis 1: move rejected"));

    // Axis 1 forward watches axis 2, a meter away.
    let events = rig.command(Command::MoveForward {
        axis: 1,
        velocity: 20_000,
    });
    assert!(mentions(&events, Severity::Primary, "Axis 1 moving"));
    assert!(rig.coordinator.supervisor().watches(1));

    let events = rig.command(Command::StopVelocity { axis: 1 });
    assert!(mentions(&events, Severity::Info, "Axis 1 stopped"));
    assert!(!rig.coordinator.supervisor().is_active());
}

#[test]
fn unknown_axis_is_refused() {
    let mut rig = Rig::new(&CoordinatorConfig::immediate());
    let events = rig.command(Command::MoveForward {
        axis: 7,
        velocity: 1_000,
    });
    assert!(mentions(&events, Severity::Error, "Axis 7 does not exist"));
}
