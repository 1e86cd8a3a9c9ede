//! Integration test: template moves through the scheduler and executor.

use gantry_common::command::{Command, MotionProfile, MoveRequest};
use gantry_common::config::ConfigLoader;
use gantry_common::event::Severity;
use gantry_common::template::{StepDefaults, TemplateFile};
use gantry_control_unit::config::CoordinatorConfig;
use gantry_control_unit::schedule::CycleFallback;

use super::support::{Rig, mentions};

const TEMPLATES: &str = r#"
layout = "shared_track"
axis_count = 4

[patterns]
half = [-0.5, -0.2, 0.2, 0.5]

[[templates]]
name = "demo"
steps = [
    { pattern = "half" },
    { pattern = "home", mode = "sequential" },
]
"#;

fn resolve(config: &CoordinatorConfig, name: &str) -> Vec<MoveRequest> {
    let file = TemplateFile::from_toml_str(TEMPLATES).unwrap();
    file.check_session(config.topology.layout_mode(), 4).unwrap();
    let defaults = StepDefaults {
        profile: config.motion.profile(),
        divisor: config.motion.divisor,
    };
    file.resolve(name, defaults, 4).unwrap()
}

fn assert_at(rig: &Rig, targets: &[f64]) {
    let positions = rig.coordinator.session().positions();
    for (axis, (&p, &t)) in positions.iter().zip(targets).enumerate() {
        assert!((p - t).abs() < 0.00125, "axis {axis} at {p:.4}, target {t}");
    }
}

#[test]
fn template_steps_reach_their_targets() {
    let config = CoordinatorConfig::immediate();
    let mut rig = Rig::new(&config);
    rig.command(Command::EnableAll);

    let steps = resolve(&config, "demo");
    assert_eq!(steps.len(), 2);

    let mut iter = steps.into_iter();
    let events = rig.command(Command::Move(iter.next().unwrap()));
    assert!(
        mentions(&events, Severity::Success, "Move 'demo/half' complete: 4 axes"),
        "{events:?}"
    );
    assert_at(&rig, &[-0.5, -0.2, 0.2, 0.5]);

    let events = rig.command(Command::Move(iter.next().unwrap()));
    assert!(
        mentions(&events, Severity::Success, "Move 'demo/home' complete: 4 axes"),
        "{events:?}"
    );
    assert_at(&rig, &[0.0, 0.0, 0.0, 0.0]);
}

#[test]
fn move_to_current_positions_is_a_no_op() {
    let config = CoordinatorConfig::immediate();
    let mut rig = Rig::new(&config);
    rig.command(Command::EnableAll);

    let before = rig.sim.lock().transactions();
    let request = MoveRequest::from_positions(&[0.0; 4], MotionProfile::default())
        .with_label("stay");
    let events = rig.command(Command::Move(request));
    assert!(mentions(&events, Severity::Info, "all axes already in place"));
    assert_eq!(rig.sim.lock().transactions() - before, 1);
}

#[test]
fn crossing_swap_is_rejected_under_reject_policy() {
    let mut config = CoordinatorConfig::immediate();
    config.motion.cycle_fallback = CycleFallback::Reject;
    let mut rig = Rig::new(&config);
    rig.place(&[0.0, 0.1, 0.5, 1.0]);
    rig.command(Command::EnableAll);

    // Axes 0 and 1 trade places.
    let request = MoveRequest::from_positions(&[0.1, 0.0, 0.5, 1.0], MotionProfile::default())
        .with_label("swap");
    let events = rig.command(Command::Move(request));
    assert!(mentions(&events, Severity::Error, "Move 'swap' refused"), "{events:?}");
    assert_at(&rig, &[0.0, 0.1, 0.5, 1.0]);
}

#[test]
fn unknown_axis_in_request_is_refused() {
    let config = CoordinatorConfig::immediate();
    let mut rig = Rig::new(&config);
    let request = MoveRequest::from_positions(&[0.1; 6], MotionProfile::default())
        .with_label("too-wide");
    let events = rig.command(Command::Move(request));
    assert!(mentions(&events, Severity::Error, "Move 'too-wide' refused"));
}
