//! Integration test: the running loop, bus recovery and shutdown.
//!
//! These run the coordinator on its own thread and talk to it only through
//! the handle, the way a control surface does.

use std::thread;
use std::time::{Duration, Instant};

use gantry_common::bus::{BusState, ParameterKey};
use gantry_common::command::Command;
use gantry_common::event::{Event, Severity};
use gantry_control_unit::config::CoordinatorConfig;
use gantry_control_unit::cycle::{CoordinatorHandle, LoopState};

use super::support::Rig;

const TIMEOUT: Duration = Duration::from_secs(10);

fn wait_for_state(handle: &CoordinatorHandle, state: LoopState) {
    let deadline = Instant::now() + TIMEOUT;
    while handle.state() != state {
        assert!(Instant::now() < deadline, "loop never reached {state:?}");
        thread::sleep(Duration::from_millis(1));
    }
}

/// Wait for a log entry matching `pred`.
fn wait_for_log(handle: &CoordinatorHandle, pred: impl Fn(Severity, &str) -> bool) -> String {
    let deadline = Instant::now() + TIMEOUT;
    loop {
        let left = deadline.saturating_duration_since(Instant::now());
        match handle.events().recv_timeout(left) {
            Ok(Event::Log { severity, message }) if pred(severity, &message) => return message,
            Ok(_) => {}
            Err(e) => panic!("no matching event: {e}"),
        }
    }
}

#[test]
fn dropped_axis_is_recovered_by_the_audit() {
    let rig = Rig::new(&CoordinatorConfig::immediate());
    let Rig {
        sim,
        coordinator,
        handle,
    } = rig;
    let worker = coordinator.spawn().unwrap();
    wait_for_state(&handle, LoopState::Running);

    // SafeOp keeps the working counter full; only the audit notices.
    sim.lock().drop_axis(2, BusState::SafeOp);
    wait_for_log(&handle, |s, m| s == Severity::Warning && m.contains("not Operational"));
    wait_for_log(&handle, |s, m| s == Severity::Success && m.contains("Axis 2 recovered"));

    handle.request_stop();
    let session = worker.join().unwrap().unwrap();
    assert_eq!(session.axis(2).unwrap().bus_state, BusState::Operational);
}

#[test]
fn offline_axis_degrades_link_once() {
    let rig = Rig::new(&CoordinatorConfig::immediate());
    let Rig {
        sim,
        coordinator,
        handle,
    } = rig;
    let worker = coordinator.spawn().unwrap();
    wait_for_state(&handle, LoopState::Running);

    sim.lock().hold_offline(3);
    wait_for_log(&handle, |s, m| s == Severity::Warning && m.contains("working counter 3/4"));
    wait_for_log(&handle, |s, m| s == Severity::Error && m.contains("Axis 3 recovery failed"));

    // Still short on every tick, but the working counter is not reported again.
    thread::sleep(Duration::from_millis(50));
    let repeats = handle
        .events()
        .try_iter()
        .filter(|e| matches!(e, Event::Log { message, .. } if message.contains("working counter")))
        .count();
    assert_eq!(repeats, 0);

    handle.request_stop();
    let session = worker.join().unwrap().unwrap();
    assert_eq!(session.axis(3).unwrap().bus_state, BusState::Offline);
}

#[test]
fn stop_request_drains_jogging_axes() {
    let rig = Rig::new(&CoordinatorConfig::immediate());
    let Rig {
        sim,
        coordinator,
        handle,
    } = rig;
    let worker = coordinator.spawn().unwrap();

    handle.submit(Command::EnableAll).unwrap();
    // The last axis has no neighbor ahead of it.
    handle
        .submit(Command::MoveForward {
            axis: 3,
            velocity: 10_000,
        })
        .unwrap();
    wait_for_log(&handle, |s, m| s == Severity::Primary && m.contains("Axis 3 moving"));
    assert_ne!(
        sim.lock().device(3).read_parameter(ParameterKey::TargetVelocity),
        0
    );

    handle.request_stop();
    let mut session = worker.join().unwrap().unwrap();
    assert_eq!(handle.state(), LoopState::Stopped);
    assert_eq!(
        sim.lock().device(3).read_parameter(ParameterKey::TargetVelocity),
        0
    );

    // The drain publishes a final snapshot.
    let last = handle
        .events()
        .try_iter()
        .filter_map(|e| match e {
            Event::Positions(snapshot) => Some(snapshot),
            Event::Log { .. } => None,
        })
        .last()
        .expect("no final snapshot");
    assert_eq!(last.cycle, handle.latest().cycle);
    session.close().unwrap();
    assert_eq!(sim.lock().device(0).bus_state(), BusState::Init);
}
