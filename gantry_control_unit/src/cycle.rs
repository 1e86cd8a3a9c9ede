//! Cyclic coordinator: transact → command → audit → safety → publish.
//!
//! ## Tick
//! 1. One bus transaction and readback refresh. A working counter that
//!    turns short reports `LinkDegraded` and requests an audit for the next
//!    tick; while it stays short only the periodic audit retries.
//! 2. At most one command is taken from the intake and dispatched.
//! 3. Every `audit_interval` ticks, or on request, the bus state of every
//!    axis is read. Dropped axes stop the proximity monitor and are walked
//!    back to Operational.
//! 4. Every `safety_divider` ticks the proximity supervisor runs, if active.
//! 5. Every `publish_interval` ticks a [`PositionSnapshot`] is published.
//!
//! Commands that block (enable, reset, scheduled moves) stall the tick for
//! their duration. Overruns are counted and logged, never fatal. A scheduled
//! move halts every jog first, since the supervisor cannot run under it.
//!
//! ## Shutdown
//! `Running` → `Draining` on a stop request: the proximity monitor is torn
//! down, every jogging axis gets velocity 0 and a final transaction pushes
//! it out. Then `Stopped`.

pub mod handle;
pub mod link;

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, TryRecvError, bounded};
use tracing::{debug, info, warn};

use gantry_common::axis::{AxisId, Direction};
use gantry_common::bus::ParameterKey;
use gantry_common::command::{Command, MoveRequest};
use gantry_common::consts::{
    AUDIT_INTERVAL, COMMAND_QUEUE_DEPTH, CYCLE_TIME_MS, EVENT_QUEUE_DEPTH, LINK_CHECK_SECS,
    PUBLISH_INTERVAL, SAFETY_DIVIDER,
};

use crate::config::CoordinatorConfig;
use crate::drive::DriveStateMachine;
use crate::error::Fault;
use crate::report::Reporter;
use crate::safety::{BusRecovery, ProximitySupervisor, SafetyVerdict};
use crate::schedule::{PlanExecutor, ScheduleSettings, schedule};
use crate::session::Session;

pub use handle::{CoordinatorHandle, SubmitError};
pub use link::{LinkHealth, check_link};

use handle::Shared;
use link::LinkMonitor;

// ─── Cycle Statistics ───────────────────────────────────────────────

/// Per-tick timing statistics, O(1) per record.
#[derive(Debug, Clone)]
pub struct CycleStats {
    pub cycle_count: u64,
    /// Last tick duration [ns].
    pub last_cycle_ns: u64,
    pub min_cycle_ns: u64,
    pub max_cycle_ns: u64,
    sum_cycle_ns: u128,
    /// Ticks longer than the configured period.
    pub overruns: u64,
}

impl CycleStats {
    pub const fn new() -> Self {
        Self {
            cycle_count: 0,
            last_cycle_ns: 0,
            min_cycle_ns: u64::MAX,
            max_cycle_ns: 0,
            sum_cycle_ns: 0,
            overruns: 0,
        }
    }

    /// Record one tick; returns `true` on an overrun of `budget_ns`.
    #[inline]
    pub fn record(&mut self, duration_ns: u64, budget_ns: u64) -> bool {
        self.cycle_count += 1;
        self.last_cycle_ns = duration_ns;
        self.min_cycle_ns = self.min_cycle_ns.min(duration_ns);
        self.max_cycle_ns = self.max_cycle_ns.max(duration_ns);
        self.sum_cycle_ns += u128::from(duration_ns);
        let overrun = duration_ns > budget_ns;
        if overrun {
            self.overruns += 1;
        }
        overrun
    }

    /// Average tick duration [ns]; 0 before the first record.
    pub fn avg_cycle_ns(&self) -> u64 {
        if self.cycle_count == 0 {
            0
        } else {
            (self.sum_cycle_ns / u128::from(self.cycle_count)) as u64
        }
    }
}

impl Default for CycleStats {
    fn default() -> Self {
        Self::new()
    }
}

// ─── RT Setup ───────────────────────────────────────────────────────

/// Errors while setting up or launching the cycle.
#[derive(Debug)]
pub enum CycleError {
    /// RT system call failed.
    RtSetup(String),
    /// A worker thread could not be started.
    Spawn(String),
}

impl std::fmt::Display for CycleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RtSetup(msg) => write!(f, "RT setup error: {msg}"),
            Self::Spawn(msg) => write!(f, "thread spawn failed: {msg}"),
        }
    }
}

impl std::error::Error for CycleError {}

#[cfg(feature = "rt")]
fn rt_mlockall() -> Result<(), CycleError> {
    use nix::sys::mman::{MlockallFlags, mlockall};
    mlockall(MlockallFlags::MCL_CURRENT | MlockallFlags::MCL_FUTURE)
        .map_err(|e| CycleError::RtSetup(format!("mlockall failed: {e}")))
}

#[cfg(not(feature = "rt"))]
fn rt_mlockall() -> Result<(), CycleError> {
    Ok(())
}

#[cfg(feature = "rt")]
fn rt_set_affinity(cpu: usize) -> Result<(), CycleError> {
    use nix::sched::{CpuSet, sched_setaffinity};
    use nix::unistd::Pid;

    let mut cpuset = CpuSet::new();
    cpuset
        .set(cpu)
        .map_err(|e| CycleError::RtSetup(format!("CpuSet::set({cpu}) failed: {e}")))?;
    sched_setaffinity(Pid::from_raw(0), &cpuset)
        .map_err(|e| CycleError::RtSetup(format!("sched_setaffinity failed: {e}")))
}

#[cfg(not(feature = "rt"))]
fn rt_set_affinity(_cpu: usize) -> Result<(), CycleError> {
    Ok(())
}

#[cfg(feature = "rt")]
fn rt_set_scheduler(priority: i32) -> Result<(), CycleError> {
    let param = libc::sched_param {
        sched_priority: priority,
    };
    // SAFETY: plain syscall on the calling thread with a valid param struct.
    let ret = unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) };
    if ret != 0 {
        let err = std::io::Error::last_os_error();
        return Err(CycleError::RtSetup(format!(
            "sched_setscheduler(SCHED_FIFO, {priority}) failed: {err}"
        )));
    }
    Ok(())
}

#[cfg(not(feature = "rt"))]
fn rt_set_scheduler(_priority: i32) -> Result<(), CycleError> {
    Ok(())
}

/// Lock memory, pin the calling thread and switch it to SCHED_FIFO.
///
/// Every step is a no-op without the `rt` feature.
pub fn rt_setup(cpu_core: usize, rt_priority: i32) -> Result<(), CycleError> {
    rt_mlockall()?;
    rt_set_affinity(cpu_core)?;
    rt_set_scheduler(rt_priority)?;
    Ok(())
}

// ─── Settings & State ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorSettings {
    pub cycle: Duration,
    pub safety_divider: u64,
    pub audit_interval: u64,
    pub publish_interval: u64,
    pub link_check_interval: Duration,
    pub command_queue_depth: usize,
    pub event_queue_depth: usize,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            cycle: Duration::from_millis(CYCLE_TIME_MS),
            safety_divider: SAFETY_DIVIDER,
            audit_interval: AUDIT_INTERVAL,
            publish_interval: PUBLISH_INTERVAL,
            link_check_interval: Duration::from_secs(LINK_CHECK_SECS),
            command_queue_depth: COMMAND_QUEUE_DEPTH,
            event_queue_depth: EVENT_QUEUE_DEPTH,
        }
    }
}

/// Lifecycle of the cycle loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LoopState {
    /// Built, loop not entered yet.
    Idle = 0,
    Running = 1,
    Draining = 2,
    Stopped = 3,
}

impl LoopState {
    const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Running,
            2 => Self::Draining,
            3 => Self::Stopped,
            _ => Self::Idle,
        }
    }
}

/// Pinning and priority applied to the cycle thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtOptions {
    pub cpu_core: usize,
    pub priority: i32,
}

// ─── Coordinator ────────────────────────────────────────────────────

/// Owner of the session and every per-axis component.
pub struct Coordinator {
    session: Session,
    drives: DriveStateMachine,
    supervisor: ProximitySupervisor,
    recovery: BusRecovery,
    scheduling: ScheduleSettings,
    executor: PlanExecutor,
    settings: CoordinatorSettings,
    commands: Receiver<Command>,
    reporter: Reporter,
    shared: Arc<Shared>,
    /// Axes currently under a velocity command.
    jogging: BTreeSet<AxisId>,
    /// Working counter was short on the last tick.
    link_degraded: bool,
    tick: u64,
    stats: CycleStats,
    rt: Option<RtOptions>,
}

impl Coordinator {
    /// Build the coordinator around an opened session.
    pub fn new(session: Session, config: &CoordinatorConfig) -> (Self, CoordinatorHandle) {
        let settings = config.coordinator_settings();
        let (command_tx, command_rx) = bounded(settings.command_queue_depth);
        let (reporter, events) = Reporter::channel(settings.event_queue_depth);
        let shared = Arc::new(Shared::new(session.snapshot(0)));

        let handle =
            CoordinatorHandle::new(command_tx, events, reporter.clone(), Arc::clone(&shared));
        let coordinator = Self {
            session,
            drives: DriveStateMachine::new(config.drive_timing()),
            supervisor: ProximitySupervisor::new(config.safety_limits()),
            recovery: BusRecovery::new(config.recovery_timing()),
            scheduling: config.schedule_settings(),
            executor: PlanExecutor::new(config.execution_settings()),
            settings,
            commands: command_rx,
            reporter,
            shared,
            jogging: BTreeSet::new(),
            link_degraded: false,
            tick: 0,
            stats: CycleStats::new(),
            rt: None,
        };
        (coordinator, handle)
    }

    /// Apply RT setup on the cycle thread before the first tick.
    pub fn with_rt(mut self, rt: RtOptions) -> Self {
        self.rt = Some(rt);
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn supervisor(&self) -> &ProximitySupervisor {
        &self.supervisor
    }

    pub fn stats(&self) -> &CycleStats {
        &self.stats
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Axes currently under a velocity command.
    pub fn jogging(&self) -> impl Iterator<Item = AxisId> + '_ {
        self.jogging.iter().copied()
    }

    /// Run the loop on a dedicated thread; the session is handed back when
    /// the loop stops.
    pub fn spawn(self) -> Result<JoinHandle<Result<Session, CycleError>>, CycleError> {
        thread::Builder::new()
            .name("gantry-cycle".into())
            .spawn(move || self.run())
            .map_err(|e| CycleError::Spawn(format!("cycle: {e}")))
    }

    /// Run the loop on the calling thread until a stop is requested.
    pub fn run(mut self) -> Result<Session, CycleError> {
        if let Some(rt) = self.rt {
            rt_setup(rt.cpu_core, rt.priority)?;
            info!(
                "RT setup complete (cpu_core={}, priority={})",
                rt.cpu_core, rt.priority
            );
        }
        let monitor = LinkMonitor::spawn(
            self.session.bus().clone(),
            self.session.axis_count(),
            self.settings.link_check_interval,
            self.reporter.clone(),
            Arc::clone(&self.shared),
        )?;

        self.shared.set_state(LoopState::Running);
        info!(
            "Cycle running: {:?} period, {} axes",
            self.settings.cycle,
            self.session.axis_count()
        );

        let budget_ns = self.settings.cycle.as_nanos() as u64;
        while !self.shared.stop.load(Ordering::Acquire) {
            let start = Instant::now();
            self.tick_once();
            let elapsed = start.elapsed();
            if self.stats.record(elapsed.as_nanos() as u64, budget_ns) {
                warn!(tick = self.tick, "Cycle overrun: {elapsed:?}");
            }
            if let Some(remaining) = self.settings.cycle.checked_sub(elapsed) {
                thread::sleep(remaining);
            }
        }

        self.drain();
        monitor.stop();
        self.shared.set_state(LoopState::Stopped);
        info!(
            ticks = self.stats.cycle_count,
            overruns = self.stats.overruns,
            avg_ns = self.stats.avg_cycle_ns(),
            max_ns = self.stats.max_cycle_ns,
            "Cycle stopped"
        );
        Ok(self.session)
    }

    /// One iteration of the loop body.
    pub fn tick_once(&mut self) {
        self.tick += 1;
        let audit_requested = self.shared.take_audit_request();

        let wkc = usize::from(self.session.transact());
        let expected = self.session.axis_count();
        if wkc < expected {
            if !self.link_degraded {
                self.reporter.fault(&Fault::LinkDegraded {
                    reason: format!("working counter {wkc}/{expected}"),
                });
                self.shared.request_audit();
            }
            self.link_degraded = true;
        } else {
            self.link_degraded = false;
        }

        match self.commands.try_recv() {
            Ok(command) => self.dispatch(command),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => {}
        }

        if audit_requested || self.tick % self.settings.audit_interval == 0 {
            self.audit();
        }

        if self.supervisor.is_active() && self.tick % self.settings.safety_divider == 0 {
            self.supervise();
        }

        if self.tick % self.settings.publish_interval == 0 {
            self.publish();
        }
    }

    fn drain(&mut self) {
        self.shared.set_state(LoopState::Draining);
        self.halt_jogs();
        self.publish();
    }

    /// Tear down the monitor and zero every jogging axis in one transaction.
    fn halt_jogs(&mut self) -> Vec<AxisId> {
        self.supervisor.stop_monitor();
        let halted: Vec<AxisId> = std::mem::take(&mut self.jogging).into_iter().collect();
        for &axis in &halted {
            self.session.write_velocity(axis, 0);
            debug!(axis, "Jog stopped");
        }
        self.session.transact();
        halted
    }

    fn publish(&mut self) {
        let snapshot = self.session.snapshot(self.tick);
        self.shared.latest.store(Arc::new(snapshot.clone()));
        self.reporter.publish(snapshot);
    }

    // ─── Commands ───────────────────────────────────────────────────

    fn dispatch(&mut self, command: Command) {
        debug!(command = command.name(), "Dispatching");
        match command {
            Command::EnableAll => self.enable_all(),
            Command::DisableAll => self.disable_all(),
            Command::ResetFaults => self.reset_faults(),
            Command::CheckStatus => self.check_status(),
            Command::MoveForward { axis, velocity } => self.jog(axis, velocity),
            Command::MoveBackward { axis, velocity } => self.jog(axis, velocity.saturating_neg()),
            Command::StopVelocity { axis } => self.stop_jog(axis),
            Command::Move(request) => self.run_move(&request),
        }
    }

    fn enable_all(&mut self) {
        for axis in 0..self.session.axis_count() {
            match self.drives.enable(&mut self.session, axis) {
                Ok(()) => self.reporter.success(format!("Axis {axis} enabled")),
                Err(e) => self.reporter.fault(&Fault::from(e)),
            }
        }
    }

    fn disable_all(&mut self) {
        self.supervisor.stop_monitor();
        self.jogging.clear();
        for axis in 0..self.session.axis_count() {
            self.drives.disable(&mut self.session, axis);
        }
        self.reporter.info("All axes disabled");
    }

    fn reset_faults(&mut self) {
        for axis in 0..self.session.axis_count() {
            self.drives.reset_fault(&mut self.session, axis);
        }
        self.reporter.info("Fault reset sent to all axes");
    }

    fn check_status(&mut self) {
        for axis in 0..self.session.axis_count() {
            match self.drives.is_enabled(&mut self.session, axis) {
                Ok(true) => self.reporter.success(format!("Axis {axis} enabled")),
                Ok(false) => self.reporter.warning(format!("Axis {axis} not enabled")),
                Err(e) => self.reporter.fault(&Fault::from(e)),
            }
        }
    }

    fn jog(&mut self, axis: AxisId, velocity: i32) {
        if !self.session.contains(axis) {
            self.reporter.error(format!("Axis {axis} does not exist"));
            return;
        }
        let direction = Direction::of_velocity(velocity);
        if let Err(rejected) = self
            .supervisor
            .is_movement_safe(&self.session, axis, direction)
        {
            self.reporter.fault(&Fault::from(rejected));
            return;
        }

        self.session.write_velocity(axis, velocity);
        self.session.transact();
        if let Err(e) =
            self.session
                .write_parameter(axis, ParameterKey::TargetVelocity, i64::from(velocity))
        {
            debug!(axis, "Mailbox velocity backup failed: {e}");
        }
        self.jogging.insert(axis);
        self.supervisor
            .start_monitor(axis, direction, self.session.topology());
        self.reporter
            .primary(format!("Axis {axis} moving {} at {velocity}", direction.label()));
    }

    fn stop_jog(&mut self, axis: AxisId) {
        if self.supervisor.watches(axis) {
            self.supervisor.stop_monitor();
        }
        self.jogging.remove(&axis);
        self.session.write_velocity(axis, 0);
        self.session.transact();
        self.reporter.info(format!("Axis {axis} stopped"));
    }

    fn run_move(&mut self, request: &MoveRequest) {
        // The executor blocks the tick, so nothing would supervise a jog.
        if !self.jogging.is_empty() || self.supervisor.is_active() {
            let halted = self.halt_jogs();
            self.reporter.warning(format!(
                "Jog on axes {halted:?} stopped for move '{}'",
                request.label
            ));
        }
        let positions = self.session.positions();
        let plan = match schedule(
            request,
            &positions,
            self.session.topology(),
            &self.scheduling,
        ) {
            Ok(plan) => plan,
            Err(e) => {
                self.reporter.error(format!("Move '{}' refused: {e}", request.label));
                return;
            }
        };
        if plan.is_empty() {
            self.reporter
                .info(format!("Move '{}': all axes already in place", request.label));
            return;
        }

        let report = self
            .executor
            .execute(&plan, &mut self.session, &self.reporter);
        if report.is_complete() {
            self.reporter.success(format!(
                "Move '{}' complete: {} axes",
                request.label,
                report.arrived.len()
            ));
        } else {
            self.reporter.warning(format!(
                "Move '{}' finished with {} of {} axes in place",
                request.label,
                report.arrived.len(),
                report.started.len()
            ));
        }
    }

    // ─── Audit & Safety ─────────────────────────────────────────────

    fn audit(&mut self) {
        let dropped = match self.session.refresh_bus_states() {
            Ok(dropped) => dropped,
            Err(e) => {
                warn!("Bus state audit failed: {e}");
                return;
            }
        };
        if dropped.is_empty() {
            return;
        }

        self.reporter.fault(&Fault::LinkDegraded {
            reason: format!("axes {dropped:?} not Operational"),
        });
        self.supervisor.stop_monitor();
        for (axis, outcome) in self.recovery.recover_all(&mut self.session, &dropped) {
            match outcome {
                Ok(o) if o.recovered() => {
                    self.reporter.success(format!("Axis {axis} recovered"));
                }
                Ok(o) => self.reporter.error(format!(
                    "Axis {axis} recovery failed, state {:?}",
                    o.state
                )),
                Err(e) => self.reporter.fault(&Fault::Bus {
                    axis,
                    message: e.to_string(),
                }),
            }
        }
    }

    fn supervise(&mut self) {
        if let SafetyVerdict::EmergencyStop {
            context,
            clearance_mm,
        } = self.supervisor.tick(&mut self.session)
        {
            self.jogging.remove(&context.moving_axis);
            self.reporter.fault(&Fault::EmergencyStop {
                axis: context.moving_axis,
                neighbor: context.conflict_axis,
                clearance_mm,
            });
        }
    }
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("tick", &self.tick)
            .field("axes", &self.session.axis_count())
            .field("jogging", &self.jogging)
            .finish_non_exhaustive()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use gantry_common::bus::{BusHandle, BusState};
    use gantry_common::event::{Event, Severity};
    use gantry_hal::SimulatedBus;
    use parking_lot::Mutex;

    fn coordinator(config: &CoordinatorConfig) -> (Arc<Mutex<SimulatedBus>>, Coordinator, CoordinatorHandle) {
        let sim = Arc::new(Mutex::new(SimulatedBus::from_config(&config.bus)));
        let session = Session::open(BusHandle::from_shared(sim.clone()), config).unwrap();
        let (c, h) = Coordinator::new(session, config);
        (sim, c, h)
    }

    fn logs(handle: &CoordinatorHandle) -> Vec<(Severity, String)> {
        handle
            .events()
            .try_iter()
            .filter_map(|e| match e {
                Event::Log { severity, message } => Some((severity, message)),
                Event::Positions(_) => None,
            })
            .collect()
    }

    #[test]
    fn cycle_stats_basic() {
        let mut stats = CycleStats::new();
        assert_eq!(stats.avg_cycle_ns(), 0);
        assert!(!stats.record(500_000, 1_000_000));
        assert!(stats.record(1_500_000, 1_000_000));
        assert_eq!(stats.cycle_count, 2);
        assert_eq!(stats.min_cycle_ns, 500_000);
        assert_eq!(stats.max_cycle_ns, 1_500_000);
        assert_eq!(stats.avg_cycle_ns(), 1_000_000);
        assert_eq!(stats.overruns, 1);
    }

    #[test]
    fn rt_setup_without_rt_feature_is_noop() {
        #[cfg(not(feature = "rt"))]
        assert!(rt_setup(0, 80).is_ok());
    }

    #[test]
    fn cycle_error_display() {
        let msg = CycleError::RtSetup("mlockall failed".into()).to_string();
        assert!(msg.contains("mlockall"));
    }

    #[test]
    fn loop_state_round_trips_through_u8() {
        for state in [
            LoopState::Idle,
            LoopState::Running,
            LoopState::Draining,
            LoopState::Stopped,
        ] {
            assert_eq!(LoopState::from_u8(state as u8), state);
        }
    }

    #[test]
    fn one_command_per_tick() {
        let config = CoordinatorConfig::immediate();
        let (_sim, mut c, h) = coordinator(&config);
        h.submit(Command::EnableAll).unwrap();
        h.submit(Command::CheckStatus).unwrap();

        c.tick_once();
        let first = logs(&h);
        assert_eq!(first.len(), 4);
        assert!(first.iter().all(|(s, _)| *s == Severity::Success));

        c.tick_once();
        let second = logs(&h);
        assert_eq!(second.len(), 4);
        assert!(second.iter().all(|(s, m)| *s == Severity::Success && m.contains("enabled")));
    }

    #[test]
    fn short_working_counter_triggers_audit_next_tick() {
        let config = CoordinatorConfig::immediate();
        let (sim, mut c, h) = coordinator(&config);
        sim.lock().drop_axis(1, BusState::Init);

        c.tick_once();
        let events = logs(&h);
        assert_eq!(events.len(), 1);
        assert!(events[0].1.contains("working counter 3/4"));

        c.tick_once();
        let events = logs(&h);
        assert!(events.iter().any(|(s, m)| *s == Severity::Success && m.contains("Axis 1 recovered")));
        assert_eq!(c.session().axis(1).unwrap().bus_state, BusState::Operational);
    }

    #[test]
    fn snapshot_published_on_interval() {
        let mut config = CoordinatorConfig::immediate();
        config.timing.publish_interval = 3;
        config.timing.audit_interval = 3;
        let (_sim, mut c, h) = coordinator(&config);
        for _ in 0..3 {
            c.tick_once();
        }
        assert_eq!(h.latest().cycle, 3);
        let positions = h
            .events()
            .try_iter()
            .filter(|e| matches!(e, Event::Positions(_)))
            .count();
        assert_eq!(positions, 1);
    }

    #[test]
    fn run_drains_to_stopped() {
        let config = CoordinatorConfig::immediate();
        let (_sim, c, h) = coordinator(&config);
        let worker = c.spawn().unwrap();
        h.submit(Command::EnableAll).unwrap();
        while h.state() != LoopState::Running {
            thread::yield_now();
        }
        h.request_stop();
        let session = worker.join().unwrap().unwrap();
        assert_eq!(h.state(), LoopState::Stopped);
        assert_eq!(session.axis_count(), 4);
        assert_eq!(h.submit(Command::CheckStatus), Err(SubmitError::Disconnected));
    }
}
