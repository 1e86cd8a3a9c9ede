//! Running an [`ExecutionPlan`] against the session.
//!
//! ```text
//! Phased:      configure all ─► start L0 ─stagger─► start L0 ─level─► start L1 ... ─► wait each
//! Sequential:  configure all ─► start ─level─► wait ─► start ─level─► wait ...
//! ```
//!
//! Every delay keeps the bus transacting. A timed-out axis is reported and
//! the remaining axes are still waited for.

use std::thread;
use std::time::Duration;

use tracing::{debug, info};

use gantry_common::axis::AxisId;
use gantry_common::bus::cia402::ControlWord;
use gantry_common::bus::{BusError, ParameterKey};
use gantry_common::command::{ExecutionMode, MotionProfile};

use super::plan::{ExecutionPlan, PlanStep};
use crate::error::Fault;
use crate::report::Reporter;
use crate::session::Session;

/// Start control word: enable operation plus the new-setpoint edge.
const START_CONTROL_WORD: u16 = ControlWord::ENABLE_OPERATION | ControlWord::NEW_SETPOINT;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExecutionSettings {
    /// After each of the two start transactions.
    pub start_settle: Duration,
    /// Between starts within one level.
    pub stagger: Duration,
    /// After the last start of a level.
    pub level_delay: Duration,
    pub wait_poll: Duration,
    pub wait_retries: u32,
    /// [m]
    pub arrival_tolerance: f64,
    /// Transactions kept up after arrival.
    pub arrival_hold: u32,
}

impl ExecutionSettings {
    /// No delays; for tests over the simulated bus.
    pub const fn immediate() -> Self {
        Self {
            start_settle: Duration::ZERO,
            stagger: Duration::ZERO,
            level_delay: Duration::ZERO,
            wait_poll: Duration::ZERO,
            wait_retries: 10_000,
            arrival_tolerance: 0.001_25,
            arrival_hold: 1,
        }
    }
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            start_settle: Duration::from_millis(10),
            stagger: Duration::from_millis(10),
            level_delay: Duration::from_millis(30),
            wait_poll: Duration::from_millis(10),
            wait_retries: 10_000,
            arrival_tolerance: 0.001_25,
            arrival_hold: 100,
        }
    }
}

/// Outcome of one plan execution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionReport {
    pub started: Vec<AxisId>,
    pub arrived: Vec<AxisId>,
    pub faults: Vec<Fault>,
}

impl ExecutionReport {
    /// Every started axis arrived.
    pub fn is_complete(&self) -> bool {
        self.started.len() == self.arrived.len()
    }
}

#[derive(Debug, Clone, Default)]
pub struct PlanExecutor {
    settings: ExecutionSettings,
}

impl PlanExecutor {
    pub const fn new(settings: ExecutionSettings) -> Self {
        Self { settings }
    }

    pub const fn settings(&self) -> &ExecutionSettings {
        &self.settings
    }

    /// Blocks until every started axis has arrived or timed out.
    pub fn execute(
        &self,
        plan: &ExecutionPlan,
        session: &mut Session,
        reporter: &Reporter,
    ) -> ExecutionReport {
        let mut report = ExecutionReport::default();
        if plan.is_empty() {
            debug!("Empty plan '{}', nothing to move", plan.label);
            return report;
        }
        if plan.degraded {
            self.record(
                &mut report,
                reporter,
                Fault::SchedulingDegraded { order: plan.order() },
            );
        }

        let mut runnable = Vec::with_capacity(plan.steps.len());
        for step in &plan.steps {
            match Self::configure(session, step.axis, step.profile) {
                Ok(()) => runnable.push(*step),
                Err(e) => self.record(
                    &mut report,
                    reporter,
                    Fault::Bus {
                        axis: step.axis,
                        message: e.to_string(),
                    },
                ),
            }
        }

        info!(
            mode = ?plan.mode,
            degraded = plan.degraded,
            "Executing '{}': {} axes",
            plan.label,
            runnable.len()
        );
        match plan.mode {
            ExecutionMode::Phased => self.run_phased(&runnable, session, reporter, &mut report),
            ExecutionMode::Sequential => {
                self.run_sequential(&runnable, session, reporter, &mut report)
            }
        }
        report
    }

    fn run_phased(
        &self,
        steps: &[PlanStep],
        session: &mut Session,
        reporter: &Reporter,
        report: &mut ExecutionReport,
    ) {
        for (i, step) in steps.iter().enumerate() {
            self.start(session, step);
            report.started.push(step.axis);
            let same_level_next = steps.get(i + 1).is_some_and(|n| n.level == step.level);
            if same_level_next {
                session.dwell(self.settings.stagger);
            } else {
                session.dwell(self.settings.level_delay);
            }
        }
        for step in steps {
            self.await_arrival(session, step, reporter, report);
        }
    }

    fn run_sequential(
        &self,
        steps: &[PlanStep],
        session: &mut Session,
        reporter: &Reporter,
        report: &mut ExecutionReport,
    ) {
        for step in steps {
            self.start(session, step);
            report.started.push(step.axis);
            session.dwell(self.settings.level_delay);
            self.await_arrival(session, step, reporter, report);
        }
    }

    fn configure(session: &Session, axis: AxisId, profile: MotionProfile) -> Result<(), BusError> {
        let speed = i64::from(profile.speed);
        session.write_parameter(axis, ParameterKey::ProfileVelocity, speed)?;
        session.write_parameter(axis, ParameterKey::MaxProfileVelocity, speed)?;
        session.write_parameter(
            axis,
            ParameterKey::ProfileAcceleration,
            i64::from(profile.acceleration),
        )?;
        session.write_parameter(
            axis,
            ParameterKey::ProfileDeceleration,
            i64::from(profile.deceleration),
        )
    }

    fn start(&self, session: &mut Session, step: &PlanStep) {
        session.write_target(step.axis, step.target, START_CONTROL_WORD);
        session.transact();
        thread::sleep(self.settings.start_settle);
        session.write_control(step.axis, ControlWord::ENABLE_OPERATION);
        session.transact();
        thread::sleep(self.settings.start_settle);
        debug!(
            axis = step.axis,
            level = step.level,
            "Started toward {:.4} m",
            step.target
        );
    }

    fn await_arrival(
        &self,
        session: &mut Session,
        step: &PlanStep,
        reporter: &Reporter,
        report: &mut ExecutionReport,
    ) {
        if self.wait_until_reached(session, step.axis, step.target) {
            report.arrived.push(step.axis);
        } else {
            self.record(
                report,
                reporter,
                Fault::WaitTimeout {
                    axis: step.axis,
                    target: step.target,
                },
            );
        }
    }

    /// Poll until the axis is within tolerance, then hold.
    pub fn wait_until_reached(&self, session: &mut Session, axis: AxisId, target: f64) -> bool {
        for _ in 0..self.settings.wait_retries {
            session.transact();
            let arrived = session
                .position(axis)
                .is_some_and(|p| (p - target).abs() < self.settings.arrival_tolerance);
            if arrived {
                for _ in 0..self.settings.arrival_hold {
                    session.transact();
                    thread::sleep(self.settings.wait_poll);
                }
                debug!(axis, "Reached {target:.4} m");
                return true;
            }
            thread::sleep(self.settings.wait_poll);
        }
        false
    }

    fn record(&self, report: &mut ExecutionReport, reporter: &Reporter, fault: Fault) {
        reporter.fault(&fault);
        report.faults.push(fault);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CoordinatorConfig;
    use crate::drive::{DriveStateMachine, DriveTiming};
    use crate::schedule::{ScheduleSettings, schedule};
    use gantry_common::bus::BusHandle;
    use gantry_common::command::MoveRequest;
    use gantry_common::event::{Event, Severity};
    use gantry_hal::SimulatedBus;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn enabled_session(axis_count: usize) -> (Arc<Mutex<SimulatedBus>>, Session) {
        let mut config = CoordinatorConfig::immediate();
        config.bus.axis_count = axis_count;
        let sim = Arc::new(Mutex::new(SimulatedBus::from_config(&config.bus)));
        let mut session = Session::open(BusHandle::from_shared(sim.clone()), &config).unwrap();
        let drives = DriveStateMachine::new(DriveTiming::immediate());
        for axis in 0..axis_count {
            drives.enable(&mut session, axis).unwrap();
        }
        (sim, session)
    }

    fn plan_for(session: &Session, request: &MoveRequest) -> ExecutionPlan {
        schedule(
            request,
            &session.positions(),
            session.topology(),
            &ScheduleSettings::default(),
        )
        .unwrap()
    }

    #[test]
    fn phased_plan_reaches_targets() {
        let (sim, mut session) = enabled_session(4);
        let request =
            MoveRequest::from_positions(&[-0.2, -0.1, 0.1, 0.2], MotionProfile::default());
        let plan = plan_for(&session, &request);
        let (reporter, _rx) = Reporter::channel(16);

        let report = PlanExecutor::new(ExecutionSettings::immediate())
            .execute(&plan, &mut session, &reporter);

        assert!(report.is_complete(), "{report:?}");
        assert_eq!(report.started.len(), 4);
        for (axis, target) in [(0, -0.2), (1, -0.1), (2, 0.1), (3, 0.2)] {
            assert!((session.position(axis).unwrap() - target).abs() < 0.001_25);
        }
        // Start sequence: new-setpoint edge, then plain enable operation.
        let log = sim.lock().control_log(0);
        let start = log.iter().position(|&cw| cw == 0x1F).unwrap();
        assert_eq!(log.get(start + 1), Some(&0x0F));
    }

    #[test]
    fn start_order_follows_plan() {
        let (_sim, mut session) = enabled_session(4);
        let request = MoveRequest::from_positions(&[-0.3, -0.3, 0.0, 0.0], MotionProfile::default());
        let plan = plan_for(&session, &request);
        assert_eq!(plan.order(), vec![1, 0]);
        let (reporter, _rx) = Reporter::channel(16);

        let report = PlanExecutor::new(ExecutionSettings::immediate())
            .execute(&plan, &mut session, &reporter);
        assert_eq!(report.started, vec![1, 0]);
    }

    #[test]
    fn stagger_within_level_and_delay_between_levels() {
        let (sim, mut session) = enabled_session(4);
        let request =
            MoveRequest::from_positions(&[-1.1, -1.1, 1.1, 1.1], MotionProfile::default());
        let plan = plan_for(&session, &request);
        assert_eq!(plan.order(), vec![0, 3, 1, 2]);
        let levels: Vec<usize> = plan.steps.iter().map(|s| s.level).collect();
        assert_eq!(levels, vec![0, 0, 1, 1]);

        // Session cycle is 1 ms: a 2 ms stagger allows at most 3 dwell
        // transactions, a 100 ms level delay far more.
        let settings = ExecutionSettings {
            stagger: Duration::from_millis(2),
            level_delay: Duration::from_millis(100),
            ..ExecutionSettings::immediate()
        };
        let (reporter, _rx) = Reporter::channel(16);
        let report = PlanExecutor::new(settings).execute(&plan, &mut session, &reporter);
        assert!(report.is_complete(), "{report:?}");

        let latches = sim.lock().setpoint_latches().to_vec();
        let started: Vec<AxisId> = latches.iter().map(|&(_, axis)| axis).collect();
        assert_eq!(started, plan.order());

        // Transactions between successive starts: 0→3 and 1→2 share a level.
        let gaps: Vec<u64> = latches.windows(2).map(|w| w[1].0 - w[0].0).collect();
        assert!(gaps[0] <= 5, "{gaps:?}");
        assert!(gaps[2] <= 5, "{gaps:?}");
        assert!(gaps[1] >= 20, "{gaps:?}");
    }

    #[test]
    fn sequential_mode_waits_between_axes() {
        let (_sim, mut session) = enabled_session(2);
        let request = MoveRequest::from_positions(&[0.1, 0.3], MotionProfile::default())
            .with_mode(ExecutionMode::Sequential);
        let plan = plan_for(&session, &request);
        let (reporter, _rx) = Reporter::channel(16);

        let report = PlanExecutor::new(ExecutionSettings::immediate())
            .execute(&plan, &mut session, &reporter);
        assert!(report.is_complete());
        assert_eq!(report.arrived, plan.order());
    }

    #[test]
    fn disabled_axis_times_out_and_others_continue() {
        let config = CoordinatorConfig::immediate();
        let sim = Arc::new(Mutex::new(SimulatedBus::from_config(&config.bus)));
        let mut session = Session::open(BusHandle::from_shared(sim.clone()), &config).unwrap();
        let drives = DriveStateMachine::new(DriveTiming::immediate());
        drives.enable(&mut session, 1).unwrap();

        let request = MoveRequest::from_positions(&[0.1, 0.2], MotionProfile::default());
        let plan = plan_for(&session, &request);
        let (reporter, rx) = Reporter::channel(16);
        let settings = ExecutionSettings {
            wait_retries: 2_000,
            ..ExecutionSettings::immediate()
        };

        let report = PlanExecutor::new(settings).execute(&plan, &mut session, &reporter);
        assert_eq!(report.arrived, vec![1]);
        assert!(matches!(
            report.faults.as_slice(),
            [Fault::WaitTimeout { axis: 0, .. }]
        ));
        let warnings = rx
            .try_iter()
            .filter(|e| matches!(e, Event::Log { severity: Severity::Warning, .. }))
            .count();
        assert_eq!(warnings, 1);
    }

    #[test]
    fn degraded_plan_is_reported() {
        let (sim, mut session) = enabled_session(2);
        sim.lock().set_position(1, session.scale().to_counts(0.3));
        session.refresh();
        let request = MoveRequest::from_positions(&[0.3, 0.0], MotionProfile::default());
        let plan = plan_for(&session, &request);
        assert!(plan.degraded);
        let (reporter, _rx) = Reporter::channel(16);

        let report = PlanExecutor::new(ExecutionSettings::immediate())
            .execute(&plan, &mut session, &reporter);
        assert!(matches!(
            report.faults.first(),
            Some(Fault::SchedulingDegraded { order }) if order == &vec![0, 1]
        ));
        assert!(report.is_complete());
    }

    #[test]
    fn empty_plan_does_nothing() {
        let (sim, mut session) = enabled_session(2);
        let request = MoveRequest::from_positions(&[0.0, 0.0], MotionProfile::default());
        let plan = plan_for(&session, &request);
        let before = sim.lock().transactions();
        let (reporter, _rx) = Reporter::channel(4);
        let report = PlanExecutor::default().execute(&plan, &mut session, &reporter);
        assert_eq!(report, ExecutionReport::default());
        assert_eq!(sim.lock().transactions(), before);
    }
}
