//! TOML configuration loader with validation.
//!
//! One file, `config/gantry.toml`, holds every tunable. Each section is
//! `#[serde(default)]` so a file only lists what it changes. Durations are
//! written in milliseconds and converted into the runtime settings types
//! of each module here.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use gantry_common::bus::BusConfig;
use gantry_common::command::MotionProfile;
use gantry_common::config::{ConfigError, ConfigLoader, SharedConfig};
use gantry_common::consts::{
    AUDIT_INTERVAL, COMMAND_QUEUE_DEPTH, CYCLE_TIME_MS, EVENT_QUEUE_DEPTH, LINK_CHECK_SECS,
    MIN_CLEARANCE_MM, PUBLISH_INTERVAL, SAFETY_DIVIDER, SAME_POSITION_EPSILON_M,
    SPREADING_THRESHOLD_M, WARNING_MARGIN_MM,
};
use gantry_common::topology::LayoutMode;

use crate::cycle::CoordinatorSettings;
use crate::drive::DriveTiming;
use crate::safety::{RecoveryTiming, SafetyLimits};
use crate::schedule::{CycleFallback, ExecutionSettings, ScheduleSettings};

// ─── Sections ───────────────────────────────────────────────────────

/// Layout names accepted in `[topology]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutKind {
    GroupedRows,
    PairedZone,
    #[default]
    SharedTrack,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TopologyConfig {
    pub layout: LayoutKind,
    /// Axes per group for `grouped_rows`.
    pub row_size: usize,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            layout: LayoutKind::default(),
            row_size: 3,
        }
    }
}

impl TopologyConfig {
    pub fn layout_mode(&self) -> LayoutMode {
        match self.layout {
            LayoutKind::GroupedRows => LayoutMode::GroupedRows {
                row_size: self.row_size,
            },
            LayoutKind::PairedZone => LayoutMode::PairedZone,
            LayoutKind::SharedTrack => LayoutMode::SharedTrack,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub cycle_ms: u64,
    pub safety_divider: u64,
    pub audit_interval: u64,
    pub publish_interval: u64,
    pub link_check_secs: u64,
    pub command_queue_depth: usize,
    pub event_queue_depth: usize,
    /// Settle after requesting Operational at session start.
    pub startup_settle_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            cycle_ms: CYCLE_TIME_MS,
            safety_divider: SAFETY_DIVIDER,
            audit_interval: AUDIT_INTERVAL,
            publish_interval: PUBLISH_INTERVAL,
            link_check_secs: LINK_CHECK_SECS,
            command_queue_depth: COMMAND_QUEUE_DEPTH,
            event_queue_depth: EVENT_QUEUE_DEPTH,
            startup_settle_ms: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    pub settle_ms: u64,
    pub fault_settle_ms: u64,
    pub enable_attempts: u32,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            settle_ms: 10,
            fault_settle_ms: 50,
            enable_attempts: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyConfig {
    pub min_clearance_mm: f64,
    pub warning_margin_mm: f64,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            min_clearance_mm: MIN_CLEARANCE_MM,
            warning_margin_mm: WARNING_MARGIN_MM,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    pub speed: u32,
    pub acceleration: u32,
    pub deceleration: u32,
    pub divisor: u32,
    pub stagger_ms: u64,
    pub level_delay_ms: u64,
    pub wait_poll_ms: u64,
    pub wait_retries: u32,
    pub arrival_tolerance_m: f64,
    pub arrival_hold: u32,
    pub spreading_threshold_m: f64,
    pub same_position_epsilon_m: f64,
    pub cycle_fallback: CycleFallback,
}

impl Default for MotionConfig {
    fn default() -> Self {
        let profile = MotionProfile::default();
        Self {
            speed: profile.speed,
            acceleration: profile.acceleration,
            deceleration: profile.deceleration,
            divisor: 1,
            stagger_ms: 10,
            level_delay_ms: 30,
            wait_poll_ms: 10,
            wait_retries: 10_000,
            arrival_tolerance_m: 0.00125,
            arrival_hold: 100,
            spreading_threshold_m: SPREADING_THRESHOLD_M,
            same_position_epsilon_m: SAME_POSITION_EPSILON_M,
            cycle_fallback: CycleFallback::default(),
        }
    }
}

impl MotionConfig {
    pub const fn profile(&self) -> MotionProfile {
        MotionProfile::new(self.speed, self.acceleration, self.deceleration)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryConfig {
    pub step_settle_ms: u64,
    pub final_settle_ms: u64,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            step_settle_ms: 50,
            final_settle_ms: 100,
        }
    }
}

// ─── Complete Configuration ─────────────────────────────────────────

/// Complete coordinator configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    pub shared: SharedConfig,
    pub bus: BusConfig,
    pub topology: TopologyConfig,
    pub timing: TimingConfig,
    pub drive: DriveConfig,
    pub safety: SafetyConfig,
    pub motion: MotionConfig,
    pub recovery: RecoveryConfig,
}

impl CoordinatorConfig {
    /// Load and validate a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config = <Self as ConfigLoader>::load(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a TOML string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config = Self::from_toml_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Configuration with every delay set to zero, for tests over the
    /// simulated bus.
    pub fn immediate() -> Self {
        let mut config = Self::default();
        config.timing.cycle_ms = 1;
        config.timing.startup_settle_ms = 0;
        config.drive.settle_ms = 0;
        config.drive.fault_settle_ms = 0;
        config.motion.stagger_ms = 0;
        config.motion.level_delay_ms = 0;
        config.motion.wait_poll_ms = 0;
        config.motion.arrival_hold = 1;
        config.recovery.step_settle_ms = 0;
        config.recovery.final_settle_ms = 0;
        config
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;

        let invalid = |msg: &str| Err(ConfigError::ValidationError(msg.to_string()));
        let t = &self.timing;
        if t.cycle_ms == 0 {
            return invalid("timing.cycle_ms must be > 0");
        }
        if t.safety_divider == 0 || t.audit_interval == 0 || t.publish_interval == 0 {
            return invalid("timing dividers and intervals must be > 0");
        }
        if t.link_check_secs == 0 {
            return invalid("timing.link_check_secs must be > 0");
        }
        if t.command_queue_depth == 0 || t.event_queue_depth == 0 {
            return invalid("queue depths must be > 0");
        }
        if self.safety.min_clearance_mm <= 0.0 {
            return invalid("safety.min_clearance_mm must be > 0");
        }
        if self.safety.warning_margin_mm < 0.0 {
            return invalid("safety.warning_margin_mm must be >= 0");
        }
        if self.bus.counts_per_meter <= 0.0 {
            return invalid("bus.counts_per_meter must be > 0");
        }
        if self.bus.max_axes == 0 {
            return invalid("bus.max_axes must be > 0");
        }
        if self.bus.axis_count > self.bus.max_axes {
            return Err(ConfigError::ValidationError(format!(
                "bus.axis_count {} exceeds bus.max_axes {}",
                self.bus.axis_count, self.bus.max_axes
            )));
        }
        if self.topology.layout == LayoutKind::GroupedRows && self.topology.row_size < 2 {
            return invalid("topology.row_size must be >= 2");
        }
        if self.drive.enable_attempts == 0 {
            return invalid("drive.enable_attempts must be > 0");
        }
        let m = &self.motion;
        if m.arrival_tolerance_m <= 0.0 || m.same_position_epsilon_m <= 0.0 {
            return invalid("motion tolerances must be > 0");
        }
        if m.wait_retries == 0 {
            return invalid("motion.wait_retries must be > 0");
        }
        Ok(())
    }

    // ─── Runtime Settings ───────────────────────────────────────────

    pub fn drive_timing(&self) -> DriveTiming {
        DriveTiming {
            settle: Duration::from_millis(self.drive.settle_ms),
            fault_settle: Duration::from_millis(self.drive.fault_settle_ms),
            enable_attempts: self.drive.enable_attempts,
        }
    }

    pub fn safety_limits(&self) -> SafetyLimits {
        SafetyLimits {
            min_clearance_mm: self.safety.min_clearance_mm,
            warning_margin_mm: self.safety.warning_margin_mm,
        }
    }

    pub fn schedule_settings(&self) -> ScheduleSettings {
        ScheduleSettings {
            same_position_epsilon: self.motion.same_position_epsilon_m,
            spreading_threshold: self.motion.spreading_threshold_m,
            cycle_fallback: self.motion.cycle_fallback,
        }
    }

    pub fn execution_settings(&self) -> ExecutionSettings {
        let m = &self.motion;
        ExecutionSettings {
            start_settle: Duration::from_millis(self.drive.settle_ms),
            stagger: Duration::from_millis(m.stagger_ms),
            level_delay: Duration::from_millis(m.level_delay_ms),
            wait_poll: Duration::from_millis(m.wait_poll_ms),
            wait_retries: m.wait_retries,
            arrival_tolerance: m.arrival_tolerance_m,
            arrival_hold: m.arrival_hold,
        }
    }

    pub fn recovery_timing(&self) -> RecoveryTiming {
        RecoveryTiming {
            step_settle: Duration::from_millis(self.recovery.step_settle_ms),
            final_settle: Duration::from_millis(self.recovery.final_settle_ms),
        }
    }

    pub fn coordinator_settings(&self) -> CoordinatorSettings {
        let t = &self.timing;
        CoordinatorSettings {
            cycle: Duration::from_millis(t.cycle_ms),
            safety_divider: t.safety_divider,
            audit_interval: t.audit_interval,
            publish_interval: t.publish_interval,
            link_check_interval: Duration::from_secs(t.link_check_secs),
            command_queue_depth: t.command_queue_depth,
            event_queue_depth: t.event_queue_depth,
        }
    }
}
