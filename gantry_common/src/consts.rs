//! System-wide constants for the gantry workspace.
//!
//! Defaults for every tunable live here; configuration files override them.

use static_assertions::const_assert;

/// Hard upper bound on axes per session (largest grouped-rows rig).
pub const MAX_AXES: usize = 18;

/// Default coordinator period in milliseconds.
pub const CYCLE_TIME_MS: u64 = 5;

/// Safety supervisor runs every N coordinator ticks.
pub const SAFETY_DIVIDER: u64 = 2;

/// Bus/drive state audit every N coordinator ticks.
pub const AUDIT_INTERVAL: u64 = 50;

/// Position snapshot publish every N coordinator ticks.
pub const PUBLISH_INTERVAL: u64 = 100;

/// Link-health worker period in seconds.
pub const LINK_CHECK_SECS: u64 = 5;

/// Minimum clearance between neighboring axes [mm].
pub const MIN_CLEARANCE_MM: f64 = 100.0;

/// Warning band above the minimum clearance [mm].
pub const WARNING_MARGIN_MM: f64 = 20.0;

/// Two positions closer than this are "the same" [m].
pub const SAME_POSITION_EPSILON_M: f64 = 0.001;

/// Summed |target| above this classifies a move as spreading [m].
pub const SPREADING_THRESHOLD_M: f64 = 3.0;

/// Encoder counts per meter of travel.
pub const COUNTS_PER_METER: f64 = 792_628.75;

/// Default depth of the command intake channel.
pub const COMMAND_QUEUE_DEPTH: usize = 64;

/// Default depth of the event channel.
pub const EVENT_QUEUE_DEPTH: usize = 256;

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "config/gantry.toml";

const_assert!(SAFETY_DIVIDER > 0);
const_assert!(AUDIT_INTERVAL > SAFETY_DIVIDER);
const_assert!(PUBLISH_INTERVAL >= AUDIT_INTERVAL);
const_assert!(MAX_AXES <= u8::MAX as usize);
