//! # Gantry Control Unit
//!
//! Opens the configured bus driver, brings every axis to Operational and
//! runs the cyclic coordinator until Ctrl-C. With `--template` and `--run`
//! the named movement template is executed after enabling all drives.

use clap::Parser;
use gantry_common::bus::BusHandle;
use gantry_common::command::Command;
use gantry_common::config::ConfigError;
use gantry_common::consts::DEFAULT_CONFIG_PATH;
use gantry_common::event::Event;
use gantry_common::template::{StepDefaults, TemplateFile};
use gantry_control_unit::config::CoordinatorConfig;
use gantry_control_unit::cycle::{Coordinator, LoopState, RtOptions};
use gantry_control_unit::session::Session;
use gantry_hal::DriverRegistry;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::EnvFilter;

/// Gantry Control Unit: motion coordination and proximity supervision
#[derive(Parser, Debug)]
#[command(name = "gantry_control_unit")]
#[command(version)]
#[command(about = "Cyclic coordinator for CiA-402 axes on shared tracks")]
struct Args {
    /// Coordinator configuration (TOML).
    #[arg(long, value_name = "FILE", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Movement template file (TOML or JSON).
    #[arg(long, value_name = "FILE")]
    template: Option<PathBuf>,

    /// Template to execute after enabling all axes.
    #[arg(long, value_name = "NAME", requires = "template")]
    run: Option<String>,

    /// CPU core to pin the cycle thread to; enables RT setup.
    #[arg(long)]
    cpu_core: Option<usize>,

    /// SCHED_FIFO priority used with --cpu-core.
    #[arg(long, default_value_t = 80)]
    rt_priority: i32,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();
    setup_tracing(&args);

    info!("Gantry Control Unit v{} starting...", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(&args) {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("Gantry Control Unit shutdown complete");
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&args.config)?;
    info!(
        "Config OK: driver={}, layout={}, cycle={}ms",
        config.bus.driver,
        config.topology.layout_mode().name(),
        config.timing.cycle_ms
    );

    let registry = DriverRegistry::with_builtin();
    debug!("Registered drivers: {:?}", registry.list_drivers());
    let driver = registry.create_driver(&config.bus)?;
    info!("Driver '{}' v{}", driver.name(), driver.version());

    let session = Session::open(BusHandle::new(driver), &config)?;
    let axis_count = session.axis_count();

    let moves = match (&args.template, &args.run) {
        (Some(path), Some(name)) => {
            let file = TemplateFile::load(path)?;
            file.check_session(config.topology.layout_mode(), axis_count)?;
            let defaults = StepDefaults {
                profile: config.motion.profile(),
                divisor: config.motion.divisor,
            };
            let moves = file.resolve(name, defaults, axis_count)?;
            info!("Template '{name}': {} steps", moves.len());
            moves
        }
        (Some(path), None) => {
            let file = TemplateFile::load(path)?;
            info!(
                "Templates available: {:?}",
                file.template_names().collect::<Vec<_>>()
            );
            Vec::new()
        }
        _ => Vec::new(),
    };

    let (mut coordinator, handle) = Coordinator::new(session, &config);
    if let Some(cpu_core) = args.cpu_core {
        coordinator = coordinator.with_rt(RtOptions {
            cpu_core,
            priority: args.rt_priority,
        });
    }
    let worker = coordinator.spawn()?;

    let stopper = handle.clone();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        stopper.request_stop();
    })?;

    if !moves.is_empty() {
        handle.submit(Command::EnableAll)?;
        for request in moves {
            handle.submit(Command::Move(request))?;
        }
    }

    // Reports are already mirrored into tracing; only positions are logged here.
    while handle.state() != LoopState::Stopped {
        if let Ok(Event::Positions(snapshot)) =
            handle.events().recv_timeout(Duration::from_millis(100))
        {
            let positions: Vec<String> = snapshot
                .axes
                .iter()
                .map(|a| format!("{:.4}", a.position))
                .collect();
            debug!(cycle = snapshot.cycle, "Positions [m]: {}", positions.join(" "));
        }
    }

    let dropped = handle.dropped_events();
    if dropped > 0 {
        warn!("{dropped} events dropped by a slow consumer");
    }

    let mut session = worker.join().map_err(|_| "cycle thread panicked")??;
    session.close()?;
    Ok(())
}

/// The default path may be absent; any explicitly named file must exist.
fn load_config(path: &Path) -> Result<CoordinatorConfig, ConfigError> {
    match CoordinatorConfig::load(path) {
        Err(ConfigError::FileNotFound(_)) if path.as_os_str() == DEFAULT_CONFIG_PATH => {
            warn!("No configuration at '{DEFAULT_CONFIG_PATH}', using defaults");
            let config = CoordinatorConfig::default();
            config.validate()?;
            Ok(config)
        }
        other => other,
    }
}

fn setup_tracing(args: &Args) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}
