//! CAN Telemetry Daemon
//!
//! Long-running acquisition process for vehicle telemetry. It uses the
//! can-telemetry-decoder library and adds the OS glue:
//! - SocketCAN interface setup with arbitration-ID filters
//! - TOML configuration loading and CLI overrides
//! - Logging setup and verbosity control
//! - Graceful shutdown on interrupt (in-flight snapshot commit completes)

use anyhow::{Context, Result};
use can_telemetry_decoder::{AcquisitionLoop, SnapshotWriter};
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

mod bus;
mod config;

/// CAN Telemetry Daemon - decode vehicle telemetry and publish snapshots
#[derive(Parser, Debug)]
#[command(name = "can-telemetry-daemon")]
#[command(about = "Acquire vehicle telemetry from a CAN bus into a pollable snapshot file", long_about = None)]
#[command(version)]
struct Args {
    /// Path to configuration file (config.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// CAN interface to open (overrides the config file)
    #[arg(long, value_name = "IFACE")]
    channel: Option<String>,

    /// Snapshot output file (overrides the config file)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet);

    log::info!("CAN Telemetry Daemon v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using decoder library v{}", can_telemetry_decoder::VERSION);

    // Load configuration and apply CLI overrides
    let mut config = match &args.config {
        Some(path) => {
            log::info!("Loading configuration from: {:?}", path);
            config::load_config(path)?
        }
        None => config::AppConfig::default(),
    };
    if let Some(channel) = args.channel {
        config.bus.channel = channel;
    }
    if let Some(output) = args.output {
        config.output.path = output;
    }

    let catalog = config.catalog().context("Invalid signal catalog")?;

    // Startup faults are fatal: exit non-zero before entering the loop
    log::info!("Initializing CAN interface '{}'...", config.bus.channel);
    let source = bus::SocketCanSource::open(&config.bus.channel, &catalog.frame_ids())
        .context("Failed to acquire CAN bus")?;

    // Interrupt -> cooperative shutdown at the next cycle boundary
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        log::info!("Interrupt received, shutting down...");
        r.store(false, Ordering::SeqCst);
    })
    .context("Failed to install interrupt handler")?;

    let writer = SnapshotWriter::new(&config.output.path, config.output.schema);
    log::info!("Waiting for CAN messages...");
    let mut pipeline = AcquisitionLoop::new(source, catalog, writer, config.loop_config());
    pipeline.run(&running)?;

    log::info!("Shutdown complete");
    Ok(())
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
