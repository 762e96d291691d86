//! Command line front end for the EmonDmon poller.
//!
//! Reads either every register or one instrument panel ("graph") from the
//! meter and prints the values.

use anyhow::{Context, Result};
use clap::Parser;
use emondmon_common::LoggingConfig;
use emondmon_poll::catalog;
use emondmon_poll::config::{PollConfig, Selection, SettingsFile};
use emondmon_poll::poller::poll_device;
use emondmon_poll::render;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// Query an EmonDmon power meter over Modbus TCP.
#[derive(Parser, Debug)]
#[command(name = "emondmon-poll")]
#[command(about = "Reads measurements from an EmonDmon power meter")]
#[command(version)]
struct Args {
    /// IP address for the EmonDmon being queried
    #[arg(short = 'i', long = "ip-address", value_name = "IP-ADDR")]
    ip_address: String,

    /// Get all data from device
    #[arg(short, long)]
    all: bool,

    /// Get data for a specific graph (1-10)
    #[arg(
        short,
        long,
        value_name = "N",
        allow_negative_numbers = true,
        long_help = format!("Get data for a specific graph (1-10)\n{}", catalog::describe_graphs())
    )]
    graph: Option<i64>,

    /// Modbus TCP port [default: 502]
    #[arg(long)]
    port: Option<u16>,

    /// Modbus unit id [default: 1]
    #[arg(long)]
    unit_id: Option<u8>,

    /// Connect and read timeout in milliseconds [default: 3000]
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Path to settings file (JSON5 format)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,

    /// Print the results as JSON
    #[arg(long)]
    json: bool,
}

/// Load the explicit settings file, or the per-user one if it exists.
fn load_settings(explicit: Option<&Path>) -> Result<(SettingsFile, Option<PathBuf>)> {
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => emondmon_common::default_config_path().filter(|p| p.exists()),
    };

    match path {
        Some(path) => {
            let settings = SettingsFile::load_from_file(&path)
                .with_context(|| format!("Failed to load settings from {:?}", path))?;
            Ok((settings, Some(path)))
        }
        None => Ok((SettingsFile::default(), None)),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (settings, settings_path) = load_settings(args.config.as_deref())?;

    // Initialize logging
    let log_config = LoggingConfig {
        level: args
            .log_level
            .clone()
            .unwrap_or_else(|| settings.logging.level.clone()),
        format: settings.logging.format,
    };
    emondmon_common::init_tracing(&log_config)
        .map_err(|e| anyhow::anyhow!("Failed to init tracing: {}", e))?;

    if let Some(path) = &settings_path {
        debug!("Loaded settings from {:?}", path);
    }

    // Reject bad selections before touching the network
    let selection = Selection::from_flags(args.all, args.graph)?;

    let mut device = settings.device.for_host(args.ip_address.as_str());
    if let Some(port) = args.port {
        device.port = port;
    }
    if let Some(unit_id) = args.unit_id {
        device.unit_id = unit_id;
    }
    if let Some(timeout_ms) = args.timeout_ms {
        device.timeout_ms = timeout_ms;
    }
    device.validate()?;

    info!(
        "Polling {} from {}:{} (unit {})",
        selection, device.host, device.port, device.unit_id
    );

    let report = match poll_device(PollConfig::new(device, selection)).await {
        Ok(report) => report,
        Err(e) => {
            error!("Can not connect to EmonDmon device: {}", e);
            return Err(e.into());
        }
    };

    if args.json {
        println!("{}", render::render_json(&report)?);
    } else {
        print!("{}", render::render_text(&report));
    }

    Ok(())
}
