//! Simulator pool supervisor for FleetSim regions.
//!
//! Launches one simulator per existing device config in an index range and
//! keeps them running until they exit or the supervisor is interrupted.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgGroup, Parser};
use color_eyre::eyre::{bail, Result};
use log::{error, info};
use tokio_util::sync::CancellationToken;

use fleetsim::config_loader::{resolve_settings, SettingsCliOverrides};
use fleetsim::process::{DeviceRange, RunOutcome, SimulatorCommand, Supervisor, SupervisorError};

#[derive(Parser, Debug)]
#[command(name = "fleet-supervisor")]
#[command(about = "Launch and supervise the device simulators of a FleetSim region")]
#[command(version)]
#[command(group(ArgGroup::new("devices").required(true).args(["index", "start"])))]
struct Cli {
    /// Folder holding the generated device configs
    #[arg(short, long)]
    folder: Option<PathBuf>,

    /// Region number (0-99)
    #[arg(short, long)]
    region: u32,

    /// Supervise a single device
    #[arg(short, long)]
    index: Option<u32>,

    /// First device of an inclusive range
    #[arg(short, long, requires = "end")]
    start: Option<u32>,

    /// Last device of an inclusive range
    #[arg(short, long, requires = "start")]
    end: Option<u32>,

    /// Simulator program; the config path is appended to its arguments
    #[arg(long)]
    simulator: Option<String>,

    /// Argument passed to the simulator before the config path (repeatable)
    #[arg(long = "simulator-arg", allow_hyphen_values = true)]
    simulator_args: Vec<String>,

    /// Fleet settings YAML file
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Zero-padding width of the device id in config file names
    #[arg(long)]
    id_width: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Cli {
    fn range(&self) -> Result<DeviceRange> {
        let range = match (self.index, self.start, self.end) {
            (Some(index), _, _) => DeviceRange::single(index)?,
            (None, Some(start), Some(end)) => DeviceRange::new(start, end)?,
            _ => bail!("either --index or both --start and --end are required"),
        };
        Ok(range)
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    color_eyre::install()?;
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&cli.log_level))
        .init();

    let settings = resolve_settings(
        cli.settings.as_deref(),
        &SettingsCliOverrides {
            device_id_width: cli.id_width,
            folder: cli.folder.clone(),
            simulator_program: cli.simulator.clone(),
            simulator_args: (!cli.simulator_args.is_empty()).then(|| cli.simulator_args.clone()),
            ..Default::default()
        },
    )?;
    let range = cli.range()?;

    let shutdown_token = CancellationToken::new();
    install_signal_handlers(shutdown_token.clone())?;

    let mut supervisor = Supervisor::new(
        settings.layout_for(&settings.folder),
        cli.region,
        SimulatorCommand::from(&settings.simulator),
    );
    let report = supervisor.run(range, &shutdown_token).await?;

    match report.outcome {
        RunOutcome::Interrupted => {
            info!("Terminated {} simulators after interrupt", report.terminated.len());
        }
        RunOutcome::Completed if report.all_clean() => {
            info!("All {} simulators exited cleanly", report.exits.len());
        }
        RunOutcome::Completed => {
            let failed = report.exits.iter().filter(|e| !e.status.success()).count();
            let errors = report
                .errors
                .iter()
                .filter(|e| !matches!(e, SupervisorError::MissingFile { .. }))
                .count();
            error!(
                "{} simulators exited with failure, {} launch/wait errors",
                failed, errors
            );
        }
    }
    if !report.skipped.is_empty() {
        info!("Skipped devices without config files: {:?}", report.skipped);
    }

    Ok(ExitCode::from(report.exit_code()))
}

/// Cancel `token` on SIGINT or SIGTERM.
///
/// The signal streams are registered before returning, so an interrupt that
/// arrives during launching is never lost to the default handler.
#[cfg(unix)]
fn install_signal_handlers(token: CancellationToken) -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;

    tokio::spawn(async move {
        tokio::select! {
            _ = interrupt.recv() => info!("SIGINT received, shutting down simulators..."),
            _ = terminate.recv() => info!("SIGTERM received, shutting down simulators..."),
        }
        token.cancel();
    });
    Ok(())
}

#[cfg(not(unix))]
fn install_signal_handlers(token: CancellationToken) -> Result<()> {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Ctrl-C received, shutting down simulators..."),
            Err(e) => {
                error!("Failed to listen for Ctrl-C: {}", e);
                return;
            }
        }
        token.cancel();
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_index() {
        let cli = Cli::parse_from([
            "fleet-supervisor",
            "--folder",
            "devices",
            "--region",
            "1",
            "--index",
            "4",
        ]);
        assert_eq!(cli.range().unwrap(), DeviceRange::single(4).unwrap());
    }

    #[test]
    fn test_index_range() {
        let cli = Cli::parse_from([
            "fleet-supervisor",
            "--region",
            "2",
            "--start",
            "1",
            "--end",
            "3",
            "--simulator",
            "uv",
            "--simulator-arg",
            "run",
            "--simulator-arg",
            "iot-sim",
        ]);
        assert_eq!(cli.range().unwrap(), DeviceRange::new(1, 3).unwrap());
        assert_eq!(cli.simulator.as_deref(), Some("uv"));
        assert_eq!(cli.simulator_args, vec!["run", "iot-sim"]);
    }

    #[test]
    fn test_range_requires_both_bounds() {
        let parsed = Cli::try_parse_from(["fleet-supervisor", "--region", "1", "--start", "1"]);
        assert!(parsed.is_err());
        assert!(Cli::try_parse_from(["fleet-supervisor", "--region", "1"]).is_err());
    }

    #[test]
    fn test_inverted_range_rejected() {
        let cli = Cli::parse_from([
            "fleet-supervisor",
            "--region",
            "1",
            "--start",
            "5",
            "--end",
            "2",
        ]);
        assert!(cli.range().is_err());
    }
}
