use clap::{Parser, Subcommand};
use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use env_logger::Env;
use log::{error, info};
use std::fs;
use std::path::{Path, PathBuf};

use fleetsim::checker::check_config_file;
use fleetsim::config::DeviceConfig;
use fleetsim::config_loader::{load_template, resolve_settings, SettingsCliOverrides};
use fleetsim::orchestrator::{generate_region, FailurePolicy, RegionRequest};
use fleetsim::overrides::compose;
use fleetsim::utils::OverrideArgs;

/// Configuration generator for simulated IoT device fleets
#[derive(Parser, Debug)]
#[command(name = "fleetsim", author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Fleet settings YAML file
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Zero-padding width of the device id in config file names
    #[arg(long, global = true)]
    id_width: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate one device config from the built-in defaults
    Config {
        #[command(flatten)]
        overrides: OverrideArgs,

        /// Write the document to a file instead of standard output
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate one device config by overriding fields of a template
    Override {
        /// Template device config (JSON)
        #[arg(short, long)]
        template: PathBuf,

        #[command(flatten)]
        overrides: OverrideArgs,

        /// Write the document to a file instead of standard output
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate every device config of a region plus its manifest
    Region {
        /// Output folder for device configs and the manifest
        #[arg(long)]
        folder: Option<PathBuf>,

        /// Region number (0-99)
        #[arg(long)]
        region: u32,

        /// Port offset; device N listens on base-port + N
        #[arg(long)]
        base_port: Option<u16>,

        /// Number of devices to generate
        #[arg(long)]
        count: u32,

        /// Template device config to start from instead of the defaults
        #[arg(long)]
        template: Option<PathBuf>,

        /// Skip devices that fail instead of aborting the whole region
        #[arg(long)]
        skip_invalid: bool,

        #[command(flatten)]
        overrides: OverrideArgs,
    },

    /// Check device config files the way the simulator will read them
    Check {
        /// Device config files
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Parse command-line arguments
    let cli = Cli::parse();

    // Logging goes to stderr so generated documents can be piped from stdout
    env_logger::Builder::from_env(Env::default().default_filter_or(&cli.log_level)).init();

    match &cli.command {
        Commands::Config { overrides, output } => {
            let config = compose(None, &overrides.to_overrides())?;
            emit_document(&config, output.as_deref())
        }
        Commands::Override {
            template,
            overrides,
            output,
        } => {
            let base = load_template(template)?;
            let config = compose(Some(&base), &overrides.to_overrides())?;
            emit_document(&config, output.as_deref())
        }
        Commands::Region {
            folder,
            region,
            base_port,
            count,
            template,
            skip_invalid,
            overrides,
        } => {
            let settings = resolve_settings(
                cli.settings.as_deref(),
                &SettingsCliOverrides {
                    device_id_width: cli.id_width,
                    folder: folder.clone(),
                    base_port: *base_port,
                    ..Default::default()
                },
            )?;
            let template = template.as_deref().map(load_template).transpose()?;
            let policy = if *skip_invalid {
                FailurePolicy::SkipAndContinue
            } else {
                FailurePolicy::AbortOnFirstError
            };

            let request = RegionRequest {
                layout: settings.layout_for(&settings.folder),
                region: *region,
                base_port: u32::from(settings.base_port),
                device_count: *count,
                policy,
            };
            let report = generate_region(&request, &overrides.to_overrides(), template.as_ref())?;

            println!("{}", report.manifest_path.display());
            Ok(())
        }
        Commands::Check { files } => {
            let mut failed = 0;
            for path in files {
                let report = check_config_file(path);
                if report.is_ok() {
                    info!("{:?}: ok", report.path);
                } else {
                    failed += 1;
                    for problem in &report.problems {
                        error!("{:?}: {}", report.path, problem);
                    }
                }
            }
            if failed > 0 {
                return Err(eyre!("{} of {} config files failed checks", failed, files.len()));
            }
            Ok(())
        }
    }
}

/// Print the document to stdout, or write it to `output`
fn emit_document(config: &DeviceConfig, output: Option<&Path>) -> Result<()> {
    let body = config.to_json_pretty()?;
    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).wrap_err_with(|| {
                    format!("Failed to create directory '{}'", parent.display())
                })?;
            }
            fs::write(path, body)
                .wrap_err_with(|| format!("Failed to write '{}'", path.display()))?;
            info!("Wrote device config to {:?}", path);
        }
        None => println!("{}", body),
    }
    Ok(())
}
