use crate::config::{DeviceConfig, DocumentError};
use crate::identity::{DeviceLayout, DEFAULT_DEVICE_ID_WIDTH};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::{Path, PathBuf};

/// Fleet-wide settings, optionally loaded from a YAML file.
///
/// ```yaml
/// device_id_width: 3
/// folder: devices
/// base_port: 5000
/// simulator:
///   program: uv
///   args: ["run", "iot-sim"]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FleetSettings {
    /// Zero-padding width of the device id in config file names
    pub device_id_width: usize,
    /// Folder holding device configs and manifests
    pub folder: PathBuf,
    /// Port offset for region generation
    pub base_port: u16,
    /// How to launch one simulator
    pub simulator: SimulatorSettings,
}

/// Simulator launch command; the config path is appended as the last argument
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorSettings {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for FleetSettings {
    fn default() -> Self {
        Self {
            device_id_width: DEFAULT_DEVICE_ID_WIDTH,
            folder: PathBuf::from("devices"),
            base_port: 5000,
            simulator: SimulatorSettings::default(),
        }
    }
}

impl Default for SimulatorSettings {
    fn default() -> Self {
        Self {
            program: "iot-sim".to_string(),
            args: Vec::new(),
        }
    }
}

impl FleetSettings {
    /// Validate the settings
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.device_id_width == 0 || self.device_id_width > 9 {
            return Err(SettingsError::Invalid(format!(
                "device_id_width must be between 1 and 9, got {}",
                self.device_id_width
            )));
        }
        if self.simulator.program.trim().is_empty() {
            return Err(SettingsError::Invalid(
                "simulator.program cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// File layout for `folder`, using the configured device id width
    pub fn layout_for(&self, folder: &Path) -> DeviceLayout {
        DeviceLayout::new(folder).with_device_id_width(self.device_id_width)
    }
}

/// CLI arguments that take precedence over values from the settings file
#[derive(Debug, Clone, Default)]
pub struct SettingsCliOverrides {
    pub device_id_width: Option<usize>,
    pub folder: Option<PathBuf>,
    pub base_port: Option<u16>,
    pub simulator_program: Option<String>,
    pub simulator_args: Option<Vec<String>>,
}

/// Errors loading fleet settings or templates
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Failed to read settings file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse settings file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid fleet settings: {0}")]
    Invalid(String),
}

/// Template file is missing or not a valid device document
#[derive(Debug, thiserror::Error)]
pub enum MalformedTemplate {
    #[error("Malformed template: {0}")]
    Unreadable(#[from] DocumentError),

    #[error("Malformed template {path:?}: {}", .problems.join("; "))]
    OutOfBounds { path: PathBuf, problems: Vec<String> },
}

/// Load and parse fleet settings from a YAML file
pub fn load_settings(path: &Path) -> Result<FleetSettings, SettingsError> {
    info!("Loading fleet settings from: {:?}", path);

    let file = File::open(path).map_err(|source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let settings: FleetSettings =
        serde_yaml::from_reader(file).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    settings.validate()?;
    Ok(settings)
}

/// Load settings from `path` if given, otherwise use the defaults, then apply
/// CLI overrides and re-validate.
pub fn resolve_settings(
    path: Option<&Path>,
    overrides: &SettingsCliOverrides,
) -> Result<FleetSettings, SettingsError> {
    let mut settings = match path {
        Some(path) => load_settings(path)?,
        None => {
            debug!("No settings file given, using defaults");
            FleetSettings::default()
        }
    };
    apply_settings_overrides(&mut settings, overrides)?;
    Ok(settings)
}

/// Apply CLI overrides to fleet settings
pub fn apply_settings_overrides(
    settings: &mut FleetSettings,
    overrides: &SettingsCliOverrides,
) -> Result<(), SettingsError> {
    if let Some(width) = overrides.device_id_width {
        settings.device_id_width = width;
    }
    if let Some(folder) = &overrides.folder {
        settings.folder = folder.clone();
    }
    if let Some(base_port) = overrides.base_port {
        settings.base_port = base_port;
    }
    if let Some(program) = &overrides.simulator_program {
        settings.simulator.program = program.clone();
    }
    if let Some(args) = &overrides.simulator_args {
        settings.simulator.args = args.clone();
    }

    // Re-validate after applying overrides
    settings.validate()
}

/// Load a device template for the override and region generators.
///
/// The template must already satisfy the document's numeric bounds, so an
/// empty override set always yields a valid document.
pub fn load_template(path: &Path) -> Result<DeviceConfig, MalformedTemplate> {
    info!("Loading device template from: {:?}", path);
    let template = DeviceConfig::from_file(path)?;

    let problems = template.range_violations();
    if !problems.is_empty() {
        return Err(MalformedTemplate::OutOfBounds {
            path: path.to_path_buf(),
            problems,
        });
    }
    Ok(template)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_settings() {
        let yaml = r#"
device_id_width: 4
folder: fleet
base_port: 6000
simulator:
  program: uv
  args: ["run", "iot-sim"]
"#;
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", yaml).unwrap();

        let settings = load_settings(temp_file.path()).unwrap();
        assert_eq!(settings.device_id_width, 4);
        assert_eq!(settings.folder, PathBuf::from("fleet"));
        assert_eq!(settings.base_port, 6000);
        assert_eq!(settings.simulator.program, "uv");
        assert_eq!(settings.simulator.args, vec!["run", "iot-sim"]);
    }

    #[test]
    fn test_partial_settings_use_defaults() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "base_port: 7000\n").unwrap();

        let settings = load_settings(temp_file.path()).unwrap();
        assert_eq!(settings.base_port, 7000);
        assert_eq!(settings.device_id_width, DEFAULT_DEVICE_ID_WIDTH);
        assert_eq!(settings.simulator, SimulatorSettings::default());
    }

    #[test]
    fn test_invalid_width_rejected() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "device_id_width: 0\n").unwrap();
        assert!(matches!(load_settings(temp_file.path()), Err(SettingsError::Invalid(_))));
    }

    #[test]
    fn test_cli_overrides_take_precedence() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "device_id_width: 4\nbase_port: 6000\n").unwrap();

        let overrides = SettingsCliOverrides {
            device_id_width: Some(3),
            simulator_program: Some("/opt/sim/bin/iot-sim".to_string()),
            ..Default::default()
        };
        let settings = resolve_settings(Some(temp_file.path()), &overrides).unwrap();
        assert_eq!(settings.device_id_width, 3);
        assert_eq!(settings.base_port, 6000);
        assert_eq!(settings.simulator.program, "/opt/sim/bin/iot-sim");
    }

    #[test]
    fn test_load_template_malformed() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{{ not json").unwrap();
        let err = load_template(temp_file.path()).unwrap_err();
        assert!(err.to_string().starts_with("Malformed template"));

        assert!(load_template(Path::new("/nonexistent/template.json")).is_err());
    }

    #[test]
    fn test_load_template_out_of_bounds() {
        let mut template = DeviceConfig::with_uuid("tmpl");
        template.server_port = 80;
        template.battery_charge = 150.0;
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", template.to_json_pretty().unwrap()).unwrap();

        match load_template(temp_file.path()) {
            Err(MalformedTemplate::OutOfBounds { problems, .. }) => {
                assert_eq!(problems.len(), 2);
            }
            other => panic!("expected OutOfBounds, got {:?}", other),
        }
        let err = load_template(temp_file.path()).unwrap_err();
        assert!(err.to_string().starts_with("Malformed template"));
    }

    #[test]
    fn test_load_template_roundtrip() {
        let template = DeviceConfig::with_uuid("tmpl");
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", template.to_json_pretty().unwrap()).unwrap();
        assert_eq!(load_template(temp_file.path()).unwrap(), template);
    }
}
