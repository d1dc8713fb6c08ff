//! Simulator launch command.
//!
//! One simulator is started per device as `<program> <args...> <config_path>`,
//! e.g. `uv run iot-sim devices/device-01-003.json`.

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;

use crate::config_loader::SimulatorSettings;

/// Program plus leading arguments used to start one simulator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatorCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl SimulatorCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Full argument vector for `config_path`, as it would be typed in a shell
    pub fn argv(&self, config_path: &Path) -> Vec<String> {
        let mut argv = Vec::with_capacity(self.args.len() + 2);
        argv.push(self.program.clone());
        argv.extend(self.args.iter().cloned());
        argv.push(config_path.display().to_string());
        argv
    }

    /// Build the command for one device.
    ///
    /// The child is killed if its handle is dropped, so a supervisor that
    /// unwinds never leaves simulators behind.
    pub fn command_for(&self, config_path: &Path) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg(config_path)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        command
    }
}

impl From<&SimulatorSettings> for SimulatorCommand {
    fn from(settings: &SimulatorSettings) -> Self {
        Self::new(settings.program.clone()).with_args(settings.args.iter().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argv_appends_config_path() {
        let command = SimulatorCommand::new("uv").with_args(["run", "iot-sim"]);
        assert_eq!(
            command.argv(Path::new("devices/device-01-002.json")),
            vec!["uv", "run", "iot-sim", "devices/device-01-002.json"]
        );
    }

    #[test]
    fn test_from_settings() {
        let settings = SimulatorSettings {
            program: "python".to_string(),
            args: vec!["-m".to_string(), "iot_sim".to_string()],
        };
        let command = SimulatorCommand::from(&settings);
        assert_eq!(command.program, "python");
        assert_eq!(command.args, vec!["-m", "iot_sim"]);
    }
}
